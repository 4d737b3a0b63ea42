use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::lexer::Token;
use crate::runtime::callable::NativeFunction;
use crate::runtime::containers::{out_of_range, to_index};
use crate::runtime::environment::Environment;
use crate::runtime::error::RuntimeError;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    WriteLn,
    Write,
    Str,
    Ord,
    Copy,
    Length,
    Clock,
    Array,
    List,
    Map,
    Stack,
    AssertTrue,
    AssertEqual,
}

#[derive(Debug, Clone, Copy)]
pub struct NativeSpec {
    pub name: &'static str,
    pub kind: NativeKind,
    pub arity: usize,
}

const fn native(name: &'static str, kind: NativeKind, arity: usize) -> NativeSpec {
    NativeSpec { name, kind, arity }
}

/// Functions bound in the global environment of every interpreter.
pub const NATIVES: &[NativeSpec] = &[
    native("WriteLn", NativeKind::WriteLn, 1),
    native("Write", NativeKind::Write, 1),
    native("Str", NativeKind::Str, 1),
    native("Ord", NativeKind::Ord, 1),
    native("Copy", NativeKind::Copy, 3),
    native("Length", NativeKind::Length, 1),
    native("clock", NativeKind::Clock, 0),
    native("Array", NativeKind::Array, 1),
    native("List", NativeKind::List, 0),
    native("Map", NativeKind::Map, 0),
    native("Stack", NativeKind::Stack, 0),
    native("AssertTrue", NativeKind::AssertTrue, 1),
    native("AssertEqual", NativeKind::AssertEqual, 2),
];

pub fn register(globals: &Environment) {
    for spec in NATIVES {
        let kind = spec.kind;
        let function = NativeFunction::new(spec.name, spec.arity, move |interpreter, paren, arguments| {
            invoke(kind, interpreter, paren, arguments)
        });
        globals.define_value(spec.name, Value::Native(function));
    }
}

fn invoke(
    kind: NativeKind,
    interpreter: &mut Interpreter,
    paren: &Token,
    arguments: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let mut arguments = arguments.into_iter();
    let mut next = move || arguments.next().unwrap_or(Value::Nil);

    match kind {
        NativeKind::WriteLn => {
            let text = format!("{}\n", next());
            interpreter.write_output(&text, paren)?;
            Ok(Value::Nil)
        }
        NativeKind::Write => {
            let text = next().to_string();
            interpreter.write_output(&text, paren)?;
            Ok(Value::Nil)
        }
        NativeKind::Str => Ok(Value::String(next().to_string())),
        NativeKind::Ord => ordinal(&next(), paren).map(Value::Integer),
        NativeKind::Copy => {
            let text = next();
            let begin = to_index(&next(), paren)?;
            let end = to_index(&next(), paren)?;
            copy(&text, begin, end, paren)
        }
        NativeKind::Length => length(&next(), paren),
        NativeKind::Clock => {
            let seconds = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs_f64())
                .unwrap_or_default();
            Ok(Value::Double(seconds))
        }
        NativeKind::Array => {
            let size = to_index(&next(), paren)?;
            let mut elements = Vec::new();
            elements
                .try_reserve_exact(size)
                .map_err(|_| RuntimeError::new(paren, "Array size out of range."))?;
            elements.resize(size, Value::Nil);
            Ok(Value::Array(Rc::new(RefCell::new(elements))))
        }
        NativeKind::List => Ok(Value::new_list(Vec::new())),
        NativeKind::Map => Ok(Value::new_map(Vec::new())),
        NativeKind::Stack => Ok(Value::Stack(Rc::new(RefCell::new(Vec::new())))),
        NativeKind::AssertTrue => {
            if next().is_truthy() {
                Ok(Value::Nil)
            } else {
                Err(RuntimeError::new(paren, "Assertion 'left = right' failed."))
            }
        }
        NativeKind::AssertEqual => {
            let left = next();
            let right = next();
            if left == right {
                Ok(Value::Nil)
            } else {
                Err(RuntimeError::new(
                    paren,
                    format!("Assertion 'left = right' failed. Expected '{left}' but got '{right}'."),
                ))
            }
        }
    }
}

fn ordinal(value: &Value, paren: &Token) -> Result<i64, RuntimeError> {
    match value {
        Value::Nil => Ok(-1),
        Value::Integer(value) => Ok(*value),
        Value::Double(value) => Ok(value.trunc() as i64),
        Value::Boolean(value) => Ok(i64::from(*value)),
        Value::Char(value) => Ok(i64::from(u32::from(*value))),
        Value::Enum(member) => Ok(member.ordinal),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .or_else(|_| text.parse::<f64>().map(|parsed| parsed.trunc() as i64))
                .map_err(|_| RuntimeError::new(paren, format!("Can't take the ordinal of '{text}'.")))
        }
        other => Err(RuntimeError::new(
            paren,
            format!("Can't take the ordinal of a {}.", other.type_name()),
        )),
    }
}

fn copy(text: &Value, begin: usize, end: usize, paren: &Token) -> Result<Value, RuntimeError> {
    let Value::String(text) = text else {
        return Err(RuntimeError::new(paren, "Copy expects a string."));
    };
    if begin > end || end > text.chars().count() {
        return Err(out_of_range(paren));
    }
    Ok(Value::String(text.chars().skip(begin).take(end - begin).collect()))
}

fn length(value: &Value, paren: &Token) -> Result<Value, RuntimeError> {
    let len = match value {
        Value::String(text) => text.chars().count(),
        Value::Array(elements) | Value::List(elements) | Value::Stack(elements) => {
            elements.borrow().len()
        }
        Value::Map(entries) => entries.borrow().len(),
        other => {
            return Err(RuntimeError::new(
                paren,
                format!("Can't take the length of a {}.", other.type_name()),
            ))
        }
    };
    Ok(Value::Integer(len as i64))
}
