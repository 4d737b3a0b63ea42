use std::rc::Rc;

use crate::lexer::Token;
use crate::runtime::callable::NativeFunction;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::{Elements, Entries, Value};

/// Resolves a member of a container value. Returns `None` when `target` is not a
/// container. Member names are matched case-insensitively.
pub fn member(target: &Value, name: &Token) -> Option<Result<Value, RuntimeError>> {
    let member = name.lexeme.to_ascii_lowercase();
    let resolved = match target {
        Value::Array(elements) => array_member(elements, &member),
        Value::List(elements) => list_member(elements, &member),
        Value::Map(entries) => map_member(entries, &member),
        Value::Stack(elements) => stack_member(elements, &member),
        _ => return None,
    };
    Some(resolved.ok_or_else(|| {
        RuntimeError::new(name, format!("Undefined property '{}'.", name.lexeme))
    }))
}

/// The error for writing a property on a container, or `None` for other values.
pub fn property_write_error(target: &Value, name: &Token) -> Option<RuntimeError> {
    let kind = match target {
        Value::Array(_) => "arrays",
        Value::List(_) => "lists",
        Value::Map(_) => "maps",
        Value::Stack(_) => "stacks",
        _ => return None,
    };
    Some(RuntimeError::new(
        name,
        format!("Can't add properties to {kind}."),
    ))
}

pub fn to_index(value: &Value, token: &Token) -> Result<usize, RuntimeError> {
    let index = match value {
        Value::Integer(index) => *index,
        Value::Double(index) => index.round() as i64,
        _ => return Err(RuntimeError::new(token, "Index must be a number.")),
    };
    usize::try_from(index).map_err(|_| out_of_range(token))
}

pub fn out_of_range(token: &Token) -> RuntimeError {
    RuntimeError::new(token, "Index out of range.")
}

pub fn element_at(elements: &Elements, index: usize, token: &Token) -> Result<Value, RuntimeError> {
    elements
        .borrow()
        .get(index)
        .cloned()
        .ok_or_else(|| out_of_range(token))
}

fn length(len: usize) -> Value {
    Value::Integer(len as i64)
}

fn method(
    name: &str,
    arity: usize,
    call: impl Fn(&Token, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
) -> Option<Value> {
    Some(Value::Native(NativeFunction::new(
        name,
        arity,
        move |_, paren, arguments| call(paren, arguments),
    )))
}

fn first(arguments: Vec<Value>) -> Value {
    arguments.into_iter().next().unwrap_or(Value::Nil)
}

fn pair(arguments: Vec<Value>) -> (Value, Value) {
    let mut arguments = arguments.into_iter();
    let first = arguments.next().unwrap_or(Value::Nil);
    let second = arguments.next().unwrap_or(Value::Nil);
    (first, second)
}

fn array_member(elements: &Elements, member: &str) -> Option<Value> {
    let elements = Rc::clone(elements);
    match member {
        "get" => method("get", 1, move |paren, arguments| {
            let index = to_index(&first(arguments), paren)?;
            element_at(&elements, index, paren)
        }),
        "set" => method("set", 2, move |paren, arguments| {
            let (index, value) = pair(arguments);
            let index = to_index(&index, paren)?;
            let mut elements = elements.borrow_mut();
            let slot = elements.get_mut(index).ok_or_else(|| out_of_range(paren))?;
            *slot = value.clone();
            Ok(value)
        }),
        "length" => {
            let len = elements.borrow().len();
            Some(length(len))
        }
        _ => None,
    }
}

fn list_member(elements: &Elements, member: &str) -> Option<Value> {
    let elements = Rc::clone(elements);
    match member {
        "get" => method("get", 1, move |paren, arguments| {
            let index = to_index(&first(arguments), paren)?;
            element_at(&elements, index, paren)
        }),
        "add" => method("add", 1, move |_, arguments| {
            elements.borrow_mut().push(first(arguments));
            Ok(Value::Nil)
        }),
        "length" => {
            let len = elements.borrow().len();
            Some(length(len))
        }
        _ => None,
    }
}

fn map_member(entries: &Entries, member: &str) -> Option<Value> {
    let entries = Rc::clone(entries);
    match member {
        "get" => method("get", 1, move |_, arguments| {
            let key = first(arguments);
            Ok(entries
                .borrow()
                .iter()
                .find(|(existing, _)| *existing == key)
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Nil))
        }),
        "put" => method("put", 2, move |_, arguments| {
            let (key, value) = pair(arguments);
            put_entry(&entries, key, value.clone());
            Ok(value)
        }),
        "contains" => method("contains", 1, move |_, arguments| {
            let key = first(arguments);
            let found = entries.borrow().iter().any(|(existing, _)| *existing == key);
            Ok(Value::Boolean(found))
        }),
        _ => None,
    }
}

/// Inserts or replaces the entry for `key`, keeping insertion order.
pub fn put_entry(entries: &Entries, key: Value, value: Value) {
    let mut entries = entries.borrow_mut();
    match entries.iter().position(|(existing, _)| *existing == key) {
        Some(index) => entries[index].1 = value,
        None => entries.push((key, value)),
    }
}

fn stack_member(elements: &Elements, member: &str) -> Option<Value> {
    let elements = Rc::clone(elements);
    match member {
        "push" => method("push", 1, move |_, arguments| {
            let value = first(arguments);
            elements.borrow_mut().push(value.clone());
            Ok(value)
        }),
        "pop" => method("pop", 0, move |paren, _| {
            elements
                .borrow_mut()
                .pop()
                .ok_or_else(|| RuntimeError::new(paren, "Stack is empty."))
        }),
        "peek" => method("peek", 0, move |paren, _| {
            elements
                .borrow()
                .last()
                .cloned()
                .ok_or_else(|| RuntimeError::new(paren, "Stack is empty."))
        }),
        "isempty" => method("isEmpty", 0, move |_, _| {
            Ok(Value::Boolean(elements.borrow().is_empty()))
        }),
        "length" => {
            let len = elements.borrow().len();
            Some(length(len))
        }
        _ => None,
    }
}
