use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::callable::{Class, EnumMember, Function, Instance, NativeFunction};

pub type Elements = Rc<RefCell<Vec<Value>>>;
pub type Entries = Rc<RefCell<Vec<(Value, Value)>>>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Char(char),
    String(String),
    Enum(Rc<EnumMember>),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Array(Elements),
    List(Elements),
    Map(Entries),
    Stack(Elements),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(value) => *value,
            Value::Integer(value) => *value != 0,
            Value::Enum(member) => member.ordinal != 0,
            _ => true,
        }
    }

    /// The runtime type name used for overload matching and `except` dispatch.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "Nil".into(),
            Value::Boolean(_) => "Boolean".into(),
            Value::Integer(_) => "Integer".into(),
            Value::Double(_) => "Double".into(),
            Value::Char(_) => "Char".into(),
            Value::String(_) => "String".into(),
            Value::Enum(member) => member.enum_name.clone(),
            Value::Function(_) | Value::Native(_) => "Function".into(),
            Value::Class(_) => "Class".into(),
            Value::Instance(instance) => instance.class.name.clone(),
            Value::Array(_) => "Array".into(),
            Value::List(_) => "List".into(),
            Value::Map(_) => "Map".into(),
            Value::Stack(_) => "Stack".into(),
        }
    }

    pub fn new_list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn new_map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(true) => write!(f, "True"),
            Value::Boolean(false) => write!(f, "False"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Double(value) => write!(f, "{value}"),
            Value::Char(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value}"),
            Value::Enum(member) => write!(f, "{}", member.name),
            Value::Function(function) => write!(f, "<fn {}>", function.name()),
            Value::Native(_) => write!(f, "<native fn>"),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
            Value::Array(values) | Value::List(values) => write_sequence(f, values.borrow().iter()),
            Value::Stack(values) => write_sequence(f, values.borrow().iter().rev()),
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (index, (key, value)) in entries.borrow().iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_sequence<'a>(
    f: &mut fmt::Formatter<'_>,
    values: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    write!(f, "[")?;
    for (index, value) in values.enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }
    write!(f, "]")
}

// Functions and instances can reach their own closures, so Debug stays shallow.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(value) => write!(f, "String({value:?})"),
            Value::Char(value) => write!(f, "Char({value:?})"),
            other => write!(f, "{}({other})", other.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => {
                Rc::ptr_eq(a, b) || (a.enum_name == b.enum_name && a.ordinal == b.ordinal)
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b))
            | (Value::List(a), Value::List(b))
            | (Value::Stack(a), Value::Stack(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
