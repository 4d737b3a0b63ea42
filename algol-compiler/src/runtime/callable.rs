use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::ast::FunctionStatement;
use crate::lexer::Token;
use crate::runtime::environment::Environment;
use crate::runtime::error::{RuntimeError, Signal};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;

/// Class name → parent class name (`Any` for root classes), filled in as class
/// declarations execute.
pub type ClassParents = HashMap<String, String>;

pub type NativeCall = Rc<dyn Fn(&mut Interpreter, &Token, Vec<Value>) -> Result<Value, RuntimeError>>;

pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub call: NativeCall,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        call: impl Fn(&mut Interpreter, &Token, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            arity,
            call: Rc::new(call),
        })
    }

    pub fn invoke(
        &self,
        interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        trace!(native = %self.name, arguments = arguments.len(), "native call");
        (self.call)(interpreter, paren, arguments)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

pub struct Function {
    pub declaration: Rc<FunctionStatement>,
    closure: Rc<Environment>,
    is_initializer: bool,
    overloads: RefCell<Vec<Rc<Function>>>,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionStatement>,
        closure: Rc<Environment>,
        is_initializer: bool,
    ) -> Rc<Self> {
        Rc::new(Self {
            declaration,
            closure,
            is_initializer,
            overloads: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.parameters.len()
    }

    pub fn add_overload(&self, overload: Rc<Function>) {
        self.overloads.borrow_mut().push(overload);
    }

    /// A copy whose closure binds `this` to `instance`. Overloads are not carried
    /// over; method lookup on the class handles those.
    pub fn bind(&self, instance: Rc<Instance>) -> Rc<Function> {
        let environment = Environment::with_enclosing(self.closure.clone());
        environment.define_value("this", Value::Instance(instance));
        Function::new(self.declaration.clone(), environment, self.is_initializer)
    }

    /// The instance this function was bound to, if any.
    pub fn bound_instance(&self) -> Option<Rc<Instance>> {
        match self.closure.get_at(0, "this") {
            Some(Value::Instance(instance)) => Some(instance),
            _ => None,
        }
    }

    /// Positional match of runtime argument types against declared parameter types.
    pub fn is_match(&self, types: &[String], parents: &ClassParents) -> bool {
        let parameters = &self.declaration.parameters;
        if parameters.len() != types.len() {
            return false;
        }
        parameters.iter().zip(types).all(|(parameter, actual)| {
            let expected = parameter.type_name.as_str();
            expected.eq_ignore_ascii_case("Any")
                || expected.eq_ignore_ascii_case(actual)
                || is_subtype(parents, expected, actual)
        })
    }

    /// Picks this function or the first sibling overload accepting `types`.
    pub fn find_overload(self: &Rc<Self>, types: &[String], parents: &ClassParents) -> Option<Rc<Function>> {
        if self.is_match(types, parents) {
            return Some(self.clone());
        }
        self.overloads
            .borrow()
            .iter()
            .find(|overload| overload.is_match(types, parents))
            .cloned()
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let environment = Environment::with_enclosing(self.closure.clone());
        for (parameter, argument) in self.declaration.parameters.iter().zip(arguments) {
            environment.define_value(parameter.name.lexeme.clone(), argument);
        }

        let returned = match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) | Err(Signal::Break) => Value::Nil,
            Err(Signal::Exit(value)) => value,
            Err(Signal::Error(error)) => return Err(error),
        };

        if self.is_initializer {
            return Ok(self.closure.get_at(0, "this").unwrap_or(Value::Nil));
        }
        Ok(returned)
    }
}

/// True when `actual` reaches `expected` through the runtime parent chain.
pub fn is_subtype(parents: &ClassParents, expected: &str, actual: &str) -> bool {
    let mut seen = HashSet::new();
    let mut current = parents.get(actual);
    while let Some(parent) = current {
        if parent.eq_ignore_ascii_case(expected) {
            return true;
        }
        if !seen.insert(parent.as_str()) {
            return false;
        }
        current = parents.get(parent);
    }
    false
}

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            superclass,
            methods,
        })
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Like `find_method`, but selects the overload accepting `types`. The nearest
    /// class declaring `name` decides; ancestors are not consulted past it.
    pub fn find_method_matching(
        &self,
        name: &str,
        types: &[String],
        parents: &ClassParents,
    ) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => method.find_overload(types, parents),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method_matching(name, types, parents)),
        }
    }

    /// Walks the class and its ancestors, nearest first.
    pub fn ancestry(self: &Rc<Self>) -> impl Iterator<Item = Rc<Class>> {
        std::iter::successors(Some(self.clone()), |class| class.superclass.clone())
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<Self> {
        Rc::new(Self {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value, RuntimeError> {
        if name.lexeme.eq_ignore_ascii_case("classname") {
            return Ok(Value::String(self.class.name.clone()));
        }

        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match self.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Function(method.bind(self.clone()))),
            None => Err(RuntimeError::new(
                name,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

pub struct EnumMember {
    pub enum_name: String,
    pub name: String,
    pub ordinal: i64,
}
