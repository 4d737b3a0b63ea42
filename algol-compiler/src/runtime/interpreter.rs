use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{
    BinaryExpression, BinaryOperator, CallExpression, ClassStatement, EnumStatement,
    ExceptHandler, Expression, ExpressionKind, Literal, LogicalOperator, NodeId, SourceSpan,
    Statement, SubscriptExpression, TryStatement, UnaryOperator,
};
use crate::lexer::Token;
use crate::resolver::INITIALIZER_NAME;
use crate::runtime::callable::{Class, ClassParents, EnumMember, Function, Instance};
use crate::runtime::containers::{self, element_at, put_entry, to_index};
use crate::runtime::environment::{undefined_variable, Environment};
use crate::runtime::error::{RuntimeError, Signal};
use crate::runtime::natives;
use crate::runtime::value::{Entries, Value};

#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub name: String,
    pub span: SourceSpan,
    pub status: TestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed { message: String },
}

/// An in-memory sink for program output. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Tree-walking evaluator. Globals and resolved distances persist across calls to
/// `interpret`, so a REPL can feed it one line at a time.
pub struct Interpreter {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: HashMap<NodeId, usize>,
    class_parents: ClassParents,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        let globals = Environment::new();
        natives::register(&globals);
        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            class_parents: ClassParents::new(),
            output,
        }
    }

    /// Merges resolution distances from a compilation into the interpreter.
    pub fn add_locals(&mut self, locals: HashMap<NodeId, usize>) {
        self.locals.extend(locals);
    }

    pub fn globals(&self) -> &Rc<Environment> {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.lookup(name)
    }

    /// Runs top-level statements in order, stopping at the first signal. An `exit`
    /// at top level comes back as `Signal::Exit`.
    pub fn interpret(&mut self, statements: &[Statement]) -> Result<(), Signal> {
        debug!(statements = statements.len(), "interpreting");
        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.flush_output();
        result
    }

    /// Runs the file, then every top-level parameterless function whose name starts
    /// with `Test`, in declaration order.
    pub fn run_tests(
        &mut self,
        statements: &[Statement],
        filter: Option<&str>,
    ) -> Result<Vec<TestOutcome>, Signal> {
        self.interpret(statements)?;

        let filter = filter.map(str::to_ascii_lowercase);
        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();

        for statement in statements {
            let Statement::Function(declaration) = statement else {
                continue;
            };
            let name = &declaration.name.lexeme;
            let lowered = name.to_ascii_lowercase();
            if !lowered.starts_with("test") || !declaration.parameters.is_empty() {
                continue;
            }
            if filter.as_ref().is_some_and(|needle| !lowered.contains(needle.as_str())) {
                continue;
            }
            if !seen.insert(name.clone()) {
                continue;
            }

            let test = match self.globals.lookup(name) {
                Some(Value::Function(function)) => function.find_overload(&[], &self.class_parents),
                _ => None,
            };
            let status = match test {
                Some(test) => match test.call(self, Vec::new()) {
                    Ok(_) => TestStatus::Passed,
                    Err(error) => TestStatus::Failed {
                        message: error.message,
                    },
                },
                None => TestStatus::Failed {
                    message: format!("Undefined variable '{name}'."),
                },
            };
            trace!(test = %name, ?status, "test finished");
            outcomes.push(TestOutcome {
                name: name.clone(),
                span: declaration.name.span(),
                status,
            });
        }

        self.flush_output();
        Ok(outcomes)
    }

    pub(crate) fn write_output(&mut self, text: &str, token: &Token) -> Result<(), RuntimeError> {
        self.output
            .write_all(text.as_bytes())
            .map_err(|error| RuntimeError::new(token, format!("Unable to write output: {error}")))
    }

    fn flush_output(&mut self) {
        if let Err(error) = self.output.flush() {
            debug!(%error, "failed to flush program output");
        }
    }

    /// Runs `statements` in `environment`, restoring the current environment on
    /// every exit path.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Statement],
        environment: Rc<Environment>,
    ) -> Result<(), Signal> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn child_environment(&self) -> Rc<Environment> {
        Environment::with_enclosing(self.environment.clone())
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), Signal> {
        match statement {
            Statement::Block(block) => {
                let environment = self.child_environment();
                self.execute_block(&block.statements, environment)
            }
            Statement::Class(class) => self.execute_class(class),
            Statement::Enum(enumeration) => self.execute_enum(enumeration),
            Statement::Function(declaration) => {
                let function = Function::new(declaration.clone(), self.environment.clone(), false);
                self.environment
                    .define(&declaration.name, Value::Function(function))?;
                Ok(())
            }
            Statement::If(if_stmt) => {
                if self.evaluate(&if_stmt.condition)?.is_truthy() {
                    self.execute(&if_stmt.then_branch)
                } else if let Some(else_branch) = &if_stmt.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Statement::While(while_stmt) => {
                while self.evaluate(&while_stmt.condition)?.is_truthy() {
                    match self.execute(&while_stmt.body) {
                        Ok(()) => {}
                        Err(Signal::Break) => break,
                        Err(signal) => return Err(signal),
                    }
                }
                Ok(())
            }
            Statement::Try(try_stmt) => self.execute_try(try_stmt),
            Statement::Print(print) => {
                let value = self.evaluate(&print.expression)?;
                self.write_output(&format!("{value}\n"), &print.keyword)?;
                Ok(())
            }
            Statement::Exit(exit) => {
                let value = match &exit.value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Err(Signal::Exit(value))
            }
            Statement::Raise(raise) => {
                let error = match &raise.value {
                    Some(value) => {
                        let value = self.evaluate(value)?;
                        RuntimeError::new(&raise.keyword, value.to_string()).with_value(value)
                    }
                    None => RuntimeError::new(&raise.keyword, "Exception"),
                };
                Err(error.into())
            }
            Statement::Var(var) => {
                let value = match &var.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.define(&var.name, value)?;
                Ok(())
            }
            Statement::Break(_) => Err(Signal::Break),
            Statement::Expression(expression) => {
                self.evaluate(&expression.expression)?;
                Ok(())
            }
            Statement::Uses(uses) => {
                trace!(unit = %uses.unit.lexeme, "uses directive left unexpanded");
                Ok(())
            }
        }
    }

    fn execute_enum(&mut self, enumeration: &EnumStatement) -> Result<(), Signal> {
        for (ordinal, member) in enumeration.members.iter().enumerate() {
            let value = Value::Enum(Rc::new(EnumMember {
                enum_name: enumeration.name.lexeme.clone(),
                name: member.lexeme.clone(),
                ordinal: ordinal as i64,
            }));
            self.environment.define(member, value)?;
        }
        Ok(())
    }

    fn execute_class(&mut self, class: &ClassStatement) -> Result<(), Signal> {
        for enumeration in &class.enums {
            self.execute_enum(enumeration)?;
        }

        let superclass = match &class.superclass {
            Some(superclass) => match self.look_up_variable(&superclass.name, superclass.id)? {
                Value::Class(value) => Some(value),
                _ => {
                    return Err(
                        RuntimeError::new(&superclass.name, "Superclass must be a class.").into(),
                    )
                }
            },
            None => None,
        };

        let defining = self.environment.clone();
        defining.define(&class.name, Value::Nil)?;

        let closure = match &superclass {
            Some(superclass) => {
                let environment = Environment::with_enclosing(defining.clone());
                environment.define_value("super", Value::Class(superclass.clone()));
                environment
            }
            None => defining.clone(),
        };

        let mut methods: HashMap<String, Rc<Function>> = HashMap::new();
        for method in &class.methods {
            let is_initializer = method.name.lexeme == INITIALIZER_NAME;
            let function = Function::new(method.clone(), closure.clone(), is_initializer);
            match methods.get(&method.name.lexeme) {
                Some(first) => first.add_overload(function),
                None => {
                    methods.insert(method.name.lexeme.clone(), function);
                }
            }
        }

        let parent = superclass
            .as_ref()
            .map_or_else(|| "Any".to_string(), |superclass| superclass.name.clone());
        self.class_parents.insert(class.name.lexeme.clone(), parent);

        debug!(class = %class.name.lexeme, methods = methods.len(), "defined class");
        let value = Class::new(class.name.lexeme.clone(), superclass, methods);
        defining.define_value(class.name.lexeme.clone(), Value::Class(value));
        Ok(())
    }

    fn execute_try(&mut self, try_stmt: &TryStatement) -> Result<(), Signal> {
        let environment = self.child_environment();
        let error = match self.execute_block(&try_stmt.body, environment) {
            Err(Signal::Error(error)) => error,
            other => return other,
        };

        let raised = error
            .value
            .unwrap_or_else(|| Value::String(error.message.clone()));
        trace!(raised = %raised, "caught runtime error");

        match find_handler(&try_stmt.handlers, &raised) {
            Some(handler) => {
                let environment = self.child_environment();
                environment.define_value(handler.name.lexeme.clone(), raised);
                self.execute_block(std::slice::from_ref(handler.body.as_ref()), environment)
            }
            None => {
                let environment = self.child_environment();
                self.execute_block(&try_stmt.default, environment)
            }
        }
    }

    fn evaluate(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        match &expression.kind {
            ExpressionKind::Literal(literal) => Ok(literal_value(literal)),
            ExpressionKind::Unary(unary) => {
                let operand = self.evaluate(&unary.operand)?;
                match unary.operator {
                    UnaryOperator::Not => Ok(Value::Boolean(!operand.is_truthy())),
                    UnaryOperator::Negate => match operand {
                        Value::Integer(value) => Ok(Value::Integer(value.wrapping_neg())),
                        Value::Double(value) => Ok(Value::Double(-value)),
                        Value::Char(value) => Ok(Value::Integer(-i64::from(u32::from(value)))),
                        _ => Err(RuntimeError::new(&unary.token, "Operand must be a number.")),
                    },
                }
            }
            ExpressionKind::Binary(binary) => self.evaluate_binary(binary),
            ExpressionKind::Logical(logical) => {
                let left = self.evaluate(&logical.left)?;
                let short_circuit = match logical.operator {
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::And => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right)
                }
            }
            ExpressionKind::Grouping(inner) => self.evaluate(inner),
            ExpressionKind::Variable(variable) => self.look_up_variable(&variable.name, variable.id),
            ExpressionKind::Assign(assign) => {
                let value = self.evaluate(&assign.value)?;
                let assigned = match self.locals.get(&assign.id) {
                    Some(distance) => {
                        self.environment
                            .assign_at(*distance, &assign.name, value.clone())
                    }
                    None => self.environment.assign(&assign.name, value.clone()),
                };
                if let Err(error) = assigned {
                    match self.environment.lookup("this") {
                        Some(Value::Instance(instance)) => instance.set(&assign.name, value.clone()),
                        _ => return Err(error),
                    }
                }
                Ok(value)
            }
            ExpressionKind::Call(call) => self.evaluate_call(call),
            ExpressionKind::Get(get) => {
                let object = self.evaluate(&get.object)?;
                match &object {
                    Value::Instance(instance) => instance.get(&get.name),
                    other => containers::member(other, &get.name).unwrap_or_else(|| {
                        Err(RuntimeError::new(&get.name, "Only instances have properties."))
                    }),
                }
            }
            ExpressionKind::Set(set) => {
                let instance = match self.evaluate(&set.object)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(containers::property_write_error(&other, &set.name)
                            .unwrap_or_else(|| {
                                RuntimeError::new(&set.name, "Only instances have fields.")
                            }))
                    }
                };
                let value = self.evaluate(&set.value)?;
                instance.set(&set.name, value.clone());
                Ok(value)
            }
            ExpressionKind::Subscript(subscript) => self.evaluate_subscript(subscript),
            ExpressionKind::Map(map) => {
                let entries: Entries = Rc::new(RefCell::new(Vec::new()));
                for (key, item) in &map.entries {
                    let key = self.evaluate(key)?;
                    let item = self.evaluate(item)?;
                    put_entry(&entries, key, item);
                }
                Ok(Value::Map(entries))
            }
            ExpressionKind::This(this) => self.look_up_variable(&this.keyword, this.id),
            ExpressionKind::Super(super_expr) => {
                let distance = self
                    .locals
                    .get(&super_expr.id)
                    .copied()
                    .ok_or_else(|| undefined_variable(&super_expr.keyword))?;
                let Some(Value::Class(superclass)) = self.environment.get_at(distance, "super")
                else {
                    return Err(undefined_variable(&super_expr.keyword));
                };
                let instance = distance
                    .checked_sub(1)
                    .and_then(|nearer| self.environment.get_at(nearer, "this"));
                let Some(Value::Instance(instance)) = instance else {
                    return Err(RuntimeError::new(
                        &super_expr.keyword,
                        "Undefined variable 'this'.",
                    ));
                };
                match superclass.find_method(&super_expr.method.lexeme) {
                    Some(method) => Ok(Value::Function(method.bind(instance))),
                    None => Err(RuntimeError::new(
                        &super_expr.method,
                        format!("Undefined property '{}'.", super_expr.method.lexeme),
                    )),
                }
            }
        }
    }

    /// Resolved distance first, then the live environment chain and globals, then a
    /// field or method of the enclosing `this`.
    fn look_up_variable(&self, name: &Token, id: NodeId) -> Result<Value, RuntimeError> {
        let found = match self.locals.get(&id) {
            Some(distance) => self.environment.get_at(*distance, &name.lexeme),
            None => self
                .environment
                .lookup(&name.lexeme)
                .or_else(|| self.globals.lookup(&name.lexeme)),
        };
        if let Some(value) = found {
            return Ok(value);
        }

        if let Some(Value::Instance(instance)) = self.environment.lookup("this") {
            if let Ok(value) = instance.get(name) {
                return Ok(value);
            }
        }
        Err(undefined_variable(name))
    }

    fn evaluate_call(&mut self, call: &CallExpression) -> Result<Value, RuntimeError> {
        let callee = self.evaluate(&call.callee)?;
        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.evaluate(argument))
            .collect::<Result<Vec<_>, _>>()?;
        let types: Vec<String> = arguments.iter().map(Value::type_name).collect();

        match callee {
            Value::Function(function) => {
                let selected = self.select_overload(&function, &types).ok_or_else(|| {
                    RuntimeError::new(&call.paren, "No matching signature for function.")
                })?;
                check_arity(selected.arity(), arguments.len(), &call.paren)?;
                selected.call(self, arguments)
            }
            Value::Native(native) => {
                check_arity(native.arity, arguments.len(), &call.paren)?;
                native.invoke(self, &call.paren, arguments)
            }
            Value::Class(class) => self.instantiate(&class, &call.paren, arguments, &types),
            _ => Err(RuntimeError::new(
                &call.paren,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Tries the callee's own overloads, then the class of the instance it is bound
    /// to, then same-named functions in the current and global environments.
    fn select_overload(&self, function: &Rc<Function>, types: &[String]) -> Option<Rc<Function>> {
        let parents = &self.class_parents;
        function
            .find_overload(types, parents)
            .or_else(|| {
                let instance = function.bound_instance()?;
                instance
                    .class
                    .find_method_matching(function.name(), types, parents)
                    .map(|method| method.bind(instance))
            })
            .or_else(|| self.environment.find_function(function.name(), types, parents))
            .or_else(|| self.globals.find_function(function.name(), types, parents))
    }

    fn instantiate(
        &mut self,
        class: &Rc<Class>,
        paren: &Token,
        arguments: Vec<Value>,
        types: &[String],
    ) -> Result<Value, RuntimeError> {
        let initializer = class.find_method(INITIALIZER_NAME).map(|first| {
            class
                .find_method_matching(INITIALIZER_NAME, types, &self.class_parents)
                .unwrap_or(first)
        });
        let arity = initializer.as_ref().map_or(0, |initializer| initializer.arity());
        check_arity(arity, arguments.len(), paren)?;

        let instance = Instance::new(class.clone());
        if let Some(initializer) = initializer {
            initializer.bind(instance.clone()).call(self, arguments)?;
        }
        trace!(class = %class.name, "instantiated");
        Ok(Value::Instance(instance))
    }

    fn evaluate_subscript(&mut self, subscript: &SubscriptExpression) -> Result<Value, RuntimeError> {
        let target = self.evaluate(&subscript.object)?;
        let index = self.evaluate(&subscript.index)?;
        match &target {
            Value::String(text) => {
                let index = to_index(&index, &subscript.bracket)?;
                text.chars()
                    .nth(index)
                    .map(Value::Char)
                    .ok_or_else(|| containers::out_of_range(&subscript.bracket))
            }
            Value::List(elements) | Value::Array(elements) => {
                let index = to_index(&index, &subscript.bracket)?;
                element_at(elements, index, &subscript.bracket)
            }
            _ => Err(RuntimeError::new(
                &subscript.bracket,
                "Subscript target should be an ordinal.",
            )),
        }
    }

    fn evaluate_binary(&mut self, binary: &BinaryExpression) -> Result<Value, RuntimeError> {
        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;
        let token = &binary.token;

        match binary.operator {
            BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
            BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
            BinaryOperator::Add => add(left, right, token),
            operator if operator.is_comparison() => compare(operator, &left, &right, token),
            operator => arithmetic(operator, &left, &right, token),
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Boolean(value) => Value::Boolean(*value),
        Literal::Integer(value) => Value::Integer(*value),
        Literal::Double(value) => Value::Double(*value),
        Literal::Char(value) => Value::Char(*value),
        Literal::String(value) => Value::String(value.clone()),
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<(), RuntimeError> {
    if expected == got {
        return Ok(());
    }
    Err(RuntimeError::new(
        paren,
        format!("Expected {expected} arguments but got {got}."),
    ))
}

/// Exact type name first, then the raised instance's ancestors, then untyped
/// handlers.
fn find_handler<'a>(handlers: &'a [ExceptHandler], raised: &Value) -> Option<&'a ExceptHandler> {
    let handles = |type_name: &str| {
        handlers.iter().find(|handler| {
            handler
                .type_name
                .as_deref()
                .is_some_and(|declared| declared.eq_ignore_ascii_case(type_name))
        })
    };

    if let Some(handler) = handles(&raised.type_name()) {
        return Some(handler);
    }
    if let Value::Instance(instance) = raised {
        if let Some(handler) = instance
            .class
            .ancestry()
            .skip(1)
            .find_map(|class| handles(&class.name))
        {
            return Some(handler);
        }
    }
    handlers.iter().find(|handler| {
        handler
            .type_name
            .as_deref()
            .map_or(true, |declared| declared.eq_ignore_ascii_case("Any"))
    })
}

fn code_point(value: char) -> i64 {
    i64::from(u32::from(value))
}

fn add(left: Value, right: Value, token: &Token) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_add(b))),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
        (Value::Char(a), Value::Char(b)) => Ok(Value::Integer(code_point(a) + code_point(b))),
        (left @ Value::String(_), right) | (left, right @ Value::String(_)) => {
            Ok(Value::String(format!("{left}{right}")))
        }
        _ => Err(RuntimeError::new(
            token,
            "Operands must be two numbers, or two strings.",
        )),
    }
}

fn compare(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    token: &Token,
) -> Result<Value, RuntimeError> {
    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Char(a), Value::Char(b)) => a.partial_cmp(b),
        (Value::Enum(a), Value::Enum(b)) if a.enum_name == b.enum_name => {
            a.ordinal.partial_cmp(&b.ordinal)
        }
        _ => return Err(RuntimeError::new(token, "Operands must be numbers.")),
    };

    // NaN compares false under every operator.
    let Some(ordering) = ordering else {
        return Ok(Value::Boolean(false));
    };
    let result = match operator {
        BinaryOperator::Greater => ordering.is_gt(),
        BinaryOperator::GreaterEqual => ordering.is_ge(),
        BinaryOperator::Less => ordering.is_lt(),
        BinaryOperator::LessEqual => ordering.is_le(),
        _ => return Err(RuntimeError::new(token, "Operands must be numbers.")),
    };
    Ok(Value::Boolean(result))
}

fn arithmetic(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    token: &Token,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(operator, *a, *b, token),
        (Value::Char(a), Value::Char(b)) => {
            integer_arithmetic(operator, code_point(*a), code_point(*b), token)
        }
        (Value::Double(a), Value::Double(b)) => {
            let result = match operator {
                BinaryOperator::Subtract => a - b,
                BinaryOperator::Multiply => a * b,
                BinaryOperator::Divide if *b == 0.0 => {
                    return Err(RuntimeError::new(token, "Division by zero."))
                }
                BinaryOperator::Divide => a / b,
                _ => return Err(RuntimeError::new(token, "Operands must be numbers.")),
            };
            Ok(Value::Double(result))
        }
        _ => Err(RuntimeError::new(token, "Operands must be numbers.")),
    }
}

fn integer_arithmetic(
    operator: BinaryOperator,
    a: i64,
    b: i64,
    token: &Token,
) -> Result<Value, RuntimeError> {
    let result = match operator {
        BinaryOperator::Subtract => a.wrapping_sub(b),
        BinaryOperator::Multiply => a.wrapping_mul(b),
        BinaryOperator::Divide if b == 0 => {
            return Err(RuntimeError::new(token, "Division by zero."))
        }
        BinaryOperator::Divide => a.wrapping_div(b),
        _ => return Err(RuntimeError::new(token, "Operands must be numbers.")),
    };
    Ok(Value::Integer(result))
}
