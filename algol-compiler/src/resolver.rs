use std::collections::HashMap;

use tracing::debug;

use crate::ast::{
    ClassStatement, EnumStatement, Expression, ExpressionKind, FunctionStatement, NodeId,
    Program, Statement, TryStatement, VarStatement,
};
use crate::diagnostics::Diagnostics;
use crate::lexer::Token;

pub const INITIALIZER_NAME: &str = "Init";

/// Computes, for every local variable reference, how many scopes separate it from its
/// declaration. Top-level names are left unresolved and looked up dynamically.
pub struct Resolver {
    scopes: Vec<HashMap<String, Binding>>,
    diagnostics: Diagnostics,
    locals: HashMap<NodeId, usize>,
    current_function: FunctionContext,
    current_class: ClassContext,
}

#[derive(Clone, Copy)]
struct Binding {
    kind: BindingKind,
    defined: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Variable,
    Parameter,
    Function,
    Class,
    EnumMember,
    Handler,
    Receiver,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionContext {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ClassContext {
    None,
    Class,
    Subclass,
}

pub struct ResolverOutput {
    pub diagnostics: Diagnostics,
    pub locals: HashMap<NodeId, usize>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            diagnostics: Diagnostics::new(),
            locals: HashMap::new(),
            current_function: FunctionContext::None,
            current_class: ClassContext::None,
        }
    }

    pub fn resolve_program(&mut self, program: &Program) {
        self.resolve_statements(&program.statements);
        debug!(
            locals = self.locals.len(),
            diagnostics = self.diagnostics.entries().len(),
            "resolved program"
        );
    }

    pub fn into_parts(self) -> ResolverOutput {
        ResolverOutput {
            diagnostics: self.diagnostics,
            locals: self.locals,
        }
    }

    fn resolve_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.resolve_statement(statement);
        }
    }

    fn resolve_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => {
                self.begin_scope();
                self.resolve_statements(&block.statements);
                self.end_scope();
            }
            Statement::Class(class) => self.resolve_class(class),
            Statement::Enum(enumeration) => self.resolve_enum(enumeration),
            Statement::Function(function) => {
                self.declare(&function.name, BindingKind::Function);
                self.define(&function.name);
                self.resolve_function(function, FunctionContext::Function);
            }
            Statement::If(if_stmt) => {
                self.resolve_expression(&if_stmt.condition);
                self.resolve_statement(&if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.resolve_statement(else_branch);
                }
            }
            Statement::While(while_stmt) => {
                self.resolve_expression(&while_stmt.condition);
                self.resolve_statement(&while_stmt.body);
            }
            Statement::Try(try_stmt) => self.resolve_try(try_stmt),
            Statement::Print(print) => self.resolve_expression(&print.expression),
            Statement::Exit(exit) => {
                if self.current_function == FunctionContext::None {
                    self.diagnostics
                        .push_token_warning(&exit.keyword, "Can't return from top-level code.");
                }
                if let Some(value) = &exit.value {
                    if self.current_function == FunctionContext::Initializer {
                        self.diagnostics.push_token_error(
                            &exit.keyword,
                            "Can't return a value from an initializer.",
                        );
                    }
                    self.resolve_expression(value);
                }
            }
            Statement::Raise(raise) => {
                if let Some(value) = &raise.value {
                    self.resolve_expression(value);
                }
            }
            Statement::Var(var) => self.resolve_var(var),
            Statement::Break(_) | Statement::Uses(_) => {}
            Statement::Expression(expression) => self.resolve_expression(&expression.expression),
        }
    }

    fn resolve_var(&mut self, var: &VarStatement) {
        self.declare(&var.name, BindingKind::Variable);
        if let Some(initializer) = &var.initializer {
            self.resolve_expression(initializer);
        }
        self.define(&var.name);
    }

    fn resolve_enum(&mut self, enumeration: &EnumStatement) {
        for member in &enumeration.members {
            self.declare(member, BindingKind::EnumMember);
            self.define(member);
        }
    }

    fn resolve_class(&mut self, class: &ClassStatement) {
        let enclosing_class = self.current_class;
        self.current_class = ClassContext::Class;

        for enumeration in &class.enums {
            self.resolve_enum(enumeration);
        }

        self.declare(&class.name, BindingKind::Class);
        self.define(&class.name);

        if let Some(superclass) = &class.superclass {
            if superclass.name.lexeme == class.name.lexeme {
                self.diagnostics
                    .push_token_error(&superclass.name, "A class can't inherit from itself.");
            }
            self.current_class = ClassContext::Subclass;
            self.resolve_local(superclass.id, &superclass.name.lexeme);

            self.begin_scope();
            self.define_receiver("super");
        }

        self.begin_scope();
        self.define_receiver("this");

        for method in &class.methods {
            let context = if method.name.lexeme == INITIALIZER_NAME {
                FunctionContext::Initializer
            } else {
                FunctionContext::Method
            };
            self.resolve_function(method, context);
        }

        self.end_scope();
        if class.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, function: &FunctionStatement, context: FunctionContext) {
        let enclosing = self.current_function;
        self.current_function = context;

        self.begin_scope();
        for parameter in &function.parameters {
            self.declare(&parameter.name, BindingKind::Parameter);
            self.define(&parameter.name);
        }
        self.resolve_statements(&function.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    fn resolve_try(&mut self, try_stmt: &TryStatement) {
        self.begin_scope();
        self.resolve_statements(&try_stmt.body);
        self.end_scope();

        for handler in &try_stmt.handlers {
            self.begin_scope();
            self.declare(&handler.name, BindingKind::Handler);
            self.define(&handler.name);
            self.resolve_statement(&handler.body);
            self.end_scope();
        }

        self.begin_scope();
        self.resolve_statements(&try_stmt.default);
        self.end_scope();
    }

    fn resolve_expression(&mut self, expression: &Expression) {
        match &expression.kind {
            ExpressionKind::Literal(_) => {}
            ExpressionKind::Unary(unary) => self.resolve_expression(&unary.operand),
            ExpressionKind::Binary(binary) => {
                self.resolve_expression(&binary.left);
                self.resolve_expression(&binary.right);
            }
            ExpressionKind::Logical(logical) => {
                self.resolve_expression(&logical.left);
                self.resolve_expression(&logical.right);
            }
            ExpressionKind::Grouping(inner) => self.resolve_expression(inner),
            ExpressionKind::Variable(variable) => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&variable.name.lexeme))
                    .is_some_and(|binding| !binding.defined);
                if in_own_initializer {
                    self.diagnostics.push_token_error(
                        &variable.name,
                        "Can't read local variable in its own initializer.",
                    );
                }
                self.resolve_local(variable.id, &variable.name.lexeme);
            }
            ExpressionKind::Assign(assign) => {
                self.resolve_expression(&assign.value);
                self.resolve_local(assign.id, &assign.name.lexeme);
            }
            ExpressionKind::Call(call) => {
                self.resolve_expression(&call.callee);
                for argument in &call.arguments {
                    self.resolve_expression(argument);
                }
            }
            ExpressionKind::Get(get) => self.resolve_expression(&get.object),
            ExpressionKind::Set(set) => {
                self.resolve_expression(&set.value);
                self.resolve_expression(&set.object);
            }
            ExpressionKind::Subscript(subscript) => {
                self.resolve_expression(&subscript.object);
                self.resolve_expression(&subscript.index);
            }
            ExpressionKind::Map(map) => {
                for (key, value) in &map.entries {
                    self.resolve_expression(key);
                    self.resolve_expression(value);
                }
            }
            ExpressionKind::This(this) => {
                if self.current_class == ClassContext::None {
                    self.diagnostics
                        .push_token_error(&this.keyword, "Can't use 'this' outside a class.");
                    return;
                }
                self.resolve_local(this.id, "this");
            }
            ExpressionKind::Super(super_expr) => {
                match self.current_class {
                    ClassContext::None => self.diagnostics.push_token_error(
                        &super_expr.keyword,
                        "Can't use 'super' outside a class.",
                    ),
                    ClassContext::Class => self.diagnostics.push_token_error(
                        &super_expr.keyword,
                        "Can't use 'super' in a class with no superclass.",
                    ),
                    ClassContext::Subclass => {}
                }
                self.resolve_local(super_expr.id, "super");
            }
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.locals.insert(id, depth);
                return;
            }
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token, kind: BindingKind) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if let Some(existing) = scope.get(&name.lexeme) {
            let overload =
                existing.kind == BindingKind::Function && kind == BindingKind::Function;
            if !overload {
                self.diagnostics.push_token_error(
                    name,
                    "Already a variable with this name in this scope.",
                );
            }
        }

        scope.insert(
            name.lexeme.clone(),
            Binding {
                kind,
                defined: false,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(binding) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            binding.defined = true;
        }
    }

    fn define_receiver(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                Binding {
                    kind: BindingKind::Receiver,
                    defined: true,
                },
            );
        }
    }
}
