mod lookup;
mod reduce;

use thiserror::Error;
use tracing::debug;

use crate::ast::{
    ClassStatement, Expression, ExpressionKind, FunctionKind, FunctionStatement, Program,
    Statement, TryStatement, VarStatement,
};
use crate::diagnostics::Diagnostics;
use crate::lexer::Token;

pub use lookup::{ScopeStack, TypeLookup};
pub use reduce::{literal_type, reduce, TypeView};

use lookup::is_any;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TypeError {
    pub token: Token,
    pub message: String,
}

impl TypeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

type CheckResult = Result<(), TypeError>;

struct FunctionFrame {
    kind: FunctionKind,
    return_type: String,
}

/// Best-effort nominal type checker. Each statement list is checked in two passes:
/// declared symbols are registered first, then assignments, field writes and
/// returns are verified. The first mismatch ends the run.
pub struct TypeChecker {
    lookup: TypeLookup,
    current_function: Option<FunctionFrame>,
    diagnostics: Diagnostics,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            lookup: TypeLookup::new(),
            current_function: None,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn check_program(&mut self, program: &Program) {
        if let Err(error) = self.check_statements(&program.statements) {
            debug!(message = %error.message, line = error.token.line, "type check failed");
            self.diagnostics
                .push_token_error(&error.token, error.message.clone());
        }
    }

    pub fn lookup(&self) -> &TypeLookup {
        &self.lookup
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn check_statements(&mut self, statements: &[Statement]) -> CheckResult {
        for statement in statements {
            self.map_type(statement);
        }
        for statement in statements {
            self.check_statement(statement)?;
        }
        Ok(())
    }

    fn map_type(&mut self, statement: &Statement) {
        let table = &mut self.lookup;
        match statement {
            Statement::Enum(enumeration) => {
                for member in &enumeration.members {
                    table
                        .declared
                        .set(member.lexeme.clone(), enumeration.name.lexeme.clone());
                }
            }
            Statement::Function(function) => {
                table
                    .declared
                    .set(function.name.lexeme.clone(), function.return_type.clone());
            }
            Statement::Class(class) => {
                let name = &class.name.lexeme;
                let parent = class
                    .superclass
                    .as_ref()
                    .map(|superclass| superclass.name.lexeme.clone())
                    .unwrap_or_else(|| lookup::ANY.to_string());
                table.parents.set(name.clone(), parent);
                table.declared.set(name.clone(), name.clone());

                for enumeration in &class.enums {
                    for member in &enumeration.members {
                        table
                            .declared
                            .set(member.lexeme.clone(), enumeration.name.lexeme.clone());
                    }
                }
                for method in &class.methods {
                    table.declared.set(
                        format!("{name}::{}", method.name.lexeme),
                        method.return_type.clone(),
                    );
                }
                for field in &class.fields {
                    table.declared.set(
                        format!("{name}::{}", field.name.lexeme),
                        field.type_name.clone(),
                    );
                    table
                        .generics
                        .set(field.name.lexeme.clone(), field.generic.clone());
                }
            }
            Statement::Var(var) => {
                table
                    .declared
                    .set(var.name.lexeme.clone(), var.type_name.clone());
                table
                    .generics
                    .set(var.name.lexeme.clone(), var.generic.clone());
            }
            _ => {}
        }
    }

    fn check_statement(&mut self, statement: &Statement) -> CheckResult {
        match statement {
            Statement::Block(block) => {
                self.lookup.begin_scope();
                let result = self.check_statements(&block.statements);
                self.lookup.end_scope();
                result
            }
            Statement::Class(class) => self.check_class(class),
            Statement::Function(function) => self.check_function(function),
            Statement::If(if_stmt) => {
                self.check_expression(&if_stmt.condition)?;
                self.check_statement(&if_stmt.then_branch)?;
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.check_statement(else_branch)?;
                }
                Ok(())
            }
            Statement::While(while_stmt) => {
                self.check_expression(&while_stmt.condition)?;
                self.check_statement(&while_stmt.body)
            }
            Statement::Try(try_stmt) => self.check_try(try_stmt),
            Statement::Exit(exit) => match &exit.value {
                Some(value) => self.check_return(&exit.keyword, value),
                None => Ok(()),
            },
            Statement::Var(var) => self.check_var(var),
            Statement::Expression(expression) => self.check_expression(&expression.expression),
            Statement::Enum(_)
            | Statement::Print(_)
            | Statement::Raise(_)
            | Statement::Break(_)
            | Statement::Uses(_) => Ok(()),
        }
    }

    fn check_class(&mut self, class: &ClassStatement) -> CheckResult {
        let previous_class = self.lookup.current_class.replace(class.name.lexeme.clone());

        if class.superclass.is_some() {
            self.lookup.begin_scope();
        }
        self.lookup.begin_scope();
        for field in &class.fields {
            self.lookup
                .declared
                .set(field.name.lexeme.clone(), field.type_name.clone());
        }

        let mut result = Ok(());
        for method in &class.methods {
            result = self.check_function(method);
            if result.is_err() {
                break;
            }
        }

        self.lookup.end_scope();
        if class.superclass.is_some() {
            self.lookup.end_scope();
        }
        self.lookup.current_class = previous_class;
        result
    }

    fn check_function(&mut self, function: &FunctionStatement) -> CheckResult {
        let enclosing = self.current_function.replace(FunctionFrame {
            kind: function.kind,
            return_type: function.return_type.clone(),
        });

        self.lookup.begin_scope();
        for parameter in &function.parameters {
            self.lookup
                .declared
                .set(parameter.name.lexeme.clone(), parameter.type_name.clone());
        }
        let result = self.check_statements(&function.body);
        self.lookup.end_scope();

        self.current_function = enclosing;
        result
    }

    fn check_try(&mut self, try_stmt: &TryStatement) -> CheckResult {
        self.lookup.begin_scope();
        let result = self.check_statements(&try_stmt.body);
        self.lookup.end_scope();
        result?;

        for handler in &try_stmt.handlers {
            self.lookup.begin_scope();
            let handler_type = handler
                .type_name
                .clone()
                .unwrap_or_else(|| lookup::ANY.to_string());
            self.lookup
                .declared
                .set(handler.name.lexeme.clone(), handler_type);
            let result = self.check_statement(&handler.body);
            self.lookup.end_scope();
            result?;
        }

        self.lookup.begin_scope();
        let result = self.check_statements(&try_stmt.default);
        self.lookup.end_scope();
        result
    }

    fn check_var(&mut self, var: &VarStatement) -> CheckResult {
        let Some(initializer) = &var.initializer else {
            return Ok(());
        };
        self.check_expression(initializer)?;

        let inferred = self.reduce(initializer)?;
        if is_any(&var.type_name) {
            self.lookup.inferred.set(var.name.lexeme.clone(), inferred);
            return Ok(());
        }

        self.lookup
            .declared
            .set(var.name.lexeme.clone(), var.type_name.clone());
        if self.is_compatible(&var.type_name, &inferred) {
            return Ok(());
        }
        Err(TypeError::new(var.name.clone(), "Type mismatch!"))
    }

    fn check_return(&mut self, keyword: &Token, value: &Expression) -> CheckResult {
        let Some(frame) = &self.current_function else {
            return Ok(());
        };
        if frame.kind == FunctionKind::Procedure {
            return Err(TypeError::new(
                keyword.clone(),
                "Can't return value from procedure.",
            ));
        }
        let return_type = frame.return_type.clone();

        self.check_expression(value)?;
        let exit_type = self.reduce(value)?;
        if is_any(&return_type) || self.is_compatible(&return_type, &exit_type) {
            return Ok(());
        }
        Err(TypeError::new(keyword.clone(), "Type mismatch!"))
    }

    fn check_expression(&mut self, expression: &Expression) -> CheckResult {
        match &expression.kind {
            ExpressionKind::Literal(_)
            | ExpressionKind::Variable(_)
            | ExpressionKind::This(_)
            | ExpressionKind::Super(_) => Ok(()),
            ExpressionKind::Unary(unary) => self.check_expression(&unary.operand),
            ExpressionKind::Grouping(inner) => self.check_expression(inner),
            ExpressionKind::Binary(binary) => {
                self.check_expression(&binary.left)?;
                self.check_expression(&binary.right)
            }
            ExpressionKind::Logical(logical) => {
                self.check_expression(&logical.left)?;
                self.check_expression(&logical.right)
            }
            ExpressionKind::Call(call) => {
                self.check_expression(&call.callee)?;
                for argument in &call.arguments {
                    self.check_expression(argument)?;
                }
                Ok(())
            }
            ExpressionKind::Get(get) => self.check_expression(&get.object),
            ExpressionKind::Subscript(subscript) => {
                self.check_expression(&subscript.object)?;
                self.check_expression(&subscript.index)
            }
            ExpressionKind::Map(map) => {
                for (key, value) in &map.entries {
                    self.check_expression(key)?;
                    self.check_expression(value)?;
                }
                Ok(())
            }
            ExpressionKind::Assign(assign) => {
                self.check_expression(&assign.value)?;

                let name = &assign.name.lexeme;
                let Some(expected) = self.lookup.declared.get(name).map(str::to_string) else {
                    return Ok(());
                };
                if is_cast_to(expression, &expected) {
                    return Ok(());
                }

                let inferred = self.reduce(&assign.value)?;
                if is_any(&expected) {
                    self.lookup.inferred.set(name.clone(), inferred);
                    return Ok(());
                }
                if self.is_compatible(&expected, &inferred) {
                    return Ok(());
                }
                Err(TypeError::new(assign.name.clone(), "Type mismatch!"))
            }
            ExpressionKind::Set(set) => {
                let inferred = self.reduce(&set.value)?;
                self.check_expression(&set.value)?;
                self.check_expression(&set.object)?;

                let receiver = self.reduce(&set.object)?;
                let expected = self
                    .lookup
                    .declared
                    .get(&format!("{receiver}::{}", set.name.lexeme))
                    .or_else(|| self.lookup.declared.get(&set.name.lexeme))
                    .map(str::to_string);

                let Some(expected) = expected else {
                    return Ok(());
                };
                if is_any(&expected)
                    || is_cast_to(expression, &expected)
                    || inferred.eq_ignore_ascii_case("Nil")
                    || self.is_compatible(&expected, &inferred)
                {
                    return Ok(());
                }
                Err(TypeError::new(set.name.clone(), "Type mismatch."))
            }
        }
    }

    fn reduce(&self, expression: &Expression) -> Result<String, TypeError> {
        reduce(expression, TypeView::declared(&self.lookup))
    }

    /// Only the declared side may be `Any`; an uninferable value is still checked
    /// against a concrete declared type.
    fn is_compatible(&self, expected: &str, actual: &str) -> bool {
        self.lookup.is_assignable(expected, actual)
    }
}

fn is_cast_to(expression: &Expression, expected: &str) -> bool {
    expression
        .cast
        .as_deref()
        .is_some_and(|cast| cast.eq_ignore_ascii_case(expected))
}
