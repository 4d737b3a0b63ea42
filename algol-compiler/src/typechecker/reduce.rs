use crate::ast::{BinaryOperator, Expression, ExpressionKind, Literal, LogicalExpression};
use crate::typechecker::lookup::{is_any, ScopeStack, TypeLookup, ANY};
use crate::typechecker::TypeError;

/// The symbol table an expression is reduced against: normally the declared types,
/// or the inferred types when a receiver's declared type is unknown.
#[derive(Clone, Copy)]
pub struct TypeView<'a> {
    pub symbols: &'a ScopeStack,
    pub lookup: &'a TypeLookup,
}

impl<'a> TypeView<'a> {
    pub fn declared(lookup: &'a TypeLookup) -> Self {
        Self {
            symbols: &lookup.declared,
            lookup,
        }
    }

    fn inferred(self) -> Self {
        Self {
            symbols: &self.lookup.inferred,
            lookup: self.lookup,
        }
    }

    fn symbol(&self, name: &str) -> Option<String> {
        self.symbols.get(name).map(str::to_string)
    }
}

/// Statically infers the type name of an expression. An explicit `as` cast wins
/// over inference; anything the checker cannot see through reduces to `Any`.
pub fn reduce(expression: &Expression, view: TypeView<'_>) -> Result<String, TypeError> {
    if let Some(cast) = &expression.cast {
        return Ok(cast.clone());
    }

    match &expression.kind {
        ExpressionKind::Literal(literal) => Ok(literal_type(literal).to_string()),
        ExpressionKind::Unary(unary) => reduce(&unary.operand, view),
        ExpressionKind::Grouping(inner) => reduce(inner, view),
        ExpressionKind::Binary(binary) => {
            if binary.operator.is_comparison() {
                return Ok("Boolean".to_string());
            }

            let left = reduce(&binary.left, view)?;
            let right = reduce(&binary.right, view)?;
            if is_any(&left) || is_any(&right) {
                return Ok(left);
            }
            if (left == "String" || right == "String") && binary.operator == BinaryOperator::Add {
                return Ok("String".to_string());
            }
            if left != right {
                return Err(TypeError::new(binary.token.clone(), "Type mismatch."));
            }
            Ok(left)
        }
        ExpressionKind::Logical(logical) => reduce_logical(logical, view),
        ExpressionKind::Variable(variable) => {
            let name = variable.name.lexeme.as_str();
            if let Some(found) = view.symbol(name) {
                return Ok(found);
            }
            let builtin = match name {
                "Str" | "Copy" => "String",
                "Length" => "Integer",
                "List" => "List",
                "Stack" => "Stack",
                "Map" => "Map",
                _ => ANY,
            };
            Ok(builtin.to_string())
        }
        ExpressionKind::Get(get) => {
            let mut receiver = reduce(&get.object, view)?;
            if is_any(&receiver) {
                receiver = reduce(&get.object, view.inferred())?;
            }
            Ok(view
                .symbol(&format!("{receiver}::{}", get.name.lexeme))
                .unwrap_or_else(|| ANY.to_string()))
        }
        ExpressionKind::Call(call) => {
            let result = reduce(&call.callee, view)?;
            let ExpressionKind::Variable(variable) = &call.callee.kind else {
                return Ok(result);
            };

            let name = variable.name.lexeme.as_str();
            if name.eq_ignore_ascii_case("Str") || name.eq_ignore_ascii_case("Copy") {
                return Ok("String".to_string());
            }
            if name.eq_ignore_ascii_case("Length") {
                return Ok("Integer".to_string());
            }
            if is_any(&result) {
                if let Some(class) = &view.lookup.current_class {
                    return Ok(view
                        .symbol(&format!("{class}::{name}"))
                        .unwrap_or_else(|| ANY.to_string()));
                }
            }
            Ok(result)
        }
        ExpressionKind::Subscript(subscript) => {
            let target = reduce(&subscript.object, view)?;
            if target.eq_ignore_ascii_case("String") {
                return Ok("Char".to_string());
            }
            if let ExpressionKind::Variable(variable) = &subscript.object.kind {
                if let Some(generic) = view.lookup.generics.get(&variable.name.lexeme) {
                    return Ok(generic.to_string());
                }
            }
            Ok(ANY.to_string())
        }
        ExpressionKind::Map(_) => Ok("Map".to_string()),
        ExpressionKind::This(_) => Ok(view
            .lookup
            .current_class
            .clone()
            .unwrap_or_else(|| ANY.to_string())),
        ExpressionKind::Assign(_) | ExpressionKind::Set(_) | ExpressionKind::Super(_) => {
            Ok(ANY.to_string())
        }
    }
}

fn reduce_logical(logical: &LogicalExpression, view: TypeView<'_>) -> Result<String, TypeError> {
    let left = reduce(&logical.left, view)?;
    let right = reduce(&logical.right, view)?;
    if !is_any(&left) && !is_any(&right) && left != right {
        return Err(TypeError::new(logical.token.clone(), "Type mismatch."));
    }
    Ok("Boolean".to_string())
}

pub fn literal_type(literal: &Literal) -> &'static str {
    match literal {
        Literal::Nil => "Nil",
        Literal::Boolean(_) => "Boolean",
        Literal::Integer(_) => "Integer",
        Literal::Double(_) => "Double",
        Literal::Char(_) => "Char",
        Literal::String(_) => "String",
    }
}
