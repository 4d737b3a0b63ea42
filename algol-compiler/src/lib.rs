mod ast;
mod compiler;
mod diagnostics;
mod lexer;
mod parser;
mod resolver;
mod source;
mod typechecker;

pub use crate::ast::{
    AssignExpression, BinaryExpression, BinaryOperator, BlockStatement, BreakStatement,
    CallExpression, ClassStatement, EnumStatement, ExceptHandler, ExitStatement, Expression,
    ExpressionKind, ExpressionStatement, FieldDeclaration, FunctionKind, FunctionStatement,
    GetExpression, IfStatement, Literal, LogicalExpression, LogicalOperator, MapExpression,
    NodeId, Parameter, PrintStatement, Program, RaiseStatement, SetExpression, SourceSpan,
    Statement, SubscriptExpression, SuperExpression, ThisExpression, TryStatement,
    UnaryExpression, UnaryOperator, UsesStatement, VarStatement, VariableExpression,
    WhileStatement,
};
pub use crate::compiler::{Compilation, CompileOptions, Compiler};
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use crate::lexer::{Keyword, Lexer, Token, TokenKind};
pub use crate::parser::{ParseError, Parser};
pub use crate::resolver::{Resolver, ResolverOutput, INITIALIZER_NAME};
pub use crate::source::{SourceFile, SourceId};
pub use crate::typechecker::{reduce, ScopeStack, TypeChecker, TypeError, TypeLookup, TypeView};

pub mod runtime;
