use std::rc::Rc;

use serde::Serialize;

use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

/// Identity of a name-bearing expression, used to key resolution distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(BlockStatement),
    Class(ClassStatement),
    Enum(EnumStatement),
    Function(Rc<FunctionStatement>),
    If(IfStatement),
    While(WhileStatement),
    Try(TryStatement),
    Print(PrintStatement),
    Exit(ExitStatement),
    Raise(RaiseStatement),
    Var(VarStatement),
    Break(BreakStatement),
    Expression(ExpressionStatement),
    Uses(UsesStatement),
}

#[derive(Debug, Clone, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct ClassStatement {
    pub name: Token,
    pub superclass: Option<VariableExpression>,
    pub fields: Vec<FieldDeclaration>,
    pub enums: Vec<EnumStatement>,
    pub methods: Vec<Rc<FunctionStatement>>,
}

/// A field declared in a class `var` section. Fields only carry type information;
/// instances create them on first write.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: Token,
    pub type_name: String,
    pub generic: String,
}

#[derive(Debug, Clone)]
pub struct EnumStatement {
    pub name: Token,
    pub members: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Procedure,
    Constructor,
    Method,
}

impl FunctionKind {
    pub fn describe(self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Procedure => "procedure",
            FunctionKind::Constructor => "constructor",
            FunctionKind::Method => "method",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionStatement {
    pub kind: FunctionKind,
    pub name: Token,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Token,
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone)]
pub struct TryStatement {
    pub keyword: Token,
    pub body: Vec<Statement>,
    pub handlers: Vec<ExceptHandler>,
    /// Trailing statements of the `except` block, run when no handler matches.
    pub default: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub name: Token,
    pub type_name: Option<String>,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone)]
pub struct PrintStatement {
    pub keyword: Token,
    pub expression: Expression,
}

#[derive(Debug, Clone)]
pub struct ExitStatement {
    pub keyword: Token,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct RaiseStatement {
    pub keyword: Token,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct VarStatement {
    pub name: Token,
    pub type_name: String,
    pub generic: String,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct BreakStatement {
    pub keyword: Token,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expression: Expression,
}

#[derive(Debug, Clone)]
pub struct UsesStatement {
    pub keyword: Token,
    pub unit: Token,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Char(char),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
                | BinaryOperator::Less
                | BinaryOperator::LessEqual
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// Explicit `as Type` annotation; overrides inference in the type checker.
    pub cast: Option<String>,
}

impl Expression {
    pub fn new(kind: ExpressionKind) -> Self {
        Self { kind, cast: None }
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Literal(Literal),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Logical(LogicalExpression),
    Grouping(Box<Expression>),
    Variable(VariableExpression),
    Assign(AssignExpression),
    Call(CallExpression),
    Get(GetExpression),
    Set(SetExpression),
    Subscript(SubscriptExpression),
    Map(MapExpression),
    This(ThisExpression),
    Super(SuperExpression),
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub token: Token,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub token: Token,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct LogicalExpression {
    pub left: Box<Expression>,
    pub operator: LogicalOperator,
    pub token: Token,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct VariableExpression {
    pub id: NodeId,
    pub name: Token,
}

#[derive(Debug, Clone)]
pub struct AssignExpression {
    pub id: NodeId,
    pub name: Token,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub paren: Token,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct GetExpression {
    pub object: Box<Expression>,
    pub name: Token,
}

#[derive(Debug, Clone)]
pub struct SetExpression {
    pub object: Box<Expression>,
    pub name: Token,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct SubscriptExpression {
    pub bracket: Token,
    pub object: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct MapExpression {
    pub bracket: Token,
    pub entries: Vec<(Expression, Expression)>,
}

#[derive(Debug, Clone)]
pub struct ThisExpression {
    pub id: NodeId,
    pub keyword: Token,
}

#[derive(Debug, Clone)]
pub struct SuperExpression {
    pub id: NodeId,
    pub keyword: Token,
    pub method: Token,
}
