use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::lexer::{Keyword, Token, TokenKind};

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Diagnostics,
    synchronize: bool,
    loop_depth: usize,
    next_node_id: usize,
}

impl Parser {
    /// Creates a parser over a scanned token stream. With `synchronize` set, syntax
    /// errors are recorded and parsing resumes at the next statement boundary;
    /// otherwise the first error is returned.
    pub fn new(tokens: Vec<Token>, synchronize: bool) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Diagnostics::new(),
            synchronize,
            loop_depth: 0,
            next_node_id: 0,
        }
    }

    /// Starts node numbering at `first`, so ids stay unique across several parses
    /// feeding one interpreter.
    pub fn with_first_node_id(mut self, first: usize) -> Self {
        self.next_node_id = first;
        self
    }

    pub fn next_node_id(&self) -> usize {
        self.next_node_id
    }

    pub fn parse(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            statements.extend(self.declaration()?);
        }

        debug!(statements = statements.len(), "parsed program");
        Ok(Program::new(statements))
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        NodeId(id)
    }

    /// Parses one declaration. A `var` section expands to one statement per name,
    /// so the result is a list.
    fn declaration(&mut self) -> ParseResult<Vec<Statement>> {
        match self.parse_declaration() {
            Ok(statements) => Ok(statements),
            Err(error) => {
                self.diagnostics
                    .push_token_error(&error.token, error.message.clone());
                if !self.synchronize {
                    return Err(error);
                }
                self.synchronize_tokens();
                Ok(Vec::new())
            }
        }
    }

    fn parse_declaration(&mut self) -> ParseResult<Vec<Statement>> {
        let statement = match self.peek_keyword() {
            Some(Keyword::Uses) => {
                self.advance();
                self.parse_uses()?
            }
            Some(Keyword::Class) => {
                self.advance();
                self.parse_class()?
            }
            Some(Keyword::Function) => {
                self.advance();
                Statement::Function(Rc::new(self.parse_function(FunctionKind::Function)?))
            }
            Some(Keyword::Procedure) => {
                self.advance();
                Statement::Function(Rc::new(self.parse_function(FunctionKind::Procedure)?))
            }
            Some(Keyword::Var) => {
                self.advance();
                return self.parse_variable_section();
            }
            Some(Keyword::Type) => {
                self.advance();
                let mut enums = Vec::new();
                while self.check(&TokenKind::Identifier) {
                    enums.push(Statement::Enum(self.parse_enum()?));
                }
                return Ok(enums);
            }
            _ => self.parse_statement()?,
        };
        Ok(vec![statement])
    }

    fn parse_uses(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        let unit = self.consume(&TokenKind::Identifier, "Expected identifier.")?;
        self.consume(&TokenKind::Semicolon, "Expected ';'")?;
        Ok(Statement::Uses(UsesStatement { keyword, unit }))
    }

    fn parse_class(&mut self) -> ParseResult<Statement> {
        let name = self.consume(&TokenKind::Identifier, "Expect class name.")?;

        let mut superclass = None;
        if self.matches(&TokenKind::LParen) {
            let super_name = self.consume(&TokenKind::Identifier, "Expect superclass name.")?;
            self.consume(&TokenKind::RParen, "Expect ')' after superclass name.")?;
            superclass = Some(VariableExpression {
                id: self.allocate_node_id(),
                name: super_name,
            });
        }
        self.consume(&TokenKind::Semicolon, "Expect ';' after class declaration.")?;

        let mut fields = Vec::new();
        let mut enums = Vec::new();
        loop {
            if self.match_keyword(Keyword::Type) {
                while self.check(&TokenKind::Identifier) {
                    enums.push(self.parse_enum()?);
                }
            } else if self.match_keyword(Keyword::Var) {
                for statement in self.parse_variable_section()? {
                    if let Statement::Var(var) = statement {
                        fields.push(FieldDeclaration {
                            name: var.name,
                            type_name: var.type_name,
                            generic: var.generic,
                        });
                    }
                }
            } else {
                break;
            }
        }

        self.consume_keyword(Keyword::Begin, "Expect 'begin' before class body.")?;
        let mut methods: Vec<Rc<FunctionStatement>> = Vec::new();
        while !self.check_keyword(Keyword::End) && !self.is_at_end() {
            let kind = if self.match_keyword(Keyword::Function) {
                FunctionKind::Function
            } else if self.match_keyword(Keyword::Procedure) {
                FunctionKind::Procedure
            } else if self.match_keyword(Keyword::Constructor) {
                FunctionKind::Constructor
            } else {
                FunctionKind::Method
            };
            methods.push(Rc::new(self.parse_function(kind)?));
            self.matches(&TokenKind::Semicolon);
        }
        self.consume_keyword(Keyword::End, "Expect 'end' after class body.")?;

        Ok(Statement::Class(ClassStatement {
            name,
            superclass,
            fields,
            enums,
            methods,
        }))
    }

    fn parse_enum(&mut self) -> ParseResult<EnumStatement> {
        let name = self.consume(&TokenKind::Identifier, "Expect enum name.")?;
        self.consume(&TokenKind::Equal, "Expect '=' after enum declaration.")?;
        self.consume(&TokenKind::LParen, "Expect '('")?;

        let mut members = Vec::new();
        loop {
            members.push(self.consume(&TokenKind::Identifier, "Expect enum identifier.")?);
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }

        self.consume(&TokenKind::RParen, "Expect ')'")?;
        self.consume(&TokenKind::Semicolon, "Expect ';'")?;
        Ok(EnumStatement { name, members })
    }

    /// Parses `Name [: Type [of Generic]]` for variable declarations.
    fn parse_type_annotation(&mut self) -> ParseResult<(String, String)> {
        let mut type_name = String::from("Any");
        let mut generic = String::from("Any");
        if self.matches(&TokenKind::Colon) {
            type_name = self.consume(&TokenKind::Identifier, "Expected type.")?.lexeme;
            if self.match_keyword(Keyword::Of) {
                generic = self
                    .consume(&TokenKind::Identifier, "Expect generic type.")?
                    .lexeme;
            }
        }
        Ok((type_name, generic))
    }

    /// `A, B, C : Type := init;` repeated until the next section or body keyword.
    /// Every name receives its own `var` statement sharing the initializer.
    fn parse_variable_section(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            let mut names = vec![self.consume(&TokenKind::Identifier, "Expect variable name.")?];
            while self.matches(&TokenKind::Comma) {
                names.push(self.consume(&TokenKind::Identifier, "Expect variable name.")?);
            }

            let (type_name, generic) = self.parse_type_annotation()?;

            let initializer = if self.matches(&TokenKind::ColonEqual) {
                Some(self.parse_expression()?)
            } else {
                None
            };

            self.consume(
                &TokenKind::Semicolon,
                "Expect ';' after variable declaration.",
            )?;

            statements.extend(names.into_iter().map(|name| {
                Statement::Var(VarStatement {
                    name,
                    type_name: type_name.clone(),
                    generic: generic.clone(),
                    initializer: initializer.clone(),
                })
            }));

            // A following line is part of the section only when it starts `Name ,` or `Name :`.
            let continues = self.check(&TokenKind::Identifier)
                && matches!(
                    self.peek_kind_at(1),
                    Some(TokenKind::Comma | TokenKind::Colon)
                );
            if !continues {
                break;
            }
        }
        Ok(statements)
    }

    fn parse_function(&mut self, kind: FunctionKind) -> ParseResult<FunctionStatement> {
        let label = kind.describe();
        let name = self.consume(&TokenKind::Identifier, &format!("Expect {label} name."))?;

        let mut parameters = Vec::new();
        if self.matches(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                loop {
                    let param_name =
                        self.consume(&TokenKind::Identifier, "Expect parameter name.")?;
                    let type_name = if self.matches(&TokenKind::Colon) {
                        self.consume(&TokenKind::Identifier, "Expect type.")?.lexeme
                    } else {
                        String::from("Any")
                    };
                    parameters.push(Parameter {
                        name: param_name,
                        type_name,
                    });
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.consume(&TokenKind::RParen, "Expect ')' after parameters.")?;
        }

        let mut return_type = String::from("Any");
        if self.matches(&TokenKind::Colon) {
            if kind == FunctionKind::Procedure {
                return Err(ParseError::new(
                    self.peek().clone(),
                    "Procedures cannot have return type.",
                ));
            }
            return_type = self
                .consume(&TokenKind::Identifier, "Expected return type.")?
                .lexeme;
        }

        self.consume(&TokenKind::Semicolon, "Expect ';'")?;

        let mut body = Vec::new();
        loop {
            if self.match_keyword(Keyword::Type) {
                while self.check(&TokenKind::Identifier) {
                    body.push(Statement::Enum(self.parse_enum()?));
                }
            } else if self.match_keyword(Keyword::Var) {
                body.extend(self.parse_variable_section()?);
            } else {
                break;
            }
        }

        self.consume_keyword(Keyword::Begin, &format!("Expect 'begin' before {label} body."))?;
        while !self.check_keyword(Keyword::End) && !self.is_at_end() {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            body.extend(self.declaration()?);
        }
        self.consume_keyword(Keyword::End, &format!("Expect 'end' after {label} body."))?;

        Ok(FunctionStatement {
            kind,
            name,
            parameters,
            return_type,
            body,
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek_keyword() {
            Some(Keyword::For) => {
                self.advance();
                self.parse_for()
            }
            Some(Keyword::Break) => {
                self.advance();
                self.parse_break()
            }
            Some(Keyword::If) => {
                self.advance();
                self.parse_if()
            }
            Some(Keyword::Try) => {
                self.advance();
                self.parse_try()
            }
            Some(Keyword::Case) => {
                self.advance();
                self.parse_case()
            }
            Some(Keyword::Print) => {
                self.advance();
                self.parse_print()
            }
            Some(Keyword::Exit) => {
                self.advance();
                self.parse_exit()
            }
            Some(Keyword::Raise) => {
                self.advance();
                self.parse_raise()
            }
            Some(Keyword::While) => {
                self.advance();
                self.parse_while()
            }
            Some(Keyword::Begin) => {
                self.advance();
                Ok(Statement::Block(BlockStatement {
                    statements: self.parse_block()?,
                }))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// `for [var init | expr]; cond; incr do body` lowered to
    /// `begin init; while cond do begin body; incr; end end`.
    fn parse_for(&mut self) -> ParseResult<Statement> {
        let initializer = if self.matches(&TokenKind::Semicolon) {
            None
        } else if self.match_keyword(Keyword::Var) {
            Some(self.parse_var()?)
        } else {
            Some(self.parse_expression_statement()?)
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check_keyword(Keyword::Do) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_keyword(Keyword::Do, "Expect 'do' after for clauses.")?;

        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        let mut body = body?;

        if let Some(increment) = increment {
            body = Statement::Block(BlockStatement {
                statements: vec![
                    body,
                    Statement::Expression(ExpressionStatement {
                        expression: increment,
                    }),
                ],
            });
        }

        let condition = condition
            .unwrap_or_else(|| Expression::new(ExpressionKind::Literal(Literal::Boolean(true))));
        body = Statement::While(WhileStatement {
            condition,
            body: Box::new(body),
        });

        if let Some(initializer) = initializer {
            body = Statement::Block(BlockStatement {
                statements: vec![initializer, body],
            });
        }

        Ok(body)
    }

    fn parse_var(&mut self) -> ParseResult<Statement> {
        let name = self.consume(&TokenKind::Identifier, "Expect variable name.")?;
        let (type_name, generic) = self.parse_type_annotation()?;
        let initializer = if self.matches(&TokenKind::ColonEqual) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(
            &TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Statement::Var(VarStatement {
            name,
            type_name,
            generic,
            initializer,
        }))
    }

    fn parse_break(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        if self.loop_depth == 0 {
            self.diagnostics
                .push_token_error(&keyword, "Must be inside a loop to use 'break'.");
        }
        self.consume(&TokenKind::Semicolon, "Expect ';' after 'break'.")?;
        Ok(Statement::Break(BreakStatement { keyword }))
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let condition = self.parse_expression()?;
        self.consume_keyword(Keyword::Then, "Expect 'then' after if condition.")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_keyword(Keyword::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_try(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();

        let mut body = Vec::new();
        while !self.check_keyword(Keyword::Except) && !self.is_at_end() {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            body.extend(self.declaration()?);
        }
        self.consume_keyword(Keyword::Except, "Expect 'except' after try block.")?;

        let mut handlers = Vec::new();
        while self.check_identifier("on") {
            self.advance();
            let name = self.consume(&TokenKind::Identifier, "Expected variable name.")?;
            let type_name = if self.matches(&TokenKind::Colon) {
                Some(self.consume(&TokenKind::Identifier, "Expected type.")?.lexeme)
            } else {
                None
            };
            self.consume_keyword(Keyword::Do, "Expected 'do'.")?;
            let body = Box::new(self.parse_statement()?);
            handlers.push(ExceptHandler {
                name,
                type_name,
                body,
            });
        }

        let mut default = Vec::new();
        while !self.check_keyword(Keyword::End) && !self.is_at_end() {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            default.extend(self.declaration()?);
        }
        self.consume_keyword(Keyword::End, "Expect 'end' after except block.")?;

        Ok(Statement::Try(TryStatement {
            keyword,
            body,
            handlers,
            default,
        }))
    }

    /// `case e of a, b: s1; c: s2; else s3 end` lowered to an `if` chain comparing
    /// `e` against each label.
    fn parse_case(&mut self) -> ParseResult<Statement> {
        let subject = self.parse_expression()?;
        self.consume_keyword(Keyword::Of, "Expect 'of' after case condition.")?;

        let mut arms: Vec<(Expression, Statement)> = Vec::new();
        let mut otherwise = None;
        loop {
            let mut condition = self.case_label(&subject)?;
            while self.matches(&TokenKind::Comma) {
                let or_token = Token::synthetic(TokenKind::Keyword(Keyword::Or), "or", self.previous());
                let additional = self.case_label(&subject)?;
                condition = Expression::new(ExpressionKind::Logical(LogicalExpression {
                    left: Box::new(condition),
                    operator: LogicalOperator::Or,
                    token: or_token,
                    right: Box::new(additional),
                }));
            }

            self.consume(&TokenKind::Colon, "Expect ':' after condition.")?;
            let statement = self.parse_statement()?;
            self.matches(&TokenKind::Semicolon);
            arms.push((condition, statement));

            if self.match_keyword(Keyword::End) {
                break;
            }
            if self.match_keyword(Keyword::Else) {
                otherwise = Some(self.parse_statement()?);
                self.matches(&TokenKind::Semicolon);
                self.consume_keyword(Keyword::End, "Expected 'end'.")?;
                break;
            }
            if self.is_at_end() {
                return Err(ParseError::new(self.peek().clone(), "Expected 'end'."));
            }
        }

        let mut chain = otherwise.map(Box::new);
        for (condition, statement) in arms.into_iter().rev() {
            chain = Some(Box::new(Statement::If(IfStatement {
                condition,
                then_branch: Box::new(statement),
                else_branch: chain,
            })));
        }

        match chain {
            Some(statement) => Ok(*statement),
            None => Err(ParseError::new(self.previous().clone(), "Expected 'end'.")),
        }
    }

    fn case_label(&mut self, subject: &Expression) -> ParseResult<Expression> {
        let label = self.parse_expression()?;
        let token = Token::synthetic(TokenKind::Equal, "=", self.previous());
        Ok(Expression::new(ExpressionKind::Binary(BinaryExpression {
            left: Box::new(subject.clone()),
            operator: BinaryOperator::Equal,
            token,
            right: Box::new(label),
        })))
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        let expression = self.parse_expression()?;
        self.consume(&TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(PrintStatement {
            keyword,
            expression,
        }))
    }

    fn parse_exit(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        let value = self.parse_optional_value()?;
        self.consume(&TokenKind::Semicolon, "Expect ';' after exit value.")?;
        Ok(Statement::Exit(ExitStatement { keyword, value }))
    }

    fn parse_raise(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        let value = self.parse_optional_value()?;
        self.consume(&TokenKind::Semicolon, "Expect ';' after exit value.")?;
        Ok(Statement::Raise(RaiseStatement { keyword, value }))
    }

    fn parse_optional_value(&mut self) -> ParseResult<Option<Expression>> {
        if self.check(&TokenKind::Semicolon) {
            Ok(None)
        } else {
            self.parse_expression().map(Some)
        }
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        let condition = self.parse_expression()?;
        self.consume_keyword(Keyword::Do, "Expect 'do' after condition.")?;

        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;

        Ok(Statement::While(WhileStatement {
            condition,
            body: Box::new(body?),
        }))
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.check_keyword(Keyword::End) && !self.is_at_end() {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            statements.extend(self.declaration()?);
        }
        self.consume_keyword(Keyword::End, "Expect 'end' after block.")?;
        Ok(statements)
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let expression = self.parse_expression()?;
        self.consume(&TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Expression(ExpressionStatement { expression }))
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_assignment()?;
        if self.match_keyword(Keyword::As) {
            let cast = self.consume(&TokenKind::Identifier, "Expect typecast identifier.")?;
            expression.cast = Some(cast.lexeme);
        }
        Ok(expression)
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let expression = self.parse_or()?;

        if self.matches(&TokenKind::ColonEqual) {
            let equals = self.previous().clone();
            let value = Box::new(self.parse_assignment()?);

            return match expression.kind {
                ExpressionKind::Variable(variable) => {
                    Ok(Expression::new(ExpressionKind::Assign(AssignExpression {
                        id: self.allocate_node_id(),
                        name: variable.name,
                        value,
                    })))
                }
                ExpressionKind::Get(get) => Ok(Expression::new(ExpressionKind::Set(SetExpression {
                    object: get.object,
                    name: get.name,
                    value,
                }))),
                _ => Err(ParseError::new(equals, "Invalid assignment target.")),
            };
        }

        Ok(expression)
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_and()?;
        while self.match_keyword(Keyword::Or) {
            let token = self.previous().clone();
            let right = self.parse_and()?;
            expression = Expression::new(ExpressionKind::Logical(LogicalExpression {
                left: Box::new(expression),
                operator: LogicalOperator::Or,
                token,
                right: Box::new(right),
            }));
        }
        Ok(expression)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_binary_level(0)?;
        while self.match_keyword(Keyword::And) {
            let token = self.previous().clone();
            let right = self.parse_binary_level(0)?;
            expression = Expression::new(ExpressionKind::Logical(LogicalExpression {
                left: Box::new(expression),
                operator: LogicalOperator::And,
                token,
                right: Box::new(right),
            }));
        }
        Ok(expression)
    }

    /// Left-associative binary levels from equality (0) down to multiplicative (3).
    fn parse_binary_level(&mut self, level: usize) -> ParseResult<Expression> {
        if level > 3 {
            return self.parse_unary();
        }

        let mut expression = self.parse_binary_level(level + 1)?;
        while let Some(operator) = binary_operator_at_level(self.peek_kind(), level) {
            let token = self.advance().clone();
            let right = self.parse_binary_level(level + 1)?;
            expression = Expression::new(ExpressionKind::Binary(BinaryExpression {
                left: Box::new(expression),
                operator,
                token,
                right: Box::new(right),
            }));
        }
        Ok(expression)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let operator = if self.check_keyword(Keyword::Not) {
            Some(UnaryOperator::Not)
        } else if self.check(&TokenKind::Minus) {
            Some(UnaryOperator::Negate)
        } else {
            None
        };

        if let Some(operator) = operator {
            let token = self.advance().clone();
            let operand = self.parse_unary()?;
            return Ok(Expression::new(ExpressionKind::Unary(UnaryExpression {
                operator,
                token,
                operand: Box::new(operand),
            })));
        }

        self.parse_call()
    }

    fn parse_call(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_primary()?;

        loop {
            if self.matches(&TokenKind::LParen) {
                expression = self.finish_call(expression)?;
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                let bracket =
                    self.consume(&TokenKind::RBracket, "Expect ']' after subscript.")?;
                expression = Expression::new(ExpressionKind::Subscript(SubscriptExpression {
                    bracket,
                    object: Box::new(expression),
                    index: Box::new(index),
                }));
            } else if self.matches(&TokenKind::Dot) {
                let name =
                    self.consume(&TokenKind::Identifier, "Expect property name after '.'")?;
                expression = Expression::new(ExpressionKind::Get(GetExpression {
                    object: Box::new(expression),
                    name,
                }));
            } else {
                break;
            }
        }

        Ok(expression)
    }

    fn finish_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(ParseError::new(
                        self.peek().clone(),
                        "Can't have more than 255 arguments.",
                    ));
                }
                arguments.push(self.parse_expression()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(&TokenKind::RParen, "Expect ')' after arguments.")?;
        Ok(Expression::new(ExpressionKind::Call(CallExpression {
            callee: Box::new(callee),
            paren,
            arguments,
        })))
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let token = self.peek().clone();
        let literal = match &token.kind {
            TokenKind::Keyword(Keyword::False) => Some(Literal::Boolean(false)),
            TokenKind::Keyword(Keyword::True) => Some(Literal::Boolean(true)),
            TokenKind::Keyword(Keyword::Nil) => Some(Literal::Nil),
            TokenKind::IntegerLiteral(value) => Some(Literal::Integer(*value)),
            TokenKind::FloatLiteral(value) => Some(Literal::Double(*value)),
            TokenKind::StringLiteral(value) => Some(Literal::String(value.clone())),
            TokenKind::CharLiteral(value) => Some(Literal::Char(*value)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expression::new(ExpressionKind::Literal(literal)));
        }

        match token.kind {
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                self.consume(&TokenKind::Dot, "Expect '.' after 'super'.")?;
                let method =
                    self.consume(&TokenKind::Identifier, "Expect superclass method name")?;
                Ok(Expression::new(ExpressionKind::Super(SuperExpression {
                    id: self.allocate_node_id(),
                    keyword: token,
                    method,
                })))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(Expression::new(ExpressionKind::This(ThisExpression {
                    id: self.allocate_node_id(),
                    keyword: token,
                })))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expression::new(ExpressionKind::Variable(VariableExpression {
                    id: self.allocate_node_id(),
                    name: token,
                })))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut entries = Vec::new();
                loop {
                    let key = self.parse_expression()?;
                    self.consume(&TokenKind::Colon, "Expect ':' after key.")?;
                    let value = self.parse_expression()?;
                    entries.push((key, value));
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(&TokenKind::RBracket, "Expect ']' after map.")?;
                Ok(Expression::new(ExpressionKind::Map(MapExpression {
                    bracket: token,
                    entries,
                })))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(&TokenKind::RParen, "Expect ')' after expression.")?;
                Ok(Expression::new(ExpressionKind::Grouping(Box::new(inner))))
            }
            _ => Err(ParseError::new(token, "Expect expression.")),
        }
    }

    /// Skips tokens until just after a `;` or just before a statement keyword.
    fn synchronize_tokens(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if matches!(
                self.peek_keyword(),
                Some(
                    Keyword::Class
                        | Keyword::For
                        | Keyword::Function
                        | Keyword::If
                        | Keyword::Print
                        | Keyword::Exit
                        | Keyword::Var
                        | Keyword::While
                )
            ) {
                return;
            }
            self.advance();
        }
    }

    fn consume(&mut self, expected: &TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(expected) {
            Ok(self.advance().clone())
        } else {
            Err(ParseError::new(self.peek().clone(), message))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword, message: &str) -> ParseResult<Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance().clone())
        } else {
            Err(ParseError::new(self.peek().clone(), message))
        }
    }

    fn matches(&mut self, expected: &TokenKind) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Compares token kinds without looking at literal payloads.
    fn check(&self, expected: &TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(expected)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek_keyword(), Some(kw) if kw == keyword)
    }

    fn check_identifier(&self, lexeme: &str) -> bool {
        self.check(&TokenKind::Identifier) && self.peek().lexeme.eq_ignore_ascii_case(lexeme)
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek_kind() {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.current].kind
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens
            .get(self.current + offset)
            .map(|token| &token.kind)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}

fn binary_operator_at_level(kind: &TokenKind, level: usize) -> Option<BinaryOperator> {
    let operator = match (level, kind) {
        (0, TokenKind::Equal) => BinaryOperator::Equal,
        (0, TokenKind::LessGreater) => BinaryOperator::NotEqual,
        (1, TokenKind::Greater) => BinaryOperator::Greater,
        (1, TokenKind::GreaterEqual) => BinaryOperator::GreaterEqual,
        (1, TokenKind::Less) => BinaryOperator::Less,
        (1, TokenKind::LessEqual) => BinaryOperator::LessEqual,
        (2, TokenKind::Plus) => BinaryOperator::Add,
        (2, TokenKind::Minus) => BinaryOperator::Subtract,
        (3, TokenKind::Star) => BinaryOperator::Multiply,
        (3, TokenKind::Slash) => BinaryOperator::Divide,
        _ => return None,
    };
    Some(operator)
}
