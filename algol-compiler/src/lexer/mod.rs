use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::ast::SourceSpan;
use crate::diagnostics::Diagnostics;
use crate::source::SourceFile;

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    pub file: Rc<str>,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        lexeme: impl Into<String>,
        line: usize,
        column: usize,
        file: Rc<str>,
    ) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
            file,
        }
    }

    /// A token that does not originate from source text, such as the `=` inserted
    /// when a `case` statement is lowered to an `if` chain.
    pub fn synthetic(kind: TokenKind, lexeme: &str, at: &Token) -> Self {
        Self::new(kind, lexeme, at.line, at.column, at.file.clone())
    }

    pub fn span(&self) -> SourceSpan {
        let len = self.lexeme.chars().count().max(1);
        SourceSpan::new(
            self.line,
            self.column,
            self.line,
            self.column + len.saturating_sub(1),
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    CharLiteral(char),
    Keyword(Keyword),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    ColonEqual,
    Semicolon,
    Equal,
    LessGreater,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Class,
    Else,
    False,
    For,
    If,
    Nil,
    Not,
    Or,
    Print,
    Exit,
    Super,
    Then,
    This,
    True,
    Type,
    Var,
    While,
    Begin,
    End,
    Do,
    Case,
    Of,
    Constructor,
    Function,
    Procedure,
    Try,
    Except,
    Finally,
    Raise,
    Break,
    As,
    Unit,
    Uses,
    Const,
}

pub struct Lexer<'a> {
    input: &'a str,
    file: Rc<str>,
    position: usize,
    line: usize,
    column: usize,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self {
            input: &source.contents,
            file: Rc::from(source.name()),
            position: 0,
            line: 1,
            column: 1,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Scans the whole input. Malformed lexemes are reported to the diagnostics and
    /// skipped, so the returned stream is always terminated by `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance_char();
                }
                '/' => {
                    if self.peek_next_char() == Some('/') {
                        self.skip_comment();
                    } else {
                        tokens.push(self.simple_token(TokenKind::Slash));
                    }
                }
                '\'' => {
                    if let Some(token) = self.lex_string() {
                        tokens.push(token);
                    }
                }
                '#' => {
                    if let Some(token) = self.lex_char_code() {
                        tokens.push(token);
                    }
                }
                '0'..='9' => {
                    if let Some(token) = self.lex_number() {
                        tokens.push(token);
                    }
                }
                ch if ch.is_alphabetic() || ch == '_' || ch == '?' => {
                    tokens.push(self.lex_identifier_or_keyword());
                }
                '(' => tokens.push(self.simple_token(TokenKind::LParen)),
                ')' => tokens.push(self.simple_token(TokenKind::RParen)),
                '[' => tokens.push(self.simple_token(TokenKind::LBracket)),
                ']' => tokens.push(self.simple_token(TokenKind::RBracket)),
                ',' => tokens.push(self.simple_token(TokenKind::Comma)),
                '.' => tokens.push(self.simple_token(TokenKind::Dot)),
                '+' => tokens.push(self.simple_token(TokenKind::Plus)),
                '-' => tokens.push(self.simple_token(TokenKind::Minus)),
                ';' => tokens.push(self.simple_token(TokenKind::Semicolon)),
                '*' => tokens.push(self.simple_token(TokenKind::Star)),
                '=' => tokens.push(self.simple_token(TokenKind::Equal)),
                ':' => {
                    let token = self.lex_pair('=', TokenKind::Colon, TokenKind::ColonEqual);
                    tokens.push(token);
                }
                '>' => {
                    let token = self.lex_pair('=', TokenKind::Greater, TokenKind::GreaterEqual);
                    tokens.push(token);
                }
                '<' => {
                    let token = self.lex_less_variants();
                    tokens.push(token);
                }
                other => {
                    self.error_here(format!("Unexpected character: {other}"));
                    self.advance_char();
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
            self.file.clone(),
        ));

        debug!(file = %self.file, tokens = tokens.len(), "scanned source");
        tokens
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn error_here(&mut self, message: String) {
        let span = SourceSpan::single_point(self.line, self.column);
        self.diagnostics.push_in_file(&self.file, message, span);
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn lex_string(&mut self) -> Option<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume opening quote

        let mut value = String::new();
        loop {
            match self.peek_char() {
                Some('\'') => {
                    self.advance_char();
                    break;
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance_char();
                }
                None => {
                    let span = SourceSpan::single_point(start_line, start_column);
                    self.diagnostics
                        .push_in_file(&self.file, "Unterminated string.", span);
                    return None;
                }
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let mut chars = value.chars();
        let kind = match (chars.next(), chars.next()) {
            (Some(ch), None) => TokenKind::CharLiteral(ch),
            _ => TokenKind::StringLiteral(value),
        };
        Some(Token::new(
            kind,
            lexeme,
            start_line,
            start_column,
            self.file.clone(),
        ))
    }

    fn lex_char_code(&mut self) -> Option<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume '#'

        while matches!(self.peek_char(), Some('0'..='9')) {
            self.advance_char();
        }

        let lexeme = self.slice(start, self.position).to_string();
        let code = lexeme[1..].parse::<u32>().ok().and_then(char::from_u32);
        match code {
            Some(ch) => Some(Token::new(
                TokenKind::CharLiteral(ch),
                lexeme,
                start_line,
                start_column,
                self.file.clone(),
            )),
            None => {
                let span = SourceSpan::single_point(start_line, start_column);
                self.diagnostics.push_in_file(
                    &self.file,
                    format!("Invalid character: {lexeme}"),
                    span,
                );
                None
            }
        }
    }

    fn lex_number(&mut self) -> Option<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        let mut is_float = false;

        while matches!(self.peek_char(), Some('0'..='9')) {
            self.advance_char();
        }

        if self.peek_char() == Some('.') && matches!(self.peek_next_char(), Some('0'..='9')) {
            is_float = true;
            self.advance_char(); // consume '.'
            while matches!(self.peek_char(), Some('0'..='9')) {
                self.advance_char();
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = if is_float {
            lexeme.parse::<f64>().ok().map(TokenKind::FloatLiteral)
        } else {
            lexeme.parse::<i64>().ok().map(TokenKind::IntegerLiteral)
        };

        match kind {
            Some(kind) => Some(Token::new(
                kind,
                lexeme,
                start_line,
                start_column,
                self.file.clone(),
            )),
            None => {
                let span = SourceSpan::single_point(start_line, start_column);
                self.diagnostics
                    .push_in_file(&self.file, format!("Invalid number: {lexeme}"), span);
                None
            }
        }
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        self.advance_char();
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '?' {
                self.advance_char();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = match keyword_from_lexeme(&lexeme) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        };
        Token::new(kind, lexeme, start_line, start_column, self.file.clone())
    }

    /// Lexes a one-character operator that may be followed by `second` to form a
    /// two-character operator.
    fn lex_pair(&mut self, second: char, single: TokenKind, double: TokenKind) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char();
        let kind = if self.peek_char() == Some(second) {
            self.advance_char();
            double
        } else {
            single
        };
        Token::new(
            kind,
            self.slice(start, self.position),
            start_line,
            start_column,
            self.file.clone(),
        )
    }

    fn lex_less_variants(&mut self) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char(); // consume '<'
        let kind = match self.peek_char() {
            Some('=') => {
                self.advance_char();
                TokenKind::LessEqual
            }
            Some('>') => {
                self.advance_char();
                TokenKind::LessGreater
            }
            _ => TokenKind::Less,
        };
        Token::new(
            kind,
            self.slice(start, self.position),
            start_line,
            start_column,
            self.file.clone(),
        )
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char();
        Token::new(
            kind,
            self.slice(start, self.position),
            start_line,
            start_column,
            self.file.clone(),
        )
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }
}

fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    let keyword = match lexeme.to_ascii_lowercase().as_str() {
        "and" => Keyword::And,
        "class" => Keyword::Class,
        "else" => Keyword::Else,
        "false" => Keyword::False,
        "for" => Keyword::For,
        "if" => Keyword::If,
        "nil" => Keyword::Nil,
        "not" => Keyword::Not,
        "or" => Keyword::Or,
        "print" => Keyword::Print,
        "exit" => Keyword::Exit,
        "super" => Keyword::Super,
        "then" => Keyword::Then,
        "this" => Keyword::This,
        "true" => Keyword::True,
        "type" => Keyword::Type,
        "var" => Keyword::Var,
        "while" => Keyword::While,
        "begin" => Keyword::Begin,
        "end" => Keyword::End,
        "do" => Keyword::Do,
        "case" => Keyword::Case,
        "of" => Keyword::Of,
        "constructor" => Keyword::Constructor,
        "function" => Keyword::Function,
        "procedure" => Keyword::Procedure,
        "try" => Keyword::Try,
        "except" => Keyword::Except,
        "finally" => Keyword::Finally,
        "raise" => Keyword::Raise,
        "break" => Keyword::Break,
        "as" => Keyword::As,
        "unit" => Keyword::Unit,
        "uses" => Keyword::Uses,
        "const" => Keyword::Const,
        _ => return None,
    };
    Some(keyword)
}
