use algol_compiler::{
    BinaryOperator, ExpressionKind, FunctionKind, Lexer, Literal, LogicalOperator, ParseError,
    Parser, Program, SourceFile, Statement,
};

fn parse_with(source: &str, synchronize: bool) -> (Result<Program, ParseError>, Vec<String>) {
    let file = SourceFile::inline("parser.pas", source);
    let tokens = Lexer::new(&file).tokenize();
    let mut parser = Parser::new(tokens, synchronize);
    let result = parser.parse();
    let messages = parser
        .diagnostics()
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.message.clone())
        .collect();
    (result, messages)
}

fn parse(source: &str) -> Vec<Statement> {
    let (result, messages) = parse_with(source, false);
    assert!(messages.is_empty(), "unexpected diagnostics: {messages:?}");
    result.expect("source should parse").statements
}

#[test]
fn var_section_declares_each_name() {
    let statements = parse("var A, B : Integer := 1;\n  C : List of String;\nprint A;");
    assert_eq!(statements.len(), 4);

    let Statement::Var(first) = &statements[0] else {
        panic!("expected var, got {:?}", statements[0]);
    };
    assert_eq!(first.name.lexeme, "A");
    assert_eq!(first.type_name, "Integer");
    assert!(first.initializer.is_some());

    let Statement::Var(second) = &statements[1] else {
        panic!("expected var, got {:?}", statements[1]);
    };
    assert_eq!(second.name.lexeme, "B");
    assert!(second.initializer.is_some());

    let Statement::Var(third) = &statements[2] else {
        panic!("expected var, got {:?}", statements[2]);
    };
    assert_eq!(third.type_name, "List");
    assert_eq!(third.generic, "String");
    assert!(third.initializer.is_none());

    assert!(matches!(statements[3], Statement::Print(_)));
}

#[test]
fn untyped_declarations_default_to_any() {
    let statements = parse("var A := 1; function F(X); begin end");
    let Statement::Var(var) = &statements[0] else {
        panic!("expected var");
    };
    assert_eq!(var.type_name, "Any");

    let Statement::Function(function) = &statements[1] else {
        panic!("expected function");
    };
    assert_eq!(function.kind, FunctionKind::Function);
    assert_eq!(function.return_type, "Any");
    assert_eq!(function.parameters[0].type_name, "Any");
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let statements = parse("1 + 2 * 3;");
    let Statement::Expression(statement) = &statements[0] else {
        panic!("expected expression statement");
    };
    let ExpressionKind::Binary(add) = &statement.expression.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(add.operator, BinaryOperator::Add);
    let ExpressionKind::Binary(multiply) = &add.right.kind else {
        panic!("expected nested binary expression");
    };
    assert_eq!(multiply.operator, BinaryOperator::Multiply);
}

#[test]
fn for_loop_lowers_to_while() {
    let statements = parse("for var I := 0; I < 3; I := I + 1 do print I;");
    let Statement::Block(outer) = &statements[0] else {
        panic!("expected block around the loop");
    };
    assert!(matches!(outer.statements[0], Statement::Var(_)));
    let Statement::While(while_stmt) = &outer.statements[1] else {
        panic!("expected while loop");
    };
    let Statement::Block(body) = while_stmt.body.as_ref() else {
        panic!("expected body block with increment");
    };
    assert!(matches!(body.statements[0], Statement::Print(_)));
    assert!(matches!(body.statements[1], Statement::Expression(_)));
}

#[test]
fn for_loop_without_clauses_runs_forever() {
    let statements = parse("for ; ; do break;");
    let Statement::While(while_stmt) = &statements[0] else {
        panic!("expected bare while loop");
    };
    assert!(matches!(
        while_stmt.condition.kind,
        ExpressionKind::Literal(Literal::Boolean(true))
    ));
}

#[test]
fn case_lowers_to_if_chain() {
    let statements = parse("case X of 1, 2: print 'low'; 3: print 'mid'; else print 'high'; end");
    let Statement::If(first) = &statements[0] else {
        panic!("expected if chain");
    };
    let ExpressionKind::Logical(either) = &first.condition.kind else {
        panic!("expected 'or' of both labels");
    };
    assert_eq!(either.operator, LogicalOperator::Or);

    let Some(rest) = &first.else_branch else {
        panic!("expected second arm");
    };
    let Statement::If(second) = rest.as_ref() else {
        panic!("expected nested if");
    };
    assert!(matches!(
        second.else_branch.as_deref(),
        Some(Statement::Print(_))
    ));
}

#[test]
fn cast_is_attached_to_expression() {
    let statements = parse("var X := Y as Integer;");
    let Statement::Var(var) = &statements[0] else {
        panic!("expected var");
    };
    let cast = var
        .initializer
        .as_ref()
        .and_then(|initializer| initializer.cast.as_deref());
    assert_eq!(cast, Some("Integer"));
}

#[test]
fn class_declaration_collects_members() {
    let statements = parse(
        r#"
class Dog(Animal);
type Mood = (Happy, Sad);
var Name : String;
begin
  constructor Init(N : String);
  begin
    this.Name := N;
  end
  procedure Bark;
  begin
    print 'woof';
  end
  Wag;
  begin
  end
end
"#,
    );
    let Statement::Class(class) = &statements[0] else {
        panic!("expected class");
    };
    assert_eq!(class.name.lexeme, "Dog");
    assert_eq!(
        class.superclass.as_ref().map(|superclass| superclass.name.lexeme.as_str()),
        Some("Animal")
    );
    assert_eq!(class.enums.len(), 1);
    assert_eq!(class.fields.len(), 1);
    assert_eq!(class.fields[0].type_name, "String");

    let kinds: Vec<_> = class.methods.iter().map(|method| method.kind).collect();
    assert_eq!(
        kinds,
        [
            FunctionKind::Constructor,
            FunctionKind::Procedure,
            FunctionKind::Method
        ]
    );
}

#[test]
fn type_section_declares_several_enums() {
    let statements = parse("type Color = (Red, Green); Size = (Small, Large);");
    assert_eq!(statements.len(), 2);
    let Statement::Enum(size) = &statements[1] else {
        panic!("expected enum");
    };
    assert_eq!(size.name.lexeme, "Size");
    assert_eq!(size.members.len(), 2);
}

#[test]
fn try_collects_handlers_and_default() {
    let statements = parse(
        r#"
try
  raise 'x';
except
  on e : String do print e;
  on other do print other;
  print 'default';
end
"#,
    );
    let Statement::Try(try_stmt) = &statements[0] else {
        panic!("expected try");
    };
    assert_eq!(try_stmt.body.len(), 1);
    assert_eq!(try_stmt.handlers.len(), 2);
    assert_eq!(try_stmt.handlers[0].type_name.as_deref(), Some("String"));
    assert_eq!(try_stmt.handlers[1].type_name, None);
    assert_eq!(try_stmt.default.len(), 1);
}

#[test]
fn map_literal_and_uses_directive() {
    let statements = parse("uses Helpers; var M := ['a': 1, 'b': 2];");
    let Statement::Uses(uses) = &statements[0] else {
        panic!("expected uses");
    };
    assert_eq!(uses.unit.lexeme, "Helpers");

    let Statement::Var(var) = &statements[1] else {
        panic!("expected var");
    };
    let Some(ExpressionKind::Map(map)) = var.initializer.as_ref().map(|init| &init.kind) else {
        panic!("expected map literal");
    };
    assert_eq!(map.entries.len(), 2);
}

#[test]
fn procedures_cannot_declare_return_types() {
    let (result, messages) = parse_with("procedure P : Integer; begin end", false);
    assert!(result.is_err());
    assert_eq!(messages, ["Procedures cannot have return type."]);
}

#[test]
fn break_outside_loop_is_reported() {
    let (result, messages) = parse_with("break;", true);
    assert!(result.is_ok());
    assert_eq!(messages, ["Must be inside a loop to use 'break'."]);
}

#[test]
fn invalid_assignment_target() {
    let (_, messages) = parse_with("1 := 2;", true);
    assert_eq!(messages, ["Invalid assignment target."]);
}

#[test]
fn synchronizing_parser_recovers_at_next_statement() {
    let (result, messages) = parse_with("var := 1; print 2;", true);
    let statements = result.expect("synchronizing parser returns a program").statements;
    assert_eq!(messages, ["Expect variable name."]);
    assert_eq!(statements.len(), 1);
    assert!(matches!(statements[0], Statement::Print(_)));

    let (result, _) = parse_with("var := 1; print 2;", false);
    let error = result.expect_err("strict parser stops at the first error");
    assert_eq!(error.message, "Expect variable name.");
    assert_eq!(error.token.lexeme, ":=");
}
