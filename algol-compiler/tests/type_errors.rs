use algol_compiler::{CompileOptions, Compiler, Diagnostic, SourceFile};

fn compile(source: &str) -> (bool, Vec<Diagnostic>) {
    let mut compiler = Compiler::new(CompileOptions::default());
    let result = compiler.compile(&SourceFile::inline("types.pas", source));
    (result.is_ok(), compiler.diagnostics().entries().to_vec())
}

fn type_error(source: &str) -> String {
    let (ok, diagnostics) = compile(source);
    assert!(!ok, "expected type checker to reject:\n{source}");
    match diagnostics.as_slice() {
        [diagnostic] => diagnostic.message.clone(),
        other => panic!("expected exactly one diagnostic, found {other:?}"),
    }
}

#[test]
fn rejects_mismatched_var_annotation() {
    let source = "var Abc : String := 123;\nprint 'after';\n";
    let mut compiler = Compiler::new(CompileOptions::default());
    let error = compiler
        .compile(&SourceFile::inline("types.pas", source))
        .err()
        .expect("type checking should fail");
    assert_eq!(error.to_string(), "Type checking failed");

    let diagnostic = &compiler.diagnostics().entries()[0];
    assert_eq!(diagnostic.message, "Type mismatch!");
    assert_eq!(diagnostic.span.map(|span| span.line), Some(1));
}

#[test]
fn skipping_the_type_checker_accepts_the_same_program() {
    let options = CompileOptions {
        check_types: false,
        ..CompileOptions::default()
    };
    let mut compiler = Compiler::new(options);
    let result = compiler.compile(&SourceFile::inline("types.pas", "var Abc : String := 123;"));
    assert!(result.is_ok());
}

#[test]
fn rejects_mismatched_assignment() {
    assert_eq!(
        type_error("var A : Integer := 1; A := 'text';"),
        "Type mismatch!"
    );
}

#[test]
fn rejects_mismatched_binary_operands() {
    assert_eq!(type_error("var A := 1 + 2.5;"), "Type mismatch.");
    assert_eq!(type_error("var A := True and 1;"), "Type mismatch.");
}

#[test]
fn string_addition_accepts_any_right_operand() {
    let (ok, diagnostics) = compile("var A : String := 'n = ' + 1;");
    assert!(ok, "{diagnostics:?}");
}

#[test]
fn rejects_return_type_mismatch() {
    assert_eq!(
        type_error("function F : Integer; begin exit 'no'; end"),
        "Type mismatch!"
    );
}

#[test]
fn procedures_cannot_return_values() {
    assert_eq!(
        type_error("procedure P; begin exit 1; end"),
        "Can't return value from procedure."
    );
}

#[test]
fn rejects_mismatched_field_write() {
    let source = r#"
class Counter;
var Count : Integer;
begin
  procedure Reset;
  begin
    this.Count := 'zero';
  end
end
"#;
    assert_eq!(type_error(source), "Type mismatch.");
}

#[test]
fn subclass_is_assignable_to_base() {
    let classes = r#"
class Animal;
begin
end
class Dog(Animal);
begin
end
"#;
    let (ok, diagnostics) = compile(&format!("{classes} var Pet : Animal := Dog();"));
    assert!(ok, "{diagnostics:?}");

    assert_eq!(
        type_error(&format!("{classes} var Pup : Dog := Animal();")),
        "Type mismatch!"
    );
}

#[test]
fn untyped_values_do_not_satisfy_declared_types() {
    assert_eq!(
        type_error("function F; begin exit 1; end var S : String := F();"),
        "Type mismatch!"
    );
    assert_eq!(
        type_error("procedure P(X); var S : Integer := X; begin end"),
        "Type mismatch!"
    );
}

#[test]
fn untyped_declarations_accept_anything() {
    let (ok, diagnostics) = compile("function F; begin exit 1; end var S := F(); S := 'text';");
    assert!(ok, "{diagnostics:?}");
}

#[test]
fn cast_overrides_inferred_type() {
    let (ok, diagnostics) = compile("var S : String := 5 as String;");
    assert!(ok, "{diagnostics:?}");
}

#[test]
fn builtin_calls_have_known_result_types() {
    assert_eq!(
        type_error("var N : Integer := Str(5);"),
        "Type mismatch!"
    );
    let (ok, diagnostics) = compile("var N : Integer := Length('abc');");
    assert!(ok, "{diagnostics:?}");
}
