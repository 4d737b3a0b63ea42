use anyhow::{anyhow, Result};

use algol_compiler::runtime::{Interpreter, OutputBuffer, RuntimeError, Signal, Value};
use algol_compiler::{CompileOptions, Compiler, DiagnosticLevel, SourceFile};

struct Run {
    interpreter: Interpreter,
    output: OutputBuffer,
    result: Result<(), Signal>,
    warnings: Vec<String>,
}

impl Run {
    fn global(&self, name: &str) -> Result<Value> {
        self.interpreter
            .global(name)
            .ok_or_else(|| anyhow!("global '{name}' is not defined"))
    }

    fn runtime_error(self) -> Result<RuntimeError> {
        match self.result {
            Err(Signal::Error(error)) => Ok(error),
            other => Err(anyhow!("expected a runtime error, got {other:?}")),
        }
    }
}

fn run(source: &str) -> Result<Run> {
    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler
        .compile(&SourceFile::inline("runtime.pas", source))
        .map_err(|error| anyhow!("{error}: {:?}", compiler.diagnostics().entries()))?;
    let warnings = compiler
        .diagnostics()
        .entries()
        .iter()
        .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Warning)
        .map(|diagnostic| diagnostic.message.clone())
        .collect();

    let output = OutputBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(output.clone()));
    interpreter.add_locals(compilation.locals);
    let result = interpreter.interpret(&compilation.program.statements);
    Ok(Run {
        interpreter,
        output,
        result,
        warnings,
    })
}

#[test]
fn assignment_inside_if_updates_global() -> Result<()> {
    let run = run("var Abc := 2; if True then Abc := 1;")?;
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.global("Abc")?, Value::Integer(1));
    Ok(())
}

#[test]
fn recursive_fib_over_doubles() -> Result<()> {
    let run = run(
        r#"
function fib(n);
begin
  if n < 2.0 then exit n;
  exit fib(n - 1.0) + fib(n - 2.0);
end

var Abc := fib(7.0);
"#,
    )?;
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.global("Abc")?, Value::Double(13.0));
    assert_eq!(run.global("fib")?.to_string(), "<fn fib>");
    Ok(())
}

#[test]
fn enum_member_has_name_and_ordinal() -> Result<()> {
    let run = run(
        r#"
type Color = (Red, Green, Blue);
var Abc := Red;
var Ordinal := Ord(Abc);
var Later := Blue > Green;
"#,
    )?;
    assert_eq!(run.global("Abc")?.to_string(), "Red");
    assert_eq!(run.global("Abc")?.type_name(), "Color");
    assert_eq!(run.global("Ordinal")?, Value::Integer(0));
    assert_eq!(run.global("Later")?, Value::Boolean(true));
    Ok(())
}

#[test]
fn integer_division_truncates() -> Result<()> {
    let run = run("var Abc := 7 / 2; var Def := 7.0 / 2.0;")?;
    assert_eq!(run.global("Abc")?, Value::Integer(3));
    assert_eq!(run.global("Def")?, Value::Double(3.5));
    Ok(())
}

#[test]
fn division_by_zero_is_a_runtime_error() -> Result<()> {
    let error = run("var Abc := 1 / 0;")?.runtime_error()?;
    assert_eq!(error.message, "Division by zero.");

    let error = run("var Abc := 1.0 / 0.0;")?.runtime_error()?;
    assert_eq!(error.message, "Division by zero.");
    Ok(())
}

#[test]
fn mixed_numeric_kinds_are_rejected_at_runtime() -> Result<()> {
    let source = r#"
function Plus(a, b);
begin
  exit a + b;
end

function Minus(a, b);
begin
  exit a - b;
end
"#;
    let error = run(&format!("{source} var Abc := Plus(1, 2.0);"))?.runtime_error()?;
    assert_eq!(error.message, "Operands must be two numbers, or two strings.");

    let error = run(&format!("{source} var Abc := Minus(1, 2.0);"))?.runtime_error()?;
    assert_eq!(error.message, "Operands must be numbers.");
    Ok(())
}

#[test]
fn string_concatenation_stringifies_the_other_side() -> Result<()> {
    let run = run("var Abc := 'Count: ' + Str(3); var Def := 'ab' + 1;")?;
    assert_eq!(run.global("Abc")?, Value::String("Count: 3".into()));
    assert_eq!(run.global("Def")?, Value::String("ab1".into()));
    Ok(())
}

#[test]
fn char_arithmetic_works_on_code_points() -> Result<()> {
    let run = run("var Abc := 'b' - 'a'; var Def := 'a' + 'a';")?;
    assert_eq!(run.global("Abc")?, Value::Integer(1));
    assert_eq!(run.global("Def")?, Value::Integer(194));
    Ok(())
}

#[test]
fn unary_minus_requires_a_number() -> Result<()> {
    let run_ok = run("var Abc := -5; var Def := -2.5;")?;
    assert_eq!(run_ok.global("Abc")?, Value::Integer(-5));
    assert_eq!(run_ok.global("Def")?, Value::Double(-2.5));

    let error = run("var Abc := -True;")?.runtime_error()?;
    assert_eq!(error.message, "Operand must be a number.");
    Ok(())
}

#[test]
fn logical_operators_return_an_operand() -> Result<()> {
    let run = run("var Abc := 0 or 5; var Def := 3 and 4; var Ghi := not 0;")?;
    assert_eq!(run.global("Abc")?, Value::Integer(5));
    assert_eq!(run.global("Def")?, Value::Integer(4));
    assert_eq!(run.global("Ghi")?, Value::Boolean(true));
    Ok(())
}

#[test]
fn for_loop_with_break() -> Result<()> {
    let run = run(
        r#"
var Total := 0;
for var I := 0; I < 10; I := I + 1 do
begin
  if I = 5 then break;
  Total := Total + I;
end
"#,
    )?;
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.global("Total")?, Value::Integer(10));
    assert!(run.interpreter.global("I").is_none());
    Ok(())
}

#[test]
fn while_loop_counts_down() -> Result<()> {
    let run = run(
        r#"
var Remaining := 3;
var Steps := 0;
while Remaining > 0 do
begin
  Remaining := Remaining - 1;
  Steps := Steps + 1;
end
"#,
    )?;
    assert_eq!(run.global("Remaining")?, Value::Integer(0));
    assert_eq!(run.global("Steps")?, Value::Integer(3));
    Ok(())
}

#[test]
fn case_picks_matching_arm() -> Result<()> {
    let source = |day: i64| {
        format!(
            r#"
var Abc := 0;
var Day := {day};
case Day of
  1, 2: Abc := 10;
  3: Abc := 30;
else Abc := 99;
end
"#
        )
    };

    assert_eq!(run(&source(2))?.global("Abc")?, Value::Integer(10));
    assert_eq!(run(&source(3))?.global("Abc")?, Value::Integer(30));
    assert_eq!(run(&source(7))?.global("Abc")?, Value::Integer(99));
    Ok(())
}

#[test]
fn closures_keep_their_environment() -> Result<()> {
    let run = run(
        r#"
function MakeCounter;
var Count := 0;
begin
  function Next;
  begin
    Count := Count + 1;
    exit Count;
  end
  exit Next;
end

var Counter := MakeCounter();
Counter();
var Abc := Counter();
var Other := MakeCounter();
var Def := Other();
"#,
    )?;
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.global("Abc")?, Value::Integer(2));
    assert_eq!(run.global("Def")?, Value::Integer(1));
    Ok(())
}

#[test]
fn functions_overload_on_parameter_types() -> Result<()> {
    let run = run(
        r#"
function Describe(value : Integer);
begin
  exit 'integer';
end

function Describe(value : String);
begin
  exit 'string';
end

var Abc := Describe(1);
var Def := Describe('text');
"#,
    )?;
    assert_eq!(run.global("Abc")?, Value::String("integer".into()));
    assert_eq!(run.global("Def")?, Value::String("string".into()));
    Ok(())
}

#[test]
fn no_overload_matches_argument_count() -> Result<()> {
    let error = run(
        r#"
function Two(a, b);
begin
  exit a;
end
Two(1);
"#,
    )?
    .runtime_error()?;
    assert_eq!(error.message, "No matching signature for function.");
    Ok(())
}

#[test]
fn block_variables_shadow_globals() -> Result<()> {
    let run = run(
        r#"
var Abc := 'global';
var Inner := '';
begin
  var Abc := 'block';
  Inner := Abc;
end
"#,
    )?;
    assert_eq!(run.global("Abc")?, Value::String("global".into()));
    assert_eq!(run.global("Inner")?, Value::String("block".into()));
    Ok(())
}

#[test]
fn redeclaring_a_global_fails() -> Result<()> {
    let error = run("var Abc := 1; var Abc := 2;")?.runtime_error()?;
    assert_eq!(error.message, "Variable already exists!");
    assert_eq!(error.token.lexeme, "Abc");
    Ok(())
}

#[test]
fn undefined_variable_is_reported_with_its_name() -> Result<()> {
    let error = run("var Abc := Missing;")?.runtime_error()?;
    assert_eq!(error.message, "Undefined variable 'Missing'.");
    assert_eq!(error.token.line, 1);
    Ok(())
}

#[test]
fn only_functions_and_classes_are_callable() -> Result<()> {
    let error = run("var Abc := 3; Abc();")?.runtime_error()?;
    assert_eq!(error.message, "Can only call functions and classes.");
    Ok(())
}

#[test]
fn string_subscript_yields_char() -> Result<()> {
    let run_ok = run("var S := 'hello'; var Abc := S[1];")?;
    assert_eq!(run_ok.global("Abc")?, Value::Char('e'));

    let error = run("var S := 'hello'; var Abc := S[9];")?.runtime_error()?;
    assert_eq!(error.message, "Index out of range.");

    let error = run("var N := 5; var Abc := N[0];")?.runtime_error()?;
    assert_eq!(error.message, "Subscript target should be an ordinal.");
    Ok(())
}

#[test]
fn top_level_exit_stops_execution_with_a_warning() -> Result<()> {
    let run = run("var Abc := 1; exit; Abc := 2;")?;
    assert!(matches!(run.result, Err(Signal::Exit(Value::Nil))));
    assert_eq!(run.global("Abc")?, Value::Integer(1));
    assert!(
        run.warnings
            .iter()
            .any(|message| message == "Can't return from top-level code."),
        "expected top-level exit warning, found {:?}",
        run.warnings
    );
    Ok(())
}

#[test]
fn print_writes_display_form() -> Result<()> {
    let run = run(
        r#"
print 'Hello';
print 42;
print 2.5;
print True;
print nil;
"#,
    )?;
    assert_eq!(run.output.contents(), "Hello\n42\n2.5\nTrue\nnil\n");
    Ok(())
}

#[test]
fn globals_persist_across_interpret_calls() -> Result<()> {
    let mut compiler = Compiler::new(CompileOptions::default());
    let mut interpreter = Interpreter::with_output(Box::new(OutputBuffer::new()));

    for line in ["var Abc := 40;", "Abc := Abc + 2;"] {
        let compilation = compiler.compile(&SourceFile::inline("REPL", line))?;
        interpreter.add_locals(compilation.locals);
        interpreter
            .interpret(&compilation.program.statements)
            .map_err(|signal| anyhow!("{signal}"))?;
    }

    assert_eq!(interpreter.global("Abc"), Some(Value::Integer(42)));
    assert!(interpreter.globals().contains("Abc"));
    assert!(interpreter.globals().enclosing().is_none());
    Ok(())
}
