use anyhow::{anyhow, Result};

use algol_compiler::runtime::{Interpreter, OutputBuffer, Signal, Value};
use algol_compiler::{CompileOptions, Compiler, SourceFile};

fn run(source: &str) -> Result<(Interpreter, Result<(), Signal>)> {
    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler
        .compile(&SourceFile::inline("exceptions.pas", source))
        .map_err(|error| anyhow!("{error}: {:?}", compiler.diagnostics().entries()))?;
    let mut interpreter = Interpreter::with_output(Box::new(OutputBuffer::new()));
    interpreter.add_locals(compilation.locals);
    let result = interpreter.interpret(&compilation.program.statements);
    Ok((interpreter, result))
}

fn caught(source: &str) -> Result<Value> {
    let (interpreter, result) = run(source)?;
    result.map_err(|signal| anyhow!("program failed: {signal}"))?;
    interpreter
        .global("Caught")
        .ok_or_else(|| anyhow!("global 'Caught' is not defined"))
}

#[test]
fn typed_handler_catches_raised_string() -> Result<()> {
    let (interpreter, result) = run(
        r#"
var Abc := False;
var Seen := '';
try
  raise 'Hello';
except
  on e : String do
  begin
    Abc := True;
    Seen := e;
  end
end
"#,
    )?;
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(interpreter.global("Abc"), Some(Value::Boolean(true)));
    assert_eq!(interpreter.global("Seen"), Some(Value::String("Hello".into())));
    assert!(interpreter.global("e").is_none());
    Ok(())
}

#[test]
fn handler_matches_ancestor_class() -> Result<()> {
    let source = r#"
class Problem;
begin
end

class NotFound(Problem);
begin
end

var Caught := '';
try
  raise NotFound();
except
  on e : String do Caught := 'string';
  on e : Problem do Caught := 'problem';
end
"#;
    assert_eq!(caught(source)?, Value::String("problem".into()));
    Ok(())
}

#[test]
fn exact_type_wins_over_ancestor() -> Result<()> {
    let source = r#"
class Problem;
begin
end

class NotFound(Problem);
begin
end

var Caught := '';
try
  raise NotFound();
except
  on e : Problem do Caught := 'problem';
  on e : NotFound do Caught := 'not found';
end
"#;
    assert_eq!(caught(source)?, Value::String("not found".into()));
    Ok(())
}

#[test]
fn runtime_errors_are_caught_as_their_message() -> Result<()> {
    let source = r#"
var Caught := '';
try
  var X := 1 / 0;
except
  on e do Caught := e;
end
"#;
    assert_eq!(caught(source)?, Value::String("Division by zero.".into()));
    Ok(())
}

#[test]
fn unmatched_error_runs_default_block() -> Result<()> {
    let source = r#"
var Caught := '';
try
  raise 42;
except
  on e : String do Caught := 'string';
  Caught := 'default';
end
"#;
    assert_eq!(caught(source)?, Value::String("default".into()));
    Ok(())
}

#[test]
fn raise_propagates_out_of_calls() -> Result<()> {
    let source = r#"
procedure Fail;
begin
  raise 'inner';
end

var Caught := '';
try
  Fail();
except
  on e do Caught := e;
end
"#;
    assert_eq!(caught(source)?, Value::String("inner".into()));
    Ok(())
}

#[test]
fn bare_raise_carries_generic_message() -> Result<()> {
    let source = r#"
var Caught := '';
try
  raise;
except
  on e do Caught := e;
end
"#;
    assert_eq!(caught(source)?, Value::String("Exception".into()));
    Ok(())
}

#[test]
fn body_without_error_skips_handlers() -> Result<()> {
    let source = r#"
var Caught := 0;
try
  Caught := 1;
except
  on e do Caught := 2;
  Caught := 3;
end
"#;
    assert_eq!(caught(source)?, Value::Integer(1));
    Ok(())
}

#[test]
fn exit_passes_through_try() -> Result<()> {
    let source = r#"
function Pick;
begin
  try
    exit 5;
  except
    exit 6;
  end
end

var Caught := Pick();
"#;
    assert_eq!(caught(source)?, Value::Integer(5));
    Ok(())
}

#[test]
fn uncaught_raise_reaches_the_caller() -> Result<()> {
    let (_, result) = run("raise 'boom';")?;
    match result {
        Err(Signal::Error(error)) => {
            assert_eq!(error.message, "boom");
            assert_eq!(error.value, Some(Value::String("boom".into())));
            assert_eq!(error.token.lexeme, "raise");
        }
        other => panic!("expected an uncaught error, got {other:?}"),
    }
    Ok(())
}
