use anyhow::{anyhow, Result};

use algol_compiler::runtime::{Interpreter, OutputBuffer, Signal, Value, NATIVES};
use algol_compiler::{CompileOptions, Compiler, SourceFile};

struct Run {
    interpreter: Interpreter,
    output: OutputBuffer,
}

impl Run {
    fn global(&self, name: &str) -> Result<Value> {
        self.interpreter
            .global(name)
            .ok_or_else(|| anyhow!("global '{name}' is not defined"))
    }
}

fn execute(source: &str) -> Result<(Run, Result<(), Signal>)> {
    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler
        .compile(&SourceFile::inline("natives.pas", source))
        .map_err(|error| anyhow!("{error}: {:?}", compiler.diagnostics().entries()))?;
    let output = OutputBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(output.clone()));
    interpreter.add_locals(compilation.locals);
    let result = interpreter.interpret(&compilation.program.statements);
    Ok((
        Run {
            interpreter,
            output,
        },
        result,
    ))
}

fn run(source: &str) -> Result<Run> {
    let (run, result) = execute(source)?;
    result.map_err(|signal| anyhow!("program failed: {signal}"))?;
    Ok(run)
}

fn error_message(source: &str) -> Result<String> {
    match execute(source)?.1 {
        Err(Signal::Error(error)) => Ok(error.message),
        other => Err(anyhow!("expected a runtime error, got {other:?}")),
    }
}

#[test]
fn every_native_is_bound_in_globals() {
    let interpreter = Interpreter::with_output(Box::new(OutputBuffer::new()));
    for spec in NATIVES {
        match interpreter.global(spec.name) {
            Some(Value::Native(native)) => {
                assert_eq!(native.arity, spec.arity, "arity of {}", spec.name);
            }
            other => panic!("expected native '{}', found {other:?}", spec.name),
        }
    }
}

#[test]
fn write_and_writeln_go_to_the_output() -> Result<()> {
    let run = run("Write('a'); Write('bc'); WriteLn(1); WriteLn(True);")?;
    assert_eq!(run.output.contents(), "abc1\nTrue\n");
    Ok(())
}

#[test]
fn str_formats_values() -> Result<()> {
    let run = run("var Abc := Str(12); var Def := Str(True); var Ghi := Str(nil);")?;
    assert_eq!(run.global("Abc")?, Value::String("12".into()));
    assert_eq!(run.global("Def")?, Value::String("True".into()));
    assert_eq!(run.global("Ghi")?, Value::String("nil".into()));
    Ok(())
}

#[test]
fn ord_covers_ordinal_values() -> Result<()> {
    let run = run(
        r#"
var FromChar := Ord('A');
var FromBool := Ord(True);
var FromNil := Ord(nil);
var FromText := Ord('42');
var FromDouble := Ord(3.9);
"#,
    )?;
    assert_eq!(run.global("FromChar")?, Value::Integer(65));
    assert_eq!(run.global("FromBool")?, Value::Integer(1));
    assert_eq!(run.global("FromNil")?, Value::Integer(-1));
    assert_eq!(run.global("FromText")?, Value::Integer(42));
    assert_eq!(run.global("FromDouble")?, Value::Integer(3));

    assert_eq!(
        error_message("var Abc := Ord(List());")?,
        "Can't take the ordinal of a List."
    );
    Ok(())
}

#[test]
fn copy_takes_a_char_range() -> Result<()> {
    let run = run("var Abc := Copy('Hello', 1, 3);")?;
    assert_eq!(run.global("Abc")?, Value::String("el".into()));

    assert_eq!(
        error_message("var Abc := Copy('Hi', 0, 5);")?,
        "Index out of range."
    );
    assert_eq!(
        error_message("var Abc := Copy(5, 0, 1);")?,
        "Copy expects a string."
    );
    Ok(())
}

#[test]
fn length_of_strings_and_containers() -> Result<()> {
    let run = run("var L := List(); L.Add(1); var Abc := Length('abc'); var Def := Length(L);")?;
    assert_eq!(run.global("Abc")?, Value::Integer(3));
    assert_eq!(run.global("Def")?, Value::Integer(1));

    assert_eq!(
        error_message("var Abc := Length(5);")?,
        "Can't take the length of a Integer."
    );
    Ok(())
}

#[test]
fn native_arity_is_checked() -> Result<()> {
    assert_eq!(
        error_message("var Abc := Str(1, 2);")?,
        "Expected 1 arguments but got 2."
    );
    Ok(())
}

#[test]
fn clock_returns_seconds() -> Result<()> {
    let run = run("var Now := clock();")?;
    match run.global("Now")? {
        Value::Double(seconds) => assert!(seconds > 0.0),
        other => panic!("expected a Double, got {other:?}"),
    }
    Ok(())
}

#[test]
fn list_supports_add_get_and_subscript() -> Result<()> {
    let run = run(
        r#"
var L := List();
L.Add(1);
L.Add(2);
var Size := L.Length;
var First := L.Get(0);
var Second := L[1];
var Shown := Str(L);
"#,
    )?;
    assert_eq!(run.global("Size")?, Value::Integer(2));
    assert_eq!(run.global("First")?, Value::Integer(1));
    assert_eq!(run.global("Second")?, Value::Integer(2));
    assert_eq!(run.global("Shown")?, Value::String("[1, 2]".into()));
    Ok(())
}

#[test]
fn array_has_fixed_size() -> Result<()> {
    let run = run(
        r#"
var A := Array(3);
A.Set(0, 'x');
var First := A.Get(0);
var Last := A.Get(2);
var Size := Length(A);
"#,
    )?;
    assert_eq!(run.global("First")?, Value::Char('x'));
    assert_eq!(run.global("Last")?, Value::Nil);
    assert_eq!(run.global("Size")?, Value::Integer(3));

    assert_eq!(
        error_message("var A := Array(2); var Abc := A.Get(5);")?,
        "Index out of range."
    );
    Ok(())
}

#[test]
fn oversized_array_is_a_runtime_error() -> Result<()> {
    assert_eq!(
        error_message("var A := Array(4611686018427387904);")?,
        "Array size out of range."
    );
    assert_eq!(error_message("var A := Array(-1);")?, "Index out of range.");
    Ok(())
}

#[test]
fn map_literal_and_methods() -> Result<()> {
    let run = run(
        r#"
var M := ['one': 1, 'two': 2];
M.Put('three', 3);
M.Put('one', 10);
var Has := M.Contains('three');
var One := M.Get('one');
var Missing := M.Get('zzz');
var Size := Length(M);
var Shown := Str(M);
"#,
    )?;
    assert_eq!(run.global("Has")?, Value::Boolean(true));
    assert_eq!(run.global("One")?, Value::Integer(10));
    assert_eq!(run.global("Missing")?, Value::Nil);
    assert_eq!(run.global("Size")?, Value::Integer(3));
    assert_eq!(
        run.global("Shown")?,
        Value::String("{one: 10, two: 2, three: 3}".into())
    );
    Ok(())
}

#[test]
fn stack_is_last_in_first_out() -> Result<()> {
    let run = run(
        r#"
var S := Stack();
S.Push(1);
S.Push(2);
var Top := S.Peek();
var Popped := S.Pop();
var Remaining := S.Length;
var Empty := S.IsEmpty();
"#,
    )?;
    assert_eq!(run.global("Top")?, Value::Integer(2));
    assert_eq!(run.global("Popped")?, Value::Integer(2));
    assert_eq!(run.global("Remaining")?, Value::Integer(1));
    assert_eq!(run.global("Empty")?, Value::Boolean(false));

    assert_eq!(
        error_message("var S := Stack(); S.Pop();")?,
        "Stack is empty."
    );
    Ok(())
}

#[test]
fn containers_reject_new_properties() -> Result<()> {
    assert_eq!(
        error_message("var L := List(); L.Size := 3;")?,
        "Can't add properties to lists."
    );
    assert_eq!(
        error_message("var L := List(); var Abc := L.Missing;")?,
        "Undefined property 'Missing'."
    );
    Ok(())
}

#[test]
fn assertions_fail_with_operands_in_message() -> Result<()> {
    run("AssertTrue(1 = 1); AssertEqual('a', 'a');")?;

    assert_eq!(
        error_message("AssertEqual(1, 2);")?,
        "Assertion 'left = right' failed. Expected '1' but got '2'."
    );
    assert_eq!(
        error_message("AssertTrue(False);")?,
        "Assertion 'left = right' failed."
    );
    Ok(())
}
