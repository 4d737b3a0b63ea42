use anyhow::{anyhow, Result};

use algol_compiler::runtime::{Interpreter, OutputBuffer, TestOutcome, TestStatus};
use algol_compiler::{CompileOptions, Compiler, SourceFile};

const SUITE: &str = r#"
var Calls := 0;

function TestPasses;
begin
  Calls := Calls + 1;
  AssertEqual(2, 1 + 1);
end

function TestFails;
begin
  AssertTrue(False);
end

function Helper;
begin
  Calls := Calls + 100;
end

function TestWithArgument(X);
begin
end
"#;

fn run_tests(source: &str, filter: Option<&str>) -> Result<(Interpreter, Vec<TestOutcome>)> {
    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler
        .compile(&SourceFile::inline("suite.pas", source))
        .map_err(|error| anyhow!("{error}: {:?}", compiler.diagnostics().entries()))?;
    let mut interpreter = Interpreter::with_output(Box::new(OutputBuffer::new()));
    interpreter.add_locals(compilation.locals);
    let outcomes = interpreter
        .run_tests(&compilation.program.statements, filter)
        .map_err(|signal| anyhow!("suite failed before tests ran: {signal}"))?;
    Ok((interpreter, outcomes))
}

#[test]
fn runs_parameterless_test_functions_in_order() -> Result<()> {
    let (interpreter, outcomes) = run_tests(SUITE, None)?;

    let names: Vec<_> = outcomes.iter().map(|outcome| outcome.name.as_str()).collect();
    assert_eq!(names, ["TestPasses", "TestFails"]);

    assert_eq!(outcomes[0].status, TestStatus::Passed);
    assert_eq!(
        outcomes[1].status,
        TestStatus::Failed {
            message: "Assertion 'left = right' failed.".into()
        }
    );
    assert_eq!(outcomes[1].span.line, 10);
    assert_eq!(
        interpreter.global("Calls"),
        Some(algol_compiler::runtime::Value::Integer(1))
    );
    Ok(())
}

#[test]
fn filter_matches_names_case_insensitively() -> Result<()> {
    let (_, outcomes) = run_tests(SUITE, Some("PASS"))?;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].name, "TestPasses");
    Ok(())
}

#[test]
fn overloads_taking_parameters_are_skipped() -> Result<()> {
    let source = r#"
function TestTwice;
begin
end

function TestTwice(X);
begin
end
"#;
    let (_, outcomes) = run_tests(source, None)?;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, TestStatus::Passed);
    Ok(())
}
