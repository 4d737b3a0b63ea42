use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use algol_compiler::runtime::{Interpreter, RuntimeError, Signal, TestStatus};
use algol_compiler::{
    CompileOptions, Compiler, Diagnostic, DiagnosticLevel, Lexer, SourceFile, SourceId, TokenKind,
};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use pathdiff::diff_paths;
use serde_json::json;
use tracing::{debug, Level};

const EXIT_FAILURE: u8 = 1;
const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;

const RUN_AFTER_HELP: &str = "\
Subcommands:
  algol test [PATH]...     Run every Test* procedure in the given .pas files.

Without an input file an interactive prompt is started.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Ast,
    TokensJson,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum DiagnosticFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "algol",
    version,
    about = "Run Pascal-flavored algol source files.",
    after_help = RUN_AFTER_HELP
)]
struct RunCli {
    /// Path to a source file. Starts a REPL when omitted.
    input: Option<PathBuf>,

    /// Dump the token stream produced by the scanner.
    #[arg(long)]
    dump_tokens: bool,

    /// Emit additional compiler output (`ast`, `tokens-json`).
    #[arg(long, value_enum)]
    emit: Vec<Emit>,

    /// Stop at the first syntax error instead of recovering.
    #[arg(long)]
    strict: bool,

    /// Skip the static type check.
    #[arg(long)]
    no_typecheck: bool,

    /// How diagnostics are written to stderr.
    #[arg(long, value_enum, default_value_t = DiagnosticFormat::Text)]
    diagnostics: DiagnosticFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Parser)]
#[command(
    name = "algol test",
    version,
    about = "Run Test* procedures found in algol source files."
)]
struct TestCli {
    /// Files or directories to search for `.pas` files (defaults to the current directory).
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Only run tests whose names contain this substring (case-insensitive).
    #[arg(long, value_name = "FILTER")]
    filter: Option<String>,

    /// Stop after the first test failure.
    #[arg(long)]
    fail_fast: bool,

    /// How diagnostics are written to stderr.
    #[arg(long, value_enum, default_value_t = DiagnosticFormat::Text)]
    diagnostics: DiagnosticFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let result = dispatch(env::args_os().collect());
    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn dispatch(mut raw: Vec<OsString>) -> Result<ExitCode> {
    if raw.get(1).is_some_and(|arg| arg == "test") {
        raw.remove(1);
        let cli = TestCli::parse_from(raw);
        init_tracing(cli.verbose);
        return run_tests(&cli);
    }
    if raw.get(1).is_some_and(|arg| arg == "run") {
        raw.remove(1);
    }

    let cli = RunCli::parse_from(raw);
    init_tracing(cli.verbose);
    match &cli.input {
        Some(input) => run_file(&cli, input),
        None => run_repl(&cli),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn compile_options(cli: &RunCli) -> CompileOptions {
    CompileOptions {
        dump_tokens: cli.dump_tokens,
        strict: cli.strict,
        check_types: !cli.no_typecheck,
    }
}

fn run_file(cli: &RunCli, input: &Path) -> Result<ExitCode> {
    let contents =
        fs::read_to_string(input).with_context(|| format!("Failed to read {:?}", input))?;
    let source = SourceFile::new(SourceId(0), input.to_path_buf(), contents);

    if cli.emit.contains(&Emit::TokensJson) {
        print_tokens_json(&source)?;
    }

    let mut compiler = Compiler::new(compile_options(cli));
    let compilation = match compiler.compile(&source) {
        Ok(compilation) => compilation,
        Err(error) => {
            debug!(%error, "compilation failed");
            report_diagnostics(&source, compiler.diagnostics().entries(), cli.diagnostics);
            return Ok(ExitCode::from(EXIT_COMPILE_ERROR));
        }
    };
    report_diagnostics(&source, compiler.diagnostics().entries(), cli.diagnostics);

    if cli.emit.contains(&Emit::Ast) {
        println!("{:#?}", compilation.program);
    }

    let mut interpreter = Interpreter::new();
    interpreter.add_locals(compilation.locals);
    match interpreter.interpret(&compilation.program.statements) {
        Ok(()) | Err(Signal::Exit(_)) | Err(Signal::Break) => Ok(ExitCode::SUCCESS),
        Err(Signal::Error(error)) => {
            report_runtime_error(&source, &error, cli.diagnostics);
            Ok(ExitCode::from(EXIT_RUNTIME_ERROR))
        }
    }
}

fn run_repl(cli: &RunCli) -> Result<ExitCode> {
    let mut compiler = Compiler::new(compile_options(cli));
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush prompt")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let source = SourceFile::inline("REPL", line);
        compiler.clear_diagnostics();
        let compilation = match compiler.compile(&source) {
            Ok(compilation) => compilation,
            Err(_) => {
                report_diagnostics(&source, compiler.diagnostics().entries(), cli.diagnostics);
                continue;
            }
        };
        report_diagnostics(&source, compiler.diagnostics().entries(), cli.diagnostics);

        interpreter.add_locals(compilation.locals);
        match interpreter.interpret(&compilation.program.statements) {
            Ok(()) | Err(Signal::Break) => {}
            Err(Signal::Exit(_)) => break,
            Err(Signal::Error(error)) => report_runtime_error(&source, &error, cli.diagnostics),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_tests(cli: &TestCli) -> Result<ExitCode> {
    let inputs = if cli.inputs.is_empty() {
        vec![env::current_dir().context("failed to determine current directory")?]
    } else {
        cli.inputs.clone()
    };

    let mut files = BTreeSet::new();
    for input in &inputs {
        collect_source_files(input, &mut files)?;
    }

    if files.is_empty() {
        println!("no test files found");
        return Ok(ExitCode::SUCCESS);
    }

    let mut passed = 0usize;
    let mut failed = 0usize;

    'files: for path in files {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let source = SourceFile::new(SourceId(0), path.clone(), contents);
        println!("{}", display_path(&path));

        let mut compiler = Compiler::new(CompileOptions::default());
        let compilation = match compiler.compile(&source) {
            Ok(compilation) => compilation,
            Err(_) => {
                report_diagnostics(&source, compiler.diagnostics().entries(), cli.diagnostics);
                failed += 1;
                if cli.fail_fast {
                    break;
                }
                continue;
            }
        };

        let mut interpreter = Interpreter::new();
        interpreter.add_locals(compilation.locals);
        let outcomes = match interpreter
            .run_tests(&compilation.program.statements, cli.filter.as_deref())
        {
            Ok(outcomes) => outcomes,
            Err(Signal::Error(error)) => {
                report_runtime_error(&source, &error, cli.diagnostics);
                failed += 1;
                if cli.fail_fast {
                    break;
                }
                continue;
            }
            Err(Signal::Exit(_)) | Err(Signal::Break) => Vec::new(),
        };

        for outcome in outcomes {
            let dots = ".".repeat(55usize.saturating_sub(outcome.name.chars().count()));
            match outcome.status {
                TestStatus::Passed => {
                    passed += 1;
                    println!("  Test: {} {} [ PASS ]", outcome.name, dots);
                }
                TestStatus::Failed { message } => {
                    failed += 1;
                    println!("  Test: {} {} [ FAIL ]", outcome.name, dots);
                    println!("    {message}");
                    if cli.fail_fast {
                        break 'files;
                    }
                }
            }
        }
    }

    println!();
    println!("{passed} passed, {failed} failed");
    if failed > 0 {
        return Ok(ExitCode::from(EXIT_FAILURE));
    }
    Ok(ExitCode::SUCCESS)
}

fn collect_source_files(path: &PathBuf, targets: &mut BTreeSet<PathBuf>) -> Result<()> {
    let metadata = fs::metadata(path).with_context(|| format!("Failed to access {:?}", path))?;

    if metadata.is_dir() {
        let mut child_paths = Vec::new();
        for entry in
            fs::read_dir(path).with_context(|| format!("Failed to read directory {:?}", path))?
        {
            let entry =
                entry.with_context(|| format!("Failed to access entry within {:?}", path))?;
            child_paths.push(entry.path());
        }
        child_paths.sort();
        for child in child_paths {
            collect_source_files(&child, targets)?;
        }
    } else if metadata.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("pas") {
        targets.insert(path.clone());
    }

    Ok(())
}

fn display_path(path: &Path) -> String {
    env::current_dir()
        .ok()
        .and_then(|cwd| diff_paths(path, cwd))
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

fn print_tokens_json(source: &SourceFile) -> Result<()> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer
        .tokenize()
        .into_iter()
        .map(|token| {
            let kind = match &token.kind {
                TokenKind::Keyword(keyword) => format!("{keyword:?}"),
                TokenKind::IntegerLiteral(_) => "IntegerLiteral".to_string(),
                TokenKind::FloatLiteral(_) => "FloatLiteral".to_string(),
                TokenKind::StringLiteral(_) => "StringLiteral".to_string(),
                TokenKind::CharLiteral(_) => "CharLiteral".to_string(),
                other => format!("{other:?}"),
            };
            json!({
                "kind": kind,
                "lexeme": token.lexeme,
                "line": token.line,
                "column": token.column,
            })
        })
        .collect::<Vec<_>>();
    let rendered = serde_json::to_string_pretty(&tokens).context("failed to encode tokens")?;
    println!("{rendered}");
    Ok(())
}

fn report_diagnostics(source: &SourceFile, diagnostics: &[Diagnostic], format: DiagnosticFormat) {
    for diagnostic in diagnostics {
        match format {
            DiagnosticFormat::Text => print_diagnostic(source, diagnostic),
            DiagnosticFormat::Json => match serde_json::to_string(diagnostic) {
                Ok(line) => eprintln!("{line}"),
                Err(error) => eprintln!("error: failed to encode diagnostic: {error}"),
            },
        }
    }
}

fn report_runtime_error(source: &SourceFile, error: &RuntimeError, format: DiagnosticFormat) {
    let diagnostic = Diagnostic {
        message: error.message.clone(),
        level: DiagnosticLevel::Error,
        span: Some(error.token.span()),
        file: Some(error.token.file.to_string()),
    };
    match format {
        DiagnosticFormat::Text => print_diagnostic(source, &diagnostic),
        DiagnosticFormat::Json => eprintln!(
            "{}",
            json!({
                "kind": "runtime",
                "message": diagnostic.message,
                "level": diagnostic.level,
                "span": diagnostic.span,
                "file": diagnostic.file,
            })
        ),
    }
}

/// The text of `line` in the file a diagnostic points into. Units pulled in by
/// `uses` are read back from disk.
fn line_text(source: &SourceFile, file: Option<&str>, line: usize) -> Option<String> {
    match file {
        Some(file) if file != source.name() => fs::read_to_string(file)
            .ok()
            .and_then(|contents| contents.lines().nth(line.checked_sub(1)?).map(str::to_string)),
        _ => source.line(line).map(str::to_string),
    }
}

fn print_diagnostic(source: &SourceFile, diagnostic: &Diagnostic) {
    let (level_label, level_marker) = match diagnostic.level {
        DiagnosticLevel::Error => ("error", "  -"),
        DiagnosticLevel::Warning => ("warning", "  ~"),
    };
    eprintln!("{} {}: {}", level_marker, level_label, diagnostic.message);
    let Some(span) = diagnostic.span else {
        return;
    };

    let file = diagnostic.file.clone().unwrap_or_else(|| source.name());
    eprintln!("     --> {}:{}:{}", display_path(Path::new(&file)), span.line, span.column);

    let Some(raw_line) = line_text(source, diagnostic.file.as_deref(), span.line) else {
        return;
    };
    let display_line = raw_line.replace('\t', "    ");
    eprintln!("      {}", display_line);

    let mut caret_line = String::from("      ");
    for (index, ch) in raw_line.chars().enumerate() {
        if index + 1 >= span.column {
            break;
        }
        match ch {
            '\t' => caret_line.push_str("    "),
            _ => caret_line.push(' '),
        }
    }

    let highlight_len = if span.end_line == span.line {
        span.end_column.saturating_sub(span.column).saturating_add(1)
    } else {
        1
    };
    caret_line.push_str(&"^".repeat(highlight_len.max(1)));
    eprintln!("{}", caret_line);
}
