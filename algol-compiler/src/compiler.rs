use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use path_clean::PathClean;
use tracing::{debug, info_span};

use crate::ast::{NodeId, Program, Statement, UsesStatement};
use crate::diagnostics::Diagnostics;
use crate::lexer::{Lexer, Token};
use crate::parser::Parser;
use crate::resolver::{Resolver, ResolverOutput};
use crate::source::{SourceFile, SourceId};
use crate::typechecker::TypeChecker;

const UNIT_EXTENSION: &str = "pas";

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Print every scanned token to stdout.
    pub dump_tokens: bool,
    /// Stop at the first syntax error instead of synchronizing.
    pub strict: bool,
    pub check_types: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dump_tokens: false,
            strict: false,
            check_types: true,
        }
    }
}

pub struct Compilation {
    pub program: Program,
    pub locals: HashMap<NodeId, usize>,
}

/// Runs the front-end stages over a source file. One compiler can be fed several
/// sources (a REPL does this); node ids and included units carry over between them.
pub struct Compiler {
    diagnostics: Diagnostics,
    options: CompileOptions,
    next_node_id: usize,
    next_source_id: u32,
    included: HashSet<PathBuf>,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            options,
            next_node_id: 0,
            next_source_id: 1,
            included: HashSet::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }

    pub fn compile(&mut self, source: &SourceFile) -> Result<Compilation> {
        let _span = info_span!("compile", file = %source.name()).entered();

        self.included.insert(source.path.clean());
        let program = self.parse_source(source)?;

        let mut failed_units = false;
        let statements = self.expand_uses(program.statements, &source.path, &mut failed_units)?;
        if failed_units {
            bail!("Parsing failed");
        }
        let program = Program::new(statements);

        let mut resolver = Resolver::new();
        resolver.resolve_program(&program);
        let ResolverOutput {
            diagnostics: resolve_diagnostics,
            locals,
        } = resolver.into_parts();
        let resolve_errors = resolve_diagnostics.has_errors();
        self.diagnostics.extend(resolve_diagnostics);
        if resolve_errors {
            bail!("Name resolution failed");
        }

        if self.options.check_types {
            let mut type_checker = TypeChecker::new();
            type_checker.check_program(&program);
            let type_diagnostics = type_checker.into_diagnostics();
            let type_errors = type_diagnostics.has_errors();
            self.diagnostics.extend(type_diagnostics);
            if type_errors {
                bail!("Type checking failed");
            }
        }

        debug!(
            statements = program.statements.len(),
            locals = locals.len(),
            "compiled"
        );
        Ok(Compilation { program, locals })
    }

    fn parse_source(&mut self, source: &SourceFile) -> Result<Program> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        let lex_errors = lexer.diagnostics().has_errors();
        self.diagnostics.extend(lexer.into_diagnostics());

        if self.options.dump_tokens {
            for token in &tokens {
                println!("{token:?}");
            }
        }

        let mut parser =
            Parser::new(tokens, !self.options.strict).with_first_node_id(self.next_node_id);
        let parsed = parser.parse();
        self.next_node_id = parser.next_node_id();
        let parse_errors = parser.diagnostics().has_errors();
        self.diagnostics.extend(parser.into_diagnostics());

        match parsed {
            Ok(program) if !lex_errors && !parse_errors => Ok(program),
            _ => bail!("Parsing failed"),
        }
    }

    /// Replaces each `uses Name;` with the statements of `Name.pas` next to
    /// `including`. A unit already included by this compiler expands to nothing.
    fn expand_uses(
        &mut self,
        statements: Vec<Statement>,
        including: &Path,
        failed: &mut bool,
    ) -> Result<Vec<Statement>> {
        let mut expanded = Vec::with_capacity(statements.len());
        for statement in statements {
            match statement {
                Statement::Uses(uses) => {
                    expanded.extend(self.include_unit(&uses, including, failed)?);
                }
                other => expanded.push(other),
            }
        }
        Ok(expanded)
    }

    fn include_unit(
        &mut self,
        uses: &UsesStatement,
        including: &Path,
        failed: &mut bool,
    ) -> Result<Vec<Statement>> {
        let path = unit_path(including, &uses.unit);
        if !self.included.insert(path.clone()) {
            debug!(unit = %path.display(), "unit already included");
            return Ok(Vec::new());
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) => {
                debug!(unit = %path.display(), %error, "failed to read unit");
                self.diagnostics.push_token_error(
                    &uses.unit,
                    format!("Unable to read unit '{}'", uses.unit.lexeme),
                );
                *failed = true;
                return Ok(Vec::new());
            }
        };

        debug!(unit = %path.display(), "including unit");
        let source = SourceFile::new(SourceId(self.next_source_id), path.clone(), contents);
        self.next_source_id += 1;
        let program = self.parse_source(&source)?;
        self.expand_uses(program.statements, &path, failed)
    }
}

fn unit_path(including: &Path, unit: &Token) -> PathBuf {
    let directory = including.parent().unwrap_or_else(|| Path::new(""));
    directory
        .join(&unit.lexeme)
        .with_extension(UNIT_EXTENSION)
        .clean()
}
