use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, contents: String) -> Self {
        Self { id, path, contents }
    }

    /// Source that did not come from disk, such as a REPL line or a test snippet.
    pub fn inline(name: &str, contents: impl Into<String>) -> Self {
        Self::new(SourceId(0), PathBuf::from(name), contents.into())
    }

    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// Returns the text of a 1-based line, without its terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.contents.lines().nth(line - 1)
    }
}
