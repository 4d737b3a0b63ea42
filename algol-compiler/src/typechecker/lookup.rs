use std::collections::{HashMap, HashSet};

pub const ANY: &str = "Any";

/// A stack of symbol → type-name scopes over a global bottom map.
#[derive(Debug, Default)]
pub struct ScopeStack {
    global: HashMap<String, String>,
    scopes: Vec<HashMap<String, String>>,
}

impl ScopeStack {
    /// Records a type in the innermost scope, or in the global map at top level.
    pub fn set(&mut self, symbol: impl Into<String>, type_name: impl Into<String>) {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => &mut self.global,
        };
        scope.insert(symbol.into(), type_name.into());
    }

    /// Searches innermost-first, then the global map.
    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(symbol))
            .or_else(|| self.global.get(symbol))
            .map(String::as_str)
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }
}

/// Type context threaded through one type-check run. The four stacks are always
/// pushed and popped together.
#[derive(Debug, Default)]
pub struct TypeLookup {
    pub declared: ScopeStack,
    pub inferred: ScopeStack,
    pub parents: ScopeStack,
    pub generics: ScopeStack,
    pub current_class: Option<String>,
}

impl TypeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_scope(&mut self) {
        self.declared.begin_scope();
        self.inferred.begin_scope();
        self.parents.begin_scope();
        self.generics.begin_scope();
    }

    pub fn end_scope(&mut self) {
        self.declared.end_scope();
        self.inferred.end_scope();
        self.parents.end_scope();
        self.generics.end_scope();
    }

    /// True when `actual` equals `expected` or reaches it through the parent-class
    /// chain. Type names compare case-insensitively.
    pub fn is_assignable(&self, expected: &str, actual: &str) -> bool {
        if expected.eq_ignore_ascii_case(actual) {
            return true;
        }

        let mut seen = HashSet::new();
        let mut parent = self.parents.get(actual);
        while let Some(name) = parent {
            if name.eq_ignore_ascii_case(expected) {
                return true;
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return false;
            }
            parent = self.parents.get(name);
        }
        false
    }
}

pub fn is_any(type_name: &str) -> bool {
    type_name.eq_ignore_ascii_case(ANY)
}
