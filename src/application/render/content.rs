//! Sources for the markdown of shared page components (header, footer).

use std::{collections::HashMap, fs, io, path::PathBuf};

/// Component rendered above every full page.
pub const HEADER_COMPONENT: &str = "header";
/// Component rendered below every full page.
pub const FOOTER_COMPONENT: &str = "footer";

/// Looks up component markdown by logical name.
///
/// `Ok(None)` means the component does not exist, which callers treat as an
/// empty fragment. `Err` is reserved for sources that exist but cannot be read.
pub trait ContentSource: Send + Sync {
    fn load_component(&self, name: &str) -> io::Result<Option<String>>;
}

/// Reads `{root}/{name}.md` from disk on every lookup.
#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn component_path(&self, name: &str) -> Option<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        valid.then(|| self.root.join(format!("{name}.md")))
    }
}

impl ContentSource for FsContentSource {
    fn load_component(&self, name: &str) -> io::Result<Option<String>> {
        let Some(path) = self.component_path(name) else {
            return Ok(None);
        };

        match fs::read_to_string(&path) {
            Ok(markdown) => Ok(Some(markdown)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// In-memory components, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentSource {
    components: HashMap<String, String>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, name: impl Into<String>, markdown: impl Into<String>) -> Self {
        self.components.insert(name.into(), markdown.into());
        self
    }
}

impl ContentSource for MemoryContentSource {
    fn load_component(&self, name: &str) -> io::Result<Option<String>> {
        Ok(self.components.get(name).cloned())
    }
}
