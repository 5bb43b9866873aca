//! Documents on disk: identity, language, and text snapshots.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Opaque identity used to re-associate results with a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(PathBuf);

impl DocumentId {
    /// Build an identity from a path, made absolute against the current directory.
    pub fn from_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self(absolute)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Other,
}

impl Language {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py" | "pyi") => Language::Python,
            _ => Language::Other,
        }
    }
}

/// Snapshot of a document's text at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub language: Language,
    pub text: String,
}

impl Document {
    pub fn new(id: DocumentId, text: impl Into<String>) -> Self {
        let language = Language::from_path(id.path());
        Self {
            id,
            language,
            text: text.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        debug!(path = %path.display(), bytes = text.len(), "loaded document");
        Ok(Self::new(DocumentId::from_path(path), text))
    }

    pub fn is_python(&self) -> bool {
        self.language == Language::Python
    }
}

/// Present repaired text as a new document.
///
/// Without an output path the text goes to stdout. The source document itself
/// is never overwritten.
pub fn write_fixed_document(source: &DocumentId, output: Option<&Path>, text: &str) -> Result<()> {
    let mut payload = text.to_string();
    if !payload.ends_with('\n') {
        payload.push('\n');
    }

    let Some(output) = output else {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(payload.as_bytes())
            .context("write fixed document to stdout")?;
        return stdout.flush().context("flush stdout");
    };

    if is_same_file(source.path(), output) {
        bail!(
            "refusing to overwrite the source document {}",
            output.display()
        );
    }
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    fs::write(output, payload).with_context(|| format!("write {}", output.display()))
}

/// Whether `output` names the same file as `source` once `..` components and
/// symlinks are resolved. `output` may not exist yet.
fn is_same_file(source: &Path, output: &Path) -> bool {
    let Ok(source) = fs::canonicalize(source) else {
        return DocumentId::from_path(output).path() == source;
    };
    let resolved = fs::canonicalize(output).ok().or_else(|| {
        let name = output.file_name()?;
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::canonicalize(parent).ok().map(|dir| dir.join(name))
    });
    resolved.is_some_and(|resolved| resolved == source)
}
