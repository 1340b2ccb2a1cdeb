use super::Source;

/// A dataset seen during one discovery pass.
///
/// Never persisted; the orchestrator drops these once the request returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Fully-qualified `{container}/{key}`.
    pub path: String,
    /// Backend the file was listed from.
    pub source: Source,
    /// Cached side-car description, if one exists and is non-empty.
    pub description: Option<String>,
    /// Inferred column names; empty when the preview was not tabular.
    pub columns: Vec<String>,
}

impl DiscoveredFile {
    pub fn new(path: impl Into<String>, source: Source) -> Self {
        Self {
            path: path.into(),
            source,
            description: None,
            columns: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Object key portion of `path`.
    pub fn key(&self) -> &str {
        self.path
            .split_once('/')
            .map(|(_, key)| key)
            .unwrap_or(&self.path)
    }
}
