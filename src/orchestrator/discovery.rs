use std::sync::Arc;

use crate::models::{AllowList, DiscoveredFile};
use crate::query::{EMPTY_DESCRIPTION, SourceClient};

/// Columns shown per file in the dataset block.
const DATASET_COLUMNS: usize = 5;

/// Columns shown per file in the schema block.
const SCHEMA_COLUMNS: usize = 10;

/// Everything the planner may know about the available files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    files: Vec<DiscoveredFile>,
    allow_list: AllowList,
}

impl Catalog {
    pub fn new(files: Vec<DiscoveredFile>) -> Self {
        let allow_list = AllowList::from_files(&files);
        Self { files, allow_list }
    }

    pub fn files(&self) -> &[DiscoveredFile] {
        &self.files
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// One line per file: description and leading columns.
    pub fn dataset_block(&self) -> String {
        self.files
            .iter()
            .map(|f| {
                let description = f.description.as_deref().unwrap_or(EMPTY_DESCRIPTION);
                if f.columns.is_empty() {
                    format!("- {} ({}): {}", f.path, f.source, description)
                } else {
                    let shown: Vec<&str> = f.columns.iter().take(DATASET_COLUMNS).map(String::as_str).collect();
                    format!("- {} ({}): {}; columns: {}", f.path, f.source, description, shown.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inferred columns of every file with at least two of them.
    pub fn schema_block(&self) -> String {
        self.files
            .iter()
            .filter(|f| f.columns.len() >= 2)
            .map(|f| {
                let shown: Vec<&str> = f.columns.iter().take(SCHEMA_COLUMNS).map(String::as_str).collect();
                format!("- {} ({}): columns = {}", f.path, f.source, shown.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The exact `(path, source)` pairs the planner may reference.
    pub fn files_block(&self) -> String {
        self.allow_list
            .entries()
            .iter()
            .map(|(path, source)| format!("- {path} ({source})"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Discovers files across all clients. A client that cannot list its
/// container is skipped with a warning.
pub fn discover(clients: &[Arc<dyn SourceClient>]) -> Catalog {
    let mut files = Vec::new();
    for client in clients {
        match client.discover() {
            Ok(found) => {
                tracing::debug!(source = %client.source(), container = client.container(), files = found.len(), "discovered");
                files.extend(found);
            }
            Err(e) => tracing::warn!(
                source = %client.source(),
                container = client.container(),
                error = %e,
                "discovery failed, source skipped"
            ),
        }
    }
    Catalog::new(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            DiscoveredFile::new("sales/orders.csv", Source::S3)
                .with_description(Some("Orders with totals".into()))
                .with_columns(
                    ["order_id", "customer_id", "total", "a", "b", "c"]
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                ),
            DiscoveredFile::new("crm.blob/notes.txt", Source::Azure),
        ])
    }

    #[test]
    fn dataset_block_lists_descriptions_and_five_columns() {
        let block = catalog().dataset_block();
        assert_eq!(
            block,
            "- sales/orders.csv (s3): Orders with totals; columns: order_id, customer_id, total, a, b\n\
             - crm.blob/notes.txt (azure): (empty)"
        );
    }

    #[test]
    fn schema_block_skips_files_without_columns() {
        let block = catalog().schema_block();
        assert_eq!(
            block,
            "- sales/orders.csv (s3): columns = order_id, customer_id, total, a, b, c"
        );
    }

    #[test]
    fn files_block_matches_allow_list() {
        let catalog = catalog();
        assert_eq!(
            catalog.files_block(),
            "- sales/orders.csv (s3)\n- crm.blob/notes.txt (azure)"
        );
        assert!(catalog.allow_list().contains("crm.blob/notes.txt", Source::Azure));
    }
}
