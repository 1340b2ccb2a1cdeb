use std::fmt;

use super::{DiscoveredFile, Source};

/// Where a plan step is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTarget {
    /// A file confirmed against the allow-list.
    Dataset { path: String, source: Source },
    /// The planner named no usable dataset or source. Executed as an inline
    /// error result without aborting the remaining steps.
    Unusable { reason: String },
}

/// One validated plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub target: StepTarget,
    pub sub_question: String,
}

impl Step {
    pub fn dataset(path: impl Into<String>, source: Source, sub_question: impl Into<String>) -> Self {
        Self {
            target: StepTarget::Dataset {
                path: path.into(),
                source,
            },
            sub_question: sub_question.into(),
        }
    }

    pub fn unusable(reason: impl Into<String>, sub_question: impl Into<String>) -> Self {
        Self {
            target: StepTarget::Unusable {
                reason: reason.into(),
            },
            sub_question: sub_question.into(),
        }
    }

    /// Source of the step, if it has a usable target.
    pub fn source(&self) -> Option<Source> {
        match &self.target {
            StepTarget::Dataset { source, .. } => Some(*source),
            StepTarget::Unusable { .. } => None,
        }
    }
}

/// Ordered steps produced for one user question. Never reused across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// An empty plan means the planner found no relevant data.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match &step.target {
                StepTarget::Dataset { path, source } => {
                    writeln!(f, "{}. [{}] {}: {}", i + 1, source, path, step.sub_question)?
                }
                StepTarget::Unusable { reason } => {
                    writeln!(f, "{}. [skipped: {}] {}", i + 1, reason, step.sub_question)?
                }
            }
        }
        Ok(())
    }
}

/// The `(path, source)` pairs the planner may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<(String, Source)>,
}

impl AllowList {
    pub fn from_files(files: &[DiscoveredFile]) -> Self {
        Self {
            entries: files.iter().map(|f| (f.path.clone(), f.source)).collect(),
        }
    }

    pub fn entries(&self) -> &[(String, Source)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str, source: Source) -> bool {
        self.entries.iter().any(|(p, s)| p == path && *s == source)
    }

    /// Resolves a planner-supplied dataset name to a listed `(path, source)`.
    ///
    /// The name may be the fully-qualified path or the bare object key. When
    /// several entries match, the one owned by `declared` wins; otherwise the
    /// first listed entry is returned. `None` means the dataset is not listed.
    pub fn resolve(&self, dataset: &str, declared: Option<Source>) -> Option<(String, Source)> {
        let dataset = dataset.trim();
        let candidates: Vec<&(String, Source)> = self
            .entries
            .iter()
            .filter(|(path, _)| {
                path == dataset || path.split_once('/').is_some_and(|(_, key)| key == dataset)
            })
            .collect();

        candidates
            .iter()
            .find(|(_, source)| Some(*source) == declared)
            .or_else(|| candidates.first())
            .map(|(path, source)| (path.clone(), *source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow_list() -> AllowList {
        AllowList::from_files(&[
            DiscoveredFile::new("sales/orders.csv", Source::S3),
            DiscoveredFile::new("crm.blob/customers.csv", Source::Azure),
            DiscoveredFile::new("crm.blob/orders.csv", Source::Azure),
        ])
    }

    #[test]
    fn resolve_accepts_full_path_and_bare_key() {
        let list = allow_list();
        assert_eq!(
            list.resolve("crm.blob/customers.csv", Some(Source::Azure)),
            Some(("crm.blob/customers.csv".to_string(), Source::Azure))
        );
        assert_eq!(
            list.resolve("customers.csv", None),
            Some(("crm.blob/customers.csv".to_string(), Source::Azure))
        );
    }

    #[test]
    fn resolve_prefers_declared_source_on_ambiguous_key() {
        let list = allow_list();
        assert_eq!(
            list.resolve("orders.csv", Some(Source::Azure)),
            Some(("crm.blob/orders.csv".to_string(), Source::Azure))
        );
        assert_eq!(
            list.resolve("orders.csv", Some(Source::S3)),
            Some(("sales/orders.csv".to_string(), Source::S3))
        );
    }

    #[test]
    fn resolve_rejects_unlisted_dataset() {
        assert_eq!(allow_list().resolve("invented.csv", Some(Source::S3)), None);
    }

    #[test]
    fn plan_display_numbers_steps() {
        let plan = Plan::new(vec![
            Step::dataset("sales/orders.csv", Source::S3, "Orders over $100?"),
            Step::unusable("missing dataset", "Who?"),
        ]);
        let rendered = plan.to_string();
        assert!(rendered.contains("1. [s3] sales/orders.csv: Orders over $100?"));
        assert!(rendered.contains("2. [skipped: missing dataset] Who?"));
        assert_eq!(plan.len(), 2);
        assert!(!plan.is_empty());
    }
}
