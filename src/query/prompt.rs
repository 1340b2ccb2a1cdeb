/// Layout the model must follow; parsed by [`super::parse_response`].
pub const RESPONSE_LAYOUT: &str = "Return **exactly** this layout (no extra text):\n\n\
DESCRIPTIONS\n<path>: <desc>\n\n\
SELECTED_FILES\n<path> ...\n\n\
ANSWER\n<answer>";

/// Marker shown for a file whose cached description is still pending.
pub const EMPTY_DESCRIPTION: &str = "(empty)";

/// Marker shown when no column list could be inferred.
pub const UNKNOWN_SCHEMA: &str = "(unknown)";

/// Bounded context for one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    pub title: String,
    /// Fully-qualified `{container}/{key}`.
    pub path: String,
    pub description: String,
    pub columns: Vec<String>,
    /// Leading characters of the object, decoded lossily.
    pub sample: String,
}

impl FileContext {
    fn render(&self) -> String {
        let description = if self.description.trim().is_empty() {
            EMPTY_DESCRIPTION
        } else {
            self.description.as_str()
        };
        let schema = if self.columns.is_empty() {
            UNKNOWN_SCHEMA.to_string()
        } else {
            self.columns.join(", ")
        };
        format!(
            "### {}\npath: {}\ndescription: {}\nschema: {}\nsample_text:\n```\n{}\n```",
            self.title, self.path, description, schema, self.sample
        )
    }
}

/// Builds the per-source answer prompt.
pub fn build_prompt(question: &str, files: &[FileContext]) -> String {
    let files_block = files
        .iter()
        .map(FileContext::render)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are an **elite file-analysis LLM**.\n\
         * Rewrite empty descriptions based on sample_text.\n\
         * Pick up to **3** files to answer the user's question.\n\
         * Answer in at most 120 words.\n\n\
         {RESPONSE_LAYOUT}\n\n\
         ## User question\n{question}\n\n\
         ## Files\n{files_block}"
    )
}

/// First `max_chars` characters of a lossily decoded preview.
pub fn sample_text(preview: &[u8], max_chars: usize) -> String {
    String::from_utf8_lossy(preview).chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(description: &str, columns: &[&str]) -> FileContext {
        FileContext {
            title: "orders.csv".into(),
            path: "sales/orders.csv".into(),
            description: description.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            sample: "order_id,total\n1,5".into(),
        }
    }

    #[test]
    fn prompt_contains_question_grammar_and_files() {
        let prompt = build_prompt("How many orders?", &[file("Orders", &["order_id", "total"])]);
        assert!(prompt.contains("## User question\nHow many orders?"));
        assert!(prompt.contains("DESCRIPTIONS\n<path>: <desc>"));
        assert!(prompt.contains("### orders.csv\npath: sales/orders.csv"));
        assert!(prompt.contains("schema: order_id, total"));
        assert!(prompt.contains("```\norder_id,total\n1,5\n```"));
    }

    #[test]
    fn pending_description_and_unknown_schema_are_marked() {
        let prompt = build_prompt("q", &[file("  ", &[])]);
        assert!(prompt.contains("description: (empty)"));
        assert!(prompt.contains("schema: (unknown)"));
    }

    #[test]
    fn sample_is_bounded_and_lossy() {
        assert_eq!(sample_text(b"abcdef", 3), "abc");
        assert_eq!(sample_text(b"a\xffb", 10), "a\u{fffd}b");
    }
}
