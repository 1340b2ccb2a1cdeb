//! Parser for the three-section answer grammar.
//!
//! ```text
//! DESCRIPTIONS
//! <path>: <description>
//!
//! SELECTED_FILES
//! <path> ...
//!
//! ANSWER
//! <answer text>
//! ```
//!
//! Headers must sit on their own line. Markdown decoration (`#`, `*`) and a
//! trailing colon are tolerated. The parser never fails: missing sections
//! simply come back empty.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Descriptions,
    SelectedFiles,
    Answer,
}

fn header(line: &str) -> Option<Section> {
    let token = line
        .trim()
        .trim_matches(|c: char| c == '#' || c == '*' || c.is_whitespace())
        .trim_end_matches(':')
        .trim();
    match token.to_ascii_uppercase().as_str() {
        "DESCRIPTIONS" => Some(Section::Descriptions),
        "SELECTED_FILES" | "SELECTED FILES" => Some(Section::SelectedFiles),
        "ANSWER" => Some(Section::Answer),
        _ => None,
    }
}

/// Sections extracted from one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// `(path, description)` pairs, in response order.
    pub descriptions: Vec<(String, String)>,
    pub selected_files: Vec<String>,
    /// Text after the final `ANSWER` header, or the whole response when
    /// there is no such header.
    pub answer: String,
    /// Whether an `ANSWER` header was found.
    pub has_answer_section: bool,
}

/// Splits a raw response into its sections.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();
    let mut current: Option<Section> = None;
    let mut seen_descriptions = false;
    let mut answer_start: Option<usize> = None;
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        let line_end = offset + line.len();
        offset = line_end;

        if let Some(section) = header(line) {
            match section {
                // Only the first DESCRIPTIONS block is cached.
                Section::Descriptions if seen_descriptions => current = None,
                Section::Descriptions => {
                    seen_descriptions = true;
                    current = Some(section);
                }
                Section::Answer => {
                    answer_start = Some(line_end);
                    current = Some(section);
                }
                Section::SelectedFiles => current = Some(section),
            }
            continue;
        }

        match current {
            Some(Section::Descriptions) => {
                if let Some(pair) = description_line(line) {
                    parsed.descriptions.push(pair);
                }
            }
            Some(Section::SelectedFiles) => parsed.selected_files.extend(
                line.split(|c: char| c.is_whitespace() || c == ',')
                    .map(clean_path)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            ),
            Some(Section::Answer) | None => {}
        }
    }

    match answer_start {
        Some(start) => {
            parsed.answer = raw[start..].trim().to_string();
            parsed.has_answer_section = true;
        }
        None => parsed.answer = raw.trim().to_string(),
    }
    parsed
}

fn description_line(line: &str) -> Option<(String, String)> {
    let (path, description) = line.trim().split_once(':')?;
    let path = clean_path(path);
    let description = description.trim();
    if path.is_empty() || description.is_empty() {
        return None;
    }
    Some((path.to_string(), description.to_string()))
}

fn clean_path(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches(['-', '*'])
        .trim()
        .trim_matches('`')
}
