use super::DescribeError;
use super::columnar::{PARQUET_MAGIC, parse_parquet};

/// Delimiters tried when sniffing a header line, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Upper bound on rows kept from one preview.
pub(super) const MAX_ROWS: usize = 5000;

/// A header plus the complete rows of a preview.
///
/// Delimited-text previews are leading byte ranges, so the final line is
/// usually cut off. It is dropped, as is any row whose field count disagrees
/// with the header. Parquet previews are read only when they hold the whole
/// file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularSample {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TabularSample {
    /// Parses a preview.
    ///
    /// # Errors
    ///
    /// Returns `DescribeError::Parse` for binary previews, Parquet heads that
    /// stop before the footer, previews without a delimited header line, and
    /// malformed headers.
    pub fn parse(preview: &[u8]) -> Result<Self, DescribeError> {
        if preview.starts_with(PARQUET_MAGIC) {
            return parse_parquet(preview);
        }
        if preview.iter().take(1024).any(|&b| b == 0) {
            return Err(DescribeError::Parse("binary content".to_string()));
        }

        let text = String::from_utf8_lossy(preview);
        let text = complete_lines(&text);
        let header = text
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| DescribeError::Parse("empty preview".to_string()))?;
        let delimiter = sniff_delimiter(header)
            .ok_or_else(|| DescribeError::Parse("no delimiter in header line".to_string()))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| DescribeError::Parse(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(DescribeError::Parse("blank header".to_string()));
        }

        let rows = reader
            .records()
            .filter_map(Result::ok)
            .filter(|record| record.len() == columns.len())
            .take(MAX_ROWS)
            .map(|record| record.iter().map(str::to_string).collect())
            .collect();

        Ok(Self { columns, rows })
    }

    pub(super) fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Values of column `index` across all rows.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).map(String::as_str))
    }

    /// True when every sampled value of column `index` is distinct.
    pub fn is_unique(&self, index: usize) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.column_values(index).all(|v| seen.insert(v))
    }
}

/// Best-effort column list for a preview; empty when it is not tabular.
pub fn infer_columns(preview: &[u8]) -> Vec<String> {
    TabularSample::parse(preview)
        .map(|sample| sample.columns)
        .unwrap_or_default()
}

/// Drops a trailing partial line when the text holds more than one line.
fn complete_lines(text: &str) -> &str {
    if text.ends_with('\n') {
        return text;
    }
    match text.rfind('\n') {
        Some(idx) => &text[..=idx],
        None => text,
    }
}

fn sniff_delimiter(header: &str) -> Option<u8> {
    let (delimiter, count) = DELIMITERS
        .iter()
        .map(|&d| (d, header.bytes().filter(|&b| b == d).count()))
        .fold((0u8, 0usize), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });
    (count > 0).then_some(delimiter)
}
