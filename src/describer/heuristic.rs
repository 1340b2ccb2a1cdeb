use std::sync::LazyLock;

use regex::Regex;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use super::{DescribeError, TabularSample};

/// Returned when nothing could be identified in a sample.
pub const FALLBACK_DESCRIPTION: &str = "Table";

static IDENTIFIER_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(^|_)id$").expect("valid identifier regex"));

static DATE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date|_dt$").expect("valid date regex"));

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const SLASH_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]/[month]/[day]");
const US_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month padding:none]/[day padding:none]/[year]");

/// Describes a raw preview as `PK=.. · FK=.. · <date col> <min>→<max>`.
///
/// # Errors
///
/// Returns `DescribeError::Parse` when the preview is not tabular; callers
/// fall back to a model-generated description.
pub fn describe(path: &str, preview: &[u8]) -> Result<String, DescribeError> {
    let sample = TabularSample::parse(preview)?;
    let description = describe_sample(&sample);
    tracing::debug!(path, columns = sample.columns().len(), %description, "heuristic description");
    Ok(description)
}

/// Describes an already parsed sample. The result is a hint, not a schema.
pub fn describe_sample(sample: &TabularSample) -> String {
    let columns = sample.columns();
    if columns.is_empty() {
        return FALLBACK_DESCRIPTION.to_string();
    }

    let pk_index = columns
        .iter()
        .enumerate()
        .find(|(i, name)| IDENTIFIER_COLUMN.is_match(name) && sample.is_unique(*i))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut bits = vec![format!("PK={}", columns[pk_index])];

    let foreign_keys: Vec<&str> = columns
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != pk_index && IDENTIFIER_COLUMN.is_match(name))
        .map(|(_, name)| name.as_str())
        .collect();
    if !foreign_keys.is_empty() {
        bits.push(format!("FK={}", foreign_keys.join(",")));
    }

    for (i, name) in columns.iter().enumerate() {
        if !DATE_COLUMN.is_match(name) {
            continue;
        }
        let dates = sample.column_values(i).filter_map(parse_date);
        let range = dates.fold(None, |acc: Option<(Date, Date)>, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        });
        if let Some((min, max)) = range {
            bits.push(format!("{name} {min}→{max}"));
        }
    }

    bits.join(" · ")
}

/// Parses the date portion of a cell. Timestamps are cut to their first ten
/// characters before the ISO attempt.
fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let head = value.get(..10).unwrap_or(value);
    Date::parse(head, ISO_DATE)
        .or_else(|_| Date::parse(head, SLASH_DATE))
        .or_else(|_| {
            let day = value.split_whitespace().next().unwrap_or(value);
            Date::parse(day, US_DATE)
        })
        .ok()
}
