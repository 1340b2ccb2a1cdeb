use bytes::Bytes;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use time::{Date, OffsetDateTime};

use super::DescribeError;
use super::tabular::{MAX_ROWS, TabularSample};

pub(super) const PARQUET_MAGIC: &[u8] = b"PAR1";

/// Julian day number of 1970-01-01.
const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// Reads the schema and leading rows of a Parquet preview.
///
/// The footer holds the schema, so only a preview that covers the whole
/// file (magic at both ends) can be read.
pub(super) fn parse_parquet(preview: &[u8]) -> Result<TabularSample, DescribeError> {
    if preview.len() < 2 * PARQUET_MAGIC.len() + 4 || !preview.ends_with(PARQUET_MAGIC) {
        return Err(DescribeError::Parse(
            "truncated columnar file: footer is not in the preview".to_string(),
        ));
    }

    let reader = SerializedFileReader::new(Bytes::copy_from_slice(preview))
        .map_err(|e| DescribeError::Parse(format!("unreadable parquet: {e}")))?;

    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();

    let rows = reader
        .get_row_iter(None)
        .map_err(|e| DescribeError::Parse(format!("unreadable parquet rows: {e}")))?
        .filter_map(Result::ok)
        .take(MAX_ROWS)
        .map(|row| row.get_column_iter().map(|(_, field)| cell(field)).collect())
        .collect();

    Ok(TabularSample::from_parts(columns, rows))
}

/// Renders a value the way it would appear in a delimited export.
fn cell(field: &Field) -> String {
    match field {
        Field::Null => String::new(),
        Field::Str(s) => s.clone(),
        Field::Date(days) => Date::from_julian_day(UNIX_EPOCH_JULIAN_DAY + days)
            .map(|d| d.to_string())
            .unwrap_or_default(),
        Field::TimestampMillis(ms) => timestamp_date(ms.div_euclid(1_000)),
        Field::TimestampMicros(us) => timestamp_date(us.div_euclid(1_000_000)),
        other => other.to_string(),
    }
}

fn timestamp_date(seconds: i64) -> String {
    OffsetDateTime::from_unix_timestamp(seconds)
        .map(|t| t.date().to_string())
        .unwrap_or_default()
}
