//! Parser for pasted or uploaded `date, value` text.
//!
//! Columns may be separated by comma, semicolon or tab. A first line that
//! has neither a recognisable date nor a number is taken as a header. Rows
//! that fail to parse are returned as skipped, never as errors.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::entry::{ImportRow, ParsedImport, SkipReason, SkippedImportRow};

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\t]").unwrap());

static YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})([-/.])(\d{1,2})([-/.])(\d{1,2})$").unwrap());

static DAY_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})([-/.])(\d{1,2})([-/.])(\d{4}|\d{2})$").unwrap());

const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

pub fn parse_import_text(text: &str) -> ParsedImport {
    let mut parsed = ParsedImport::default();
    let mut seen_content = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let is_first = !seen_content;
        seen_content = true;

        let mut columns = SEPARATOR.split(line).map(clean_cell);
        let (date_cell, value_cell) = match (columns.next(), columns.next()) {
            (Some(date), Some(value)) => (date, value),
            _ => {
                parsed.skipped.push(skip(index, line, SkipReason::MissingColumns));
                continue;
            }
        };

        let date = parse_date(date_cell);
        let value = parse_value(value_cell);

        match (date, value) {
            (Some(date), Some(value)) => parsed.rows.push(ImportRow { date, value }),
            (None, None) if is_first => {
                debug!(target: "app::import", header = %line, "header row detected");
                parsed.header_detected = true;
            }
            (None, _) => parsed.skipped.push(skip(index, line, SkipReason::UnparseableDate)),
            (Some(_), None) => parsed.skipped.push(skip(index, line, SkipReason::NonNumericValue)),
        }
    }

    debug!(
        target: "app::import",
        rows = parsed.rows.len(),
        skipped = parsed.skipped.len(),
        "import text parsed"
    );
    parsed
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `DD/MM/YYYY`,
/// `DD-MM-YYYY`, `DD.MM.YYYY` and `DD/MM/YY` (years below 50 are 20xx).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Some(caps) = YEAR_FIRST.captures(value) {
        if caps[2] != caps[4] {
            return None;
        }
        let year = caps[1].parse().ok()?;
        let month = caps[3].parse().ok()?;
        let day = caps[5].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DAY_FIRST.captures(value) {
        if caps[2] != caps[4] {
            return None;
        }
        let day = caps[1].parse().ok()?;
        let month = caps[3].parse().ok()?;
        let year_text = &caps[5];
        let year = if year_text.len() == 2 {
            if &caps[2] != "/" {
                return None;
            }
            let short: i32 = year_text.parse().ok()?;
            if short < TWO_DIGIT_YEAR_PIVOT {
                2000 + short
            } else {
                1900 + short
            }
        } else {
            year_text.parse().ok()?
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

pub fn parse_value(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn clean_cell(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

fn skip(index: usize, line: &str, reason: SkipReason) -> SkippedImportRow {
    SkippedImportRow {
        line_number: index + 1,
        content: line.to_string(),
        reason,
    }
}
