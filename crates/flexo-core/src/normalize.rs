//! Tabular normalization
//!
//! Every table read from storage or submitted by a caller passes through
//! [`normalize`] before anyone sees it. The result always has the 14 registry
//! columns, canonical dates and integer quantities. Nothing here fails: values
//! that cannot be interpreted fall back to an empty date, zero or empty text.

use crate::schema::{self, Field, FieldKind};
use crate::{RawTable, Record, Table, Value};
use chrono::NaiveDate;

/// Canonical rendering of dates
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Normalize a raw table into a typed [`Table`].
///
/// Unknown columns are dropped, missing registry columns default to empty.
pub fn normalize(raw: &RawTable) -> Table {
    let positions: Vec<(Field, Option<usize>)> = schema::fields()
        .iter()
        .map(|field| (*field, raw.column_index(field.display_name())))
        .collect();

    raw.rows()
        .iter()
        .map(|row| {
            let mut record = Record::default();
            for (field, position) in &positions {
                let value = position.and_then(|idx| row.get(idx)).unwrap_or(&Value::Null);
                apply(&mut record, *field, value);
            }
            record
        })
        .collect()
}

fn apply(record: &mut Record, field: Field, value: &Value) {
    match field.kind() {
        FieldKind::Date => {
            let date = parse_date(value);
            match field {
                Field::OrderDate => record.order_date = date,
                _ => record.delivery_date = date,
            }
        }
        FieldKind::Quantity => record.quantity = coerce_quantity(value),
        FieldKind::Text => {
            if let Some(text) = record.text_mut(field) {
                *text = coerce_text(value);
            }
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Interpret a cell as a date; `None` when it is empty or unparseable
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => {
            let parsed = parse_date_str(s);
            if parsed.is_none() && !s.trim().is_empty() {
                tracing::trace!(value = %s, "unparseable date, leaving it empty");
            }
            parsed
        }
        _ => None,
    }
}

/// Parse a date written day-first or ISO.
///
/// `a/b/YYYY` is read as day/month and only read as month/day when the
/// day-first reading is not a real date.
pub fn parse_date_str(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    // Drop a trailing time part ("2025-06-12T10:00:00", "12/06/2025 10:00")
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);

    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    let nums: Vec<u32> = parts.iter().filter_map(|p| p.parse().ok()).collect();
    if nums.len() != 3 {
        return None;
    }

    if parts[0].len() == 4 {
        return NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2]);
    }

    let year = match parts[2].len() {
        4 => nums[2] as i32,
        2 => expand_two_digit_year(nums[2]),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, nums[1], nums[0])
        .or_else(|| NaiveDate::from_ymd_opt(year, nums[0], nums[1]))
}

// Same pivot as chrono's `%y`: 00-68 is 20xx, 69-99 is 19xx
fn expand_two_digit_year(yy: u32) -> i32 {
    if yy < 69 { 2000 + yy as i32 } else { 1900 + yy as i32 }
}

/// Interpret a cell as a non-negative integer quantity
pub fn coerce_quantity(value: &Value) -> i64 {
    let n = match value {
        Value::Int64(n) => *n,
        Value::Float64(f) => truncate(*f),
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(truncate))
                .unwrap_or(0)
        }
        Value::Null | Value::Date(_) => 0,
    };
    n.max(0)
}

fn truncate(f: f64) -> i64 {
    if f.is_finite() { f.trunc() as i64 } else { 0 }
}

/// Interpret a cell as text; `Null` becomes empty, strings are kept verbatim
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
