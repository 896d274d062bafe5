//! Typed records and normalized tables

use crate::normalize::format_date;
use crate::schema::{self, Field};
use crate::{RawTable, Value};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One business row with the 14 fixed fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub order_number: String,
    pub sender_name: String,
    pub sender_code: String,
    pub order_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub ean_code: String,
    pub buyer_code: String,
    pub description: String,
    pub quantity: i64,
    pub product_type: String,
    pub cliche_type: String,
    pub paper: String,
    pub internal_code: String,
    pub document_link: String,
}

impl Record {
    /// Text of a text field; `None` for the date and quantity fields
    pub fn text(&self, field: Field) -> Option<&str> {
        let text = match field {
            Field::OrderNumber => &self.order_number,
            Field::SenderName => &self.sender_name,
            Field::SenderCode => &self.sender_code,
            Field::EanCode => &self.ean_code,
            Field::BuyerCode => &self.buyer_code,
            Field::Description => &self.description,
            Field::ProductType => &self.product_type,
            Field::ClicheType => &self.cliche_type,
            Field::Paper => &self.paper,
            Field::InternalCode => &self.internal_code,
            Field::DocumentLink => &self.document_link,
            Field::OrderDate | Field::DeliveryDate | Field::Quantity => return None,
        };
        Some(text.as_str())
    }

    pub(crate) fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        let text = match field {
            Field::OrderNumber => &mut self.order_number,
            Field::SenderName => &mut self.sender_name,
            Field::SenderCode => &mut self.sender_code,
            Field::EanCode => &mut self.ean_code,
            Field::BuyerCode => &mut self.buyer_code,
            Field::Description => &mut self.description,
            Field::ProductType => &mut self.product_type,
            Field::ClicheType => &mut self.cliche_type,
            Field::Paper => &mut self.paper,
            Field::InternalCode => &mut self.internal_code,
            Field::DocumentLink => &mut self.document_link,
            Field::OrderDate | Field::DeliveryDate | Field::Quantity => return None,
        };
        Some(text)
    }

    pub fn date(&self, field: Field) -> Option<NaiveDate> {
        match field {
            Field::OrderDate => self.order_date,
            Field::DeliveryDate => self.delivery_date,
            _ => None,
        }
    }

    /// Display form of a field: text verbatim, dates as `DD/MM/YYYY` (empty
    /// when undefined), quantity as an integer
    pub fn display_value(&self, field: Field) -> Value {
        match field {
            Field::OrderDate | Field::DeliveryDate => {
                Value::String(self.date(field).map(format_date).unwrap_or_default())
            }
            Field::Quantity => Value::Int64(self.quantity),
            _ => Value::String(self.text(field).unwrap_or_default().to_string()),
        }
    }

    /// Display form rendered as text, as written to CSV cells
    pub fn display_text(&self, field: Field) -> String {
        match self.display_value(field) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    /// Storage form of a field: dates as native dates (`Null` when undefined)
    pub fn storage_value(&self, field: Field) -> Value {
        match field {
            Field::OrderDate | Field::DeliveryDate => self.date(field).into(),
            _ => self.display_value(field),
        }
    }

    /// Display values in registry order
    pub fn display_values(&self) -> Vec<Value> {
        schema::fields().iter().map(|f| self.display_value(*f)).collect()
    }
}

/// An ordered sequence of normalized records.
///
/// Always exposes exactly the 14 registry columns, whatever was stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Column names, always the registry display names in registry order
    pub fn columns(&self) -> Vec<&'static str> {
        schema::display_names()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Keep only records matching the predicate, returning how many were removed
    pub fn retain(&mut self, predicate: impl FnMut(&Record) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(predicate);
        before - self.records.len()
    }

    /// Apply `edit` to every record matching the predicate, returning how
    /// many were edited
    pub fn update(
        &mut self,
        mut predicate: impl FnMut(&Record) -> bool,
        mut edit: impl FnMut(&mut Record),
    ) -> usize {
        let mut updated = 0;
        for record in &mut self.records {
            if predicate(record) {
                edit(record);
                updated += 1;
            }
        }
        updated
    }

    /// Display-form cell lookup by column name
    pub fn get(&self, row: usize, column: &str) -> Option<Value> {
        let field = Field::from_display_name(column)?;
        self.records.get(row).map(|r| r.display_value(field))
    }

    /// Display-form raw table with the 14 registry columns
    pub fn to_raw(&self) -> RawTable {
        let mut raw = RawTable::new(self.columns());
        for record in &self.records {
            raw.push_row(record.display_values());
        }
        raw
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl From<&Table> for RawTable {
    fn from(table: &Table) -> Self {
        table.to_raw()
    }
}
