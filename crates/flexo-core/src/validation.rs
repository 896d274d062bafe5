//! Form validation for new records

use crate::normalize::DATE_FORMAT;
use crate::schema::{Field, FieldKind};
use crate::{FlexoError, Record};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Record fields as typed by a user, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordForm {
    pub order_number: String,
    pub sender_name: String,
    pub sender_code: String,
    pub order_date: String,
    pub delivery_date: String,
    pub ean_code: String,
    pub buyer_code: String,
    pub description: String,
    pub quantity: String,
    pub product_type: String,
    pub cliche_type: String,
    pub paper: String,
    pub internal_code: String,
    pub document_link: String,
}

/// A single problem with a submitted form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormProblem {
    #[error("Order Number is required")]
    MissingOrderNumber,
    #[error("Sender Name is required")]
    MissingSenderName,
    #[error("Description is required")]
    MissingDescription,
    #[error("Description exceeds 500 characters ({0})")]
    DescriptionTooLong(usize),
    #[error("Order Date is required")]
    MissingOrderDate,
    #[error("Order Date must use the format DD/MM/YYYY")]
    InvalidOrderDate,
    #[error("Delivery Date must use the format DD/MM/YYYY")]
    InvalidDeliveryDate,
    #[error("Quantity must be greater than 0")]
    InvalidQuantity,
}

/// Every problem found in a form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct ValidationErrors {
    pub problems: Vec<FormProblem>,
}

impl From<ValidationErrors> for FlexoError {
    fn from(err: ValidationErrors) -> Self {
        FlexoError::Validation(err.to_string())
    }
}

impl RecordForm {
    /// Check every rule and build the record, trimming text fields
    pub fn validate(&self) -> Result<Record, ValidationErrors> {
        let mut problems = Vec::new();

        let order_date = match self.order_date.trim() {
            "" => {
                problems.push(FormProblem::MissingOrderDate);
                None
            }
            s => strict_date(s).or_else(|| {
                problems.push(FormProblem::InvalidOrderDate);
                None
            }),
        };
        let delivery_date = match self.delivery_date.trim() {
            "" => None,
            s => strict_date(s).or_else(|| {
                problems.push(FormProblem::InvalidDeliveryDate);
                None
            }),
        };

        if self.order_number.trim().is_empty() {
            problems.push(FormProblem::MissingOrderNumber);
        }
        if self.sender_name.trim().is_empty() {
            problems.push(FormProblem::MissingSenderName);
        }
        let description = self.description.trim();
        if description.is_empty() {
            problems.push(FormProblem::MissingDescription);
        }
        let description_len = description.chars().count();
        if description_len > MAX_DESCRIPTION_LENGTH {
            problems.push(FormProblem::DescriptionTooLong(description_len));
        }

        let quantity = parse_quantity(&self.quantity);
        if quantity.is_none() {
            problems.push(FormProblem::InvalidQuantity);
        }

        if !problems.is_empty() {
            return Err(ValidationErrors { problems });
        }

        Ok(Record {
            order_number: self.order_number.trim().to_string(),
            sender_name: self.sender_name.trim().to_string(),
            sender_code: self.sender_code.trim().to_string(),
            order_date,
            delivery_date,
            ean_code: self.ean_code.trim().to_string(),
            buyer_code: self.buyer_code.trim().to_string(),
            description: description.to_string(),
            quantity: quantity.unwrap_or_default(),
            product_type: self.product_type.trim().to_string(),
            cliche_type: self.cliche_type.trim().to_string(),
            paper: self.paper.trim().to_string(),
            internal_code: self.internal_code.trim().to_string(),
            document_link: self.document_link.trim().to_string(),
        })
    }
}

/// Field changes for existing records, as typed by a user.
///
/// Only the fields present are checked and changed. The rules match
/// [`RecordForm`]: required text may not be blanked, the order date may not
/// be cleared, dates are strict `DD/MM/YYYY`, quantities are positive.
/// An empty delivery date clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    changes: BTreeMap<Field, String>,
}

/// A checked [`RecordPatch`], ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEdit {
    text: Vec<(Field, String)>,
    order_date: Option<NaiveDate>,
    delivery_date: Option<Option<NaiveDate>>,
    quantity: Option<i64>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: Field, value: impl Into<String>) -> Self {
        self.changes.insert(field, value.into());
        self
    }

    /// Set `field` only when a value was given
    pub fn set_opt(self, field: Field, value: Option<String>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn validate(&self) -> Result<RecordEdit, ValidationErrors> {
        let mut problems = Vec::new();
        let mut edit = RecordEdit {
            text: Vec::new(),
            order_date: None,
            delivery_date: None,
            quantity: None,
        };

        for (field, raw) in &self.changes {
            let value = raw.trim();
            match (field.kind(), field) {
                (FieldKind::Date, Field::OrderDate) => match value {
                    "" => problems.push(FormProblem::MissingOrderDate),
                    s => match strict_date(s) {
                        Some(date) => edit.order_date = Some(date),
                        None => problems.push(FormProblem::InvalidOrderDate),
                    },
                },
                (FieldKind::Date, _) => match value {
                    "" => edit.delivery_date = Some(None),
                    s => match strict_date(s) {
                        Some(date) => edit.delivery_date = Some(Some(date)),
                        None => problems.push(FormProblem::InvalidDeliveryDate),
                    },
                },
                (FieldKind::Quantity, _) => match parse_quantity(value) {
                    Some(n) => edit.quantity = Some(n),
                    None => problems.push(FormProblem::InvalidQuantity),
                },
                (FieldKind::Text, _) => {
                    if value.is_empty() {
                        match field {
                            Field::OrderNumber => problems.push(FormProblem::MissingOrderNumber),
                            Field::SenderName => problems.push(FormProblem::MissingSenderName),
                            Field::Description => problems.push(FormProblem::MissingDescription),
                            _ => {}
                        }
                    }
                    let len = value.chars().count();
                    if *field == Field::Description && len > MAX_DESCRIPTION_LENGTH {
                        problems.push(FormProblem::DescriptionTooLong(len));
                    }
                    edit.text.push((*field, value.to_string()));
                }
            }
        }

        if problems.is_empty() {
            Ok(edit)
        } else {
            Err(ValidationErrors { problems })
        }
    }
}

impl RecordEdit {
    pub fn apply(&self, record: &mut Record) {
        for (field, value) in &self.text {
            if let Some(text) = record.text_mut(*field) {
                text.clone_from(value);
            }
        }
        if let Some(date) = self.order_date {
            record.order_date = Some(date);
        }
        if let Some(date) = self.delivery_date {
            record.delivery_date = date;
        }
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
    }
}

fn strict_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

fn parse_quantity(s: &str) -> Option<i64> {
    let s = s.trim();
    let n = s
        .parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?;
    (n > 0).then_some(n)
}
