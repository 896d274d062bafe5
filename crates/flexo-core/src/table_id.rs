//! Logical table identifiers
//!
//! A table is addressed by `(section, subsection)`. Labels are accepted in
//! English or Spanish; the physical name always uses the Spanish storage
//! labels so both spellings reach the same file or relational table.

use crate::{FlexoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Customers,
    Suppliers,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Customers, Section::Suppliers];

    /// Label used in physical names
    pub const fn storage_label(self) -> &'static str {
        match self {
            Section::Customers => "clientes",
            Section::Suppliers => "proveedores",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Section::Customers => "Customers",
            Section::Suppliers => "Suppliers",
        }
    }
}

impl FromStr for Section {
    type Err = FlexoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "customers" | "customer" | "clientes" | "cliente" => Ok(Section::Customers),
            "suppliers" | "supplier" | "proveedores" | "proveedor" => Ok(Section::Suppliers),
            other => Err(FlexoError::UnknownTable(format!("unknown section '{}'", other))),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subsection {
    Orders,
    DeliveryNotes,
    Invoices,
}

impl Subsection {
    pub const ALL: [Subsection; 3] = [
        Subsection::Orders,
        Subsection::DeliveryNotes,
        Subsection::Invoices,
    ];

    pub const fn storage_label(self) -> &'static str {
        match self {
            Subsection::Orders => "pedidos",
            Subsection::DeliveryNotes => "albaranes",
            Subsection::Invoices => "facturas",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Subsection::Orders => "Orders",
            Subsection::DeliveryNotes => "Delivery Notes",
            Subsection::Invoices => "Invoices",
        }
    }
}

impl FromStr for Subsection {
    type Err = FlexoError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        match key.as_str() {
            "orders" | "order" | "pedidos" | "pedido" => Ok(Subsection::Orders),
            "deliverynotes" | "deliverynote" | "albaranes" | "albaran" | "albarán" => {
                Ok(Subsection::DeliveryNotes)
            }
            "invoices" | "invoice" | "facturas" | "factura" => Ok(Subsection::Invoices),
            _ => Err(FlexoError::UnknownTable(format!(
                "unknown subsection '{}'",
                s.trim()
            ))),
        }
    }
}

impl fmt::Display for Subsection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one of the six logical tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId {
    pub section: Section,
    pub subsection: Subsection,
}

impl TableId {
    pub const fn new(section: Section, subsection: Subsection) -> Self {
        Self {
            section,
            subsection,
        }
    }

    /// Parse section and subsection labels in either language
    pub fn parse(section: &str, subsection: &str) -> Result<Self> {
        Ok(Self::new(section.parse()?, subsection.parse()?))
    }

    /// Every logical table, sections outermost
    pub fn all() -> impl Iterator<Item = TableId> {
        Section::ALL.into_iter().flat_map(|section| {
            Subsection::ALL
                .into_iter()
                .map(move |subsection| TableId::new(section, subsection))
        })
    }

    /// Storage name: `{subsection}_{section}`, lowercase
    pub fn physical_name(&self) -> String {
        format!(
            "{}_{}",
            self.subsection.storage_label(),
            self.section.storage_label()
        )
    }

    /// Names built from the English labels (`orders_customers`,
    /// `delivery notes_customers`), as files written by the English UI are
    /// called. The underscore spelling of "Delivery Notes" is included.
    pub fn english_names(&self) -> Vec<String> {
        let name = format!("{}_{}", self.subsection.label(), self.section.label()).to_lowercase();
        let underscored = name.replace(' ', "_");
        if underscored == name {
            vec![name]
        } else {
            vec![name, underscored]
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.section, self.subsection)
    }
}
