//! Schema registry
//!
//! The fixed mapping between the internal field identifiers used by the
//! relational layout and the display column names used by CSV files and
//! callers. Every other module goes through this table instead of spelling
//! column names out.

use serde::{Deserialize, Serialize};

/// How a field is typed after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Free text, kept verbatim
    Text,
    /// Calendar date, rendered as `DD/MM/YYYY`
    Date,
    /// Non-negative integer
    Quantity,
}

/// One of the 14 fixed record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    OrderNumber,
    SenderName,
    SenderCode,
    OrderDate,
    DeliveryDate,
    EanCode,
    BuyerCode,
    Description,
    Quantity,
    ProductType,
    ClicheType,
    Paper,
    InternalCode,
    DocumentLink,
}

/// Registry order; also the column order of every normalized table.
const FIELDS: [Field; 14] = [
    Field::OrderNumber,
    Field::SenderName,
    Field::SenderCode,
    Field::OrderDate,
    Field::DeliveryDate,
    Field::EanCode,
    Field::BuyerCode,
    Field::Description,
    Field::Quantity,
    Field::ProductType,
    Field::ClicheType,
    Field::Paper,
    Field::InternalCode,
    Field::DocumentLink,
];

impl Field {
    /// Identifier used for relational columns
    pub const fn internal_id(self) -> &'static str {
        match self {
            Field::OrderNumber => "numPedido",
            Field::SenderName => "nombreEmisor",
            Field::SenderCode => "codEmisor",
            Field::OrderDate => "fechaPedido",
            Field::DeliveryDate => "fechaEntrega",
            Field::EanCode => "codArtEan",
            Field::BuyerCode => "codArtComprador",
            Field::Description => "descripcion",
            Field::Quantity => "cantidad",
            Field::ProductType => "tipo",
            Field::ClicheType => "tipoCliche",
            Field::Paper => "papel",
            Field::InternalCode => "codIpg",
            Field::DocumentLink => "pdfLink",
        }
    }

    /// Column name shown to callers and written to CSV headers
    pub const fn display_name(self) -> &'static str {
        match self {
            Field::OrderNumber => "Num_Pedido",
            Field::SenderName => "Nombre_Emisor",
            Field::SenderCode => "Cod_Emisor",
            Field::OrderDate => "Fecha_Pedido",
            Field::DeliveryDate => "Fecha_Entrega",
            Field::EanCode => "Cod_Art_EAN",
            Field::BuyerCode => "Cod_Art_Comprador",
            Field::Description => "Descripcion",
            Field::Quantity => "Cantidad",
            Field::ProductType => "Tipo",
            Field::ClicheType => "Tipo_Cliche",
            Field::Paper => "Papel",
            Field::InternalCode => "Cod_IPG",
            Field::DocumentLink => "PDF_Link",
        }
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Field::OrderDate | Field::DeliveryDate => FieldKind::Date,
            Field::Quantity => FieldKind::Quantity,
            _ => FieldKind::Text,
        }
    }

    /// Maximum length of the relational column, `None` for unbounded text
    pub const fn max_length(self) -> Option<u32> {
        match self {
            Field::OrderNumber
            | Field::SenderCode
            | Field::EanCode
            | Field::BuyerCode
            | Field::InternalCode => Some(50),
            Field::SenderName => Some(200),
            Field::ProductType | Field::ClicheType | Field::Paper => Some(100),
            Field::DocumentLink => Some(500),
            Field::Description | Field::OrderDate | Field::DeliveryDate | Field::Quantity => None,
        }
    }

    pub fn from_internal_id(id: &str) -> Option<Field> {
        FIELDS.iter().copied().find(|f| f.internal_id() == id)
    }

    pub fn from_display_name(name: &str) -> Option<Field> {
        FIELDS.iter().copied().find(|f| f.display_name() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// All fields in registry order
pub fn fields() -> &'static [Field] {
    &FIELDS
}

/// `(internal_id, display_name)` pairs in registry order
pub fn pairs() -> impl Iterator<Item = (&'static str, &'static str)> {
    FIELDS.iter().map(|f| (f.internal_id(), f.display_name()))
}

/// Display names in registry order
pub fn display_names() -> Vec<&'static str> {
    FIELDS.iter().map(|f| f.display_name()).collect()
}

pub fn display_name_for(internal_id: &str) -> Option<&'static str> {
    Field::from_internal_id(internal_id).map(Field::display_name)
}

pub fn internal_id_for(display_name: &str) -> Option<&'static str> {
    Field::from_display_name(display_name).map(Field::internal_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_has_fourteen_unique_fields() {
        assert_eq!(fields().len(), 14);
        let internal: HashSet<_> = fields().iter().map(|f| f.internal_id()).collect();
        let display: HashSet<_> = fields().iter().map(|f| f.display_name()).collect();
        assert_eq!(internal.len(), 14);
        assert_eq!(display.len(), 14);
    }

    #[test]
    fn lookups_work_in_both_directions() {
        for (internal, display) in pairs() {
            assert_eq!(display_name_for(internal), Some(display));
            assert_eq!(internal_id_for(display), Some(internal));
        }
        assert_eq!(display_name_for("fechaPedido"), Some("Fecha_Pedido"));
        assert_eq!(internal_id_for("Cod_IPG"), Some("codIpg"));
        assert_eq!(display_name_for("id"), None);
        assert_eq!(internal_id_for("num_pedido"), None);
    }

    #[test]
    fn only_dates_and_quantity_are_typed() {
        let typed: Vec<_> = fields()
            .iter()
            .filter(|f| f.kind() != FieldKind::Text)
            .map(|f| f.display_name())
            .collect();
        assert_eq!(typed, vec!["Fecha_Pedido", "Fecha_Entrega", "Cantidad"]);
    }
}
