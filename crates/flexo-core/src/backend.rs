//! Storage backend contract

use crate::{FlexoError, Result, Table, TableId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of storage a backend writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// One CSV file per table
    Csv,
    /// One SQL table per table
    Relational,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Csv => f.write_str("csv"),
            BackendKind::Relational => f.write_str("relational"),
        }
    }
}

/// Details of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub table: TableId,
    /// Rows persisted; the table holds exactly this many afterwards
    pub rows_written: usize,
    pub backend: BackendKind,
}

/// Result of a save: the report, or the reason it failed
pub type SaveOutcome = std::result::Result<SaveReport, FlexoError>;

/// A store that can load and fully replace logical tables.
///
/// Implementations return normalized tables from `load`, treat a table that
/// was never written as empty, and make `save` replace the whole table.
#[async_trait]
pub trait TableBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn load(&self, table: &TableId) -> Result<Table>;

    async fn save(&self, table: &TableId, data: &Table) -> Result<SaveReport>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Record, Section, Subsection};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryBackend {
        tables: Mutex<HashMap<String, Table>>,
    }

    #[async_trait]
    impl TableBackend for MemoryBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Csv
        }

        async fn load(&self, table: &TableId) -> Result<Table> {
            let tables = self.tables.lock().unwrap();
            Ok(tables.get(&table.physical_name()).cloned().unwrap_or_default())
        }

        async fn save(&self, table: &TableId, data: &Table) -> Result<SaveReport> {
            self.tables
                .lock()
                .unwrap()
                .insert(table.physical_name(), data.clone());
            Ok(SaveReport {
                table: *table,
                rows_written: data.len(),
                backend: self.kind(),
            })
        }
    }

    #[tokio::test]
    async fn backends_are_usable_as_trait_objects() {
        let backend: Box<dyn TableBackend> = Box::new(MemoryBackend::default());
        let id = TableId::new(Section::Suppliers, Subsection::Invoices);

        assert!(backend.load(&id).await.unwrap().is_empty());

        let table = Table::from_records(vec![Record::default(), Record::default()]);
        let report = backend.save(&id, &table).await.unwrap();
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.backend.to_string(), "csv");
        assert_eq!(backend.load(&id).await.unwrap(), table);
    }
}
