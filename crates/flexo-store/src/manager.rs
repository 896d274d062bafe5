//! Table manager: the single entry point for reading and writing tables

use crate::config::{BackendRequest, StoreConfig};
use crate::csv_store::CsvStore;
use crate::relational_store::RelationalStore;
use flexo_core::{
    BackendKind, RawTable, Record, RecordEdit, Result, SaveOutcome, Table, TableBackend, TableId,
    normalize,
};
use serde::Serialize;

/// Which backend ended up active, decided once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "selection", rename_all = "snake_case")]
pub enum BackendSelection {
    Csv,
    Relational,
    /// A relational backend was requested but could not be built
    CsvFallback { reason: String },
}

impl BackendSelection {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendSelection::Relational => BackendKind::Relational,
            BackendSelection::Csv | BackendSelection::CsvFallback { .. } => BackendKind::Csv,
        }
    }
}

/// Owns the active backend and converts its failures into safe defaults
pub struct TableManager {
    backend: Box<dyn TableBackend>,
    selection: BackendSelection,
}

impl TableManager {
    /// Build the backend the configuration asks for.
    ///
    /// A relational backend that cannot be built (missing credentials,
    /// unreachable server, bad schema) is logged and replaced by the CSV
    /// store; the only error returned is failing to set up the CSV store.
    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        let relational = match &config.backend {
            BackendRequest::Csv => None,
            BackendRequest::Postgres(settings) => {
                Some(RelationalStore::connect_postgres(settings).await)
            }
            BackendRequest::Sqlite { path } => Some(RelationalStore::open_sqlite(path).await),
        };

        let manager = match relational {
            None => Self {
                backend: Box::new(CsvStore::new(&config.data_dir)?),
                selection: BackendSelection::Csv,
            },
            Some(Ok(store)) => Self {
                backend: Box::new(store),
                selection: BackendSelection::Relational,
            },
            Some(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    data_dir = %config.data_dir.display(),
                    "relational backend unavailable, falling back to CSV"
                );
                Self {
                    backend: Box::new(CsvStore::new(&config.data_dir)?),
                    selection: BackendSelection::CsvFallback {
                        reason: e.to_string(),
                    },
                }
            }
        };

        tracing::info!(backend = %manager.backend_kind(), "table manager ready");
        Ok(manager)
    }

    /// Use an explicitly constructed backend
    pub fn with_backend(backend: Box<dyn TableBackend>) -> Self {
        let selection = match backend.kind() {
            BackendKind::Csv => BackendSelection::Csv,
            BackendKind::Relational => BackendSelection::Relational,
        };
        Self { backend, selection }
    }

    pub fn selection(&self) -> &BackendSelection {
        &self.selection
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn fell_back(&self) -> bool {
        matches!(self.selection, BackendSelection::CsvFallback { .. })
    }

    /// Load a table; failures are logged and yield an empty table
    pub async fn get_table(&self, table: TableId) -> Table {
        match self.try_get_table(table).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(table = %table.physical_name(), error = %e, "failed to load table");
                Table::new()
            }
        }
    }

    pub async fn try_get_table(&self, table: TableId) -> Result<Table> {
        self.backend.load(&table).await
    }

    /// Normalize a caller-supplied table and replace the stored one with it
    pub async fn save_table(&self, table: TableId, data: &RawTable) -> SaveOutcome {
        self.save_records(table, &normalize(data)).await
    }

    pub async fn save_records(&self, table: TableId, data: &Table) -> SaveOutcome {
        let outcome = self.backend.save(&table, data).await;
        if let Err(e) = &outcome {
            tracing::error!(table = %table.physical_name(), error = %e, "failed to save table");
        }
        outcome
    }

    /// Append one record and write the whole table back.
    ///
    /// Loads without recovery: a table that cannot be read is not
    /// overwritten with the single new record.
    pub async fn append_record(&self, table: TableId, record: Record) -> SaveOutcome {
        let mut data = self.try_get_table(table).await?;
        data.push(record);
        self.save_records(table, &data).await
    }

    /// Remove every record matching `predicate`, rewriting the table.
    ///
    /// Returns how many records were removed; nothing is written when no
    /// record matches.
    pub async fn delete_where(
        &self,
        table: TableId,
        predicate: impl Fn(&Record) -> bool,
    ) -> Result<usize> {
        let mut data = self.try_get_table(table).await?;
        let removed = data.retain(|r| !predicate(r));
        if removed > 0 {
            self.save_records(table, &data).await?;
        }
        tracing::debug!(table = %table.physical_name(), removed, "deleted records");
        Ok(removed)
    }

    /// Apply `edit` to every record matching `predicate`, rewriting the
    /// table. Returns how many records were edited; nothing is written when
    /// no record matches.
    pub async fn update_where(
        &self,
        table: TableId,
        predicate: impl Fn(&Record) -> bool,
        edit: &RecordEdit,
    ) -> Result<usize> {
        let mut data = self.try_get_table(table).await?;
        let updated = data.update(|r| predicate(r), |r| edit.apply(r));
        if updated > 0 {
            self.save_records(table, &data).await?;
        }
        tracing::debug!(table = %table.physical_name(), updated, "updated records");
        Ok(updated)
    }
}
