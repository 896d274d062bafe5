//! CSV table store

use async_trait::async_trait;
use flexo_core::{
    BackendKind, FlexoError, RawTable, Result, SaveReport, Table, TableBackend, TableId, Value,
    normalize, schema,
};
use std::path::{Path, PathBuf};

/// One `<physical_name>.csv` file per table under a data directory
#[derive(Debug, Clone)]
pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    /// Create the store, creating the data directory if needed
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        tracing::debug!(data_dir = %data_dir.display(), "CSV store ready");
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, table: &TableId) -> PathBuf {
        self.data_dir.join(format!("{}.csv", table.physical_name()))
    }

    /// File to read a table from: the canonical file, else a file named
    /// after the English labels. The next save migrates it to the
    /// canonical name.
    fn existing_path(&self, table: &TableId) -> Option<PathBuf> {
        let canonical = self.path_for(table);
        if canonical.exists() {
            return Some(canonical);
        }
        table
            .english_names()
            .into_iter()
            .map(|name| self.data_dir.join(format!("{}.csv", name)))
            .find(|path| path.exists())
    }

    fn read_raw(path: &Path) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut raw = RawTable::new(headers);
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            raw.push_row(record.iter().map(Value::from).collect());
        }
        Ok(raw)
    }

    fn write_table(&self, path: &Path, data: &Table) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.data_dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record(schema::display_names()).map_err(csv_error)?;
            for record in data.records() {
                writer
                    .write_record(schema::fields().iter().map(|f| record.display_text(*f)))
                    .map_err(csv_error)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path).map_err(|e| FlexoError::Io(e.error))?;
        Ok(())
    }
}

fn csv_error(err: csv::Error) -> FlexoError {
    FlexoError::Csv(err.to_string())
}

#[async_trait]
impl TableBackend for CsvStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Csv
    }

    #[tracing::instrument(skip(self), fields(table = %table.physical_name()))]
    async fn load(&self, table: &TableId) -> Result<Table> {
        let Some(path) = self.existing_path(table) else {
            tracing::debug!(data_dir = %self.data_dir.display(), "no CSV file yet, returning empty table");
            return Ok(Table::new());
        };
        if path != self.path_for(table) {
            tracing::info!(path = %path.display(), "reading table from English-named file");
        }

        let raw = Self::read_raw(&path)?;
        let table = normalize(&raw);
        tracing::debug!(rows = table.len(), "loaded CSV table");
        Ok(table)
    }

    #[tracing::instrument(skip(self, data), fields(table = %table.physical_name(), rows = data.len()))]
    async fn save(&self, table: &TableId, data: &Table) -> Result<SaveReport> {
        let path = self.path_for(table);
        self.write_table(&path, data)?;
        tracing::info!(path = %path.display(), "saved CSV table");
        Ok(SaveReport {
            table: *table,
            rows_written: data.len(),
            backend: BackendKind::Csv,
        })
    }
}
