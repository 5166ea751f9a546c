//! Purpose: Cache table names and per-table descriptors over a raw store.
//! Exports: `Catalog`, `TableDescriptor`, `ColumnDef`.
//! Role: Single owner of the raw store; every read goes through its mutex.
//! Invariants: At most one metadata read per distinct table for the catalog's lifetime.
//! Invariants: Table order is the order reported by the store.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::core::cell::ColumnType;
use crate::core::error::{Error, ErrorKind};
use crate::core::store::{RawStore, RawTable};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub row_count: usize,
}

impl TableDescriptor {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn from_raw(name: &str, table: &RawTable) -> Result<Self, Error> {
        let row_count = table.row_count().map_err(|err| err.with_table(name))?;
        Ok(Self {
            name: name.to_string(),
            columns: table
                .columns
                .iter()
                .map(|column| ColumnDef {
                    name: column.name.clone(),
                    column_type: column.column_type,
                })
                .collect(),
            row_count,
        })
    }
}

/// Stores are not assumed thread-safe, so all access is serialized through
/// one mutex. Callers wanting parallel reads should open one handle per worker.
pub struct Catalog {
    store: Mutex<Box<dyn RawStore>>,
    tables: OnceLock<Vec<String>>,
    descriptors: Mutex<HashMap<String, TableDescriptor>>,
}

impl Catalog {
    pub fn new(store: Box<dyn RawStore>) -> Self {
        Self {
            store: Mutex::new(store),
            tables: OnceLock::new(),
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    pub fn list_tables(&self) -> Result<&[String], Error> {
        if let Some(tables) = self.tables.get() {
            return Ok(tables);
        }
        let names = self.lock_store()?.table_names()?;
        Ok(self.tables.get_or_init(|| names))
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.list_tables()?.iter().any(|table| table == name))
    }

    pub fn table_info(&self, name: &str) -> Result<TableDescriptor, Error> {
        self.require_table(name)?;
        if let Some(descriptor) = self.lock_descriptors()?.get(name) {
            return Ok(descriptor.clone());
        }

        let raw = self.read_raw(name)?;
        let descriptor = TableDescriptor::from_raw(name, &raw)?;
        self.lock_descriptors()?
            .insert(name.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    /// Reads the table's data from the store. Never cached: every call
    /// re-reads so exports always see the store's current content.
    pub fn read_table(&self, name: &str) -> Result<RawTable, Error> {
        self.require_table(name)?;
        self.read_raw(name)
    }

    /// Up to five table names containing `name`, ignoring case.
    pub fn suggest(&self, name: &str) -> Vec<String> {
        let needle = name.to_lowercase();
        match self.list_tables() {
            Ok(tables) => tables
                .iter()
                .filter(|table| table.to_lowercase().contains(&needle))
                .take(5)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn close(&self) -> Result<(), Error> {
        self.lock_store()?.close()
    }

    fn require_table(&self, name: &str) -> Result<(), Error> {
        if self.table_exists(name)? {
            return Ok(());
        }
        let mut err = Error::new(ErrorKind::NotFound)
            .with_message(format!("table `{name}` not found"))
            .with_table(name);
        let similar = self.suggest(name);
        if !similar.is_empty() {
            err = err.with_hint(format!("Did you mean: {}?", similar.join(", ")));
        }
        Err(err)
    }

    fn read_raw(&self, name: &str) -> Result<RawTable, Error> {
        tracing::debug!(table = name, "reading table");
        self.lock_store()?
            .read_table(name)
            .map_err(|err| match err.table() {
                Some(_) => err,
                None => err.with_table(name),
            })
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, Box<dyn RawStore>>, Error> {
        self.store
            .lock()
            .map_err(|_| Error::new(ErrorKind::Internal).with_message("store lock poisoned"))
    }

    fn lock_descriptors(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, TableDescriptor>>, Error> {
        self.descriptors
            .lock()
            .map_err(|_| Error::new(ErrorKind::Internal).with_message("catalog lock poisoned"))
    }
}
