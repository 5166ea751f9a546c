// Database overview: table counts, data presence, and schema coverage.
use serde::Serialize;

use crate::core::catalog::Catalog;
use crate::core::error::Error;
use crate::core::schema::SchemaRegistry;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub file_path: String,
    pub total_tables: usize,
    pub tables_with_data: usize,
    pub tables_with_schema: usize,
    pub total_rows: usize,
    /// Share of catalog tables with a registered schema, in `[0, 1]`.
    pub model_coverage: f64,
    /// Tables whose metadata could not be read; excluded from row counts.
    pub unreadable_tables: Vec<String>,
}

pub fn summarize(
    file_path: &str,
    catalog: &Catalog,
    registry: &SchemaRegistry,
) -> Result<Summary, Error> {
    let tables = catalog.list_tables()?;
    let mut tables_with_data = 0usize;
    let mut tables_with_schema = 0usize;
    let mut total_rows = 0usize;
    let mut unreadable_tables = Vec::new();

    for name in tables {
        if registry.has_schema(name) {
            tables_with_schema += 1;
        }
        match catalog.table_info(name) {
            Ok(descriptor) => {
                total_rows += descriptor.row_count;
                if descriptor.row_count > 0 {
                    tables_with_data += 1;
                }
            }
            Err(err) => {
                tracing::warn!(table = %name, error = %err, "skipping unreadable table in summary");
                unreadable_tables.push(name.clone());
            }
        }
    }

    let model_coverage = if tables.is_empty() {
        0.0
    } else {
        tables_with_schema as f64 / tables.len() as f64
    };

    Ok(Summary {
        file_path: file_path.to_string(),
        total_tables: tables.len(),
        tables_with_data,
        tables_with_schema,
        total_rows,
        model_coverage,
        unreadable_tables,
    })
}

#[cfg(test)]
mod tests {
    use super::summarize;
    use crate::core::catalog::Catalog;
    use crate::core::cell::{Cell, ColumnType};
    use crate::core::schema::{Schema, SchemaRegistry};
    use crate::core::store::{MemoryStore, RawColumn, RawTable};

    fn table(rows: usize) -> RawTable {
        RawTable::new(vec![RawColumn::new(
            "id",
            ColumnType::Int32,
            (0..rows as i64).map(Cell::Int).collect(),
        )])
    }

    #[test]
    fn coverage_counts_tables_with_schemas() {
        let mut store = MemoryStore::new();
        for idx in 0..10 {
            let rows = if idx < 6 { idx + 1 } else { 0 };
            store.insert(format!("T{idx}"), table(rows));
        }
        let mut registry = SchemaRegistry::new();
        for idx in [0, 3, 7, 9] {
            registry.register(format!("T{idx}"), Schema::default());
        }
        registry.register("NotInDatabase", Schema::default());

        let catalog = Catalog::new(Box::new(store));
        let summary = summarize("lighting.mdb", &catalog, &registry).expect("summary");
        assert_eq!(summary.file_path, "lighting.mdb");
        assert_eq!(summary.total_tables, 10);
        assert_eq!(summary.tables_with_data, 6);
        assert_eq!(summary.tables_with_schema, 4);
        assert_eq!(summary.total_rows, 21);
        assert!((summary.model_coverage - 0.4).abs() < f64::EPSILON);
        assert!(summary.unreadable_tables.is_empty());
    }

    #[test]
    fn empty_database_has_zero_coverage() {
        let catalog = Catalog::new(Box::new(MemoryStore::new()));
        let summary = summarize("empty", &catalog, &SchemaRegistry::new()).expect("summary");
        assert_eq!(summary.total_tables, 0);
        assert_eq!(summary.model_coverage, 0.0);
    }

    #[test]
    fn broken_tables_are_reported_not_fatal() {
        let mut broken = table(2);
        broken
            .columns
            .push(RawColumn::new("name", ColumnType::Text, vec![Cell::from("x")]));
        let store = MemoryStore::new()
            .with_table("Good", table(3))
            .with_table("Broken", broken);
        let catalog = Catalog::new(Box::new(store));
        let summary = summarize("db", &catalog, &SchemaRegistry::new()).expect("summary");
        assert_eq!(summary.total_tables, 2);
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.unreadable_tables, ["Broken"]);
    }
}
