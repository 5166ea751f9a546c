// Export pipeline tests against snapshot files on disk.
use std::fs;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::{Value, json};
use tabex::api::{
    CancelToken, Cell, ColumnType, Database, ErrorKind, ExportFormat, ExportOptions, MemoryStore,
    RawColumn, RawStore, RawTable, database_summary, list_tables, quick_export,
};

fn snapshot(tables: Value) -> Value {
    json!({"snapshot": "tabex", "version": 1, "tables": tables})
}

/// A: two valid rows, B: column lengths disagree, C: one valid row.
fn abc_snapshot() -> Value {
    snapshot(json!([
        {"name": "A", "columns": [
            {"name": "Id", "type": "long", "values": [1, 2]},
            {"name": "Label", "type": "text", "values": ["one", null]},
            {"name": "Ratio", "type": "double", "values": [0.5, 2.0]},
            {"name": "Enabled", "type": "boolean", "values": [true, -1]},
            {"name": "Changed", "type": "datetime", "values": ["2023-05-14T07:30:00", null]}
        ]},
        {"name": "B", "columns": [
            {"name": "Id", "type": "long", "values": [1, 2, 3]},
            {"name": "Name", "type": "text", "values": ["x"]}
        ]},
        {"name": "C", "columns": [
            {"name": "Key", "type": "text", "values": ["k"]}
        ]}
    ]))
}

fn write_snapshot(dir: &Path, value: &Value) -> PathBuf {
    let path = dir.join("lighting.json");
    fs::write(&path, serde_json::to_vec(value).expect("encode")).expect("write snapshot");
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).expect("read artifact")).expect("artifact json")
}

#[test]
fn one_broken_table_does_not_stop_the_others() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let dest = temp.path().join("out").join("db.json");

    let db = Database::open(&db_path).expect("open");
    let options = ExportOptions::new(ExportFormat::Json).with_separate_files(true);
    let result = db.export(&dest, &options).expect("export");
    db.close().expect("close");

    assert_eq!(result.tables_exported, 2);
    assert_eq!(result.table_names, ["A", "C"]);
    assert_eq!(result.errors.len(), 1);
    let err = &result.errors["B"];
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(err.table(), Some("B"));
    assert!(!result.is_complete());

    let out = temp.path().join("out");
    assert!(out.join("db_A.json").exists());
    assert!(out.join("db_C.json").exists());
    assert!(!out.join("db_B.json").exists());
}

#[test]
fn combined_json_skips_failed_tables_and_keeps_types() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let dest = temp.path().join("all.json");

    let result = quick_export(&db_path, &dest, &ExportOptions::new(ExportFormat::Json))
        .expect("export");
    assert_eq!(result.output_paths, [dest.clone()]);
    assert_eq!(result.tables_exported, 2);

    let doc = read_json(&dest);
    let keys: Vec<_> = doc.as_object().expect("object").keys().cloned().collect();
    assert_eq!(keys, ["A", "C"]);
    assert_eq!(
        doc["A"][0],
        json!({"Id": 1, "Label": "one", "Ratio": 0.5, "Enabled": true, "Changed": "2023-05-14T07:30:00"})
    );
    assert_eq!(
        doc["A"][1],
        json!({"Id": 2, "Label": null, "Ratio": 2.0, "Enabled": true, "Changed": null})
    );
    assert!(doc["A"][1]["Ratio"].is_f64());
}

#[test]
fn json_round_trip_matches_transposed_records() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let dest = temp.path().join("a.json");

    let db = Database::open(&db_path).expect("open");
    let records = db.get_table("A", false).expect("records");
    let options = ExportOptions::new(ExportFormat::Json)
        .with_tables(["A"])
        .with_separate_files(true);
    let result = db.export(&dest, &options).expect("export");

    let parsed = read_json(&result.output_paths[0]);
    let expected: Vec<Value> = records.iter().map(|record| record.to_json()).collect();
    assert_eq!(parsed, Value::Array(expected));
}

#[test]
fn csv_combined_request_writes_one_file_per_table() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let dest = temp.path().join("export.csv");

    let options = ExportOptions::new(ExportFormat::Csv).with_tables(["A", "C"]);
    let result = quick_export(&db_path, &dest, &options).expect("export");

    assert!(result.forced_separate_files);
    assert_eq!(
        result.output_paths,
        [
            temp.path().join("export_A.csv"),
            temp.path().join("export_C.csv")
        ]
    );
    assert!(!dest.exists());
    let text = fs::read_to_string(temp.path().join("export_A.csv")).expect("csv");
    assert_eq!(
        text,
        "Id,Label,Ratio,Enabled,Changed\n1,one,0.5,true,2023-05-14T07:30:00\n2,,2.0,true,\n"
    );
}

#[test]
fn yaml_combined_export_is_keyed_by_table() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let dest = temp.path().join("db.yml");

    let options = ExportOptions::new("YAML".parse().expect("format")).with_tables(["C", "A"]);
    quick_export(&db_path, &dest, &options).expect("export");

    let doc: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&dest).expect("yaml")).expect("parse yaml");
    let mapping = doc.as_mapping().expect("mapping");
    let keys: Vec<_> = mapping.keys().filter_map(|key| key.as_str()).collect();
    assert_eq!(keys, ["A", "C"]);
    assert_eq!(doc["A"][0]["Ratio"].as_f64(), Some(0.5));
    assert_eq!(doc["A"][0]["Changed"].as_str(), Some("2023-05-14T07:30:00"));
    assert!(doc["A"][1]["Label"].is_null());
}

#[test]
fn repeated_exports_are_byte_identical() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let dest = temp.path().join("db.yaml");

    for format in [ExportFormat::Json, ExportFormat::Yaml] {
        let options = ExportOptions::new(format);
        quick_export(&db_path, &dest, &options).expect("first");
        let first = fs::read(&dest).expect("first bytes");
        quick_export(&db_path, &dest, &options).expect("second");
        let second = fs::read(&dest).expect("second bytes");
        assert_eq!(first, second, "{format}");
    }
}

#[test]
fn unmatched_patterns_export_nothing_without_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let dest = temp.path().join("none.json");

    let options = ExportOptions::new(ExportFormat::Json).with_tables(["Nope", "a"]);
    let result = quick_export(&db_path, &dest, &options).expect("export");
    assert_eq!(result.tables_exported, 0);
    assert!(result.errors.is_empty());
    assert_eq!(read_json(&dest), json!({}));
}

#[test]
fn control_characters_in_patterns_are_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let options = ExportOptions::new(ExportFormat::Json).with_tables(["A\n"]);
    match quick_export(&db_path, temp.path().join("x.json"), &options) {
        Ok(_) => panic!("expected invalid pattern"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::InvalidPattern),
    }
}

#[test]
fn unwritable_destination_is_fatal() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, b"file, not a directory").expect("write blocker");

    let options = ExportOptions::new(ExportFormat::Json);
    match quick_export(&db_path, blocker.join("db.json"), &options) {
        Ok(_) => panic!("expected write error"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::Write),
    }
}

#[test]
fn per_table_file_failure_is_recorded_for_that_table() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());
    // A directory where the artifact for A would go makes that one file uncreatable.
    fs::create_dir_all(temp.path().join("db_A.json")).expect("dir");

    let options = ExportOptions::new(ExportFormat::Json)
        .with_tables(["A", "C"])
        .with_separate_files(true);
    let result = quick_export(&db_path, temp.path().join("db.json"), &options).expect("export");
    assert_eq!(result.table_names, ["C"]);
    assert_eq!(result.errors["A"].kind(), ErrorKind::Write);
}

struct CancelOnRead {
    inner: MemoryStore,
    table: &'static str,
    token: CancelToken,
}

impl RawStore for CancelOnRead {
    fn table_names(&mut self) -> Result<Vec<String>, tabex::api::Error> {
        self.inner.table_names()
    }

    fn read_table(&mut self, name: &str) -> Result<RawTable, tabex::api::Error> {
        if name == self.table {
            self.token.cancel();
        }
        self.inner.read_table(name)
    }
}

fn three_tables() -> MemoryStore {
    let column = |value: i64| {
        RawTable::new(vec![RawColumn::new(
            "Id",
            ColumnType::Int32,
            vec![Cell::Int(value)],
        )])
    };
    MemoryStore::new()
        .with_table("One", column(1))
        .with_table("Two", column(2))
        .with_table("Three", column(3))
}

#[test]
fn cancellation_stops_between_tables_and_keeps_finished_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let token = CancelToken::new();
    let store = CancelOnRead {
        inner: three_tables(),
        table: "Two",
        token: token.clone(),
    };
    let db = Database::from_store("memory", store);
    let options = ExportOptions::new(ExportFormat::Json)
        .with_separate_files(true)
        .with_cancel(token);
    let result = db.export(temp.path().join("db.json"), &options).expect("export");

    assert!(result.cancelled);
    assert_eq!(result.table_names, ["One", "Two"]);
    assert!(temp.path().join("db_Two.json").exists());
    assert!(!temp.path().join("db_Three.json").exists());
}

#[test]
fn cancelled_combined_export_writes_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let token = CancelToken::new();
    let store = CancelOnRead {
        inner: three_tables(),
        table: "One",
        token: token.clone(),
    };
    let db = Database::from_store("memory", store);
    let dest = temp.path().join("db.json");
    let options = ExportOptions::new(ExportFormat::Json).with_cancel(token);
    let result = db.export(&dest, &options).expect("export");

    assert!(result.cancelled);
    assert_eq!(result.tables_exported, 0);
    assert!(result.output_paths.is_empty());
    assert!(!dest.exists());
}

#[test]
fn validation_counts_failures_and_keeps_rows() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(
        temp.path(),
        &snapshot(json!([
            {"name": "GenisysZones", "columns": [
                {"name": "Zone_ID", "type": "long", "values": [1, null, 3]},
                {"name": "Zone", "type": "text", "values": ["Hall", "Foyer", "Stage"]}
            ]}
        ])),
    );
    let dest = temp.path().join("zones.json");

    let options = ExportOptions::new(ExportFormat::Json).with_validation(true);
    let result = quick_export(&db_path, &dest, &options).expect("export");
    assert_eq!(result.validation_failures["GenisysZones"], 1);
    assert!(result.errors.is_empty());
    assert_eq!(read_json(&dest)["GenisysZones"].as_array().map(Vec::len), Some(3));
}

#[test]
fn summary_and_listing_helpers_close_the_database() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());

    assert_eq!(list_tables(&db_path).expect("tables"), ["A", "B", "C"]);
    let summary = database_summary(&db_path).expect("summary");
    assert_eq!(summary.total_tables, 3);
    assert_eq!(summary.tables_with_data, 2);
    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.unreadable_tables, ["B"]);
    assert_eq!(summary.model_coverage, 0.0);

    let file = fs::File::open(&db_path).expect("open");
    FileExt::try_lock_exclusive(&file).expect("lock released after helpers");
    FileExt::unlock(&file).expect("unlock");
}

#[test]
fn open_handle_holds_a_shared_lock() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = write_snapshot(temp.path(), &abc_snapshot());

    let db = Database::open(&db_path).expect("open");
    let file = fs::File::open(&db_path).expect("open");
    assert!(FileExt::try_lock_exclusive(&file).is_err());
    db.close().expect("close");
    FileExt::try_lock_exclusive(&file).expect("lock after close");
    FileExt::unlock(&file).expect("unlock");
}

#[test]
fn missing_and_corrupt_files_are_distinct_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    match Database::open(temp.path().join("absent.json")) {
        Ok(_) => panic!("expected not found"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::NotFound),
    }

    let corrupt = temp.path().join("corrupt.json");
    fs::write(&corrupt, b"{\"snapshot\": \"tabex\", \"version\": 1, \"tables\": [").expect("write");
    match Database::open(&corrupt) {
        Ok(_) => panic!("expected load error"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::Load),
    }

    let foreign = temp.path().join("foreign.json");
    fs::write(&foreign, b"{\"snapshot\": \"other\", \"version\": 1}").expect("write");
    match Database::open(&foreign) {
        Ok(_) => panic!("expected load error"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::Load),
    }
}

#[test]
fn first_error_follows_failure_order_not_table_name() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mismatched = RawTable::new(vec![
        RawColumn::new("Id", ColumnType::Int32, vec![Cell::Int(1), Cell::Int(2)]),
        RawColumn::new("Name", ColumnType::Text, vec![Cell::from("x")]),
    ]);
    let valid = RawTable::new(vec![RawColumn::new(
        "Id",
        ColumnType::Int32,
        vec![Cell::Int(1)],
    )]);
    let store = MemoryStore::new()
        .with_table("Zeta", valid)
        .with_table("Alpha", mismatched);
    // Zeta fails first, on file creation; Alpha fails later on its data.
    fs::create_dir_all(temp.path().join("db_Zeta.json")).expect("dir");

    let db = Database::from_store("memory", store);
    let options = ExportOptions::new(ExportFormat::Json).with_separate_files(true);
    let result = db.export(temp.path().join("db.json"), &options).expect("export");

    assert_eq!(result.failed_tables, ["Zeta", "Alpha"]);
    let first = result.first_error().expect("first error");
    assert_eq!(first.kind(), ErrorKind::Write);
    assert_eq!(first.table(), Some("Zeta"));
    assert_eq!(result.errors["Alpha"].kind(), ErrorKind::Integrity);
}
