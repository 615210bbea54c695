//! End-to-end tests for the record store against SQLite databases.

use recordstore::config::parse_config;
use recordstore::{params, RecordStore, StoreError, StoreOptions, Value};
use std::process::{Command, Output};
use tempfile::NamedTempFile;

/// Set in the child process to the name of the test that should fail fast
const EXIT_CHILD_ENV: &str = "RECORDSTORE_EXIT_CHILD";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Creates a store over a temporary file with a `users` table
fn create_temp_store() -> (RecordStore, NamedTempFile) {
    init_tracing();
    let temp_file = NamedTempFile::new().unwrap();
    let mut store = RecordStore::open_sqlite(temp_file.path());
    store
        .query(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                age INTEGER
            )",
            params![],
        )
        .unwrap();
    (store, temp_file)
}

fn insert_user(store: &mut RecordStore, name: &str, email: &str, age: i64) -> String {
    store
        .insert_record(
            "users",
            [
                ("name", Value::from(name)),
                ("email", Value::from(email)),
                ("age", Value::from(age)),
            ],
        )
        .unwrap()
}

#[test]
fn test_inserted_row_is_retrievable_by_id() {
    let (mut store, _file) = create_temp_store();
    let id = insert_user(&mut store, "John Doe", "john@example.com", 30);

    let row = store
        .select_one_record_with_id("users", id.as_str())
        .unwrap()
        .expect("inserted row should exist");
    assert_eq!(row.get("name"), Some(&Value::from("John Doe")));
    assert_eq!(row.get("email"), Some(&Value::from("john@example.com")));
    assert_eq!(row.get("age"), Some(&Value::Integer(30)));
    assert_eq!(
        row.columns().collect::<Vec<_>>(),
        vec!["id", "name", "email", "age"]
    );
}

#[test]
fn test_update_with_id_then_select() {
    let (mut store, _file) = create_temp_store();
    let id = insert_user(&mut store, "Jane", "jane@example.com", 25);
    insert_user(&mut store, "Other", "other@example.com", 40);

    store
        .update_record_with_id("users", [("age", 26)], id.as_str())
        .unwrap();

    let row = store.select_one_record_with_id("users", id.as_str()).unwrap().unwrap();
    assert_eq!(row.get("age"), Some(&Value::Integer(26)));

    let untouched = store
        .select_one_record("SELECT age FROM users WHERE name=?", params!["Other"])
        .unwrap()
        .unwrap();
    assert_eq!(untouched.get("age"), Some(&Value::Integer(40)));
}

#[test]
fn test_update_binds_fields_before_where_params() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "a@example.com", 10);
    insert_user(&mut store, "b", "b@example.com", 20);
    insert_user(&mut store, "c", "c@example.com", 30);

    store
        .update_record(
            "users",
            [("name", Value::from("adult")), ("age", Value::from(99))],
            "age >= ? AND age <= ?",
            params![20, 30],
        )
        .unwrap();

    let adults = store
        .row_count("users", "name=? AND age=?", params!["adult", 99])
        .unwrap();
    assert_eq!(adults, 2);
}

#[test]
fn test_update_without_where_touches_every_row() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "a@example.com", 10);
    insert_user(&mut store, "b", "b@example.com", 20);

    store.update_record("users", [("age", 1)], "", params![]).unwrap();
    assert_eq!(store.row_count("users", "age=?", params![1]).unwrap(), 2);
}

#[test]
fn test_delete_with_id_leaves_no_row_and_no_error() {
    let (mut store, _file) = create_temp_store();
    let id = insert_user(&mut store, "Gone", "gone@example.com", 50);

    store.delete_record_with_id("users", id.as_str()).unwrap();
    let row = store.select_one_record_with_id("users", id.as_str()).unwrap();
    assert!(row.is_none());
    assert!(store.last_error().is_none());
}

#[test]
fn test_delete_with_where_and_without() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "a@example.com", 10);
    insert_user(&mut store, "b", "b@example.com", 20);
    insert_user(&mut store, "c", "c@example.com", 30);

    store.delete_record("users", "age < ?", params![25]).unwrap();
    assert_eq!(store.row_count("users", "", params![]).unwrap(), 1);

    store.delete_record("users", "", params![]).unwrap();
    assert_eq!(store.row_count("users", "", params![]).unwrap(), 0);
}

#[test]
fn test_row_count_grows_by_one_per_insert() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "a@example.com", 10);

    let all = store.select_records("SELECT * FROM users", params![]).unwrap();
    let before = store.row_count("users", "", params![]).unwrap();
    assert_eq!(before, all.len() as i64);

    insert_user(&mut store, "b", "b@example.com", 20);
    assert_eq!(store.row_count("users", "", params![]).unwrap(), before + 1);
}

#[test]
fn test_select_records_preserves_order() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "a@example.com", 30);
    insert_user(&mut store, "b", "b@example.com", 10);
    insert_user(&mut store, "c", "c@example.com", 20);

    let rows = store
        .select_records("SELECT name FROM users WHERE age > ? ORDER BY age", params![5])
        .unwrap();
    let names: Vec<_> = rows
        .iter()
        .map(|row| row.get("name").and_then(Value::as_str).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["b", "c", "a"]);
}

#[test]
fn test_query_with_zero_rows_is_not_an_error() {
    let (mut store, _file) = create_temp_store();
    let stmt = store.query("SELECT 1 WHERE 1=?", params![0]).unwrap();
    assert_eq!(stmt.fetch_all().len(), 0);
    assert!(store.last_error().is_none());

    let none = store.select_one_record("SELECT 1 WHERE 1=?", params![0]).unwrap();
    assert!(none.is_none());
}

#[test]
fn test_invalid_sql_sets_last_error() {
    let (mut store, _file) = create_temp_store();
    let result = store.query("SELECT * FROM", params![]);
    assert!(matches!(result, Err(StoreError::Database(_))));
    let message = store.last_error().expect("error should be recorded");
    assert!(!message.is_empty());

    assert!(store.select_records("SELECT nope FROM users", params![]).is_err());
    assert!(store.select_one_record("SELECT nope FROM users", params![]).is_err());
    assert!(store.row_count("no_such_table", "", params![]).is_err());
}

#[test]
fn test_placeholder_count_mismatch_is_an_error() {
    let (mut store, _file) = create_temp_store();
    let result = store.select_records("SELECT * FROM users WHERE id=? AND age=?", params![1]);
    assert!(result.is_err());
    assert!(store.last_error().is_some());
}

#[test]
fn test_constraint_violation_is_recorded() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "dup@example.com", 10);
    let result = store.insert_record(
        "users",
        [("name", Value::from("b")), ("email", Value::from("dup@example.com"))],
    );
    assert!(result.is_err());
    assert!(store.last_error().unwrap().contains("UNIQUE"));
}

#[test]
fn test_custom_id_field_name() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "a@example.com", 10);

    store.set_id_field_name("");
    assert_eq!(store.id_field_name(), "id");

    store.set_id_field_name("email");
    let row = store
        .select_one_record_with_id("users", "a@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(row.get("name"), Some(&Value::from("a")));

    store
        .update_record_with_id("users", [("age", 11)], "a@example.com")
        .unwrap();
    store.delete_record_with_id("users", "a@example.com").unwrap();
    assert_eq!(store.row_count("users", "", params![]).unwrap(), 0);
}

#[test]
fn test_id_field_name_from_options() {
    init_tracing();
    let mut store =
        RecordStore::open_sqlite_with(":memory:", StoreOptions::new().id_field_name("uuid"));
    store
        .query("CREATE TABLE tokens (uuid TEXT PRIMARY KEY, label TEXT)", params![])
        .unwrap();

    let key = store
        .insert_record("tokens", [("uuid", "f00d"), ("label", "first")])
        .unwrap();
    // Generated key of a TEXT primary key table is the rowid, not the uuid
    assert_eq!(key, "1");

    let row = store.select_one_record_with_id("tokens", "f00d").unwrap().unwrap();
    assert_eq!(row.get("label"), Some(&Value::from("first")));
}

#[test]
fn test_rollback_discards_writes() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "keep", "keep@example.com", 1);

    store.begin_transaction().unwrap();
    insert_user(&mut store, "tmp", "tmp@example.com", 2);
    store.delete_record("users", "name=?", params!["keep"]).unwrap();
    store.cancel_transaction().unwrap();

    assert_eq!(store.row_count("users", "", params![]).unwrap(), 1);
    assert!(store
        .select_one_record("SELECT * FROM users WHERE name=?", params!["keep"])
        .unwrap()
        .is_some());
}

#[test]
fn test_commit_keeps_writes() {
    let (mut store, file) = create_temp_store();

    store.begin_transaction().unwrap();
    insert_user(&mut store, "a", "a@example.com", 1);
    insert_user(&mut store, "b", "b@example.com", 2);
    store.end_transaction().unwrap();
    drop(store);

    // Visible from a fresh connection
    let mut reopened = RecordStore::open_sqlite(file.path());
    assert_eq!(reopened.row_count("users", "", params![]).unwrap(), 2);
}

#[test]
fn test_transaction_misuse_is_recorded() {
    let (mut store, _file) = create_temp_store();
    assert!(store.end_transaction().is_err());
    assert!(store.last_error().is_some());

    store.begin_transaction().unwrap();
    assert!(store.begin_transaction().is_err(), "transactions do not nest");
    store.cancel_transaction().unwrap();
    assert!(store.last_error().is_none());
}

#[test]
fn test_null_and_blob_values() {
    init_tracing();
    let mut store = RecordStore::open_sqlite(":memory:");
    store
        .query("CREATE TABLE files (id INTEGER PRIMARY KEY, body BLOB, note TEXT)", params![])
        .unwrap();
    let id = store
        .insert_record(
            "files",
            [("body", Value::from(vec![0u8, 159, 146, 150])), ("note", Value::Null)],
        )
        .unwrap();

    let row = store.select_one_record_with_id("files", id).unwrap().unwrap();
    assert_eq!(row.get("body"), Some(&Value::Blob(vec![0, 159, 146, 150])));
    assert_eq!(row.get("note"), Some(&Value::Null));
}

#[test]
fn test_rows_serialize_to_json() {
    let (mut store, _file) = create_temp_store();
    insert_user(&mut store, "a", "a@example.com", 10);

    let rows = store
        .select_records("SELECT name, age FROM users", params![])
        .unwrap();
    let json = serde_json::to_string(&rows).unwrap();
    assert_eq!(json, r#"[{"name":"a","age":10}]"#);
}

/// Re-runs this test binary with only `test_name` selected and the child
/// marker set; returns the child's output.
fn run_exit_child(test_name: &str) -> Output {
    Command::new(std::env::current_exe().unwrap())
        .args(["--exact", test_name, "--nocapture", "--test-threads=1"])
        .env(EXIT_CHILD_ENV, test_name)
        .output()
        .unwrap()
}

fn is_exit_child(test_name: &str) -> bool {
    std::env::var(EXIT_CHILD_ENV).map_or(false, |name| name == test_name)
}

fn assert_exited_with_syntax_error(output: &Output) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
    assert!(stderr.contains("syntax error"), "stderr: {}", stderr);
}

#[test]
fn test_exit_after_error_terminates_process() {
    const NAME: &str = "test_exit_after_error_terminates_process";
    if is_exit_child(NAME) {
        let mut store =
            RecordStore::open_sqlite_with(":memory:", StoreOptions::new().exit_after_error(true));
        let _ = store.query("SELEC 1", params![]);
        unreachable!("store should have exited");
    }

    assert_exited_with_syntax_error(&run_exit_child(NAME));
}

#[test]
fn test_exit_after_error_from_config() {
    const NAME: &str = "test_exit_after_error_from_config";
    if is_exit_child(NAME) {
        let config = parse_config(
            "[connection]\nbackend = \"sqlite\"\npath = \":memory:\"\n\n[store]\nexit_after_error = true\n",
        )
        .unwrap();
        let mut store = RecordStore::from_config(&config);
        let _ = store.select_records("SELEC 1", params![]);
        unreachable!("store should have exited");
    }

    assert_exited_with_syntax_error(&run_exit_child(NAME));
}

#[test]
fn test_exit_after_error_can_be_switched_off() {
    init_tracing();
    let options = StoreOptions::new().exit_after_error(true).exit_after_error(false);
    let mut store = RecordStore::open_sqlite_with(":memory:", options);

    assert!(store.query("SELEC 1", params![]).is_err());
    assert!(store.last_error().unwrap().contains("syntax error"));
}
