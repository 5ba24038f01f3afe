//! Script execution integration tests.

use super::common;
use mddb::{MddbError, Value};
use std::io::Write;
use tempfile::NamedTempFile;

fn script_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_run_sql_file_commits_insert() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = common::unique_table("commit");

    let file = script_file(&format!(
        "CREATE TABLE {table} (name text, animal text, age int, sex text);\n\
         INSERT INTO {table} (name, animal, age, sex) VALUES ('yiwen', 'human', 22, 'M');\n\
         GRANT SELECT ON {table} TO PUBLIC;\n"
    ));
    admin.run_sql_file(file.path(), None).await.unwrap();

    // A fresh session sees the committed row.
    let reader_result = match common::test_reader() {
        Some(reader) => reader
            .query(&format!("SELECT name, age FROM {table}"), None, &[])
            .await
            .unwrap(),
        None => admin
            .query(&format!("SELECT name, age FROM {table}"), None, &[])
            .await
            .unwrap(),
    };
    assert_eq!(reader_result.row_count, 1);
    assert_eq!(reader_result.get(0, "name"), Some(&Value::from("yiwen")));
    assert_eq!(reader_result.get(0, "age"), Some(&Value::Int(22)));

    admin
        .run_sql(&format!("DROP TABLE {table}"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_run_sql_file_syntax_error_leaves_table_unmodified() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = common::unique_table("rollback");
    admin
        .run_sql(&format!("CREATE TABLE {table} (id int)"), None)
        .await
        .unwrap();

    let file = script_file(&format!(
        "INSERT INTO {table} VALUES (1);\nINSRT INTO {table} VALUES (2);\n"
    ));
    let error = admin.run_sql_file(file.path(), None).await.unwrap_err();

    assert!(matches!(error, MddbError::Query { .. }));
    assert_eq!(error.sqlstate(), Some("42601"));
    assert_eq!(common::count_rows(&admin, &table).await, 0);

    admin
        .run_sql(&format!("DROP TABLE {table}"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_run_sql_file_constraint_violation_rolls_back() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = common::unique_table("constraint");
    admin
        .run_sql(&format!("CREATE TABLE {table} (id int PRIMARY KEY)"), None)
        .await
        .unwrap();

    let file = script_file(&format!(
        "INSERT INTO {table} VALUES (1);\nINSERT INTO {table} VALUES (1);\n"
    ));
    let error = admin.run_sql_file(file.path(), None).await.unwrap_err();

    assert_eq!(error.sqlstate(), Some("23505"));
    assert_eq!(common::count_rows(&admin, &table).await, 0);

    admin
        .run_sql(&format!("DROP TABLE {table}"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_connection_usable_after_failed_script() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let mut conn = admin.get_connection().await.unwrap();

    let error = admin.run_sql("SELEC 1;", Some(&mut *conn)).await.unwrap_err();
    assert!(matches!(error, MddbError::Query { .. }));

    let result = admin
        .query("SELECT 1 AS one", Some(&mut *conn), &[])
        .await
        .unwrap();
    assert_eq!(result.get(0, "one"), Some(&Value::Int(1)));

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_run_sql_file_missing_path() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let error = admin
        .run_sql_file("/nonexistent/mddb/script.sql", None)
        .await
        .unwrap_err();
    assert!(matches!(error, MddbError::FileNotFound { .. }));
}
