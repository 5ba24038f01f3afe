//! Read-only query integration tests.

use super::common;
use mddb::{MddbError, Value};

#[tokio::test]
async fn test_query_columns_and_rows() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = admin
        .query(
            "SELECT g AS trade_id, g * 1.5::float8 AS price FROM generate_series(1, 3) AS g",
            None,
            &[],
        )
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["trade_id", "price"]);
    assert_eq!(result.row_count, 3);
    assert_eq!(result.get(2, "trade_id"), Some(&Value::Int(3)));
    assert_eq!(result.get(0, "price"), Some(&Value::Float(1.5)));
}

#[tokio::test]
async fn test_query_with_null_and_timestamp() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = admin
        .query(
            "SELECT NULL::text AS side, '2017-11-02 10:00:00'::timestamp AS time",
            None,
            &[],
        )
        .await
        .unwrap();

    assert!(result.get(0, "side").unwrap().is_null());
    assert_eq!(
        result.get(0, "time"),
        Some(&Value::from("2017-11-02 10:00:00"))
    );
}

fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::String(s)) => s.parse().unwrap(),
        other => panic!("Expected numeric text, got {other:?}"),
    }
}

#[tokio::test]
async fn test_query_decodes_numeric_uuid_json_and_interval() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = admin
        .query(
            "SELECT sum(x) AS total, avg(x) AS mean, 1.25::numeric AS px, \
             '11111111-2222-3333-4444-555555555555'::uuid AS id, \
             '{\"a\": 1}'::jsonb AS j, '{}'::json AS empty, \
             interval '1 day' AS iv, gen_random_uuid() AS random_id \
             FROM generate_series(1, 4) AS x",
            None,
            &[],
        )
        .await
        .unwrap();

    assert_eq!(result.get(0, "total"), Some(&Value::Int(10)));
    assert_eq!(numeric(result.get(0, "mean")), 2.5);
    assert_eq!(numeric(result.get(0, "px")), 1.25);
    assert_eq!(
        result.get(0, "id"),
        Some(&Value::from("11111111-2222-3333-4444-555555555555"))
    );
    assert_eq!(result.get(0, "j"), Some(&Value::from(r#"{"a":1}"#)));
    assert_eq!(result.get(0, "empty"), Some(&Value::from("{}")));
    assert_eq!(result.get(0, "iv"), Some(&Value::from("1 day")));
    assert!(matches!(result.get(0, "random_id"), Some(Value::String(_))));
}

#[tokio::test]
async fn test_query_with_params() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = admin
        .query(
            "SELECT $1::text AS product_id, $2::bigint * 2 AS doubled",
            None,
            &[Value::from("ETH-BTC"), Value::Int(21)],
        )
        .await
        .unwrap();

    assert_eq!(result.get(0, "product_id"), Some(&Value::from("ETH-BTC")));
    assert_eq!(result.get(0, "doubled"), Some(&Value::Int(42)));
}

#[tokio::test]
async fn test_query_with_syntax_error() {
    let Some(admin) = common::test_admin() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let error = admin.query("SELEC 1", None, &[]).await.unwrap_err();
    assert!(matches!(error, MddbError::Query { .. }));
    assert!(error.to_string().to_lowercase().contains("syntax"));
}

#[tokio::test]
async fn test_reader_cannot_delete_but_admin_can() {
    let (Some(admin), Some(reader)) = (common::test_admin(), common::test_reader()) else {
        eprintln!("Skipping test: DATABASE_URL or MDDB_TEST_READER_URL not set");
        return;
    };
    let table = common::unique_table("perm");

    admin
        .run_sql(
            &format!(
                "CREATE TABLE {table} (id int); INSERT INTO {table} VALUES (1); \
                 GRANT SELECT ON {table} TO PUBLIC;"
            ),
            None,
        )
        .await
        .unwrap();

    let denied = reader
        .query(&format!("DELETE FROM {table}"), None, &[])
        .await
        .unwrap_err();
    assert!(denied.is_permission_denied(), "got: {denied}");

    admin
        .query(&format!("DELETE FROM {table}"), None, &[])
        .await
        .unwrap();
    assert_eq!(common::count_rows(&admin, &table).await, 0);

    admin
        .run_sql(&format!("DROP TABLE {table}"), None)
        .await
        .unwrap();
}
