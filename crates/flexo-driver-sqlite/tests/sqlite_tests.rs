//! Integration tests for the SQLite connection

use chrono::NaiveDate;
use flexo_core::{Connection, Value};
use flexo_driver_sqlite::SqliteConnection;
use pretty_assertions::assert_eq;

async fn setup() -> SqliteConnection {
    let conn = SqliteConnection::open(":memory:").expect("open in-memory database");
    conn.execute(
        r#"CREATE TABLE pedidos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            "numPedido" VARCHAR(50),
            "fechaPedido" DATE,
            "cantidad" INTEGER
        )"#,
        &[],
    )
    .await
    .expect("create table");
    conn
}

#[tokio::test]
async fn test_insert_and_select_with_numbered_placeholders() {
    let conn = setup().await;
    let date = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();

    let result = conn
        .execute(
            r#"INSERT INTO pedidos ("numPedido", "fechaPedido", "cantidad") VALUES (?1, ?2, ?3)"#,
            &[Value::from("100001"), Value::Date(date), Value::Int64(1000)],
        )
        .await
        .unwrap();
    assert_eq!(result.affected_rows, 1);

    let rows = conn
        .query("SELECT * FROM pedidos ORDER BY id", &[])
        .await
        .unwrap();
    let names: Vec<&str> = rows.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "numPedido", "fechaPedido", "cantidad"]);
    assert_eq!(rows.columns[2].data_type, "DATE");
    assert_eq!(
        rows.rows[0].values,
        vec![
            Value::Int64(1),
            Value::from("100001"),
            Value::Date(date),
            Value::Int64(1000)
        ]
    );
}

#[tokio::test]
async fn test_null_dates_stay_null() {
    let conn = setup().await;
    conn.execute(
        r#"INSERT INTO pedidos ("numPedido", "fechaPedido") VALUES (?1, ?2)"#,
        &[Value::from("1"), Value::Null],
    )
    .await
    .unwrap();

    let rows = conn
        .query(r#"SELECT "fechaPedido" FROM pedidos"#, &[])
        .await
        .unwrap();
    assert_eq!(rows.rows[0].get(0), Some(&Value::Null));
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let conn = setup().await;
    let tx = conn.begin_transaction().await.unwrap();
    tx.execute("DELETE FROM pedidos", &[]).await.unwrap();
    tx.execute(
        r#"INSERT INTO pedidos ("numPedido") VALUES (?1)"#,
        &[Value::from("temp")],
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();

    let rows = conn.query("SELECT * FROM pedidos", &[]).await.unwrap();
    assert_eq!(rows.row_count(), 0);
}

#[tokio::test]
async fn test_commit_persists_changes() {
    let conn = setup().await;
    let tx = conn.begin_transaction().await.unwrap();
    tx.execute(
        r#"INSERT INTO pedidos ("numPedido") VALUES (?1)"#,
        &[Value::from("kept")],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let rows = conn.query("SELECT * FROM pedidos", &[]).await.unwrap();
    assert_eq!(rows.row_count(), 1);
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let conn = setup().await;
    {
        let tx = conn.begin_transaction().await.unwrap();
        tx.execute(
            r#"INSERT INTO pedidos ("numPedido") VALUES (?1)"#,
            &[Value::from("lost")],
        )
        .await
        .unwrap();
    }

    let rows = conn.query("SELECT * FROM pedidos", &[]).await.unwrap();
    assert_eq!(rows.row_count(), 0);

    // The connection is usable for a fresh transaction afterwards
    let tx = conn.begin_transaction().await.unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_file_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flexo.db");
    let path = path.to_str().unwrap();

    {
        let conn = SqliteConnection::open(path).unwrap();
        conn.execute("CREATE TABLE t (v TEXT)", &[]).await.unwrap();
        conn.execute("INSERT INTO t (v) VALUES (?1)", &[Value::from("x")])
            .await
            .unwrap();
        conn.close().await.unwrap();
        assert!(conn.is_closed());
    }

    let conn = SqliteConnection::open(path).unwrap();
    let rows = conn.query("SELECT v FROM t", &[]).await.unwrap();
    assert_eq!(rows.rows[0].get(0), Some(&Value::from("x")));
}

#[test]
fn test_missing_parent_directory_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("flexo.db");
    let err = SqliteConnection::open(path.to_str().unwrap()).err().unwrap();
    assert!(matches!(err, flexo_core::FlexoError::Connection(_)));
}
