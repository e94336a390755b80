use chorusdb::{Block, BlockInfo, Cursor, DictCursor, DictRow, RawRow, Row, Type, Value};
use indexmap::IndexMap;

use crate::support::connect_pair;

fn two_row_block() -> Block {
    let mut column_types = IndexMap::new();
    column_types.insert("id".to_string(), Type::UInt64);
    column_types.insert("name".to_string(), Type::String);
    let mut column_data = IndexMap::new();
    column_data.insert("id".to_string(), vec![Value::UInt64(1), Value::UInt64(2)]);
    column_data.insert(
        "name".to_string(),
        vec![
            Value::String(b"alpha".to_vec()),
            Value::String(b"beta".to_vec()),
        ],
    );
    Block {
        info: BlockInfo::default(),
        rows: 2,
        column_types,
        column_data,
    }
}

#[tokio::test]
async fn fetchall_drains_every_row_across_blocks() {
    let (connection, mut server) = connect_pair().await;

    let client = async {
        let mut cursor: Cursor = Cursor::new(connection);
        cursor.execute("SELECT id, name FROM t").await.unwrap();
        cursor.fetchall().await.unwrap()
    };
    let driver = async {
        server.expect_query().await;
        server.send_data(two_row_block()).await;
        server.send_end_of_stream().await;
    };

    let (rows, _) = tokio::join!(client, driver);
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn fetchone_returns_none_on_empty_result() {
    let (connection, mut server) = connect_pair().await;

    let client = async {
        let mut cursor: Cursor = Cursor::new(connection);
        cursor.execute("SELECT 1 WHERE 0").await.unwrap();
        cursor.fetchone().await.unwrap()
    };
    let driver = async {
        server.expect_query().await;
        server.send_end_of_stream().await;
    };

    let (row, _) = tokio::join!(client, driver);
    assert!(row.is_none());
}

#[tokio::test]
async fn dict_cursor_yields_name_keyed_rows() {
    let (connection, mut server) = connect_pair().await;

    let client = async {
        let mut cursor: DictCursor = Cursor::new(connection);
        cursor.execute("SELECT id, name FROM t").await.unwrap();
        cursor.fetchall().await.unwrap()
    };
    let driver = async {
        server.expect_query().await;
        server.send_data(two_row_block()).await;
        server.send_end_of_stream().await;
    };

    let (rows, _) = tokio::join!(client, driver);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0.get("id"), Some(&Value::UInt64(1)));
    assert_eq!(
        rows[0].0.get("name"),
        Some(&Value::String(b"alpha".to_vec()))
    );
}

#[test]
fn dict_row_keeps_the_first_of_two_same_named_columns() {
    let row = DictRow::deserialize_row(vec![
        ("id", &Type::UInt64, Value::UInt64(1)),
        ("id", &Type::UInt64, Value::UInt64(2)),
    ])
    .unwrap();
    assert_eq!(row.0.get("id"), Some(&Value::UInt64(1)));
    assert_eq!(row.0.len(), 1);
}

#[tokio::test]
async fn rowcount_reflects_fetched_rows() {
    let (connection, mut server) = connect_pair().await;

    let client = async {
        let mut cursor: Cursor<RawRow> = Cursor::new(connection);
        cursor.execute("SELECT id, name FROM t").await.unwrap();
        let rows = cursor.fetchall().await.unwrap();
        (rows.len(), cursor.rowcount())
    };
    let driver = async {
        server.expect_query().await;
        server.send_data(two_row_block()).await;
        server.send_end_of_stream().await;
    };

    let ((len, rowcount), _) = tokio::join!(client, driver);
    assert_eq!(len, 2);
    assert_eq!(rowcount, 2);
}
