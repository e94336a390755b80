use chorusdb::{Block, BlockInfo, KlickhouseError, Type, Value};
use futures_util::StreamExt;
use indexmap::IndexMap;
use std::time::Duration;

use chorusdb::ConnectionOptions;
use crate::support::{connect_pair, connect_pair_with};

fn one_row_block(column: &str, type_: Type, value: Value) -> Block {
    let mut column_types = IndexMap::new();
    column_types.insert(column.to_string(), type_);
    let mut column_data = IndexMap::new();
    column_data.insert(column.to_string(), vec![value]);
    Block {
        info: BlockInfo::default(),
        rows: 1,
        column_types,
        column_data,
    }
}

#[tokio::test]
async fn handshake_succeeds() {
    let (connection, _server) = connect_pair().await;
    assert!(connection.is_opened());
    assert!(!connection.is_closed());
}

#[tokio::test]
async fn simple_select_roundtrip() {
    let (connection, mut server) = connect_pair().await;

    let client = async {
        let mut stream = connection.query_raw("SELECT 1").await.unwrap();
        let mut blocks = Vec::new();
        while let Some(block) = stream.next().await {
            blocks.push(block.unwrap());
        }
        blocks
    };
    let driver = async {
        let received = server.expect_query().await;
        assert_eq!(received.query, "SELECT 1");
        server
            .send_data(one_row_block("1", Type::UInt8, Value::UInt8(1)))
            .await;
        server.send_end_of_stream().await;
    };

    let (blocks, _) = tokio::join!(client, driver);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].rows, 1);
    assert_eq!(blocks[0].column_data["1"], vec![Value::UInt8(1)]);
}

#[tokio::test]
async fn empty_result_terminates_cleanly() {
    let (connection, mut server) = connect_pair().await;

    let client = async { connection.execute("SELECT 1 WHERE 0").await };
    let driver = async {
        server.expect_query().await;
        server.send_end_of_stream().await;
    };

    let (result, _) = tokio::join!(client, driver);
    result.unwrap();
}

#[tokio::test]
async fn server_exception_propagates_as_error() {
    let (connection, mut server) = connect_pair().await;

    let client = async { connection.execute("SELECT * FROM nonexistent").await };
    let driver = async {
        server.expect_query().await;
        server
            .send_exception(60, "DB::Exception", "Table does not exist")
            .await;
    };

    let (result, _) = tokio::join!(client, driver);
    match result {
        Err(KlickhouseError::ServerException { code, message, .. }) => {
            assert_eq!(code, 60);
            assert!(message.contains("Table does not exist"));
        }
        other => panic!("expected a server exception, got {other:?}"),
    }
}

#[tokio::test]
async fn insert_sends_the_block_the_caller_provided() {
    let (connection, mut server) = connect_pair().await;

    let block = one_row_block("id", Type::UInt64, Value::UInt64(7));
    let block_for_assert = block.clone();
    let client = async {
        let mut stream = connection
            .insert_block("INSERT INTO t (id)", block)
            .await
            .unwrap();
        while stream.next().await.is_some() {}
    };
    let driver = async {
        server.expect_query().await;
        let received = server.expect_data_block().await;
        server.send_end_of_stream().await;
        received
    };

    let (_, received) = tokio::join!(client, driver);
    assert_eq!(received.rows, block_for_assert.rows);
    assert_eq!(received.column_data["id"], vec![Value::UInt64(7)]);
}

#[tokio::test]
async fn ping_returns_true_on_pong() {
    let (connection, mut server) = connect_pair().await;

    let client = async { connection.ping(Duration::from_secs(1)).await };
    let driver = async {
        let packet_id = server.expect_packet_id().await;
        assert_eq!(packet_id, 4, "expected client Ping packet");
        server.send_pong().await;
    };

    let (result, _) = tokio::join!(client, driver);
    assert!(result.unwrap());
}

#[tokio::test]
async fn ping_times_out_without_a_pong() {
    let (connection, _server) = connect_pair().await;
    let result = connection.ping(Duration::from_millis(50)).await;
    assert_eq!(result.unwrap(), false);
}

#[tokio::test]
async fn cancel_sends_the_cancel_packet() {
    let (connection, mut server) = connect_pair().await;

    let client = async {
        connection.query_raw("SELECT 1").await.unwrap();
        connection.cancel().await
    };
    let driver = async {
        server.expect_query().await;
        let packet_id = server.expect_packet_id().await;
        assert_eq!(packet_id, 3, "expected client Cancel packet");
    };

    let (result, _) = tokio::join!(client, driver);
    result.unwrap();
}

#[tokio::test]
async fn a_second_query_is_rejected_while_one_is_in_flight() {
    let (connection, mut server) = connect_pair().await;

    let first = connection.query_raw("SELECT 1").await;
    assert!(first.is_ok());
    let second = connection.query_raw("SELECT 2").await;
    assert!(matches!(second, Err(KlickhouseError::ConnectionBusy)));

    server.expect_query().await;
    server.send_end_of_stream().await;
}

#[tokio::test]
async fn stalled_query_times_out_and_closes_the_connection() {
    let (connection, mut server) = connect_pair_with(ConnectionOptions {
        send_receive_timeout: Some(Duration::from_millis(50)),
        ..ConnectionOptions::default()
    })
    .await;

    let mut stream = connection.query_raw("SELECT 1").await.unwrap();
    server.expect_query().await;
    // Never sends a Data/EndOfStream reply: the client's read deadline should
    // fire and the stream should end in an error rather than hang forever.
    let result = stream.next().await;
    assert!(matches!(result, Some(Err(KlickhouseError::TimeoutError(_)))));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(connection.is_closed());
}
