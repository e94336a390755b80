use chorusdb::{ConnectionOptions, Pool, PoolOptions};
use tokio::net::TcpListener;

use crate::support::FakeServer;

/// Binds a loopback listener and answers every accepted connection with just
/// the handshake, forever, so the pool can dial real `TcpStream`s (`Pool`
/// requires a `ToSocketAddrs` destination, unlike `Connection::connect_stream`).
async fn spawn_fake_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut server = FakeServer::new(stream);
                server.handshake().await;
                // Idle until the client drops the connection.
                loop {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                }
            });
        }
    });
    addr
}

#[tokio::test]
async fn startup_precreates_minsize_connections() {
    let addr = spawn_fake_server().await;
    let pool = Pool::new(
        addr,
        ConnectionOptions::default(),
        PoolOptions {
            minsize: 2,
            maxsize: 4,
        },
    );
    pool.startup().await.unwrap();
    assert_eq!(pool.size().await, 2);
    assert_eq!(pool.freesize().await, 2);
    pool.shutdown().await;
}

#[tokio::test]
async fn acquire_reuses_released_connections() {
    let addr = spawn_fake_server().await;
    let pool = Pool::new(
        addr,
        ConnectionOptions::default(),
        PoolOptions {
            minsize: 0,
            maxsize: 1,
        },
    );
    pool.startup().await.unwrap();

    let first = pool.acquire().await.unwrap();
    assert_eq!(pool.size().await, 1);
    drop(first);

    // Release happens on a spawned task; give it a moment to land.
    for _ in 0..100 {
        if pool.freesize().await == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(pool.freesize().await, 1);

    let second = pool.acquire().await.unwrap();
    assert_eq!(
        pool.size().await,
        1,
        "acquire should reuse the freed connection, not open a new one"
    );
    drop(second);
    pool.shutdown().await;
}

#[tokio::test]
async fn acquire_blocks_at_maxsize_until_a_slot_frees_up() {
    let addr = spawn_fake_server().await;
    let pool = Pool::new(
        addr,
        ConnectionOptions::default(),
        PoolOptions {
            minsize: 0,
            maxsize: 1,
        },
    );
    pool.startup().await.unwrap();

    let held = pool.acquire().await.unwrap();

    let pool_clone = pool.clone();
    let waiter = tokio::spawn(async move { pool_clone.acquire().await });

    // The waiter should not resolve while the only slot is held.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    drop(held);
    let acquired = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
        .await
        .expect("waiter should be woken once the slot frees up")
        .unwrap();
    assert!(acquired.is_ok());

    pool.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_idempotent_and_closes_connections() {
    let addr = spawn_fake_server().await;
    let pool = Pool::new(
        addr,
        ConnectionOptions::default(),
        PoolOptions {
            minsize: 1,
            maxsize: 1,
        },
    );
    pool.startup().await.unwrap();
    pool.shutdown().await;
    pool.shutdown().await;

    let result = pool.acquire().await;
    assert!(matches!(result, Err(chorusdb::KlickhouseError::PoolClosed)));
}
