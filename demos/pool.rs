//! Acquires a few connections concurrently from a bounded pool and runs a
//! query on each. Run with `cargo run --example pool -- <host:port>`.

use chorusdb::{ConnectionOptions, Pool, PoolOptions};
use futures_util::future::join_all;

#[tokio::main]
async fn main() -> chorusdb::Result<()> {
    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let destination = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:9000".to_string());

    let pool = Pool::new(
        destination,
        ConnectionOptions::default(),
        PoolOptions {
            minsize: 1,
            maxsize: 4,
        },
    );
    pool.startup().await?;
    println!("pool started with {} connection(s)", pool.size().await);

    let tasks = (0..8).map(|i| {
        let pool = pool.clone();
        async move {
            let conn = pool.acquire().await?;
            conn.execute("SELECT 1").await?;
            println!("worker {i} ran its query");
            chorusdb::Result::<()>::Ok(())
        }
    });
    for result in join_all(tasks).await {
        result?;
    }

    println!(
        "pool size={} free={} after running all workers",
        pool.size().await,
        pool.freesize().await
    );

    pool.shutdown().await;
    Ok(())
}
