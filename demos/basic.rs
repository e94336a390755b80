//! Connects once, inserts a couple of rows, then streams them back through
//! both cursor flavors. Run with `cargo run --example basic -- <host:port>`.

use chorusdb::{Connection, ConnectionOptions, Cursor, DictCursor, RawRow};

#[tokio::main]
async fn main() -> chorusdb::Result<()> {
    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let destination = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:9000".to_string());

    let options = ConnectionOptions {
        username: "default".to_string(),
        password: String::new(),
        default_database: "default".to_string(),
        ..Default::default()
    };
    let connection = Connection::connect(destination, options).await?;

    connection
        .execute(
            "CREATE TABLE IF NOT EXISTS chorusdb_basic_demo (id UInt64, name String) ENGINE = Memory",
        )
        .await?;

    let mut insert_cursor: Cursor = Cursor::new(connection.clone());
    let rows: Vec<RawRow> = (1..=3u64)
        .map(|id| {
            let mut row = RawRow::default();
            row.set("id", id);
            row.set("name", format!("row-{id}"));
            row
        })
        .collect();
    insert_cursor
        .executemany("INSERT INTO chorusdb_basic_demo (id, name)", rows)
        .await?;
    println!("inserted {} row(s)", insert_cursor.rowcount());

    let mut cursor: Cursor = Cursor::new(connection.clone());
    cursor
        .execute("SELECT id, name FROM chorusdb_basic_demo ORDER BY id")
        .await?;
    while let Some(mut row) = cursor.fetchone().await? {
        let id: u64 = row.get("id");
        let name: String = row.get("name");
        println!("row: id={id} name={name}");
    }

    // The dict-shaped cursor yields name-keyed rows instead of positional ones.
    let mut dict_cursor: DictCursor = Cursor::new(connection);
    dict_cursor
        .execute("SELECT id, name FROM chorusdb_basic_demo ORDER BY id")
        .await?;
    let rows = dict_cursor.fetchall().await?;
    println!("fetched {} row(s) as dicts", rows.len());
    for row in rows {
        println!("dict row: {:?}", row.0);
    }

    Ok(())
}
