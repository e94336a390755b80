//! An in-process stand-in for a ClickHouse-speaking server. Generic over the
//! transport so the same handshake/query framing can run over an in-memory
//! `tokio::io::duplex` pair (protocol tests) or a loopback `TcpStream`
//! (pool tests, which need a real `ToSocketAddrs` destination to dial).

use chorusdb::{Block, Connection, ConnectionOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};

/// Protocol revision the fake server advertises in its `Hello`. Chosen above
/// every `DBMS_MIN_REVISION_WITH_*` gate so both sides take the newest wire
/// format.
pub const REVISION: u64 = 54448;

async fn read_varint<R: AsyncRead + Unpin>(r: &mut R) -> u64 {
    let mut out = 0u64;
    for i in 0..9u64 {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte).await.expect("read varint byte");
        out |= ((byte[0] & 0x7F) as u64) << (7 * i);
        if byte[0] & 0x80 == 0 {
            break;
        }
    }
    out
}

async fn write_varint<W: AsyncWrite + Unpin>(w: &mut W, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        w.write_all(&[byte]).await.expect("write varint byte");
        if value == 0 {
            break;
        }
    }
}

async fn read_string<R: AsyncRead + Unpin>(r: &mut R) -> String {
    let len = read_varint(r).await as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).await.expect("read string body");
    String::from_utf8(buf).expect("utf8 string")
}

async fn write_string<W: AsyncWrite + Unpin>(w: &mut W, value: &str) {
    write_varint(w, value.len() as u64).await;
    w.write_all(value.as_bytes()).await.expect("write string body");
}

/// The SQL text the client sent in a `Query` packet.
pub struct ReceivedQuery {
    pub query: String,
}

/// The server side of a connection, generic over the transport.
pub struct FakeServer<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> FakeServer<S> {
    pub fn new(stream: S) -> Self {
        FakeServer { stream }
    }

    /// Reads the client `Hello` and replies with a fixed server `Hello`.
    pub async fn handshake(&mut self) {
        let packet_id = read_varint(&mut self.stream).await;
        assert_eq!(packet_id, 0, "expected client Hello packet");
        let _client_name = read_string(&mut self.stream).await;
        let _major = read_varint(&mut self.stream).await;
        let _minor = read_varint(&mut self.stream).await;
        let _protocol_version = read_varint(&mut self.stream).await;
        let _database = read_string(&mut self.stream).await;
        let _username = read_string(&mut self.stream).await;
        let _password = read_string(&mut self.stream).await;

        write_varint(&mut self.stream, 0).await; // ServerPacketId::Hello
        write_string(&mut self.stream, "FakeServer").await;
        write_varint(&mut self.stream, 24).await;
        write_varint(&mut self.stream, 8).await;
        write_varint(&mut self.stream, REVISION).await;
        write_string(&mut self.stream, "UTC").await;
        write_string(&mut self.stream, "fake").await;
        write_varint(&mut self.stream, 1).await;
        self.stream.flush().await.unwrap();
    }

    /// Reads a client `Query` packet plus the empty `Data` terminator that
    /// always follows it, returning the SQL text.
    pub async fn expect_query(&mut self) -> ReceivedQuery {
        let packet_id = read_varint(&mut self.stream).await;
        assert_eq!(packet_id, 1, "expected client Query packet");
        let _query_id = read_string(&mut self.stream).await;

        let mut kind = [0u8; 1];
        self.stream.read_exact(&mut kind).await.unwrap();
        if kind[0] != 0 {
            let _initial_user = read_string(&mut self.stream).await;
            let _initial_query_id = read_string(&mut self.stream).await;
            let _initial_address = read_string(&mut self.stream).await;
            let mut interface = [0u8; 1];
            self.stream.read_exact(&mut interface).await.unwrap();
            let _os_user = read_string(&mut self.stream).await;
            let _client_hostname = read_string(&mut self.stream).await;
            let _client_name = read_string(&mut self.stream).await;
            let _client_version_major = read_varint(&mut self.stream).await;
            let _client_version_minor = read_varint(&mut self.stream).await;
            let _client_tcp_protocol_version = read_varint(&mut self.stream).await;
            let _quota_key = read_string(&mut self.stream).await;
            let _distributed_depth = read_varint(&mut self.stream).await;
            let _client_version_patch = read_varint(&mut self.stream).await;
            let mut otel = [0u8; 1];
            self.stream.read_exact(&mut otel).await.unwrap();
            if otel[0] != 0 {
                let mut trace_id = [0u8; 16];
                self.stream.read_exact(&mut trace_id).await.unwrap();
                let _span_id = self.stream.read_u64_le().await.unwrap();
                let _tracestate = read_string(&mut self.stream).await;
                let mut trace_flags = [0u8; 1];
                self.stream.read_exact(&mut trace_flags).await.unwrap();
            }
        }

        // Settings: a run of name strings terminated by an empty one.
        loop {
            let name = read_string(&mut self.stream).await;
            if name.is_empty() {
                break;
            }
            let mut important = [0u8; 1];
            self.stream.read_exact(&mut important).await.unwrap();
            let _value = read_string(&mut self.stream).await;
        }
        let _interserver_secret = read_string(&mut self.stream).await;
        let _stage = read_varint(&mut self.stream).await;
        let mut compression = [0u8; 1];
        self.stream.read_exact(&mut compression).await.unwrap();
        let query = read_string(&mut self.stream).await;

        // "No external tables"/schema-request terminator Data block.
        let packet_id = read_varint(&mut self.stream).await;
        assert_eq!(packet_id, 2, "expected terminator Data packet");
        let _table_name = read_string(&mut self.stream).await;
        Block::read(&mut self.stream, REVISION)
            .await
            .expect("read empty data block");

        ReceivedQuery { query }
    }

    /// Reads a client `Data` packet carrying upload rows (i.e. an insert
    /// payload), returning the block.
    pub async fn expect_data_block(&mut self) -> Block {
        let packet_id = read_varint(&mut self.stream).await;
        assert_eq!(packet_id, 2, "expected client Data packet");
        let _table_name = read_string(&mut self.stream).await;
        Block::read(&mut self.stream, REVISION)
            .await
            .expect("read data block")
    }

    /// Reads the next raw packet id without interpreting a body. Used to
    /// observe bodyless client packets (`Cancel` = 3, `Ping` = 4).
    pub async fn expect_packet_id(&mut self) -> u64 {
        read_varint(&mut self.stream).await
    }

    /// Sends one `Data` packet carrying `block`.
    pub async fn send_data(&mut self, block: Block) {
        write_varint(&mut self.stream, 1).await; // ServerPacketId::Data
        write_string(&mut self.stream, "").await;
        block
            .write(&mut self.stream, REVISION)
            .await
            .expect("write data block");
        self.stream.flush().await.unwrap();
    }

    /// Sends `EndOfStream`.
    pub async fn send_end_of_stream(&mut self) {
        write_varint(&mut self.stream, 5).await;
        self.stream.flush().await.unwrap();
    }

    /// Sends `Exception`.
    pub async fn send_exception(&mut self, code: i32, name: &str, message: &str) {
        write_varint(&mut self.stream, 2).await;
        self.stream.write_i32_le(code).await.unwrap();
        write_string(&mut self.stream, name).await;
        write_string(&mut self.stream, message).await;
        write_string(&mut self.stream, "").await;
        self.stream.write_u8(0).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Sends `Pong`.
    pub async fn send_pong(&mut self) {
        write_varint(&mut self.stream, 4).await;
        self.stream.flush().await.unwrap();
    }
}

/// Spawns a connected `Connection`/`FakeServer` pair over an in-memory duplex
/// stream, performing the handshake before returning.
pub async fn connect_pair() -> (Connection, FakeServer<DuplexStream>) {
    connect_pair_with(ConnectionOptions::default()).await
}

pub async fn connect_pair_with(
    options: ConnectionOptions,
) -> (Connection, FakeServer<DuplexStream>) {
    let (client_io, server_io) = tokio::io::duplex(1 << 20);
    let (client_read, client_write) = tokio::io::split(client_io);

    let handshake = tokio::spawn(async move {
        let mut server = FakeServer::new(server_io);
        server.handshake().await;
        server
    });

    let connection = Connection::connect_stream(client_read, client_write, options)
        .await
        .expect("connect_stream should succeed against the fake server");
    let server = handshake.await.expect("handshake task panicked");
    (connection, server)
}
