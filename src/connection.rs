use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex as StdMutex,
    },
    task::{Context, Poll},
    time::Duration,
};

use futures_util::{Stream, StreamExt};
use indexmap::IndexMap;
use tokio::{
    io::{AsyncRead, AsyncWrite, BufReader, BufWriter},
    net::{TcpStream, ToSocketAddrs},
    select,
    sync::{broadcast, mpsc, oneshot, Mutex as AsyncMutex, OwnedMutexGuard},
};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    block::{Block, BlockInfo},
    convert::{RawRow, Row},
    internal_client_in::InternalClientIn,
    internal_client_out::{
        ClientHello, ClientInfo, InternalClientOut, Query, QueryKind, QueryProcessingStage,
    },
    io::{ClickhouseRead, ClickhouseWrite},
    progress::Progress,
    protocol::{self, BlockStreamProfileInfo, CompressionMethod, ServerPacket, Setting},
    KlickhouseError, Result, Value,
};
use log::*;

/// Number of progress updates buffered for `subscribe_progress` before old
/// ones are dropped for slow subscribers.
const PROGRESS_CAPACITY: usize = 100;

/// Options set for a connection (spec section 6 "Public API surface").
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub username: String,
    pub password: String,
    pub default_database: String,
    pub compression: CompressionMethod,
    /// Settings sent with every query issued on this connection, in addition
    /// to whatever is passed to an individual `query`/`execute` call.
    pub settings: Vec<Setting>,
    /// Whether the DSN that produced these options asked for a TLS
    /// transport (spec section 6 `secure`). `Connection::connect_dsn` reads
    /// this to decide between `connect`/`connect_tls`; it is carried here
    /// purely as a record once a caller has already picked a transport.
    pub secure: bool,
    /// Whether TLS peer verification should be performed (spec section 6
    /// `verify`). Trust management itself is out of scope (spec section 1);
    /// this only gates which connector-building path `connect_dsn` takes.
    pub verify: bool,
    /// Deadline for the initial TCP connect (spec section 6 `connect_timeout`).
    pub connect_timeout: Option<Duration>,
    /// Deadline applied to every send/receive round trip once connected:
    /// the handshake, dispatching a query, sending a data block, and
    /// waiting on the next server packet while a query or ping is
    /// outstanding (spec section 6 `send_receive_timeout`, spec section 5
    /// "Timeouts"). Expiry produces `TimeoutError` and marks the connection
    /// unusable.
    pub send_receive_timeout: Option<Duration>,
    /// Deadline for a single synchronous, non-streaming round trip such as
    /// `cancel` (spec section 6 `sync_request_timeout`).
    pub sync_request_timeout: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptions {
            username: "default".to_string(),
            password: String::new(),
            default_database: String::new(),
            compression: CompressionMethod::default(),
            settings: Vec::new(),
            secure: false,
            verify: true,
            connect_timeout: None,
            send_receive_timeout: None,
            sync_request_timeout: None,
        }
    }
}

impl ConnectionOptions {
    /// Builds options from a parsed [`crate::Dsn`]. DSN fields win over
    /// these defaults (spec section 6: "If both DSN and explicit kwargs are
    /// present, DSN wins"); a caller who wants to override something on top
    /// of a DSN should mutate the returned value before connecting.
    pub fn from_dsn(dsn: &crate::Dsn) -> Self {
        ConnectionOptions {
            username: dsn.username.clone(),
            password: dsn.password.clone(),
            default_database: dsn.database.clone(),
            compression: dsn.compression,
            settings: Vec::new(),
            secure: dsn.secure,
            verify: dsn.verify,
            connect_timeout: dsn.connect_timeout,
            send_receive_timeout: dsn.send_receive_timeout,
            sync_request_timeout: dsn.sync_request_timeout,
        }
    }
}

/// Transient, per-connection context that a pooled connection must not leak
/// across checkouts. Cleared by `Connection::reset_state`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    pub last_profile_info: Option<BlockStreamProfileInfo>,
    pub last_totals: Option<Block>,
    pub last_extremes: Option<Block>,
}

enum RequestData {
    Query {
        query: String,
        settings: Vec<Setting>,
        response: oneshot::Sender<Result<mpsc::Receiver<Result<Block>>>>,
    },
    SendData {
        block: Block,
        response: oneshot::Sender<Result<()>>,
    },
    Cancel {
        response: oneshot::Sender<Result<()>>,
    },
    Ping {
        response: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

struct Request {
    data: RequestData,
}

/// Races `fut` against `timeout` (a no-op if `None`), turning expiry into
/// `TimeoutError` instead of propagating the bare `Elapsed`.
async fn apply_timeout<T>(
    timeout: Option<Duration>,
    fut: impl std::future::Future<Output = Result<T>>,
    what: &str,
) -> Result<T> {
    match timeout {
        Some(duration) => match tokio::time::timeout(duration, fut).await {
            Ok(result) => result,
            Err(_) => Err(KlickhouseError::TimeoutError(what.to_string())),
        },
        None => fut.await,
    }
}

/// Opens a TCP connection under `connect_timeout` (spec section 6).
async fn connect_tcp<A: ToSocketAddrs>(destination: A, connect_timeout: Option<Duration>) -> Result<TcpStream> {
    apply_timeout(
        connect_timeout,
        async move {
            TcpStream::connect(destination)
                .await
                .map_err(|e| KlickhouseError::ConnectionError(format!("tcp connect failed: {e}")))
        },
        "tcp connect",
    )
    .await
}

struct InnerClient<R: ClickhouseRead, W: ClickhouseWrite> {
    input: InternalClientIn<R>,
    output: InternalClientOut<W>,
    options: ConnectionOptions,
    executing_query: Option<(Uuid, mpsc::Sender<Result<Block>>)>,
    pending_ping: Option<oneshot::Sender<Result<()>>>,
    progress: broadcast::Sender<Progress>,
    context: Arc<StdMutex<ConnectionContext>>,
    closed: Arc<AtomicBool>,
}

impl<R: ClickhouseRead + 'static, W: ClickhouseWrite + 'static> InnerClient<R, W> {
    async fn handshake(&mut self) -> Result<()> {
        let timeout = self.options.send_receive_timeout;
        apply_timeout(
            timeout,
            self.output.send_hello(ClientHello {
                default_database: &self.options.default_database,
                username: &self.options.username,
                password: &self.options.password,
            }),
            "sending hello",
        )
        .await?;

        let hello = apply_timeout(timeout, self.input.receive_hello(), "receiving hello").await?;
        self.input.server_hello = hello.clone();
        self.output.server_hello = hello;
        self.input.compression = self.options.compression;
        self.output.compression = self.options.compression;
        Ok(())
    }

    async fn dispatch_query(&mut self, id: Uuid, query: &str, settings: &[Setting]) -> Result<()> {
        let mut all_settings = self.options.settings.clone();
        all_settings.extend_from_slice(settings);
        let timeout = self.options.send_receive_timeout;

        apply_timeout(
            timeout,
            self.output.send_query(Query {
                id: &id.to_string(),
                info: ClientInfo {
                    kind: QueryKind::InitialQuery,
                    initial_user: &self.options.username,
                    initial_query_id: "",
                    initial_address: "0.0.0.0:0",
                    os_user: "",
                    client_hostname: "localhost",
                    client_name: "chorusdb",
                    client_version_major: crate::VERSION_MAJOR,
                    client_version_minor: crate::VERSION_MINOR,
                    client_tcp_protocol_version: protocol::DBMS_TCP_PROTOCOL_VERSION,
                    quota_key: "",
                    distributed_depth: 0,
                    client_version_patch: 1,
                    open_telemetry: None,
                },
                settings: &all_settings,
                stage: QueryProcessingStage::Complete,
                compression: self.options.compression,
                query,
            }),
            "sending query",
        )
        .await?;

        // Empty Data block: schema request for INSERT, "no external tables"
        // terminator otherwise (spec section 4.5, query lifecycle step 2).
        apply_timeout(
            timeout,
            self.output.send_data(Block::default(), ""),
            "sending data",
        )
        .await?;
        Ok(())
    }

    async fn handle_request(&mut self, request: Request) -> Result<()> {
        match request.data {
            RequestData::Query {
                query,
                settings,
                response,
            } => {
                if self.executing_query.is_some() {
                    response.send(Err(KlickhouseError::ConnectionBusy)).ok();
                    return Ok(());
                }
                let id = Uuid::new_v4();
                if let Err(e) = self.dispatch_query(id, &query, &settings).await {
                    response.send(Err(e)).ok();
                    return Ok(());
                }
                let (sender, receiver) = mpsc::channel(32);
                self.executing_query = Some((id, sender));
                response.send(Ok(receiver)).ok();
            }
            RequestData::SendData { block, response } => {
                let timeout = self.options.send_receive_timeout;
                let result = apply_timeout(timeout, self.output.send_data(block, ""), "sending data").await;
                response.send(result).ok();
            }
            RequestData::Cancel { response } => {
                let timeout = self.options.sync_request_timeout;
                let result = apply_timeout(timeout, self.output.send_cancel(), "sending cancel").await;
                response.send(result).ok();
            }
            RequestData::Ping { response } => {
                let timeout = self.options.send_receive_timeout;
                if let Err(e) = apply_timeout(timeout, self.output.send_ping(), "sending ping").await {
                    response.send(Err(e)).ok();
                } else {
                    self.pending_ping = Some(response);
                }
            }
            RequestData::Shutdown => {}
        }
        Ok(())
    }

    /// Waits for the next server packet, applying `send_receive_timeout`
    /// (spec section 6) only while a query or ping is actually outstanding --
    /// an idle connection with nothing in flight waits indefinitely, since
    /// there is no "receive" operation pending to bound.
    async fn recv_packet_with_deadline(&mut self) -> Result<ServerPacket> {
        let waiting_on_response = self.executing_query.is_some() || self.pending_ping.is_some();
        let timeout = if waiting_on_response {
            self.options.send_receive_timeout
        } else {
            None
        };
        apply_timeout(timeout, self.input.receive_packet(), "receiving packet").await
    }

    async fn receive_packet(&mut self, packet: Result<ServerPacket>) -> Result<()> {
        let packet = match packet {
            Ok(packet) => packet,
            Err(e) => {
                let fatal = e.is_fatal_to_connection();
                if let Some((_, current)) = self.executing_query.take() {
                    current.send(Err(e)).await.ok();
                } else if let Some(ping) = self.pending_ping.take() {
                    ping.send(Err(e)).ok();
                } else {
                    return Err(e);
                }
                // Timeouts and other connection-fatal errors (spec section 5
                // "Timeouts") end the actor loop instead of looping back to
                // wait for a packet that may never reconcile with what the
                // caller was just told failed. The original error already
                // reached the caller above; what run_inner's caller logs
                // just needs to be informative, not identical.
                return if fatal {
                    Err(KlickhouseError::ConnectionError(
                        "connection closed after a fatal error while awaiting a server packet".to_string(),
                    ))
                } else {
                    Ok(())
                };
            }
        };

        match packet {
            ServerPacket::Hello(_) => {
                return Err(KlickhouseError::ProtocolError(
                    "unexpected retransmission of server hello".to_string(),
                ));
            }
            ServerPacket::Data(data) => {
                if let Some((_, current)) = self.executing_query.as_ref() {
                    current.send(Ok(data.block)).await.ok();
                } else {
                    return Err(KlickhouseError::ProtocolError(
                        "received data block, but no executing query".to_string(),
                    ));
                }
            }
            ServerPacket::Exception(e) => {
                if let Some((_, current)) = self.executing_query.take() {
                    current.send(Err(e.emit())).await.ok();
                } else {
                    return Err(e.emit());
                }
            }
            ServerPacket::Progress(progress) => {
                let _ = self.progress.send(progress);
            }
            ServerPacket::Pong => {
                if let Some(ping) = self.pending_ping.take() {
                    ping.send(Ok(())).ok();
                }
            }
            ServerPacket::EndOfStream => {
                if self.executing_query.take().is_none() {
                    return Err(KlickhouseError::ProtocolError(
                        "received end of stream, but no executing query".to_string(),
                    ));
                }
            }
            ServerPacket::ProfileInfo(info) => {
                self.context.lock().unwrap().last_profile_info = Some(info);
            }
            ServerPacket::Totals(data) => {
                self.context.lock().unwrap().last_totals = Some(data.block);
            }
            ServerPacket::Extremes(data) => {
                self.context.lock().unwrap().last_extremes = Some(data.block);
            }
            ServerPacket::TablesStatusResponse(_) => {}
            ServerPacket::Log(_) => {}
            ServerPacket::TableColumns(_) => {}
            ServerPacket::PartUUIDs(_) => {}
            ServerPacket::ReadTaskRequest => {}
            ServerPacket::ProfileEvents(_) => {}
        }
        Ok(())
    }

    async fn run_inner(mut self, mut input: mpsc::Receiver<Request>) -> Result<()> {
        loop {
            select! {
                request = input.recv() => {
                    match request {
                        None => return Ok(()),
                        Some(request) => {
                            if matches!(request.data, RequestData::Shutdown) {
                                return Ok(());
                            }
                            if let Err(e) = self.handle_request(request).await {
                                error!("failed to handle connection request: {:?}", e);
                            }
                        }
                    }
                },
                packet = self.recv_packet_with_deadline() => {
                    self.receive_packet(packet).await?;
                },
            }
        }
    }

    async fn run(mut self, input: mpsc::Receiver<Request>, ready: oneshot::Sender<Result<()>>) {
        if let Err(e) = self.handshake().await {
            error!("clickhouse connection handshake failed: {:#?}", e);
            self.closed.store(true, Ordering::SeqCst);
            ready.send(Err(e)).ok();
            return;
        }
        ready.send(Ok(())).ok();

        if let Err(e) = self.run_inner(input).await {
            error!("clickhouse connection failed: {:#?}", e);
        }
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A stream wrapper that keeps the connection's busy guard alive for as long
/// as the caller is still pulling result blocks out of it.
struct GuardedStream<S> {
    _guard: OwnedMutexGuard<()>,
    inner: S,
}

impl<S: Stream + Unpin> Stream for GuardedStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A single-socket connection to a columnar analytical database speaking the
/// native wire protocol (spec section 4.6). Cheaply cloneable: every clone
/// shares the same background I/O task and the same busy guard, so at most
/// one query is ever in flight regardless of how many handles exist.
#[derive(Clone)]
pub struct Connection {
    sender: mpsc::Sender<Request>,
    context: Arc<StdMutex<ConnectionContext>>,
    progress: broadcast::Sender<Progress>,
    busy: Arc<AsyncMutex<()>>,
    opened: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Consumes a reader and writer to connect. For exotic transports (unix
    /// sockets, TLS via a manually-wrapped stream); most callers want
    /// [`Connection::connect`].
    pub async fn connect_stream(
        read: impl AsyncRead + Unpin + Send + Sync + 'static,
        writer: impl AsyncWrite + Unpin + Send + Sync + 'static,
        options: ConnectionOptions,
    ) -> Result<Self> {
        Self::start(
            InternalClientIn::new(BufReader::new(read)),
            InternalClientOut::new(BufWriter::new(writer)),
            options,
        )
        .await
    }

    /// Connects over plaintext TCP, applying `options.connect_timeout` (spec
    /// section 6) to the TCP handshake itself. Expiry produces `TimeoutError`.
    pub async fn connect<A: ToSocketAddrs>(destination: A, options: ConnectionOptions) -> Result<Self> {
        let stream = connect_tcp(destination, options.connect_timeout).await?;
        let (read, writer) = stream.into_split();
        Self::connect_stream(read, writer, options).await
    }

    /// Connects over TLS (rustls), applying `options.connect_timeout` to
    /// both the TCP handshake and the TLS handshake.
    #[cfg(feature = "tls")]
    pub async fn connect_tls<A: ToSocketAddrs>(
        destination: A,
        options: ConnectionOptions,
        name: rustls_pki_types::ServerName<'static>,
        connector: &tokio_rustls::TlsConnector,
    ) -> Result<Self> {
        let stream = connect_tcp(destination, options.connect_timeout).await?;
        let tls_stream = apply_timeout(
            options.connect_timeout,
            async move {
                connector
                    .connect(name, stream)
                    .await
                    .map_err(|e| KlickhouseError::ConnectionError(format!("tls handshake failed: {e}")))
            },
            "tls handshake",
        )
        .await?;
        let (read, writer) = tokio::io::split(tls_stream);
        Self::connect_stream(read, writer, options).await
    }

    /// Opens a connection from a parsed [`crate::Dsn`] (spec section 6).
    /// Threads the DSN's `connect_timeout`/`send_receive_timeout`/
    /// `sync_request_timeout` through [`ConnectionOptions`]. A DSN with
    /// `secure=true` requires the `tls` feature and a caller-supplied
    /// connector/server name (see [`Connection::connect_tls_dsn`]) -- this
    /// driver passes through trust settings, it does not build its own trust
    /// store (spec section 1 non-goals).
    pub async fn connect_dsn(dsn: &crate::Dsn) -> Result<Self> {
        if dsn.secure {
            return Err(KlickhouseError::ConnectionError(
                "dsn requests a secure connection; use Connection::connect_tls_dsn with an explicit TLS connector".to_string(),
            ));
        }
        let options = ConnectionOptions::from_dsn(dsn);
        Self::connect(dsn.address(), options).await
    }

    /// Like [`Connection::connect_dsn`], but for `secure=true` DSNs: the
    /// caller still supplies the `TlsConnector`/server name (trust
    /// management is out of scope, spec section 1), while the DSN's
    /// database/credentials/timeouts are threaded through as usual.
    #[cfg(feature = "tls")]
    pub async fn connect_tls_dsn(
        dsn: &crate::Dsn,
        name: rustls_pki_types::ServerName<'static>,
        connector: &tokio_rustls::TlsConnector,
    ) -> Result<Self> {
        let options = ConnectionOptions::from_dsn(dsn);
        Self::connect_tls(dsn.address(), options, name, connector).await
    }

    async fn start<R: ClickhouseRead + 'static, W: ClickhouseWrite + 'static>(
        input: InternalClientIn<R>,
        output: InternalClientOut<W>,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let progress = broadcast::channel(PROGRESS_CAPACITY).0;
        let context = Arc::new(StdMutex::new(ConnectionContext::default()));
        let closed = Arc::new(AtomicBool::new(false));

        let inner = InnerClient {
            input,
            output,
            options,
            executing_query: None,
            pending_ping: None,
            progress: progress.clone(),
            context: context.clone(),
            closed: closed.clone(),
        };

        let (sender, receiver) = mpsc::channel(1024);
        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(inner.run(receiver, ready_tx));
        ready_rx
            .await
            .map_err(|e| {
                KlickhouseError::ConnectionError(format!("connection task died during handshake: {e}"))
            })??;

        Ok(Connection {
            sender,
            context,
            progress,
            busy: Arc::new(AsyncMutex::new(())),
            opened: Arc::new(AtomicBool::new(true)),
            closed,
        })
    }

    fn acquire_busy(&self) -> Result<OwnedMutexGuard<()>> {
        self.busy
            .clone()
            .try_lock_owned()
            .map_err(|_| KlickhouseError::ConnectionBusy)
    }

    async fn start_query(&self, query: &str, settings: Vec<Setting>) -> Result<mpsc::Receiver<Result<Block>>> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Request {
                data: RequestData::Query {
                    query: query.to_string(),
                    settings,
                    response: sender,
                },
            })
            .await
            .map_err(|e| KlickhouseError::ConnectionError(format!("connection is closed: {e}")))?;
        receiver
            .await
            .map_err(|e| KlickhouseError::ConnectionError(format!("connection dropped response: {e}")))?
    }

    async fn send_data(&self, block: Block) -> Result<()> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Request {
                data: RequestData::SendData {
                    block,
                    response: sender,
                },
            })
            .await
            .map_err(|e| KlickhouseError::ConnectionError(format!("connection is closed: {e}")))?;
        receiver
            .await
            .map_err(|e| KlickhouseError::ConnectionError(format!("connection dropped response: {e}")))??;
        Ok(())
    }

    /// Sends a query along with a single block of associated data (i.e. an
    /// insert), and returns whatever response blocks the server sends back.
    pub async fn insert_block(&self, query: impl Into<String>, block: Block) -> Result<impl Stream<Item = Result<Block>>> {
        let guard = self.acquire_busy()?;
        let receiver = self.start_query(&query.into(), Vec::new()).await?;
        self.send_data(block).await?;
        self.send_data(Block::default()).await?;
        Ok(GuardedStream {
            _guard: guard,
            inner: ReceiverStream::new(receiver),
        })
    }

    /// Sends a query along with a stream of associated data blocks (i.e. an
    /// insert), terminating the insert once `blocks` is exhausted.
    pub async fn insert_native_raw(
        &self,
        query: impl Into<String>,
        mut blocks: impl Stream<Item = Block> + Send + Sync + Unpin + 'static,
    ) -> Result<impl Stream<Item = Result<Block>>> {
        let guard = self.acquire_busy()?;
        let receiver = self.start_query(&query.into(), Vec::new()).await?;
        while let Some(block) = blocks.next().await {
            self.send_data(block).await?;
        }
        self.send_data(Block::default()).await?;
        Ok(GuardedStream {
            _guard: guard,
            inner: ReceiverStream::new(receiver),
        })
    }

    /// Inserts a batch of typed rows. Fetches the target schema block the
    /// server replies with, serializes every row against it, and sends the
    /// whole batch as a single block (unbounded streaming inserts are out of
    /// scope; callers that need batching call this once per batch).
    pub async fn insert_native<T: Row>(&self, query: impl Into<String>, rows: Vec<T>) -> Result<()> {
        let guard = self.acquire_busy()?;
        let receiver = self.start_query(&query.into(), Vec::new()).await?;
        let mut stream = ReceiverStream::new(receiver);

        let schema = stream.next().await.ok_or_else(|| {
            KlickhouseError::ProtocolError("server closed connection before sending insert schema".to_string())
        })??;

        let mut column_data: IndexMap<String, Vec<Value>> = schema
            .column_types
            .keys()
            .map(|name| (name.clone(), Vec::with_capacity(rows.len())))
            .collect();

        let row_count = rows.len() as u64;
        for row in rows {
            let values = row.serialize_row(&schema.column_types)?;
            for (name, value) in values {
                let name = name.into_owned();
                column_data
                    .get_mut(&name)
                    .ok_or_else(|| {
                        KlickhouseError::SerializeError(format!("row produced unknown column '{name}'"))
                    })?
                    .push(value);
            }
        }

        let data_block = Block {
            info: BlockInfo::default(),
            rows: row_count,
            column_types: schema.column_types.clone(),
            column_data,
        };
        self.send_data(data_block).await?;
        self.send_data(Block::default()).await?;

        while let Some(next) = stream.next().await {
            next?;
        }
        drop(guard);
        Ok(())
    }

    /// Runs a query, returning a stream of deserialized row batches. No rows
    /// arrive until the server sends a full block.
    pub async fn query<T: Row>(&self, query: impl Into<String>) -> Result<impl Stream<Item = Result<Vec<T>>>> {
        let raw = self.query_raw(query).await?;
        Ok(raw.map(|block| match block {
            Ok(mut block) => block
                .take_iter_rows()
                .map(T::deserialize_row)
                .collect::<Result<Vec<_>>>(),
            Err(e) => Err(e),
        }))
    }

    /// Same as `query`, but returns only the first row and discards the rest
    /// of the result set.
    pub async fn query_one<T: Row>(&self, query: impl Into<String>) -> Result<T> {
        let mut stream = self.query::<T>(query).await?;
        while let Some(rows) = stream.next().await {
            if let Some(row) = rows?.into_iter().next() {
                return Ok(row);
            }
        }
        Err(KlickhouseError::MissingRow)
    }

    /// Sends a query and returns a stream of raw column blocks. Prefer
    /// [`Connection::query`] for typed rows.
    pub async fn query_raw(&self, query: impl Into<String>) -> Result<impl Stream<Item = Result<Block>>> {
        let guard = self.acquire_busy()?;
        let receiver = self.start_query(&query.into(), Vec::new()).await?;
        Ok(GuardedStream {
            _guard: guard,
            inner: ReceiverStream::new(receiver),
        })
    }

    /// Same as [`Connection::query_raw`], but returns a stream of raw blocks
    /// as they arrive for SELECT-style streaming reads (spec section 4.6
    /// `execute_iter`).
    pub async fn execute_iter(&self, query: impl Into<String>) -> Result<impl Stream<Item = Result<Block>>> {
        self.query_raw(query).await
    }

    /// Runs a query and discards all returned blocks, waiting for the full
    /// result (or error) before returning.
    pub async fn execute(&self, query: impl Into<String>) -> Result<()> {
        let mut stream = self.query::<RawRow>(query).await?;
        while let Some(next) = stream.next().await {
            next?;
        }
        Ok(())
    }

    /// Same as `execute`, but only waits for the first block or error instead
    /// of draining the whole result. The query can still be aborted if the
    /// connection is dropped immediately afterwards.
    pub async fn execute_now(&self, query: impl Into<String>) -> Result<()> {
        let mut stream = self.query::<RawRow>(query).await?;
        stream.next().await.transpose()?;
        Ok(())
    }

    /// Sends `Cancel` for the in-flight query, if any. Idempotent: calling it
    /// with no query in flight is a no-op on the server side.
    pub async fn cancel(&self) -> Result<()> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Request {
                data: RequestData::Cancel { response: sender },
            })
            .await
            .map_err(|e| KlickhouseError::ConnectionError(format!("connection is closed: {e}")))?;
        receiver
            .await
            .map_err(|e| KlickhouseError::ConnectionError(format!("connection dropped response: {e}")))??;
        Ok(())
    }

    /// Ping/Pong round trip under `timeout`. Returns `Ok(false)` on a bare
    /// timeout rather than an error; other failures (e.g. the connection
    /// being busy or already closed) are still reported as errors.
    pub async fn ping(&self, timeout: Duration) -> Result<bool> {
        let _guard = self.acquire_busy()?;
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Request {
                data: RequestData::Ping { response: sender },
            })
            .await
            .map_err(|e| KlickhouseError::ConnectionError(format!("connection is closed: {e}")))?;

        match tokio::time::timeout(timeout, receiver).await {
            Err(_) => Ok(false),
            Ok(Err(e)) => Err(KlickhouseError::ConnectionError(format!(
                "connection dropped ping response: {e}"
            ))),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Ok(Ok(()))) => Ok(true),
        }
    }

    /// Clears transient per-query context (last profile info/totals/extremes)
    /// so a pooled connection doesn't leak state across checkouts. Client-side
    /// only, no server round trip (spec section 9, open question).
    pub fn reset_state(&self) {
        *self.context.lock().unwrap() = ConnectionContext::default();
    }

    /// The last-seen `ProfileInfo`/`Totals`/`Extremes` context, if any.
    pub fn context(&self) -> ConnectionContext {
        self.context.lock().unwrap().clone()
    }

    /// Best-effort close: tells the background task to stop and marks this
    /// handle (and every clone of it) closed. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self
            .sender
            .send(Request {
                data: RequestData::Shutdown,
            })
            .await;
    }

    /// Whether the handshake has completed. True for the lifetime of a
    /// successfully constructed `Connection`.
    pub fn is_opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    /// Whether this connection has been closed, either explicitly or because
    /// the background task exited after an I/O or protocol error.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.sender.is_closed()
    }

    /// Subscribes to `Progress` updates for whatever query is currently
    /// executing on this connection.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<Progress> {
        self.progress.subscribe()
    }
}
