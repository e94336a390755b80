use thiserror::Error;

/// The crate's single error type.
///
/// Broadly split the way the wire protocol splits failures: problems the
/// caller created (`InterfaceError`-flavored variants) versus problems the
/// connection or the server created (`DatabaseError`-flavored variants).
/// `kind()` exposes that split without forcing callers to match on every
/// variant.
#[derive(Error, Debug)]
pub enum KlickhouseError {
    #[error("io error: {0}")]
    Io(std::io::Error),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("checksum mismatch decompressing block")]
    ChecksumError,

    #[error("type parse error: {0}")]
    TypeParseError(String),

    #[error("deserialize error: {0}")]
    DeserializeError(String),

    #[error("serialize error: {0}")]
    SerializeError(String),

    #[error("server exception {code} ({name}): {message}")]
    ServerException {
        code: i32,
        name: String,
        message: String,
        stack_trace: String,
    },

    #[error("timed out waiting for {0}")]
    TimeoutError(String),

    #[error("connection is busy with another query")]
    ConnectionBusy,

    #[error("pool is closed")]
    PoolClosed,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("duplicate field '{0}'")]
    DuplicateField(&'static str),

    #[error("no row returned")]
    MissingRow,

    #[error("column index out of bounds")]
    OutOfBounds,

    #[error("value already taken from row")]
    DoubleFetch,

    #[error("invalid dsn: {0}")]
    DsnError(String),

    #[error("cursor is closed")]
    CursorClosed,
}

/// Coarse bucket a [`KlickhouseError`] falls into, mirroring the two-level
/// taxonomy every DB-API-style driver exposes: errors the caller caused vs.
/// errors the connection or server caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client misuse: bad arguments, double-fetching a row, using a closed
    /// cursor/pool, malformed DSN.
    Interface,
    /// The connection itself is unusable (io failure, checksum mismatch,
    /// protocol desync) and must be discarded, not reused.
    Connection,
    /// The server understood the request and rejected it; the connection is
    /// still usable afterwards.
    Operational,
    /// Timed out waiting on I/O or a pool slot.
    Timeout,
}

impl KlickhouseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KlickhouseError::Io(_)
            | KlickhouseError::ConnectionError(_)
            | KlickhouseError::ProtocolError(_)
            | KlickhouseError::ChecksumError => ErrorKind::Connection,
            KlickhouseError::ServerException { .. } => ErrorKind::Operational,
            KlickhouseError::TimeoutError(_) => ErrorKind::Timeout,
            _ => ErrorKind::Interface,
        }
    }

    /// Whether a connection that produced this error must be discarded
    /// rather than returned to a pool.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection | ErrorKind::Timeout)
    }
}

impl From<std::io::Error> for KlickhouseError {
    /// A checksum failure surfaces from [`crate::compression`] as an
    /// `io::Error` wrapping a `ChecksumMismatch` marker (so it can flow
    /// through `?` at every `AsyncRead` call site); unwrap it back into a
    /// dedicated variant instead of leaving it stringified inside `Io`.
    fn from(e: std::io::Error) -> Self {
        if e.get_ref()
            .map(|inner| inner.is::<crate::compression::ChecksumMismatch>())
            .unwrap_or(false)
        {
            return KlickhouseError::ChecksumError;
        }
        KlickhouseError::Io(e)
    }
}

pub fn missing_field(name: &'static str) -> KlickhouseError {
    KlickhouseError::MissingField(name)
}

pub fn duplicate_field(name: &'static str) -> KlickhouseError {
    KlickhouseError::DuplicateField(name)
}

pub type Result<T, E = KlickhouseError> = std::result::Result<T, E>;
