
pub const VERSION_MAJOR: u64 = 21;
pub const VERSION_MINOR: u64 = 6;

mod io;
mod internal_client_out;
mod internal_client_in;
mod protocol;
mod connection;
mod block;
mod progress;
mod types;
mod values;
mod convert;
mod compression;
mod pool;
mod cursor;
mod dsn;
pub mod errors;

pub use uuid::Uuid;

pub use values::*;
pub use convert::{FromSql, ToSql, Row, RawRow, RowIndex, UnitValue, VecTuple, Json};
pub use types::Type;
pub use block::{Block, BlockInfo};
pub use protocol::{CompressionMethod, Setting};
pub use connection::{Connection, ConnectionOptions, ConnectionContext};
pub use pool::{Pool, PoolOptions, PooledConnection};
pub use cursor::{Cursor, DictCursor, DictRow};
pub use dsn::Dsn;
pub use errors::{KlickhouseError, ErrorKind};

pub use errors::Result;
pub type Error = KlickhouseError;