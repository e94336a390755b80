//! Per-block compression framing (spec section 4.2).
//!
//! Wire shape: `checksum(16) || method(1) || compressed_size(4 LE) ||
//! uncompressed_size(4 LE) || body`. `compressed_size` counts the method
//! byte, the two size fields and the body (i.e. `9 + body.len()`).
//! `checksum` is CityHash128 over everything from `method` onward.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::io::{AsyncRead, ReadBuf};

use crate::{block::Block, protocol::CompressionMethod, KlickhouseError, Result};

/// Marker stashed in an `io::Error`'s source so the caller can tell a
/// checksum failure apart from a transport-level I/O error without string
/// matching. See [`KlickhouseError`]'s `From<std::io::Error>` impl.
#[derive(Debug)]
pub(crate) struct ChecksumMismatch;

impl fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "checksum mismatch decompressing block")
    }
}

impl std::error::Error for ChecksumMismatch {}

fn io_err(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}

fn checksum(method: u8, compressed_size: u32, uncompressed_size: u32, body: &[u8]) -> u128 {
    let mut hashed = Vec::with_capacity(9 + body.len());
    hashed.push(method);
    hashed.extend_from_slice(&compressed_size.to_le_bytes());
    hashed.extend_from_slice(&uncompressed_size.to_le_bytes());
    hashed.extend_from_slice(body);
    cityhash_rs::cityhash_102_128(&hashed)
}

fn compress_body(method: CompressionMethod, raw: &[u8]) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(raw.to_vec()),
        #[cfg(feature = "lz4")]
        CompressionMethod::LZ4 => lz4::block::compress(raw, None, false)
            .map_err(|e| KlickhouseError::ProtocolError(format!("lz4 compression failed: {e}"))),
        #[cfg(feature = "zstd")]
        CompressionMethod::ZSTD => {
            zstd::stream::encode_all(raw, 0).map_err(|e| {
                KlickhouseError::ProtocolError(format!("zstd compression failed: {e}"))
            })
        }
        #[allow(unreachable_patterns)]
        other => Err(KlickhouseError::ProtocolError(format!(
            "{other:?} compression requested but klickhouse wasn't built with that codec"
        ))),
    }
}

fn decompress_body(method: CompressionMethod, body: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(body.to_vec()),
        #[cfg(feature = "lz4")]
        CompressionMethod::LZ4 => lz4::block::decompress(body, Some(uncompressed_size as i32))
            .map_err(|e| KlickhouseError::ProtocolError(format!("lz4 decompression failed: {e}"))),
        #[cfg(feature = "zstd")]
        CompressionMethod::ZSTD => zstd::stream::decode_all(body).map_err(|e| {
            KlickhouseError::ProtocolError(format!("zstd decompression failed: {e}"))
        }),
        #[allow(unreachable_patterns)]
        other => Err(KlickhouseError::ProtocolError(format!(
            "{other:?} compression received but klickhouse wasn't built with that codec"
        ))),
    }
}

/// Serializes `block`, compresses it with `method`, and frames it per the
/// wire format above. Returns the complete frame, checksum included.
pub async fn compress_block(
    block: Block,
    method: CompressionMethod,
    revision: u64,
) -> Result<Vec<u8>> {
    let mut raw = vec![];
    block.write(&mut raw, revision).await?;
    let uncompressed_size = raw.len() as u32;
    let body = compress_body(method, &raw)?;
    let compressed_size = body.len() as u32 + 9;

    let mut frame = Vec::with_capacity(9 + body.len());
    frame.push(method.byte());
    frame.extend_from_slice(&compressed_size.to_le_bytes());
    frame.extend_from_slice(&uncompressed_size.to_le_bytes());
    frame.extend_from_slice(&body);

    let hash = checksum(method.byte(), compressed_size, uncompressed_size, &body);
    let mut out = Vec::with_capacity(16 + frame.len());
    out.extend_from_slice(&((hash >> 64) as u64).to_le_bytes());
    out.extend_from_slice(&(hash as u64).to_le_bytes());
    out.extend_from_slice(&frame);
    Ok(out)
}

#[derive(Debug)]
enum State {
    Header { buf: [u8; 25], filled: usize },
    Body { method: u8, uncompressed_size: u32, expected: u128, buf: Vec<u8>, filled: usize },
    Ready { data: Vec<u8>, pos: usize },
    Eof,
}

/// Wraps an inner reader, transparently decompressing one checksum-framed
/// block at a time. Implements [`AsyncRead`] by hand (rather than eagerly
/// reading the whole frame up front) so it composes with the same
/// `read_exact`-style call sites that read an uncompressed stream.
pub struct DecompressionReader<'a, R> {
    inner: &'a mut R,
    state: State,
}

impl<'a, R: AsyncRead + Unpin + Send + Sync> DecompressionReader<'a, R> {
    pub fn new(inner: &'a mut R) -> Self {
        DecompressionReader {
            inner,
            state: State::Header { buf: [0u8; 25], filled: 0 },
        }
    }
}

impl<'a, R: AsyncRead + Unpin + Send + Sync> AsyncRead for DecompressionReader<'a, R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                State::Header { buf, filled } => {
                    while *filled < buf.len() {
                        let mut rb = ReadBuf::new(&mut buf[*filled..]);
                        match Pin::new(&mut *this.inner).poll_read(cx, &mut rb) {
                            Poll::Ready(Ok(())) => {
                                let n = rb.filled().len();
                                if n == 0 {
                                    if *filled == 0 {
                                        this.state = State::Eof;
                                        return Poll::Ready(Ok(()));
                                    }
                                    return Poll::Ready(Err(std::io::Error::new(
                                        std::io::ErrorKind::UnexpectedEof,
                                        "eof mid compressed block header",
                                    )));
                                }
                                *filled += n;
                            }
                            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                    let hi = u64::from_le_bytes(buf[0..8].try_into().unwrap());
                    let lo = u64::from_le_bytes(buf[8..16].try_into().unwrap());
                    let expected = ((hi as u128) << 64) | lo as u128;
                    let method = buf[16];
                    let compressed_size = u32::from_le_bytes(buf[17..21].try_into().unwrap());
                    let uncompressed_size = u32::from_le_bytes(buf[21..25].try_into().unwrap());
                    if compressed_size < 9 {
                        return Poll::Ready(Err(io_err(format!(
                            "compressed block size too small: {compressed_size}"
                        ))));
                    }
                    let body_len = compressed_size as usize - 9;
                    this.state = State::Body {
                        method,
                        uncompressed_size,
                        expected,
                        buf: vec![0u8; body_len],
                        filled: 0,
                    };
                }
                State::Body { buf, filled, .. } => {
                    while *filled < buf.len() {
                        let mut rb = ReadBuf::new(&mut buf[*filled..]);
                        match Pin::new(&mut *this.inner).poll_read(cx, &mut rb) {
                            Poll::Ready(Ok(())) => {
                                let n = rb.filled().len();
                                if n == 0 {
                                    return Poll::Ready(Err(std::io::Error::new(
                                        std::io::ErrorKind::UnexpectedEof,
                                        "eof mid compressed block body",
                                    )));
                                }
                                *filled += n;
                            }
                            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                    let (method, uncompressed_size, expected, buf) = match std::mem::replace(
                        &mut this.state,
                        State::Eof,
                    ) {
                        State::Body { method, uncompressed_size, expected, buf, .. } => {
                            (method, uncompressed_size, expected, buf)
                        }
                        _ => unreachable!(),
                    };
                    let compressed_size = buf.len() as u32 + 9;
                    let actual = checksum(method, compressed_size, uncompressed_size, &buf);
                    if actual != expected {
                        return Poll::Ready(Err(io_err(ChecksumMismatch)));
                    }
                    let method = match CompressionMethod::from_byte(method) {
                        Ok(m) => m,
                        Err(e) => return Poll::Ready(Err(io_err(e.to_string()))),
                    };
                    let data = match decompress_body(method, &buf, uncompressed_size as usize) {
                        Ok(d) => d,
                        Err(e) => return Poll::Ready(Err(io_err(e.to_string()))),
                    };
                    this.state = State::Ready { data, pos: 0 };
                }
                State::Ready { data, pos } => {
                    if *pos >= data.len() {
                        this.state = State::Header { buf: [0u8; 25], filled: 0 };
                        continue;
                    }
                    let n = out.remaining().min(data.len() - *pos);
                    out.put_slice(&data[*pos..*pos + n]);
                    *pos += n;
                    return Poll::Ready(Ok(()));
                }
                State::Eof => return Poll::Ready(Ok(())),
            }
        }
    }
}

/// Reads one checksum-framed, compressed block from `reader`.
pub async fn read_compressed_block<R: AsyncRead + Unpin + Send + Sync>(
    reader: &mut R,
    revision: u64,
) -> Result<Block> {
    let mut decompressor = DecompressionReader::new(reader);
    Block::read(&mut decompressor, revision).await
}
