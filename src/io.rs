use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{protocol::MAX_STRING_SIZE, KlickhouseError, Result};

#[async_trait::async_trait]
pub trait ClickhouseRead: AsyncRead + Unpin + Send + Sync {
    async fn read_var_uint(&mut self) -> Result<u64>;

    /// Length-prefixed UTF-8 string, for protocol metadata (column names,
    /// query ids, handshake fields).
    async fn read_string(&mut self) -> Result<String>;

    /// Length-prefixed raw bytes, for `String`/`FixedString` column data,
    /// which carries no charset guarantee.
    async fn read_binary(&mut self) -> Result<Vec<u8>>;
}

#[async_trait::async_trait]
impl<T: AsyncRead + Unpin + Send + Sync> ClickhouseRead for T {
    async fn read_var_uint(&mut self) -> Result<u64> {
        let mut out = 0u64;
        for i in 0..9u64 {
            let mut octet = [0u8];
            self.read_exact(&mut octet[..]).await?;
            out |= ((octet[0] & 0x7F) as u64) << (7 * i);
            if (octet[0] & 0x80) == 0 {
                break;
            }
        }
        Ok(out)
    }

    async fn read_string(&mut self) -> Result<String> {
        let buf = self.read_binary().await?;
        String::from_utf8(buf)
            .map_err(|e| KlickhouseError::ProtocolError(format!("invalid utf8 string: {e}")))
    }

    async fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = self.read_var_uint().await?;
        if len as usize > MAX_STRING_SIZE {
            return Err(KlickhouseError::ProtocolError(format!(
                "string too large: {len} bytes"
            )));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf[..]).await?;
        Ok(buf)
    }
}

#[async_trait::async_trait]
pub trait ClickhouseWrite: AsyncWrite + Unpin + Send + Sync {
    async fn write_var_uint(&mut self, value: u64) -> Result<()>;

    async fn write_string(&mut self, value: impl AsRef<[u8]> + Send) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: AsyncWrite + Unpin + Send + Sync> ClickhouseWrite for T {
    async fn write_var_uint(&mut self, mut value: u64) -> Result<()> {
        for _ in 0..9u64 {
            let mut byte = value & 0x7F;
            if value > 0x7F {
                byte |= 0x80;
            }
            self.write_all(&[byte as u8]).await?;
            value >>= 7;
            if value == 0 {
                break;
            }
        }
        Ok(())
    }

    async fn write_string(&mut self, value: impl AsRef<[u8]> + Send) -> Result<()> {
        let value = value.as_ref();
        self.write_var_uint(value.len() as u64).await?;
        self.write_all(value).await?;
        Ok(())
    }
}
