//! Line codec for the stdio transport.
//!
//! One JSON message per line:
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"ping"}\n
//! ```
//! Blank lines are skipped. A line longer than the configured maximum is
//! discarded and reported as `InvalidData`; the stream stays usable.

use serde::Serialize;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default cap on one message, excluding the newline.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Read one message. Returns `None` on clean EOF.
pub async fn read_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_message_bytes: usize,
) -> io::Result<Option<String>> {
    loop {
        let mut buf = Vec::new();
        // One byte of headroom for the terminating newline.
        let limit = max_message_bytes as u64 + 1;
        let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }

        if buf.len() > max_message_bytes && buf.last() != Some(&b'\n') {
            skip_line(reader).await?;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Message too large: exceeds {} bytes", max_message_bytes),
            ));
        }

        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        return String::from_utf8(buf)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
    }
}

/// Discard input up to and including the next newline.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}

/// Write one message as a single line and flush.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message).map_err(|e| {
        tracing::error!("JSON encoding failed: {}", e);
        io::Error::new(io::ErrorKind::InvalidData, e)
    })?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_reads_lines_and_skips_blanks() {
        let input = b"{\"a\":1}\n\n   \r\n{\"b\":2}\r\n";
        let mut reader = BufReader::new(&input[..]);

        assert_eq!(read_message(&mut reader, 1024).await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(read_message(&mut reader, 1024).await.unwrap().as_deref(), Some("{\"b\":2}"));
        assert_eq!(read_message(&mut reader, 1024).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let mut reader = BufReader::new(&b"{\"a\":1}"[..]);
        assert_eq!(read_message(&mut reader, 1024).await.unwrap().as_deref(), Some("{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_oversized_message_is_skipped() {
        let mut input = vec![b'x'; 64];
        input.extend_from_slice(b"\n{\"ok\":true}\n");
        let mut reader = BufReader::new(&input[..]);

        let err = read_message(&mut reader, 16).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        // The stream resynchronizes on the next line.
        assert_eq!(read_message(&mut reader, 16).await.unwrap().as_deref(), Some("{\"ok\":true}"));
    }

    #[tokio::test]
    async fn test_message_at_exact_limit() {
        let mut reader = BufReader::new(&b"0123456789\n"[..]);
        assert_eq!(read_message(&mut reader, 10).await.unwrap().as_deref(), Some("0123456789"));
    }

    #[tokio::test]
    async fn test_write_message_appends_newline() {
        let mut out = Vec::new();
        write_message(&mut out, &json!({"id": 1})).await.unwrap();
        assert_eq!(out, b"{\"id\":1}\n");
    }
}
