//! `Content-Length`-framed JSON-RPC 2.0 wire encoding.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Encode `message` as `Content-Length: N\r\n\r\n<N bytes>`.
pub fn encode(message: &Value) -> Vec<u8> {
    let body = serde_json::to_vec(message).expect("JSON-RPC message must serialize");
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut out = header.into_bytes();
    out.extend_from_slice(&body);
    out
}

pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> std::io::Result<()> {
    writer.write_all(&encode(message)).await?;
    writer.flush().await
}

/// Read one framed JSON-RPC message, parsing the `Content-Length` header
/// byte-for-byte rather than splitting on newlines in the body.
///
/// Returns `Ok(None)` on clean EOF (the server's stdout closed).
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Value>> {
    let mut content_length: Option<usize> = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        if !read_line(reader, &mut line).await? {
            return Ok(None);
        }
        if line.is_empty() {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        if let Some(value) = text.strip_prefix("Content-Length:") {
            content_length = value.trim().parse().ok();
        }
    }

    let Some(len) = content_length else {
        return Ok(None);
    };

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body).ok())
}

/// Read a single `\r\n`-terminated header line. Returns `false` on EOF
/// before any bytes were read.
async fn read_line<R: AsyncRead + Unpin>(reader: &mut R, out: &mut Vec<u8>) -> std::io::Result<bool> {
    let mut byte = [0u8; 1];
    let mut saw_any = false;
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Ok(saw_any);
        }
        saw_any = true;
        if byte[0] == b'\n' {
            if out.last() == Some(&b'\r') {
                out.pop();
            }
            return Ok(true);
        }
        out.push(byte[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_a_message() {
        let msg = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});
        let encoded = encode(&msg);
        let mut cursor = std::io::Cursor::new(encoded);
        let decoded = read_message(&mut cursor).await.unwrap().unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn returns_none_on_empty_input() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(read_message(&mut cursor).await.unwrap().is_none());
    }
}
