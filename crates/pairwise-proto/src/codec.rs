//! Newline-delimited JSON with `END`-terminated bursts.
//!
//! A logical exchange is a burst of message lines closed by a sentinel line
//! `END`. An empty line also closes a burst on input; only `END` is ever
//! written.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Sentinel line terminating a burst.
pub const SENTINEL: &str = "END";

/// One decoded input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<T> {
    /// A message.
    Message(T),
    /// Burst terminator (`END` or an empty line).
    End,
}

/// Decode a single line, without its trailing newline.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<Line<T>, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed == SENTINEL {
        return Ok(Line::End);
    }
    Ok(Line::Message(serde_json::from_str(trimmed)?))
}

/// Encode a message as one line, including the trailing newline.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Line-oriented reader over a buffered byte stream.
pub struct LineReader<R> {
    inner: R,
    buf: String,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Wrap a buffered reader.
    pub fn new(inner: R) -> Self {
        Self { inner, buf: String::new() }
    }

    /// Read and decode the next line. `None` at end of stream.
    pub async fn next_line<T: DeserializeOwned>(
        &mut self,
    ) -> Result<Option<Line<T>>, ProtocolError> {
        self.buf.clear();
        let n = self.inner.read_line(&mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        decode_line(&self.buf).map(Some)
    }

    /// Read messages up to the next terminator.
    ///
    /// Fails with [`ProtocolError::ConnectionClosed`] if the stream ends
    /// first, and on the first line that does not decode.
    pub async fn read_burst<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, ProtocolError> {
        let mut messages = Vec::new();
        loop {
            match self.next_line().await? {
                Some(Line::Message(msg)) => messages.push(msg),
                Some(Line::End) => return Ok(messages),
                None => return Err(ProtocolError::ConnectionClosed),
            }
        }
    }
}

/// Write `messages` followed by the sentinel line, then flush.
pub async fn write_burst<W, T>(writer: &mut W, messages: &[T]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut out = String::new();
    for msg in messages {
        out.push_str(&encode_line(msg)?);
    }
    out.push_str(SENTINEL);
    out.push('\n');

    writer.write_all(out.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;
    use crate::messages::{ControllerMessage, MrMetadata, PeerMessage, QpMetadata};

    #[test]
    fn sentinel_and_blank_lines_end_a_burst() {
        assert_eq!(decode_line::<PeerMessage>("END\n").unwrap(), Line::End);
        assert_eq!(decode_line::<PeerMessage>("  END  ").unwrap(), Line::End);
        assert_eq!(decode_line::<PeerMessage>("\n").unwrap(), Line::End);
        assert_eq!(decode_line::<PeerMessage>("").unwrap(), Line::End);
    }

    #[test]
    fn garbage_line_is_an_error() {
        assert!(matches!(decode_line::<PeerMessage>("{not json"), Err(ProtocolError::Json(_))));
    }

    #[tokio::test]
    async fn write_then_read_burst() {
        let (mut client, server) = tokio::io::duplex(1024);
        let sent = vec![
            ControllerMessage::MrMetadata(MrMetadata { addr: 1, rkey: 2 }),
            ControllerMessage::MrMetadata(MrMetadata { addr: 3, rkey: 4 }),
        ];

        write_burst(&mut client, &sent).await.unwrap();
        drop(client);

        let mut reader = LineReader::new(BufReader::new(server));
        let received: Vec<ControllerMessage> = reader.read_burst().await.unwrap();
        assert_eq!(received, sent);

        let next: Option<Line<ControllerMessage>> = reader.next_line().await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn eof_before_sentinel_is_connection_closed() {
        let input = b"{\"type\":\"qp_metadata\",\"qpn\":1,\"addr\":0,\"rkey\":0}\n".as_slice();
        let mut reader = LineReader::new(BufReader::new(input));

        let result = reader.read_burst::<PeerMessage>().await;
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn blank_line_terminates_burst() {
        let input =
            b"{\"type\":\"qp_metadata\",\"qpn\":1,\"addr\":0,\"rkey\":0}\n\nleftover\n".as_slice();
        let mut reader = LineReader::new(BufReader::new(input));

        let burst: Vec<PeerMessage> = reader.read_burst().await.unwrap();
        assert_eq!(burst, vec![PeerMessage::QpMetadata(QpMetadata { qpn: 1, addr: 0, rkey: 0 })]);
    }
}
