use futures_util::TryStreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;

use crate::{IllustrateError, Result};

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Clone, Copy, Debug)]
pub struct SseLimits {
    pub max_line_bytes: usize,
}

impl Default for SseLimits {
    fn default() -> Self {
        // A completed event inlines the whole generated image as base64.
        Self {
            max_line_bytes: 16 * 1024 * 1024,
        }
    }
}

/// How a single trimmed stream line is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Blank lines, `:` comments and non-data fields.
    Skip,
    Data(&'a str),
    Done,
}

impl<'a> SseLine<'a> {
    pub fn classify(raw: &'a str) -> Self {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(':') {
            return Self::Skip;
        }
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            return Self::Skip;
        };
        if data == DONE_SENTINEL {
            Self::Done
        } else {
            Self::Data(data)
        }
    }
}

/// Pull-based line reader over a live response body.
pub struct SseLineReader<R> {
    reader: R,
    line: Vec<u8>,
    limits: SseLimits,
}

impl<R> SseLineReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, SseLimits::default())
    }

    pub fn with_limits(reader: R, limits: SseLimits) -> Self {
        Self {
            reader,
            line: Vec::new(),
            limits: SseLimits {
                max_line_bytes: limits.max_line_bytes.max(1),
            },
        }
    }

    /// Next line without its terminator; `None` once the connection closes.
    /// A trailing line without `\n` is still returned.
    pub async fn next_line(&mut self) -> Result<Option<&str>> {
        self.line.clear();
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                if self.line.is_empty() {
                    return Ok(None);
                }
                break;
            }

            let (chunk, complete) = match buf.iter().position(|b| *b == b'\n') {
                Some(pos) => (&buf[..=pos], true),
                None => (buf, false),
            };
            if self.line.len() + chunk.len() > self.limits.max_line_bytes {
                return Err(IllustrateError::InvalidResponse(format!(
                    "stream line longer than {} bytes",
                    self.limits.max_line_bytes
                )));
            }
            self.line.extend_from_slice(chunk);
            let consumed = chunk.len();
            self.reader.consume(consumed);
            if complete {
                break;
            }
        }

        let line = std::str::from_utf8(&self.line).map_err(|err| {
            IllustrateError::InvalidResponse(format!("stream line is not UTF-8: {err}"))
        })?;
        Ok(Some(line.trim_end_matches(['\r', '\n'])))
    }
}

pub fn sse_reader_from_response(
    response: reqwest::Response,
) -> SseLineReader<tokio::io::BufReader<impl tokio::io::AsyncRead + Send + Unpin>> {
    let byte_stream = response.bytes_stream().map_err(std::io::Error::other);
    let reader = StreamReader::new(byte_stream);
    SseLineReader::new(tokio::io::BufReader::new(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;

    #[test]
    fn classifies_lines() {
        assert_eq!(SseLine::classify(""), SseLine::Skip);
        assert_eq!(SseLine::classify("   \t"), SseLine::Skip);
        assert_eq!(SseLine::classify(": keep-alive"), SseLine::Skip);
        assert_eq!(SseLine::classify("event: response.completed"), SseLine::Skip);
        assert_eq!(SseLine::classify("data: [DONE]"), SseLine::Done);
        assert_eq!(SseLine::classify("  data: {\"a\":1}\r"), SseLine::Data("{\"a\":1}"));
        assert_eq!(SseLine::classify("data:{\"a\":1}"), SseLine::Skip);
    }

    #[tokio::test]
    async fn reads_lines_across_chunk_boundaries() -> crate::Result<()> {
        let chunks = [
            Ok::<_, std::io::Error>(Bytes::from_static(b"data: {\"he")),
            Ok(Bytes::from_static(b"llo\":1}\r\n\n: ping\n")),
            Ok(Bytes::from_static(b"data: [DONE]")),
        ];
        let reader = StreamReader::new(stream::iter(chunks));
        let mut lines = SseLineReader::new(tokio::io::BufReader::new(reader));

        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await? {
            out.push(line.to_string());
        }

        assert_eq!(out, vec!["data: {\"hello\":1}", "", ": ping", "data: [DONE]"]);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_lines_over_max_line_bytes() {
        let sse = format!("data: {}\n", "x".repeat(1024));
        let reader = StreamReader::new(stream::iter([Ok::<_, std::io::Error>(Bytes::from(sse))]));
        let mut lines = SseLineReader::with_limits(
            tokio::io::BufReader::new(reader),
            SseLimits { max_line_bytes: 64 },
        );

        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
        assert!(err.to_string().contains("longer than 64 bytes"));
    }

    #[tokio::test]
    async fn rejects_invalid_utf8() {
        let reader = StreamReader::new(stream::iter([Ok::<_, std::io::Error>(
            Bytes::from_static(b"data: \xff\xfe\n"),
        )]));
        let mut lines = SseLineReader::new(tokio::io::BufReader::new(reader));

        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let chunks = [
            Ok(Bytes::from_static(b"data: {}\n")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            )),
        ];
        let reader = StreamReader::new(stream::iter(chunks));
        let mut lines = SseLineReader::new(tokio::io::BufReader::new(reader));

        assert_eq!(lines.next_line().await.ok().flatten(), Some("data: {}"));
        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
