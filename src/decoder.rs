use tokio::io::AsyncBufRead;

use crate::Result;
use crate::event::StreamEvent;
use crate::sse::{SseLine, SseLineReader};

/// What a finished stream produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedStream {
    /// Base64 image payload from the last completed event that carried one.
    pub image_b64: Option<String>,
    pub events: usize,
    pub malformed_events: usize,
    pub saw_done: bool,
}

/// Folds stream lines into a single optional image payload.
#[derive(Debug, Default)]
pub struct ImageStreamDecoder {
    state: DecodedStream,
}

impl ImageStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one raw line. Returns `false` once the terminator has been seen.
    pub fn push_line(&mut self, raw: &str) -> bool {
        if self.state.saw_done {
            return false;
        }
        match SseLine::classify(raw) {
            SseLine::Skip => true,
            SseLine::Done => {
                self.state.saw_done = true;
                false
            }
            SseLine::Data(data) => {
                let Some(event) = StreamEvent::parse(data) else {
                    self.state.malformed_events += 1;
                    return true;
                };
                self.state.events += 1;
                if let Some(result) = event.image_result() {
                    self.state.image_b64 = Some(result.to_string());
                }
                true
            }
        }
    }

    pub fn finish(self) -> DecodedStream {
        self.state
    }
}

/// Consumes `lines` until `[DONE]` or connection close.
///
/// Malformed events are skipped; read failures propagate.
pub async fn decode_image_stream<R>(lines: &mut SseLineReader<R>) -> Result<DecodedStream>
where
    R: AsyncBufRead + Unpin,
{
    let mut decoder = ImageStreamDecoder::new();
    while let Some(line) = lines.next_line().await? {
        if !decoder.push_line(line) {
            break;
        }
    }
    let decoded = decoder.finish();
    if decoded.malformed_events > 0 {
        tracing::debug!(
            malformed = decoded.malformed_events,
            events = decoded.events,
            "skipped malformed stream events"
        );
    }
    Ok(decoded)
}
