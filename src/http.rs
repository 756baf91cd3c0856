use futures_util::StreamExt;

use crate::{IllustrateError, Result};

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;
const TRUNCATION_MARKER: &str = "...(truncated)";

/// Sends `req`, turning any non-2xx status into [`IllustrateError::Api`]
/// carrying at most 64 KiB of the response body.
pub(crate) async fn send_checked(req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = req.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = Vec::<u8>::new();
    let mut chunks = response.bytes_stream();
    let mut truncated = false;
    // A body that breaks off mid-read still explains the status; keep what arrived.
    while let Some(Ok(chunk)) = chunks.next().await {
        let room = MAX_ERROR_BODY_BYTES - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        body.extend_from_slice(&chunk);
    }

    let mut body = String::from_utf8_lossy(&body).into_owned();
    if truncated {
        body.push('\n');
        body.push_str(TRUNCATION_MARKER);
    }
    Err(IllustrateError::Api { status, body })
}
