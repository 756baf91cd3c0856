use serde::Deserialize;

/// One decoded `data:` payload from the responses stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "response.completed")]
    Completed {
        #[serde(default)]
        response: CompletedResponse,
    },
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompletedResponse {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

/// An entry of `response.output`. Items with a missing or unknown `type`
/// decode as `Other` instead of failing the whole event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawOutputItem")]
pub enum OutputItem {
    ImageGenerationCall { result: Option<String> },
    Other,
}

#[derive(Deserialize)]
struct RawOutputItem {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl From<RawOutputItem> for OutputItem {
    fn from(raw: RawOutputItem) -> Self {
        match raw.kind.as_deref() {
            Some("image_generation_call") => Self::ImageGenerationCall {
                result: raw
                    .result
                    .as_ref()
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string),
            },
            _ => Self::Other,
        }
    }
}

impl StreamEvent {
    /// Malformed payloads decode to `None`; callers skip them.
    pub fn parse(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }

    /// The last non-empty `image_generation_call` result, if this is a completed event.
    pub fn image_result(&self) -> Option<&str> {
        let Self::Completed { response } = self else {
            return None;
        };
        response.output.iter().rev().find_map(|item| match item {
            OutputItem::ImageGenerationCall {
                result: Some(result),
            } if !result.is_empty() => Some(result.as_str()),
            _ => None,
        })
    }
}
