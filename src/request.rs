use std::path::Path;

use base64::Engine as _;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMediaType {
    Jpeg,
    Png,
}

impl ImageMediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Picks the MIME type from the file extension; anything but `.png` is sent as JPEG.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => Self::Png,
            _ => Self::Jpeg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageTurn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDirective {
    ImageGeneration,
}

/// Body of `POST <base>/responses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub stream: bool,
    pub input: Vec<MessageTurn>,
    pub tools: Vec<ToolDirective>,
}

impl GenerationRequest {
    /// One user turn: the instruction text followed by the sketch as a data URI.
    pub fn for_sketch(
        model: &str,
        prompt: &str,
        image: &[u8],
        media_type: ImageMediaType,
    ) -> Self {
        Self {
            model: model.to_string(),
            stream: true,
            input: vec![MessageTurn {
                role: Role::User,
                content: vec![
                    ContentBlock::InputText {
                        text: prompt.to_string(),
                    },
                    ContentBlock::InputImage {
                        image_url: image_data_uri(image, media_type),
                    },
                ],
            }],
            tools: vec![ToolDirective::ImageGeneration],
        }
    }
}

pub fn image_data_uri(image: &[u8], media_type: ImageMediaType) -> String {
    let data = base64::engine::general_purpose::STANDARD.encode(image);
    format!("data:{};base64,{data}", media_type.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_responses_payload() -> crate::Result<()> {
        let request =
            GenerationRequest::for_sketch("gpt-5-nano", "draw it", &[1, 2, 3], ImageMediaType::Jpeg);
        let value = serde_json::to_value(&request)?;
        assert_eq!(
            value,
            json!({
                "model": "gpt-5-nano",
                "stream": true,
                "input": [{
                    "role": "user",
                    "content": [
                        {"type": "input_text", "text": "draw it"},
                        {"type": "input_image", "image_url": "data:image/jpeg;base64,AQID"},
                    ],
                }],
                "tools": [{"type": "image_generation"}],
            })
        );
        Ok(())
    }

    #[test]
    fn media_type_follows_extension_case_insensitively() {
        assert_eq!(
            ImageMediaType::from_path(Path::new("page.PNG")),
            ImageMediaType::Png
        );
        assert_eq!(
            ImageMediaType::from_path(Path::new("page.jpeg")),
            ImageMediaType::Jpeg
        );
        assert_eq!(
            ImageMediaType::from_path(Path::new("page.Jpg")),
            ImageMediaType::Jpeg
        );
    }

    #[test]
    fn empty_image_still_produces_data_uri() {
        assert_eq!(
            image_data_uri(&[], ImageMediaType::Png),
            "data:image/png;base64,"
        );
    }
}
