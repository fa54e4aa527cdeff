//! Request types shared by all AI backends

/// MIME type used for captured receipt photos
pub const JPEG_MIME: &str = "image/jpeg";

/// One piece of a multimodal request
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64-encoded binary payload (e.g. a JPEG photo)
    InlineData { mime_type: String, data: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    /// A base64 JPEG image part
    pub fn jpeg(base64_data: impl Into<String>) -> Self {
        Part::InlineData {
            mime_type: JPEG_MIME.to_string(),
            data: base64_data.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::InlineData { .. } => None,
        }
    }
}

/// A single-turn generation request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    /// Ask the model for JSON-only output
    pub json_output: bool,
}

impl GenerateRequest {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts,
            json_output: false,
        }
    }

    pub fn json(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::InlineData { .. }))
    }
}
