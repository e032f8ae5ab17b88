use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ──────────────────────────────────────────────
// Image input
// ──────────────────────────────────────────────

/// Raster formats the inference provider accepts inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMimeType::Jpeg => "image/jpeg",
            ImageMimeType::Png => "image/png",
            ImageMimeType::Gif => "image/gif",
            ImageMimeType::Webp => "image/webp",
        }
    }

    /// Match a declared `Content-Type` against the allow-list.
    ///
    /// Parameters after `;` are ignored and `image/jpg` is accepted as a
    /// common misspelling of JPEG.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageMimeType::Jpeg),
            "image/png" => Some(ImageMimeType::Png),
            "image/gif" => Some(ImageMimeType::Gif),
            "image/webp" => Some(ImageMimeType::Webp),
            _ => None,
        }
    }

    /// Detect the format from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
            Some(ImageMimeType::Jpeg)
        } else if bytes.len() >= 8
            && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        {
            Some(ImageMimeType::Png)
        } else if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
            Some(ImageMimeType::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageMimeType::Webp)
        } else {
            None
        }
    }

    /// Resolve the type to send upstream.
    ///
    /// Absent or empty declarations default to JPEG without looking at the
    /// bytes. A declaration outside the allow-list is replaced by the sniffed
    /// type, and JPEG when sniffing fails. No upload is rejected on type.
    pub fn resolve(declared: Option<&str>, bytes: &[u8]) -> Self {
        match declared.map(str::trim).filter(|d| !d.is_empty()) {
            None => ImageMimeType::Jpeg,
            Some(d) => Self::from_declared(d)
                .or_else(|| Self::sniff(bytes))
                .unwrap_or(ImageMimeType::Jpeg),
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded photo, owned by the pipeline for the length of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: ImageMimeType,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, declared_type: Option<&str>) -> Self {
        let mime_type = ImageMimeType::resolve(declared_type, &bytes);
        Self { bytes, mime_type }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Base64 transport form of an `UploadedImage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: ImageMimeType,
}

impl From<&UploadedImage> for EncodedImage {
    fn from(image: &UploadedImage) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            mime_type: image.mime_type,
        }
    }
}

/// Everything the provider receives for one analysis: the encoded image
/// and the fixed instruction. Built fresh per call, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    image: EncodedImage,
    instruction: &'static str,
}

impl ExtractionRequest {
    pub fn new(image: EncodedImage, instruction: &'static str) -> Self {
        Self { image, instruction }
    }

    pub fn image(&self) -> &EncodedImage {
        &self.image
    }

    pub fn instruction(&self) -> &'static str {
        self.instruction
    }
}

// ──────────────────────────────────────────────
// Output
// ──────────────────────────────────────────────

/// One extracted test item, exactly as the model wrote it.
///
/// `name`, `value` and `unit` keep their JSON type; a field the model left
/// out stays absent and an explicit `null` stays `null`. Any other keys are
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisItem {
    /// Split a reply item into the known fields and the rest.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        Self {
            name: fields.shift_remove("name"),
            value: fields.shift_remove("value"),
            unit: fields.shift_remove("unit"),
            extra: fields,
        }
    }
}

/// Validated extraction output returned to the client.
///
/// Top-level keys other than `date` and `items` are carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub date: String,
    pub items: Vec<AnalysisItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
