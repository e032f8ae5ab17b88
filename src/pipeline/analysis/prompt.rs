//! Fixed extraction instruction sent with every image.
//!
//! The schema is embedded as instruction text. The provider gets no
//! structured-output schema object, so the reply is free text that the
//! parser has to dig the JSON out of.

use super::types::{EncodedImage, ExtractionRequest, UploadedImage};

/// Japanese instruction: extract the measurement date (YYYY-MM-DD) and the
/// test item, value and unit triples, and output only the given JSON.
pub const EXTRACTION_INSTRUCTION: &str = "\
この健康診断書の画像から、測定日(YYYY-MM-DD)と、検査項目・測定値・単位を抽出し、指定のJSON形式のみを出力してください。\n\
\n\
返却形式:\n\
{\"date\": \"YYYY-MM-DD\", \"items\": [{\"name\": \"項目名\", \"value\": \"値\", \"unit\": \"単位\"}]}";

/// Encode the image and pair it with the fixed instruction.
pub fn build_extraction_request(image: &UploadedImage) -> ExtractionRequest {
    ExtractionRequest::new(EncodedImage::from(image), EXTRACTION_INSTRUCTION)
}
