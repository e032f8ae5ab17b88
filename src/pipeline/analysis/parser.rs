use serde_json::Value;

use super::AnalysisError;

/// Locate the JSON object candidate in a free-text model reply.
///
/// The candidate runs from the first `{` to the last `}`, so fences, prose
/// before and after, and nested objects all collapse into one slice. Two
/// separate objects in one reply produce a candidate spanning both, which
/// then fails to parse.
pub fn extract_json_candidate(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Extract and parse the JSON object from a model reply.
///
/// A reply with no candidate is `UnparsableReply` and carries the whole reply
/// verbatim. A candidate that is not valid JSON is `MalformedReply` with the
/// parser's message.
pub fn parse_reply(reply: &str) -> Result<Value, AnalysisError> {
    let candidate = extract_json_candidate(reply).ok_or_else(|| AnalysisError::UnparsableReply {
        raw: reply.to_string(),
        reason: "no brace-delimited object found".into(),
    })?;

    // A slice that starts with `{` and ends with `}` can only parse as an object.
    serde_json::from_str(candidate).map_err(|e| AnalysisError::MalformedReply(e.to_string()))
}
