use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{CompanionError, Result};
use crate::tools::python::strip_fences;

/// Final answer of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    FreeText(String),
    Structured(StructuredResult),
}

/// Fields of a JSON-shaped answer.  A field the model left out (or sent
/// with an unusable type) is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredResult {
    pub code: Option<String>,
    pub explanation: Option<String>,
    pub dependencies: Option<String>,
}

impl StructuredResult {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            code: string_field(obj, "code"),
            explanation: string_field(obj, "explanation"),
            dependencies: string_field(obj, "dependencies"),
        }
    }
}

/// String value of `key`.  Arrays of strings are joined with ", " since
/// models like to list dependencies that way.
fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(", ")),
        _ => None,
    }
}

/// Interpret model output as a structured answer.  Output that does not
/// contain a decodable JSON object yields a result with every field missing,
/// so each one renders its own error placeholder.
pub fn parse_structured(raw: &str) -> ModelResponse {
    match decode_object(raw) {
        Ok(obj) => ModelResponse::Structured(StructuredResult::from_object(&obj)),
        Err(e) => {
            warn!(error = %e, raw_len = raw.len(), "structured output did not decode");
            ModelResponse::Structured(StructuredResult::default())
        }
    }
}

/// Decode the first JSON object in `raw`.  Only one value is read, so text
/// after the object (separators, commentary) is ignored rather than cut at a
/// marker.
fn decode_object(raw: &str) -> Result<Map<String, Value>> {
    let body = strip_fences(raw, "json");
    let start = body
        .find('{')
        .ok_or_else(|| CompanionError::ResponseShape("no JSON object in model output".into()))?;

    let mut values = serde_json::Deserializer::from_str(&body[start..]).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Object(obj))) => Ok(obj),
        Some(Ok(_)) | None => Err(CompanionError::ResponseShape(
            "model output is not a JSON object".into(),
        )),
        Some(Err(e)) => Err(e.into()),
    }
}
