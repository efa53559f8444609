//! Extraction of uniform results from provider response bodies.
//!
//! Providers answer with arrays, nested objects or single-field objects. The
//! rules below are tried in order and the first one that yields at least one
//! element wins.

use serde_json::Value;

use super::error::JobError;
use super::models::{JobResult, ResultKind};

type Rule = fn(&Value) -> Vec<String>;

const OUTPUT_RULES: &[Rule] = &[
    from_single_value,
    from_sequence,
    from_sequence_field,
    from_singular_field,
    from_url_values,
];

/// Element fields consulted for objects inside a sequence, in priority order
const ELEMENT_FIELDS: &[&str] = &["url", "image", "output"];

const SINGULAR_FIELDS: &[&str] = &["imageUrl", "image", "output"];

const URL_PREFIXES: &[&str] = &["http", "data:image"];

const TRANSCRIPT_POINTERS: &[&str] = &[
    "/outputs/0",
    "/outputs/0/text",
    "/outputs/0/transcription",
    "/text",
    "/transcription",
    "/output",
    "/output/text",
    "/output/transcription",
];

/// Normalize URL-style output (images, videos)
pub fn normalize_output(payload: &Value, kind: ResultKind) -> Result<JobResult, JobError> {
    OUTPUT_RULES
        .iter()
        .map(|rule| rule(payload))
        .find(|urls| !urls.is_empty())
        .and_then(|urls| JobResult::new(kind, urls))
        .ok_or(JobError::UnrecognizedResponse)
}

/// The provider's `output` section when present, the whole body otherwise
pub fn output_section(body: &Value) -> &Value {
    body.get("output").filter(|v| !v.is_null()).unwrap_or(body)
}

/// First non-blank transcript found among the known response shapes
pub fn extract_transcript(payload: &Value) -> Option<String> {
    TRANSCRIPT_POINTERS
        .iter()
        .filter_map(|pointer| payload.pointer(pointer).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn normalize_transcript(payload: &Value) -> Result<JobResult, JobError> {
    extract_transcript(payload)
        .and_then(JobResult::text)
        .ok_or(JobError::NoTranscriptionFound)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn element_value(element: &Value) -> Option<String> {
    match element {
        Value::String(s) => non_blank(s),
        Value::Object(map) => ELEMENT_FIELDS
            .iter()
            .filter_map(|field| map.get(*field).and_then(Value::as_str))
            .find_map(non_blank),
        _ => None,
    }
}

fn elements_of(items: &[Value]) -> Vec<String> {
    items.iter().filter_map(element_value).collect()
}

/// A bare string payload, e.g. the `output` section of a prediction that
/// produced one file
fn from_single_value(payload: &Value) -> Vec<String> {
    payload.as_str().and_then(non_blank).into_iter().collect()
}

fn from_sequence(payload: &Value) -> Vec<String> {
    payload.as_array().map(|items| elements_of(items)).unwrap_or_default()
}

fn from_sequence_field(payload: &Value) -> Vec<String> {
    let Some(map) = payload.as_object() else {
        return Vec::new();
    };
    map.values()
        .filter_map(Value::as_array)
        .map(|items| elements_of(items))
        .find(|urls| !urls.is_empty())
        .unwrap_or_default()
}

fn from_singular_field(payload: &Value) -> Vec<String> {
    SINGULAR_FIELDS
        .iter()
        .filter_map(|field| payload.get(*field).and_then(Value::as_str))
        .find_map(non_blank)
        .into_iter()
        .collect()
}

fn from_url_values(payload: &Value) -> Vec<String> {
    let Some(map) = payload.as_object() else {
        return Vec::new();
    };
    map.values()
        .filter_map(Value::as_str)
        .filter_map(non_blank)
        .filter(|s| URL_PREFIXES.iter().any(|prefix| s.starts_with(prefix)))
        .collect()
}
