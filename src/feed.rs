//! Boundary with the upstream use case feed.
//!
//! Transport lives with the caller behind [`UseCaseFeed`]; this module only
//! decides whether a response has a usable shape.

use crate::errors::{AppError, AppResult};
use serde_json::{Map, Value};

pub type RawUseCase = Map<String, Value>;

/// Keys that may wrap the use case list, checked in order.
pub const WRAPPER_KEYS: [&str; 4] = ["data", "use_cases", "results", "items"];

const EXPECTED_FIELDS: [&str; 3] = ["title", "description", "submitter"];
const INSPECTED_ITEMS: usize = 5;

pub trait UseCaseFeed {
    fn fetch(&self) -> anyhow::Result<Value>;
}

/// A feed backed by a value already in memory.
#[derive(Debug, Clone)]
pub struct StaticFeed {
    payload: Value,
}

impl StaticFeed {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }
}

impl UseCaseFeed for StaticFeed {
    fn fetch(&self) -> anyhow::Result<Value> {
        Ok(self.payload.clone())
    }
}

/// Fetches once and unwraps the response. Never retries.
pub fn load_use_cases(feed: &dyn UseCaseFeed) -> AppResult<Vec<RawUseCase>> {
    let payload = feed.fetch().map_err(|error| AppError::Feed(format!("{:#}", error)))?;
    let use_cases = unwrap_feed(payload)?;
    tracing::info!(count = use_cases.len(), "loaded use cases from feed");
    Ok(use_cases)
}

pub fn unwrap_feed(payload: Value) -> AppResult<Vec<RawUseCase>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            let wrapped = WRAPPER_KEYS
                .iter()
                .find(|key| matches!(object.get(**key), Some(Value::Array(_))))
                .and_then(|key| object.remove(*key));
            match wrapped {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(object)],
            }
        }
        other => {
            return Err(AppError::Validation(format!(
                "unexpected feed payload type: {}",
                json_type_name(&other)
            )))
        }
    };

    if items.is_empty() {
        return Err(AppError::Validation("feed returned no use cases".to_string()));
    }

    let mut use_cases = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(object) => use_cases.push(object),
            other => {
                return Err(AppError::Validation(format!(
                    "feed item {} is a {}, not an object",
                    index,
                    json_type_name(&other)
                )))
            }
        }
    }

    warn_on_missing_fields(&use_cases);
    Ok(use_cases)
}

fn warn_on_missing_fields(use_cases: &[RawUseCase]) {
    for (index, use_case) in use_cases.iter().take(INSPECTED_ITEMS).enumerate() {
        let missing: Vec<&str> = EXPECTED_FIELDS
            .iter()
            .copied()
            .filter(|field| !use_case.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(item = index, missing = ?missing, "feed item is missing expected fields");
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
