//! Gateway Request and Cache Fingerprint
//!
//! A [`Request`] is built once per call and never mutated after it enters the
//! gateway. Its [`CacheKey`] depends only on the prompt and a canonical,
//! key-sorted rendering of the context, so logically identical contexts always
//! fingerprint identically regardless of field insertion order.

use std::fmt;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::error::Failure;

/// Inclusive sampling temperature bounds accepted by the service
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// One call to the inference service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl Request {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_context(mut self, context: Option<Value>) -> Self {
        self.context = context;
        self
    }

    /// Attach any serializable value as context.
    ///
    /// A value that cannot become JSON is an `InvalidRequest` failure, the
    /// same as any other malformed input.
    pub fn with_serializable_context<T: Serialize>(
        self,
        context: &T,
    ) -> Result<Self, Failure> {
        let value = serde_json::to_value(context)
            .map_err(|e| Failure::InvalidRequest(format!("context is not serializable: {}", e)))?;
        Ok(self.with_context(Some(value)))
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// Local validation, run before any throttle wait or network call
    pub fn validate(&self) -> Result<(), Failure> {
        if self.prompt.trim().is_empty() {
            return Err(Failure::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }

        if let Some(temperature) = self.temperature
            && !TEMPERATURE_RANGE.contains(&temperature)
        {
            return Err(Failure::InvalidRequest(format!(
                "temperature must be between {} and {}, got {}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end(),
                temperature
            )));
        }

        if self.max_tokens == Some(0) {
            return Err(Failure::InvalidRequest(
                "max_tokens must be a positive integer".to_string(),
            ));
        }

        Ok(())
    }

    /// Cache fingerprint for this request
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.prompt, self.context.as_ref())
    }
}

// =============================================================================
// Cache Key
// =============================================================================

/// Deterministic fingerprint of a prompt and its context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(prompt: &str, context: Option<&Value>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        // Unit separator keeps ("ab", "c") apart from ("a", "bc")
        hasher.update([0x1f]);
        if let Some(context) = context {
            hasher.update(canonical_json(context).as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render JSON with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                // Display on Value is infallible and escapes like serde_json
                let _ = write!(out, "{}", Value::String(key.clone()));
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{}", scalar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Request::new("Summarize page X").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_prompt() {
        let err = Request::new("   ").validate().unwrap_err();
        assert!(matches!(err, Failure::InvalidRequest(ref m) if m.contains("empty")));
    }

    #[test]
    fn test_validate_temperature_bounds() {
        let ok = Request::new("p").with_temperature(Some(2.0));
        assert!(ok.validate().is_ok());

        let too_hot = Request::new("p").with_temperature(Some(5.0));
        assert!(too_hot.validate().is_err());

        let negative = Request::new("p").with_temperature(Some(-0.1));
        assert!(negative.validate().is_err());

        let nan = Request::new("p").with_temperature(Some(f32::NAN));
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_validate_max_tokens() {
        assert!(Request::new("p").with_max_tokens(Some(0)).validate().is_err());
        assert!(Request::new("p").with_max_tokens(Some(1)).validate().is_ok());
    }

    #[test]
    fn test_unserializable_context_is_invalid_request() {
        use std::collections::HashMap;
        // Non-string map keys cannot become JSON object keys
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        let err = Request::new("p").with_serializable_context(&bad).unwrap_err();
        assert!(matches!(err, Failure::InvalidRequest(_)));
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"d": [3, {"z": 1, "y": 2}], "c": "x"}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":"x","d":[3,{"y":2,"z":1}]},"b":1}"#
        );
    }

    #[test]
    fn test_cache_key_ignores_insertion_order() {
        let mut first = serde_json::Map::new();
        first.insert("url".into(), json!("https://example.com"));
        first.insert("tags".into(), json!(["rust", "web"]));

        let mut second = serde_json::Map::new();
        second.insert("tags".into(), json!(["rust", "web"]));
        second.insert("url".into(), json!("https://example.com"));

        assert_eq!(
            CacheKey::new("p", Some(&Value::Object(first))),
            CacheKey::new("p", Some(&Value::Object(second)))
        );
    }

    #[test]
    fn test_cache_key_distinguishes_inputs() {
        let base = CacheKey::new("prompt", None);
        assert_ne!(base, CacheKey::new("prompt2", None));
        assert_ne!(base, CacheKey::new("prompt", Some(&json!({"a": 1}))));
        assert_ne!(
            CacheKey::new("ab", Some(&json!("c"))),
            CacheKey::new("a", Some(&json!("bc")))
        );
        // Array order is meaningful
        assert_ne!(
            CacheKey::new("p", Some(&json!([1, 2]))),
            CacheKey::new("p", Some(&json!([2, 1])))
        );
    }

    #[test]
    fn test_cache_key_ignores_sampling_options() {
        let cold = Request::new("p").with_temperature(Some(0.1));
        let hot = Request::new("p").with_temperature(Some(1.9));
        assert_eq!(cold.cache_key(), hot.cache_key());
    }
}
