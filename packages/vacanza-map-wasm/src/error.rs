use thiserror::Error;
use wasm_bindgen::JsValue;

/// Why a search request produced no usable response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Search endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Malformed search response: {0}")]
    Decode(String),

    #[error("Search endpoint returned an HTML page instead of JSON")]
    HtmlResponse,

    #[error("Search request timed out after {0} ms")]
    Timeout(u32),

    #[error("Search request was superseded")]
    Cancelled,

    #[error("Browser fetch API unavailable")]
    Unavailable,
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Decode(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Malformed(String),

    #[error("Invalid '{field}': {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Sign-out failed: {0}")]
    SignOut(String),
}

/// Readable text for a thrown JS value.
pub fn js_error_text(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

impl From<ConfigError> for JsValue {
    fn from(e: ConfigError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}
