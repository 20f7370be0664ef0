use crate::messages::wire::{ProtocolError, CODE_LEN, CONTROL_BYTE, SENTINEL_BYTE, SEPARATOR_BYTE};
use serde_json::{Map, Value};

/// A single protocol message: a three letter code and an optional JSON object.
///
/// Codes are opaque to the connection core; the dispatcher decides what they mean.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    code: String,
    payload: Option<Map<String, Value>>,
}

impl Frame {
    /// Create a frame without a payload
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            payload: None,
        }
    }

    /// Create a frame carrying a JSON object
    pub fn with_payload(code: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            code: code.into(),
            payload: Some(payload),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Map<String, Value>> {
        self.payload
    }

    /// Look up a string member of the payload.
    ///
    /// Returns `None` when there is no payload, the member is absent, or it is not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.as_ref()?.get(key)?.as_str()
    }

    /// Serialize to the wire shape `0x00 CODE [0x20 JSON] 0xFF`.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let code = self.code.as_bytes();
        if code.len() != CODE_LEN || !code.is_ascii() {
            return Err(ProtocolError::InvalidCode {
                code: self.code.clone(),
            });
        }

        let json = match &self.payload {
            Some(payload) => Some(serde_json::to_vec(payload).map_err(ProtocolError::InvalidPayload)?),
            None => None,
        };

        let mut bytes = Vec::with_capacity(CODE_LEN + 3 + json.as_ref().map_or(0, Vec::len));
        bytes.push(CONTROL_BYTE);
        bytes.extend_from_slice(code);
        if let Some(json) = json {
            bytes.push(SEPARATOR_BYTE);
            bytes.extend_from_slice(&json);
        }
        bytes.push(SENTINEL_BYTE);
        Ok(bytes)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.payload {
            Some(payload) => write!(f, "{} {}", self.code, Value::Object(payload.clone())),
            None => write!(f, "{}", self.code),
        }
    }
}
