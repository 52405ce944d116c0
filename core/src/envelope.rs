//! The response envelope shared by callee services, and the shapes a call
//! can return.
//!
//! # Design
//! Services wrap every answer as `{"code", "flag", "msg", "result"}`. The
//! `flag` key marks a body as an envelope. How an envelope is recognised and
//! judged is a strategy (`EnvelopeFormat`) so a client can speak a different
//! convention without touching the request pipeline.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ClientError, RemoteCallError};

/// Key whose presence marks a JSON object as an envelope.
pub const ENVELOPE_MARKER: &str = "flag";

/// Envelope code meaning "success".
pub const SUCCESS_CODE: &str = "0";

pub const SUCCESS_MSG: &str = "请求成功";

/// Message of the envelope substituted for a 503.
pub const BUSY_MSG: &str = "系统繁忙,请稍后重试";

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(deserialize_with = "code_from_string_or_number")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flag: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl Envelope {
    pub fn success(result: Value) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            flag: true,
            msg: SUCCESS_MSG.to_string(),
            result,
            solution: None,
        }
    }

    pub fn failure(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            flag: false,
            msg: msg.into(),
            result: Value::Null,
            solution: None,
        }
    }

    /// The synthetic success returned in place of a 503.
    pub fn busy() -> Self {
        Self {
            msg: BUSY_MSG.to_string(),
            ..Self::success(Value::Null)
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Take the payload, or fail with a `RemoteCall` error if the envelope
    /// reports failure. Meant for envelopes obtained from silent calls.
    pub fn into_result(self) -> Result<Value, ClientError> {
        if self.is_success() {
            Ok(self.result)
        } else {
            Err(RemoteCallError::from_envelope(self).into())
        }
    }

    /// Deserialize the payload into `T`.
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        T::deserialize(&self.result).map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

fn code_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(s) => s,
        Code::Number(n) => n.to_string(),
    })
}

/// Java services send `"msg": null` on success.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Strategy for recognising and judging envelopes.
pub trait EnvelopeFormat: Send + Sync {
    /// Whether `body` has the envelope shape.
    fn detect(&self, body: &Value) -> bool;

    fn parse(&self, body: Value) -> Result<Envelope, serde_json::Error>;

    fn is_success(&self, envelope: &Envelope) -> bool;

    /// Envelope returned when the remote answered 503.
    fn busy(&self) -> Envelope;
}

/// The `flag`/`code`/`msg`/`result` convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct LesoonEnvelope;

impl EnvelopeFormat for LesoonEnvelope {
    fn detect(&self, body: &Value) -> bool {
        body.as_object()
            .is_some_and(|obj| obj.contains_key(ENVELOPE_MARKER))
    }

    fn parse(&self, body: Value) -> Result<Envelope, serde_json::Error> {
        serde_json::from_value(body)
    }

    fn is_success(&self, envelope: &Envelope) -> bool {
        envelope.is_success()
    }

    fn busy(&self) -> Envelope {
        Envelope::busy()
    }
}

/// What a call returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// An unwrapped envelope (successful, or failed on a silent call).
    Envelope(Envelope),
    /// A JSON body that was not unwrapped.
    Json(Value),
    /// A body that was not valid JSON.
    Text(String),
}

impl Reply {
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Reply::Envelope(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            Reply::Envelope(e) => Some(e),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            Reply::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Reply::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Text(t) => Some(t),
            _ => None,
        }
    }

    /// The payload: an envelope's result (raising if it failed), the JSON
    /// body, or the text as a JSON string.
    pub fn into_result(self) -> Result<Value, ClientError> {
        match self {
            Reply::Envelope(e) => e.into_result(),
            Reply::Json(v) => Ok(v),
            Reply::Text(t) => Ok(Value::String(t)),
        }
    }

    /// Decode a response body: JSON when it parses, raw text otherwise.
    pub(crate) fn decode(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Reply::Json(value),
            Err(e) => {
                tracing::debug!(error = %e, "response body is not JSON, keeping raw text");
                Reply::Text(body.to_string())
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Envelope(e) => match serde_json::to_string(e) {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{e:?}"),
            },
            Reply::Json(v) => write!(f, "{v}"),
            Reply::Text(t) => f.write_str(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numeric_code() {
        let env = LesoonEnvelope
            .parse(json!({"code": 0, "flag": true, "msg": "ok", "result": [1, 2]}))
            .unwrap();
        assert_eq!(env.code, "0");
        assert!(env.is_success());
        assert_eq!(env.result, json!([1, 2]));
    }

    #[test]
    fn parses_string_code_and_missing_result() {
        let env = LesoonEnvelope
            .parse(json!({"code": "5000", "flag": false, "msg": "boom"}))
            .unwrap();
        assert!(!env.is_success());
        assert_eq!(env.result, Value::Null);
        assert!(env.solution.is_none());
    }

    #[test]
    fn null_msg_and_flag_read_as_empty() {
        let env = LesoonEnvelope
            .parse(json!({"code": "0", "flag": null, "msg": null, "result": {"id": 1}}))
            .unwrap();
        assert!(env.is_success());
        assert!(!env.flag);
        assert_eq!(env.msg, "");
        assert_eq!(env.result, json!({"id": 1}));
    }

    #[test]
    fn null_code_is_malformed() {
        assert!(LesoonEnvelope
            .parse(json!({"code": null, "flag": true, "msg": "ok"}))
            .is_err());
    }

    #[test]
    fn detect_requires_marker_key() {
        assert!(LesoonEnvelope.detect(&json!({"flag": false})));
        assert!(!LesoonEnvelope.detect(&json!({"code": "0", "msg": "x"})));
        assert!(!LesoonEnvelope.detect(&json!(["flag"])));
        assert!(!LesoonEnvelope.detect(&json!("flag")));
    }

    #[test]
    fn busy_envelope_is_success_with_retry_message() {
        let env = LesoonEnvelope.busy();
        assert!(env.is_success());
        assert_eq!(env.msg, "系统繁忙,请稍后重试");
    }

    #[test]
    fn into_result_raises_on_failure() {
        let err = Envelope::failure("5000", "库存不足").into_result().unwrap_err();
        match err {
            ClientError::RemoteCall(e) => {
                assert_eq!(e.code, "3001");
                assert_eq!(e.msg, "库存不足");
                assert_eq!(e.remote_code(), Some("5000"));
                assert!(e.request.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn result_as_deserializes_payload() {
        #[derive(Deserialize)]
        struct Ids {
            ids: Vec<u64>,
        }
        let env = Envelope::success(json!({"ids": [7, 8]}));
        let ids: Ids = env.result_as().unwrap();
        assert_eq!(ids.ids, vec![7, 8]);

        let err = env.result_as::<Vec<String>>().unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }

    #[test]
    fn decode_falls_back_to_text() {
        assert_eq!(Reply::decode(r#"{"a":1}"#), Reply::Json(json!({"a": 1})));
        assert_eq!(Reply::decode("echo :hi"), Reply::Text("echo :hi".to_string()));
        assert_eq!(Reply::decode(""), Reply::Text(String::new()));
    }
}
