//! Inbound request model.
//!
//! Retrieval requests have their JSON body parsed up front so the size gate
//! can rewrite it; every other method keeps its body as opaque bytes.

use axum::body::{Body, Bytes};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, Method, Request};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::GateError;
use crate::security::ResultSizeCapper;

const SIZE: &str = "size";

/// Search body as parsed from the client.
///
/// Numbers keep their original text (`arbitrary_precision`) and members keep
/// their order, so re-serializing changes nothing but a rewritten `size`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SearchRequestPayload {
    fields: Map<String, Value>,
}

impl SearchRequestPayload {
    /// An empty body counts as `{}`.
    pub fn from_slice(body: &[u8]) -> Result<Self, GateError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let fields: Map<String, Value> =
            serde_json::from_slice(body).map_err(|e| GateError::MalformedPayload(e.to_string()))?;
        Self::from_map(fields)
    }

    /// Wrap an already parsed object, checking its `size` member.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self, GateError> {
        if let Some(value) = fields.get(SIZE) {
            read_size(value)?;
        }
        Ok(Self { fields })
    }

    /// Requested size. `null` counts as absent; integers beyond `i64`
    /// saturate, so they still compare as too large (or non-positive).
    pub fn size(&self) -> Option<i64> {
        self.fields.get(SIZE).and_then(|v| read_size(v).ok().flatten())
    }

    /// Replace `size` in place, keeping its position among the members.
    pub fn set_size(&mut self, size: i64) {
        self.fields.insert(SIZE.to_string(), Value::Number(Number::from(size)));
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn read_size(value: &Value) -> Result<Option<i64>, GateError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(size) = n.as_i64() {
                return Ok(Some(size));
            }
            let text = n.to_string();
            if text.contains(['.', 'e', 'E']) {
                return Err(GateError::MalformedPayload(format!("size must be an integer, got {}", text)));
            }
            Ok(Some(if text.starts_with('-') { i64::MIN } else { i64::MAX }))
        }
        other => Err(GateError::MalformedPayload(format!("size must be an integer, got {}", other))),
    }
}

/// Request body as seen by the gates.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Search(SearchRequestPayload),
    Opaque(Bytes),
}

/// A buffered request on its way through the pipeline.
#[derive(Debug)]
pub struct InboundRequest {
    pub parts: Parts,
    /// Source address the policy and the rate limiter key on.
    pub source: String,
    pub payload: Payload,
}

impl InboundRequest {
    /// Classify the body by method. Malformed retrieval bodies are rejected here,
    /// before any gate runs.
    pub fn parse(
        parts: Parts,
        body: Bytes,
        source: impl Into<String>,
        capper: &ResultSizeCapper,
    ) -> Result<Self, GateError> {
        let payload = if capper.is_retrieval(&parts.method) {
            Payload::Search(SearchRequestPayload::from_slice(&body)?)
        } else {
            Payload::Opaque(body)
        };

        Ok(Self {
            parts,
            source: source.into(),
            payload,
        })
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Rebuild the HTTP request to hand to the forwarder.
    ///
    /// Headers are copied unchanged except for the framing headers of a
    /// re-serialized search body.
    pub fn into_http(self) -> Result<Request<Body>, GateError> {
        let mut parts = self.parts;
        let body = match self.payload {
            Payload::Opaque(bytes) => bytes,
            Payload::Search(search) => {
                let bytes = serde_json::to_vec(&search)
                    .map_err(|e| GateError::MalformedPayload(e.to_string()))?;
                parts.headers.remove(header::TRANSFER_ENCODING);
                parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                if !parts.headers.contains_key(header::CONTENT_TYPE) {
                    parts
                        .headers
                        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Bytes::from(bytes)
            }
        };
        Ok(Request::from_parts(parts, Body::from(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capper() -> ResultSizeCapper {
        ResultSizeCapper::new(1, 1000, vec![Method::GET])
    }

    fn parts(method: Method) -> Parts {
        Request::builder()
            .method(method)
            .uri("/pas/_search")
            .header("x-custom", "kept")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_empty_retrieval_body_is_empty_search() {
        let req = InboundRequest::parse(parts(Method::GET), Bytes::new(), "10.0.0.1", &capper()).unwrap();
        assert_eq!(req.payload, Payload::Search(SearchRequestPayload::default()));
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = InboundRequest::parse(parts(Method::GET), Bytes::from_static(b"[1,2]"), "10.0.0.1", &capper())
            .unwrap_err();
        assert!(matches!(err, GateError::MalformedPayload(_)));
    }

    #[test]
    fn test_non_integer_size_rejected() {
        for body in [r#"{"size":"ten"}"#, r#"{"size":2.5}"#, "{not json"] {
            let result = InboundRequest::parse(
                parts(Method::GET),
                Bytes::from(body.to_string()),
                "10.0.0.1",
                &capper(),
            );
            assert!(result.is_err(), "{} should be rejected", body);
        }
    }

    #[test]
    fn test_null_size_treated_as_missing() {
        let payload = SearchRequestPayload::from_slice(br#"{"size":null,"from":0}"#).unwrap();
        assert_eq!(payload.size(), None);
        assert_eq!(payload.fields().get("from"), Some(&json!(0)));
    }

    #[test]
    fn test_huge_integer_sizes_saturate() {
        let payload = SearchRequestPayload::from_slice(br#"{"size":18446744073709551615}"#).unwrap();
        assert_eq!(payload.size(), Some(i64::MAX));

        let payload = SearchRequestPayload::from_slice(br#"{"size":123456789012345678901234567890}"#).unwrap();
        assert_eq!(payload.size(), Some(i64::MAX));

        let payload = SearchRequestPayload::from_slice(br#"{"size":-99999999999999999999}"#).unwrap();
        assert_eq!(payload.size(), Some(i64::MIN));
    }

    #[test]
    fn test_numbers_reserialized_verbatim() {
        let body = r#"{"size":10,"query":{"term":{"id":123456789012345678901234567890}},"min_score":0.12345678901234567890123}"#;
        let payload = SearchRequestPayload::from_slice(body.as_bytes()).unwrap();
        assert_eq!(serde_json::to_string(&payload).unwrap(), body);
    }

    #[test]
    fn test_set_size_keeps_member_position() {
        let mut payload = SearchRequestPayload::from_slice(br#"{"from":5,"size":5000,"sort":["_doc"]}"#).unwrap();
        payload.set_size(1);
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"from":5,"size":1,"sort":["_doc"]}"#
        );
    }

    #[test]
    fn test_non_retrieval_body_not_parsed() {
        let body = Bytes::from_static(b"not json at all");
        let req = InboundRequest::parse(parts(Method::POST), body.clone(), "10.0.0.1", &capper()).unwrap();
        assert_eq!(req.payload, Payload::Opaque(body));
    }

    #[tokio::test]
    async fn test_into_http_rewrites_framing_only() {
        let mut req = InboundRequest::parse(
            parts(Method::GET),
            Bytes::from_static(br#"{"query":{"match_all":{}},"from":30}"#),
            "10.0.0.1",
            &capper(),
        )
        .unwrap();
        if let Payload::Search(search) = &mut req.payload {
            search.set_size(1);
        }

        let http = req.into_http().unwrap();
        assert_eq!(http.headers()["x-custom"], "kept");
        assert_eq!(http.headers()[header::CONTENT_TYPE], "application/json");
        let length: usize = http.headers()[header::CONTENT_LENGTH].to_str().unwrap().parse().unwrap();

        let bytes = axum::body::to_bytes(http.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.len(), length);
        let forwarded: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(forwarded, json!({ "size": 1, "query": { "match_all": {} }, "from": 30 }));
    }
}
