//! Request parameter extraction.
//!
//! Exactly one source is read per request:
//!
//! | Method      | Content type                          | Source              |
//! |-------------|---------------------------------------|---------------------|
//! | GET, HEAD   | any                                   | `data` query value  |
//! | POST        | `application/json`                    | body as JSON object |
//! | POST        | `application/x-www-form-urlencoded`   | body form fields    |
//!
//! Anything else is rejected.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;
use serde_json::Value;
use spa_core::HttpError;

use crate::action::Params;

pub const METHOD_NOT_ALLOWED: &str = "method is not allowed";
pub const CONTENT_TYPE_NOT_ALLOWED: &str = "Content-Type is not allowed";

/// Where the parameters of a request come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Query,
    Json,
    Form,
}

/// Pick the parameter source from method, query and content type.
pub fn source_for(method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<ParamSource, HttpError> {
    if (method == Method::GET || method == Method::HEAD) && query_data(uri).is_some() {
        return Ok(ParamSource::Query);
    }
    if method != Method::POST {
        return Err(HttpError::MethodNotAllowed(METHOD_NOT_ALLOWED.into()));
    }
    match content_type_essence(headers).as_deref() {
        Some("application/json") => Ok(ParamSource::Json),
        Some("application/x-www-form-urlencoded") => Ok(ParamSource::Form),
        _ => Err(HttpError::BadRequest(CONTENT_TYPE_NOT_ALLOWED.into())),
    }
}

/// Media type without parameters, lowercased.
pub fn content_type_essence(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next()?.trim();
    (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
}

/// First non-empty `data` query value.
pub fn query_data(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "data")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Parse a JSON object. `null` yields an empty mapping; other non-objects are
/// rejected with the parser's message.
pub fn parse_json(input: &[u8]) -> Result<Params, HttpError> {
    serde_json::from_slice::<Option<Params>>(input)
        .map(Option::unwrap_or_default)
        .map_err(|e| HttpError::BadRequest(e.to_string()))
}

/// Form fields, keeping the first value of a repeated key.
pub fn parse_form(input: &[u8]) -> Params {
    let mut params = Params::new();
    for (key, value) in form_urlencoded::parse(input) {
        params
            .entry(key.into_owned())
            .or_insert_with(|| Value::String(value.into_owned()));
    }
    params
}

/// Read parameters from `source`.
pub fn extract(source: ParamSource, uri: &Uri, body: &Bytes) -> Result<Params, HttpError> {
    match source {
        ParamSource::Query => parse_json(query_data(uri).unwrap_or_default().as_bytes()),
        ParamSource::Json => parse_json(body),
        ParamSource::Form => Ok(parse_form(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn ct(value: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        h
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn get_with_data_reads_query() {
        let u = uri("/api?data=%7B%22action%22%3A%22get_version%22%7D");
        assert_eq!(source_for(&Method::GET, &u, &HeaderMap::new()).unwrap(), ParamSource::Query);
        let params = extract(ParamSource::Query, &u, &Bytes::new()).unwrap();
        assert_eq!(params["action"], json!("get_version"));
    }

    #[test]
    fn head_with_data_reads_query() {
        let u = uri("/api?data=%7B%7D");
        assert_eq!(source_for(&Method::HEAD, &u, &HeaderMap::new()).unwrap(), ParamSource::Query);
    }

    #[test]
    fn get_without_data_not_allowed() {
        let err = source_for(&Method::GET, &uri("/api"), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, HttpError::MethodNotAllowed(_)));
        assert_eq!(err.message(), METHOD_NOT_ALLOWED);
    }

    #[test]
    fn get_with_empty_data_not_allowed() {
        let err = source_for(&Method::GET, &uri("/api?data="), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, HttpError::MethodNotAllowed(_)));
    }

    #[test]
    fn put_not_allowed() {
        let err = source_for(&Method::PUT, &uri("/api"), &ct("application/json")).unwrap_err();
        assert!(matches!(err, HttpError::MethodNotAllowed(_)));
    }

    #[test]
    fn post_json_with_charset() {
        let source =
            source_for(&Method::POST, &uri("/api"), &ct("application/json; charset=utf-8")).unwrap();
        assert_eq!(source, ParamSource::Json);
    }

    #[test]
    fn post_form() {
        let source = source_for(
            &Method::POST,
            &uri("/api"),
            &ct("application/x-www-form-urlencoded"),
        )
        .unwrap();
        assert_eq!(source, ParamSource::Form);
    }

    #[test]
    fn post_text_rejected() {
        let err = source_for(&Method::POST, &uri("/api"), &ct("text/plain")).unwrap_err();
        assert!(matches!(err, HttpError::BadRequest(_)));
        assert_eq!(err.message(), CONTENT_TYPE_NOT_ALLOWED);
    }

    #[test]
    fn post_without_content_type_rejected() {
        let err = source_for(&Method::POST, &uri("/api"), &HeaderMap::new()).unwrap_err();
        assert_eq!(err.message(), CONTENT_TYPE_NOT_ALLOWED);
    }

    #[test]
    fn post_data_query_ignored() {
        let u = uri("/api?data=%7B%7D");
        let err = source_for(&Method::POST, &u, &ct("text/plain")).unwrap_err();
        assert_eq!(err.message(), CONTENT_TYPE_NOT_ALLOWED);
    }

    #[test]
    fn form_keeps_first_value() {
        let params = parse_form(b"action=first&action=second&x=1");
        assert_eq!(params["action"], json!("first"));
        assert_eq!(params["x"], json!("1"));
    }

    #[test]
    fn malformed_json_reports_parser_message() {
        let err = parse_json(b"{\"action\":").unwrap_err();
        assert!(matches!(err, HttpError::BadRequest(_)));
        assert!(err.message().contains("EOF"), "{}", err.message());
    }

    #[test]
    fn array_is_not_a_mapping() {
        let err = parse_json(b"[1,2]").unwrap_err();
        assert!(err.message().contains("invalid type"), "{}", err.message());
    }

    #[test]
    fn null_is_an_empty_mapping() {
        assert!(parse_json(b"null").unwrap().is_empty());
    }

    #[test]
    fn json_primitives_round_trip() {
        let original = json!({
            "action": "get_version",
            "count": 3,
            "ratio": 0.5,
            "negative": -7,
            "flag": true,
            "nothing": null,
            "nested": {"list": [1, "two", false]}
        });
        let encoded = serde_json::to_vec(&original).unwrap();
        let params = parse_json(&encoded).unwrap();
        assert_eq!(Value::Object(params), original);
    }
}
