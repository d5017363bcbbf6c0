use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use switchboard::http::request::{HttpRequest, Method, RequestHead};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    age: u32,
}

fn head(version: &str, headers: &[(&str, &str)]) -> RequestHead {
    RequestHead {
        method: Method::GET,
        target: "/".to_string(),
        version: version.to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    }
}

#[test]
fn test_extract_typed_body() {
    let req = HttpRequest::new(Method::POST, "/users", r#"{"id":1,"name":"a","age":2}"#);

    let user: User = req.extract().unwrap();
    assert_eq!(
        user,
        User {
            id: 1,
            name: "a".to_string(),
            age: 2
        }
    );
}

#[test]
fn test_extract_not_json_is_absent() {
    let req = HttpRequest::new(Method::POST, "/users", "not json");

    assert!(req.extract::<User>().is_none());
    assert!(req.extract::<serde_json::Value>().is_none());
}

#[test]
fn test_extract_empty_body_is_absent() {
    let req = HttpRequest::new(Method::GET, "/users", "");

    assert!(req.extract::<serde_json::Value>().is_none());
}

#[test]
fn test_extract_shape_mismatch_is_absent() {
    let req = HttpRequest::new(Method::POST, "/users", r#"{"id":"seven"}"#);

    assert!(req.extract::<User>().is_none());
    // Untyped extraction still accepts any valid JSON.
    assert_eq!(req.extract::<serde_json::Value>(), Some(json!({"id": "seven"})));
}

#[test]
fn test_try_extract_reports_error() {
    let req = HttpRequest::new(Method::POST, "/users", "{\"id\":");

    let err = req.try_extract::<User>().unwrap_err();
    assert!(err.to_string().contains("EOF"));
}

#[test]
fn test_extract_round_trips_serialized_values() {
    let values = vec![
        json!(null),
        json!(42),
        json!("text with \"quotes\" and ünïcode"),
        json!([1, 2.5, false, null]),
        json!({"nested": {"list": [{"a": 1}], "empty": {}}}),
    ];

    for value in values {
        let req = HttpRequest::new(Method::POST, "/", serde_json::to_string(&value).unwrap());
        assert_eq!(req.extract::<serde_json::Value>(), Some(value));
    }

    let user = User {
        id: 7,
        name: "Ann".to_string(),
        age: 30,
    };
    let req = HttpRequest::new(Method::POST, "/users", serde_json::to_string(&user).unwrap());
    assert_eq!(req.extract::<User>(), Some(user));
}

#[test]
fn test_request_accessors() {
    let req = HttpRequest::new(Method::PUT, "/users", "{}");

    assert_eq!(req.method(), &Method::PUT);
    assert_eq!(req.path(), "/users");
    assert_eq!(req.body(), "{}");
}

#[test]
fn test_head_header_lookup_ignores_case() {
    let head = head("HTTP/1.1", &[("content-type", "application/json")]);

    assert_eq!(head.header("Content-Type"), Some("application/json"));
    assert_eq!(head.header("Missing"), None);
}

#[test]
fn test_head_content_length() {
    assert_eq!(head("HTTP/1.1", &[("Content-Length", "42")]).content_length(), 42);
    assert_eq!(head("HTTP/1.1", &[]).content_length(), 0);
}

#[test]
fn test_head_chunked_detection() {
    assert!(head("HTTP/1.1", &[("Transfer-Encoding", "chunked")]).is_chunked());
    assert!(head("HTTP/1.1", &[("Transfer-Encoding", "gzip, Chunked")]).is_chunked());
    assert!(!head("HTTP/1.1", &[("Transfer-Encoding", "gzip")]).is_chunked());
    assert!(!head("HTTP/1.1", &[]).is_chunked());
}

#[test]
fn test_head_keep_alive() {
    assert!(head("HTTP/1.1", &[]).keep_alive());
    assert!(head("HTTP/1.1", &[("Connection", "Keep-Alive")]).keep_alive());
    assert!(!head("HTTP/1.1", &[("Connection", "close")]).keep_alive());
    assert!(!head("HTTP/1.0", &[]).keep_alive());
    assert!(head("HTTP/1.0", &[("Connection", "keep-alive")]).keep_alive());
}

#[test]
fn test_request_method_from_string() {
    assert_eq!(Method::from_str("GET"), Some(Method::GET));
    assert_eq!(Method::from_str("POST"), Some(Method::POST));
    assert_eq!(Method::from_str("PURGE"), Some(Method::Other("PURGE".to_string())));
    assert_eq!(Method::from_str("get"), Some(Method::Other("get".to_string()))); // Case-sensitive
    assert_eq!(Method::from_str(""), None);
    assert_eq!(Method::from_str("GE T"), None);
    assert_eq!(Method::from_str("GET/1"), None);
    assert_eq!(Method::PATCH.to_string(), "PATCH");
    assert_eq!(Method::Other("TRACE".to_string()).to_string(), "TRACE");
}
