//! Scope translation: [`ServerScope`] → [`HttpScope`].
//!
//! A pure function with no I/O.  The rules:
//!
//! | AppProtocol field | Source                                                 |
//! |-------------------|--------------------------------------------------------|
//! | `server`/`client` | `"host:port"` split on the last colon, `[]` if absent  |
//! | `raw_path`        | `path` as single-byte-per-codepoint bytes, `b""` if absent |
//! | `query_string`    | same encoding, `b""` if absent                         |
//! | `headers`         | byte pairs in the host's iteration order, `[]` if absent |
//! | `root_path`       | always `""`                                            |
//! | `state`           | the process-wide lifespan state, shared by reference   |
//!
//! A missing or empty source scope is the only input that is rejected.

use std::collections::BTreeMap;

use rsgi_core::protocol::messages::HTTP_RESPONSE_PATHSEND;
use rsgi_core::{AsgiVersion, Headers, HttpScope, ServerScope, SharedState};
use thiserror::Error;

/// Errors from scope translation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// The host server supplied no scope, or an empty one.
    #[error("invalid input: scope cannot be empty")]
    InvalidInput,
}

/// Builds the AppProtocol scope for one request.
///
/// # Errors
///
/// Returns [`ScopeError::InvalidInput`] when `scope` is `None` or
/// [`ServerScope::is_empty`].
pub fn translate_scope(
    scope: Option<&ServerScope>,
    asgi: &AsgiVersion,
    state: &SharedState,
) -> Result<HttpScope, ScopeError> {
    let scope = match scope {
        Some(scope) if !scope.is_empty() => scope,
        _ => return Err(ScopeError::InvalidInput),
    };

    let path = scope.path.clone().unwrap_or_default();
    let raw_path = latin1_bytes(&path);
    let query_string = scope
        .query_string
        .as_deref()
        .map(latin1_bytes)
        .unwrap_or_default();
    let headers: Headers = scope
        .headers
        .iter()
        .flatten()
        .map(|(name, value)| (latin1_bytes(name), latin1_bytes(value)))
        .collect();

    let mut extensions = BTreeMap::new();
    extensions.insert(
        HTTP_RESPONSE_PATHSEND.to_string(),
        serde_json::Value::Object(Default::default()),
    );

    Ok(HttpScope {
        asgi: asgi.clone(),
        extensions,
        scope_type: scope.proto.clone(),
        http_version: scope.http_version.clone(),
        server: split_address(scope.server.as_deref()),
        client: split_address(scope.client.as_deref()),
        scheme: scope.scheme.clone(),
        method: scope.method.clone(),
        path,
        raw_path,
        query_string,
        headers,
        root_path: String::new(),
        state: state.clone(),
    })
}

/// Splits `"host:port"` on the last colon.
///
/// `None` or `""` gives an empty list; an address without a colon is returned
/// as a single element.
pub fn split_address(address: Option<&str>) -> Vec<String> {
    match address {
        None | Some("") => Vec::new(),
        Some(address) => match address.rsplit_once(':') {
            Some((host, port)) => vec![host.to_string(), port.to_string()],
            None => vec![address.to_string()],
        },
    }
}

/// Encodes text with one byte per code point.
///
/// Code points up to U+00FF map to the byte of the same value.  Anything
/// above cannot be represented in one byte and is written as its UTF-8
/// sequence instead, so no input is lost.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(byte) => out.push(byte),
            Err(_) => {
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scope() -> ServerScope {
        ServerScope {
            proto: "http".to_string(),
            http_version: "1.1".to_string(),
            server: Some("example.com:80".to_string()),
            client: Some("127.0.0.1:1234".to_string()),
            scheme: "https".to_string(),
            method: "GET".to_string(),
            path: Some("/test".to_string()),
            query_string: Some("key=value".to_string()),
            headers: Some(vec![(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
        }
    }

    fn translate(scope: Option<&ServerScope>) -> Result<HttpScope, ScopeError> {
        translate_scope(scope, &AsgiVersion::default(), &SharedState::new())
    }

    #[test]
    fn test_fields_are_mapped() {
        // Arrange
        let scope = sample_scope();

        // Act
        let result = translate(Some(&scope)).unwrap();

        // Assert
        assert_eq!(result.scope_type, "http");
        assert_eq!(result.http_version, "1.1");
        assert_eq!(result.server, vec!["example.com", "80"]);
        assert_eq!(result.client, vec!["127.0.0.1", "1234"]);
        assert_eq!(result.scheme, "https");
        assert_eq!(result.method, "GET");
        assert_eq!(result.path, "/test");
        assert_eq!(result.raw_path, b"/test");
        assert_eq!(result.query_string, b"key=value");
        assert_eq!(
            result.headers,
            vec![(b"Content-Type".to_vec(), b"application/json".to_vec())]
        );
        assert_eq!(result.root_path, "");
        assert_eq!(result.asgi, AsgiVersion::default());
    }

    #[test]
    fn test_pathsend_extension_is_advertised() {
        let result = translate(Some(&sample_scope())).unwrap();
        assert_eq!(
            result.extensions.get("http.response.pathsend"),
            Some(&serde_json::json!({}))
        );
    }

    #[test]
    fn test_missing_scope_is_invalid_input() {
        assert_eq!(translate(None).unwrap_err(), ScopeError::InvalidInput);
    }

    #[test]
    fn test_empty_scope_is_invalid_input() {
        assert_eq!(
            translate(Some(&ServerScope::default())).unwrap_err(),
            ScopeError::InvalidInput
        );
    }

    #[test]
    fn test_absent_optional_fields_become_empty() {
        let scope = ServerScope {
            proto: "http".to_string(),
            method: "POST".to_string(),
            ..ServerScope::default()
        };

        let result = translate(Some(&scope)).unwrap();

        assert!(result.server.is_empty());
        assert!(result.client.is_empty());
        assert_eq!(result.path, "");
        assert!(result.raw_path.is_empty());
        assert!(result.query_string.is_empty());
        assert!(result.headers.is_empty());
    }

    #[test]
    fn test_state_is_shared_by_reference() {
        let state = SharedState::new();
        let result = translate_scope(Some(&sample_scope()), &AsgiVersion::default(), &state).unwrap();
        assert!(result.state.same_as(&state));
    }

    #[test]
    fn test_headers_keep_order_and_duplicates() {
        let mut scope = sample_scope();
        scope.headers = Some(vec![
            ("b".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ]);

        let result = translate(Some(&scope)).unwrap();

        let names: Vec<&[u8]> = result.headers.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(names, vec![&b"b"[..], &b"a"[..], &b"b"[..]]);
    }

    #[test]
    fn test_split_address_uses_last_colon() {
        assert_eq!(split_address(Some("[::1]:8080")), vec!["[::1]", "8080"]);
        assert_eq!(split_address(Some("unix-socket")), vec!["unix-socket"]);
        assert!(split_address(Some("")).is_empty());
        assert!(split_address(None).is_empty());
    }

    #[test]
    fn test_latin1_encoding_is_one_byte_per_codepoint() {
        assert_eq!(latin1_bytes("/caf\u{e9}"), vec![b'/', b'c', b'a', b'f', 0xE9]);
        assert_eq!(latin1_bytes("a=1&b=2"), b"a=1&b=2".to_vec());
    }

    #[test]
    fn test_latin1_encoding_keeps_wide_codepoints_as_utf8() {
        assert_eq!(latin1_bytes("\u{20ac}"), "\u{20ac}".as_bytes().to_vec());
    }
}
