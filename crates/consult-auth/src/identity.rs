//! Identity resolver: reads the subject out of a credential's payload.
//!
//! Decoding is structural only. Signatures are verified by the backend,
//! never here.

use crate::credential::Credential;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Subject identifier carried by `credential`, or `None` if its token is
/// malformed.
pub fn get_subject_id(credential: &Credential) -> Option<String> {
    subject_from_token(&credential.raw_token)
}

/// Decode the payload segment of a `header.payload.signature` token and
/// return its `sub` claim (falling back to `id`).
pub fn subject_from_token(raw_token: &str) -> Option<String> {
    let mut segments = raw_token.trim().split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() || payload.is_empty() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let claims = claims.as_object()?;

    ["sub", "id"]
        .iter()
        .filter_map(|name| claims.get(*name))
        .find_map(claim_as_id)
}

fn claim_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_extracts_sub_claim() {
        let token = token_with(r#"{"sub":"abc-123","exp":1}"#);
        assert_eq!(subject_from_token(&token).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_falls_back_to_numeric_id_claim() {
        let token = token_with(r#"{"id":987}"#);
        assert_eq!(subject_from_token(&token).as_deref(), Some("987"));
    }

    #[test]
    fn test_prefers_sub_over_id() {
        let token = token_with(r#"{"id":"other","sub":"primary"}"#);
        assert_eq!(subject_from_token(&token).as_deref(), Some("primary"));
    }

    #[test]
    fn test_tolerates_padded_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"p"}"#);
        let token = format!("h.{}.s", payload);
        assert_eq!(subject_from_token(&token).as_deref(), Some("p"));
    }

    #[test]
    fn test_malformed_tokens_yield_none() {
        assert!(subject_from_token("").is_none());
        assert!(subject_from_token("opaque-token").is_none());
        assert!(subject_from_token("a.b").is_none());
        assert!(subject_from_token("a.b.c.d").is_none());
        assert!(subject_from_token("h.!!!.s").is_none());
        assert!(subject_from_token(&token_with("not json")).is_none());
        assert!(subject_from_token(&token_with(r#"["sub"]"#)).is_none());
        assert!(subject_from_token(&token_with(r#"{"sub":""}"#)).is_none());
        assert!(subject_from_token(&token_with(r#"{"name":"x"}"#)).is_none());
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let token = token_with(r#"{"sub":"same"}"#);
        let first = subject_from_token(&token);
        for _ in 0..10 {
            assert_eq!(subject_from_token(&token), first);
        }
    }
}
