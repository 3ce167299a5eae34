//! CMS webhook that drops cached content.
//!
//! Requests are authenticated with a hex HMAC-SHA256 of the raw body, keyed
//! by `REVALIDATE_SECRET` and sent in the configured signature header.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::AppState;
use crate::cache::keys;
use crate::content::{AUTHORS, BLOGS, CASINOS, GAMES, HOMEPAGE, REDIRECTS};
use crate::error::{Result, ServerError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
pub struct EventEntry {
    #[serde(default)]
    pub slug: Option<String>,
}

/// Accepted webhook bodies
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RevalidateRequest {
    Key { key: String },
    Tag { tag: String },
    Prefix { prefix: String },
    Event {
        event: String,
        model: String,
        #[serde(default)]
        entry: Option<EventEntry>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub keys: usize,
}

/// Check `signature` (hex, optionally `sha256=`-prefixed) against the body
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Hex signature for a body, as the CMS would send it
#[cfg(test)]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Plural collection name for a known CMS model id
fn collection_for_model(model: &str) -> Option<&'static str> {
    match model {
        "game" | "games" => Some(GAMES),
        "casino" | "casinos" => Some(CASINOS),
        "blog" | "blogs" => Some(BLOGS),
        "author" | "authors" => Some(AUTHORS),
        "redirect" | "redirects" => Some(REDIRECTS),
        "homepage" => Some(HOMEPAGE),
        _ => None,
    }
}

/// Cache tags affected by a CMS model event. Unknown models only drop
/// their collection tag.
pub fn tags_for_event(model: &str, slug: Option<&str>) -> Vec<String> {
    let Some(collection) = collection_for_model(model) else {
        return vec![keys::tags::collection(model)];
    };
    let mut tags = vec![keys::tags::collection(collection)];
    if let Some(slug) = slug.map(str::trim).filter(|s| !s.is_empty()) {
        tags.push(keys::tags::entry(collection, slug));
    }
    tags
}

/// POST /api/revalidate
pub async fn revalidate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RevalidateResponse>> {
    let secret = state.config.revalidate_secret.as_deref().ok_or_else(|| {
        tracing::warn!("revalidation request received but REVALIDATE_SECRET is not set");
        ServerError::InvalidSignature
    })?;
    let signature = headers
        .get(state.config.signature_header.as_str())
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::InvalidSignature)?;
    if !verify_signature(secret, &body, signature) {
        tracing::warn!("revalidation rejected: bad signature");
        return Err(ServerError::InvalidSignature);
    }

    let request: RevalidateRequest = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid revalidation body: {}", e)))?;

    let cache = &state.cache;
    let keys = match &request {
        RevalidateRequest::Key { key } => cache.invalidate_key(key).await?,
        RevalidateRequest::Tag { tag } => cache.invalidate_tag(tag).await?,
        RevalidateRequest::Prefix { prefix } => {
            if prefix.trim().is_empty() {
                return Err(ServerError::InvalidRequest("Prefix must not be empty".to_string()));
            }
            cache.invalidate_prefix(prefix).await?
        }
        RevalidateRequest::Event { event, model, entry } => {
            let slug = entry.as_ref().and_then(|e| e.slug.as_deref());
            let mut removed = 0;
            for tag in tags_for_event(model, slug) {
                removed += cache.invalidate_tag(&tag).await?;
            }
            if collection_for_model(model) == Some(REDIRECTS) {
                removed += cache.invalidate_key(&keys::collection(REDIRECTS, "all")).await?;
            }
            tracing::info!(event = %event, model = %model, slug = ?slug, "CMS event received");
            removed
        }
    };

    tracing::info!(request = ?request, keys, "cache revalidated");
    Ok(Json(RevalidateResponse {
        revalidated: true,
        keys,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_roundtrip_and_prefix() {
        let body = br#"{"tag":"collection:games"}"#;
        let signature = sign("s3cret", body);

        assert!(verify_signature("s3cret", body, &signature));
        assert!(verify_signature("s3cret", body, &format!("sha256={}", signature)));
        assert!(!verify_signature("other", body, &signature));
        assert!(!verify_signature("s3cret", b"{}", &signature));
        assert!(!verify_signature("s3cret", body, "not-hex"));
    }

    #[test]
    fn test_body_shapes() {
        let key: RevalidateRequest = serde_json::from_str(r#"{"key":"games:slug:x"}"#).unwrap();
        assert!(matches!(key, RevalidateRequest::Key { .. }));

        let prefix: RevalidateRequest = serde_json::from_str(r#"{"prefix":"games:"}"#).unwrap();
        assert!(matches!(prefix, RevalidateRequest::Prefix { ref prefix } if prefix == "games:"));

        let event: RevalidateRequest =
            serde_json::from_str(r#"{"event":"entry.update","model":"game","entry":{"id":1,"slug":"starburst"}}"#)
                .unwrap();
        assert!(matches!(event, RevalidateRequest::Event { ref model, .. } if model == "game"));

        assert!(serde_json::from_str::<RevalidateRequest>(r#"{"hello":"world"}"#).is_err());
    }

    #[test]
    fn test_event_tags() {
        assert_eq!(
            tags_for_event("game", Some("starburst")),
            vec!["collection:games".to_string(), "games:starburst".to_string()]
        );
        assert_eq!(tags_for_event("casino", None), vec!["collection:casinos".to_string()]);
        assert_eq!(tags_for_event("promotion", Some("x")), vec!["collection:promotion".to_string()]);
    }
}
