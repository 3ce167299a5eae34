//! CMS-managed redirects.

use std::collections::HashMap;

use axum::http::HeaderValue;

use super::{collection_policy, fetch_all, REDIRECTS};
use crate::api::AppState;
use crate::cache::keys;
use crate::cms::types::Redirect;
use crate::cms::{CmsError, CmsResult, StrapiQuery};

/// Where a matched path should go
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectTarget {
    pub destination: String,
    pub permanent: bool,
}

/// Lookup table built from the CMS redirect entries
#[derive(Clone, Debug, Default)]
pub struct RedirectTable {
    entries: HashMap<String, RedirectTarget>,
}

/// `/Foo/bar/` → `/Foo/bar`; a missing leading slash is added
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl RedirectTable {
    pub fn from_entries(redirects: Vec<Redirect>) -> Self {
        let mut entries = HashMap::new();
        for redirect in redirects {
            let source = normalize(&redirect.redirect_url);
            let destination = redirect.destination.trim().to_string();
            if destination.is_empty()
                || normalize(&destination) == source
                || HeaderValue::from_str(&destination).is_err()
            {
                tracing::warn!(source = %source, "skipping redirect without a usable destination");
                continue;
            }
            entries.insert(
                source,
                RedirectTarget {
                    destination,
                    permanent: redirect.permanent,
                },
            );
        }
        Self { entries }
    }

    pub fn resolve(&self, path: &str) -> Option<&RedirectTarget> {
        self.entries.get(&normalize(path))
    }
}

/// Every redirect defined in the CMS
pub async fn all(state: &AppState) -> CmsResult<RedirectTable> {
    let cms = state.cms.clone();
    let redirects: Vec<Redirect> = state
        .cache
        .get_or_fetch(
            &keys::collection(REDIRECTS, "all"),
            collection_policy(state, REDIRECTS),
            move || async move {
                let query = StrapiQuery::new().fields(&["redirectUrl", "destination", "permanent"]);
                fetch_all::<Redirect>(&cms, REDIRECTS, &query).await
            },
        )
        .await?;

    Ok(RedirectTable::from_entries(redirects))
}

/// Resolve a request path, logging and ignoring lookup failures
pub async fn resolve(state: &AppState, path: &str) -> Option<RedirectTarget> {
    match all(state).await {
        Ok(table) => table.resolve(path).cloned(),
        Err(e) => {
            log_lookup_failure(&e);
            None
        }
    }
}

fn log_lookup_failure(error: &CmsError) {
    tracing::warn!(error = %error, "redirect lookup failed, continuing without redirects");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect(from: &str, to: &str, permanent: bool) -> Redirect {
        Redirect {
            id: 0,
            redirect_url: from.to_string(),
            destination: to.to_string(),
            permanent,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/old/"), "/old");
        assert_eq!(normalize("old"), "/old");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/a?b=1"), "/a");
    }

    #[test]
    fn test_resolve() {
        let table = RedirectTable::from_entries(vec![
            redirect("/old-casino/", "/casinos/new-casino", true),
            redirect("promo", "https://partner.example.com/promo", false),
        ]);

        let target = table.resolve("/old-casino").unwrap();
        assert_eq!(target.destination, "/casinos/new-casino");
        assert!(target.permanent);

        let target = table.resolve("/promo/").unwrap();
        assert!(!target.permanent);
        assert!(table.resolve("/casinos").is_none());
    }

    #[test]
    fn test_self_and_empty_redirects_skipped() {
        let table = RedirectTable::from_entries(vec![
            redirect("/loop", "/loop/", true),
            redirect("/nowhere", "  ", true),
            redirect("/broken", "/casinos\r\nX-Injected: 1", true),
        ]);
        assert!(table.resolve("/loop").is_none());
        assert!(table.resolve("/nowhere").is_none());
        assert!(table.resolve("/broken").is_none());
    }
}
