//! Sitemap entries.

use serde::{Deserialize, Serialize};

use super::{collection_policy, fetch_all, AUTHORS, BLOGS, CASINOS, GAMES};
use crate::api::AppState;
use crate::cms::types::SlugEntry;
use crate::cms::{CmsError, StrapiQuery};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SitemapKind {
    Pages,
    Casinos,
    Games,
    Blogs,
    Authors,
}

impl SitemapKind {
    pub const ALL: [SitemapKind; 5] = [
        SitemapKind::Pages,
        SitemapKind::Casinos,
        SitemapKind::Games,
        SitemapKind::Blogs,
        SitemapKind::Authors,
    ];

    /// Parse the file name used in `/sitemaps/:file`
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".xml")?;
        Self::ALL.into_iter().find(|kind| kind.name() == stem)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SitemapKind::Pages => "pages",
            SitemapKind::Casinos => "casinos",
            SitemapKind::Games => "games",
            SitemapKind::Blogs => "blogs",
            SitemapKind::Authors => "authors",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.xml", self.name())
    }

    /// CMS collection and public path prefix for content-backed sitemaps
    fn source(&self) -> Option<(&'static str, &'static str)> {
        match self {
            SitemapKind::Pages => None,
            SitemapKind::Casinos => Some((CASINOS, "/casinos")),
            SitemapKind::Games => Some((GAMES, "/games")),
            SitemapKind::Blogs => Some((BLOGS, "/blog")),
            SitemapKind::Authors => Some((AUTHORS, "/authors")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
}

const STATIC_PAGES: [&str; 4] = ["/", "/casinos", "/games", "/blog"];

/// Entries for one sitemap file, with absolute URLs
pub async fn entries(state: &AppState, kind: SitemapKind) -> Result<Vec<SitemapEntry>, CmsError> {
    let site_url = state.config.site_url.clone();

    let Some((collection, prefix)) = kind.source() else {
        return Ok(STATIC_PAGES
            .iter()
            .map(|path| SitemapEntry {
                loc: format!("{}{}", site_url, path),
                lastmod: None,
            })
            .collect());
    };

    let cms = state.cms.clone();
    let slugs: Vec<SlugEntry> = state
        .cache
        .get_or_fetch(
            &format!("sitemap:{}", kind.name()),
            collection_policy(state, collection),
            move || async move {
                let query = StrapiQuery::new().fields(&["slug", "updatedAt"]);
                fetch_all::<SlugEntry>(&cms, collection, &query).await
            },
        )
        .await?;

    Ok(slugs
        .into_iter()
        .filter(|entry| !entry.slug.is_empty())
        .map(|entry| SitemapEntry {
            loc: format!("{}{}/{}", site_url, prefix, entry.slug),
            lastmod: entry.updated_at.map(|ts| ts.chars().take(10).collect()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(SitemapKind::from_file_name("games.xml"), Some(SitemapKind::Games));
        assert_eq!(SitemapKind::from_file_name("pages.xml"), Some(SitemapKind::Pages));
        assert_eq!(SitemapKind::from_file_name("games"), None);
        assert_eq!(SitemapKind::from_file_name("users.xml"), None);
    }

    #[tokio::test]
    async fn test_entries_walk_all_pages() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .and(query_param("pagination[page]", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "slug": "first", "updatedAt": "2026-01-02T10:00:00.000Z" }],
                "meta": { "pagination": { "page": 1, "pageSize": 100, "pageCount": 2, "total": 2 } }
            })))
            .mount(&env.cms)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .and(query_param("pagination[page]", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "slug": "second" }],
                "meta": { "pagination": { "page": 2, "pageSize": 100, "pageCount": 2, "total": 2 } }
            })))
            .mount(&env.cms)
            .await;

        let entries = entries(&env.state, SitemapKind::Blogs).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].loc, format!("{}/blog/first", env.state.config.site_url));
        assert_eq!(entries[0].lastmod.as_deref(), Some("2026-01-02"));
        assert!(entries[1].lastmod.is_none());
    }

    #[tokio::test]
    async fn test_static_pages() {
        let env = TestEnv::start().await;
        let entries = entries(&env.state, SitemapKind::Pages).await.unwrap();
        assert_eq!(entries.len(), STATIC_PAGES.len());
        assert!(entries[0].loc.ends_with('/'));
    }
}
