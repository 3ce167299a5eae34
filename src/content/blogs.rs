//! Blog posts.

use super::{cached_page, entry_policy, Page, BLOGS, MAX_PAGE_SIZE};
use crate::api::AppState;
use crate::cache::keys;
use crate::cms::types::Blog;
use crate::cms::{CmsResult, SortDir, StrapiQuery};

pub const PAGE_SIZE: u32 = 12;

fn card_query() -> StrapiQuery {
    StrapiQuery::new()
        .fields(&["title", "slug", "excerpt", "publishedAt", "updatedAt"])
        .populate("image")
        .populate_fields("author", &["name", "slug"])
        .sort("publishedAt", SortDir::Desc)
}

pub async fn by_slug(state: &AppState, slug: &str) -> CmsResult<Option<Blog>> {
    let cms = state.cms.clone();
    let owned = slug.to_string();
    state
        .cache
        .get_or_fetch(
            &keys::entry(BLOGS, slug),
            entry_policy(state, BLOGS, slug),
            move || async move {
                let query = StrapiQuery::new()
                    .populate("image")
                    .populate("seo")
                    .populate_nested("author", "photo");
                cms.find_by_slug::<Blog>(BLOGS, &owned, query).await
            },
        )
        .await
}

pub async fn latest(state: &AppState, limit: u32) -> CmsResult<Vec<Blog>> {
    let query = card_query().page(1, limit.clamp(1, MAX_PAGE_SIZE));
    Ok(cached_page::<Blog>(state, BLOGS, query).await?.items)
}

pub async fn list(state: &AppState, page: u32) -> CmsResult<Page<Blog>> {
    cached_page(state, BLOGS, card_query().page(page.max(1), PAGE_SIZE)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .and(query_param("sort[0]", "publishedAt:desc"))
            .and(query_param("pagination[page]", "2"))
            .and(query_param("pagination[pageSize]", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "title": "Bonus guide", "slug": "bonus-guide", "excerpt": "Read this" }],
                "meta": { "pagination": { "page": 2, "pageSize": 12, "pageCount": 3, "total": 25 } }
            })))
            .mount(&env.cms)
            .await;

        let page = list(&env.state, 2).await.unwrap();
        assert_eq!(page.items[0].slug, "bonus-guide");
        assert_eq!((page.page, page.page_count, page.total), (2, 3, 25));
    }

    #[tokio::test]
    async fn test_latest_clamps_limit() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .and(query_param("pagination[pageSize]", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&env.cms)
            .await;

        assert!(latest(&env.state, 500).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_by_slug_is_cached() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .and(query_param("filters[slug][$eq]", "bonus-guide"))
            .and(query_param("populate[seo]", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "documentId": "b1", "title": "Bonus guide", "slug": "bonus-guide", "content": "<p>Hi</p>" }]
            })))
            .expect(1)
            .mount(&env.cms)
            .await;

        for _ in 0..2 {
            let blog = by_slug(&env.state, "bonus-guide").await.unwrap().unwrap();
            assert_eq!(blog.document_id, "b1");
            assert_eq!(blog.content.as_deref(), Some("<p>Hi</p>"));
        }
    }

    #[tokio::test]
    async fn test_unknown_slug() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&env.cms)
            .await;

        assert!(by_slug(&env.state, "nope").await.unwrap().is_none());
    }
}
