//! Casino reviews.

use super::{cached_page, entry_policy, Page, CASINOS, MAX_PAGE_SIZE};
use crate::api::AppState;
use crate::cache::keys;
use crate::cms::types::Casino;
use crate::cms::{CmsResult, SortDir, StrapiQuery};

pub const PAGE_SIZE: u32 = 20;

fn card_query() -> StrapiQuery {
    StrapiQuery::new()
        .fields(&["title", "slug", "ratingAvg", "ratingCount", "bonusText", "affiliateLink", "updatedAt"])
        .populate("logo")
}

/// A casino review by slug
pub async fn by_slug(state: &AppState, slug: &str) -> CmsResult<Option<Casino>> {
    let cms = state.cms.clone();
    let owned = slug.to_string();
    state
        .cache
        .get_or_fetch(
            &keys::entry(CASINOS, slug),
            entry_policy(state, CASINOS, slug),
            move || async move {
                let query = StrapiQuery::new()
                    .populate("logo")
                    .populate("seo")
                    .populate_nested("author", "photo");
                cms.find_by_slug::<Casino>(CASINOS, &owned, query).await
            },
        )
        .await
}

/// Highest rated casinos
pub async fn top(state: &AppState, limit: u32) -> CmsResult<Vec<Casino>> {
    let query = card_query()
        .sort("ratingAvg", SortDir::Desc)
        .sort("ratingCount", SortDir::Desc)
        .page(1, limit.clamp(1, MAX_PAGE_SIZE));
    Ok(cached_page::<Casino>(state, CASINOS, query).await?.items)
}

/// Paged listing, best rated first
pub async fn list(state: &AppState, page: u32) -> CmsResult<Page<Casino>> {
    let query = card_query()
        .sort("ratingAvg", SortDir::Desc)
        .sort("title", SortDir::Asc)
        .page(page.max(1), PAGE_SIZE);
    cached_page(state, CASINOS, query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_top_sorts_by_rating() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/casinos"))
            .and(query_param("sort[0]", "ratingAvg:desc"))
            .and(query_param("pagination[pageSize]", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "title": "Royal", "slug": "royal", "ratingAvg": 4.8, "ratingCount": 120 },
                    { "title": "Lucky", "slug": "lucky", "ratingAvg": 4.1, "ratingCount": 40 }
                ]
            })))
            .mount(&env.cms)
            .await;

        let casinos = top(&env.state, 3).await.unwrap();
        assert_eq!(casinos.len(), 2);
        assert_eq!(casinos[0].slug, "royal");
    }

    #[tokio::test]
    async fn test_by_slug_invalidated_by_entry_tag() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/casinos"))
            .and(query_param("filters[slug][$eq]", "royal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "documentId": "c1", "title": "Royal", "slug": "royal" }]
            })))
            .expect(2)
            .mount(&env.cms)
            .await;

        assert!(by_slug(&env.state, "royal").await.unwrap().is_some());
        assert!(by_slug(&env.state, "royal").await.unwrap().is_some());

        env.state
            .cache
            .invalidate_tag(&keys::tags::entry(CASINOS, "royal"))
            .await
            .unwrap();
        assert!(by_slug(&env.state, "royal").await.unwrap().is_some());
    }
}
