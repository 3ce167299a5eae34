//! Cached content queries.
//!
//! Each submodule shapes the Strapi queries for one content type and wraps
//! them in the stale-while-revalidate cache. Cache entries are tagged with
//! `collection:<name>` (and `<name>:<slug>` for single entries) so the
//! revalidation webhook can drop exactly what changed.

pub mod authors;
pub mod blogs;
pub mod casinos;
pub mod games;
pub mod home;
pub mod redirects;
pub mod sitemap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::cache::{keys, CachePolicy};
use crate::cms::{CmsError, CmsResult, StrapiClient, StrapiQuery};
use crate::api::AppState;

pub const GAMES: &str = "games";
pub const CASINOS: &str = "casinos";
pub const BLOGS: &str = "blogs";
pub const AUTHORS: &str = "authors";
pub const REDIRECTS: &str = "redirects";
pub const HOMEPAGE: &str = "homepage";

/// Largest page size accepted by the CMS
pub const MAX_PAGE_SIZE: u32 = 100;

/// Upper bound on pages walked by `fetch_all`
const MAX_PAGES: u32 = 50;

/// One page of a listing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_count: u32,
}

impl<T> Page<T> {
    pub fn empty(page: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            page_count: 0,
        }
    }
}

/// Policy for a whole-collection query
pub(crate) fn collection_policy(state: &AppState, collection: &str) -> CachePolicy {
    state.cache.policy().tagged(keys::tags::collection(collection))
}

/// Policy for a single entry looked up by slug
pub(crate) fn entry_policy(state: &AppState, collection: &str, slug: &str) -> CachePolicy {
    collection_policy(state, collection).tagged(keys::tags::entry(collection, slug))
}

/// Fetch one page of a collection, cached under the query fingerprint
pub(crate) async fn cached_page<T>(state: &AppState, collection: &'static str, query: StrapiQuery) -> CmsResult<Page<T>>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let key = keys::collection(collection, &query.fingerprint());
    let cms = state.cms.clone();
    state
        .cache
        .get_or_fetch(&key, collection_policy(state, collection), move || async move {
            let found = cms.find::<T>(collection, &query).await?;
            let pagination = found.pagination();
            Ok::<_, CmsError>(Page {
                items: found.data,
                total: pagination.total,
                page: pagination.page.max(1),
                page_count: pagination.page_count,
            })
        })
        .await
}

/// Walk every page of a collection
pub(crate) async fn fetch_all<T: DeserializeOwned>(
    cms: &StrapiClient,
    collection: &str,
    query: &StrapiQuery,
) -> CmsResult<Vec<T>> {
    let mut all = Vec::new();
    let mut page = 1;

    loop {
        let found = cms
            .find::<T>(collection, &query.clone().page(page, MAX_PAGE_SIZE))
            .await?;
        let pagination = found.pagination();
        all.extend(found.data);

        if page >= pagination.page_count || page >= MAX_PAGES {
            break;
        }
        page += 1;
    }

    Ok(all)
}
