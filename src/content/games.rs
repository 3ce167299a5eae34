//! Game listing and game pages.

use serde::{Deserialize, Serialize};

use super::{collection_policy, entry_policy, GAMES, MAX_PAGE_SIZE};
use crate::api::AppState;
use crate::cache::keys;
use crate::cms::types::{Collection, Game};
use crate::cms::{CmsError, CmsResult, FilterOp, SortDir, StrapiQuery};

pub const DEFAULT_PAGE_SIZE: u32 = 24;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSort {
    #[default]
    Newest,
    Rating,
    Title,
}

/// Listing filters as they arrive in a query string.
///
/// `providers` and `categories` are comma-separated slug lists.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFilters {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub providers: Option<String>,
    pub categories: Option<String>,
    pub search: Option<String>,
    pub sort: Option<GameSort>,
}

fn slug_list(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl GameFilters {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Strapi query for this listing
    pub fn to_query(&self) -> StrapiQuery {
        let mut query = StrapiQuery::new()
            .populate("images")
            .populate("provider")
            .populate("categories");

        let providers = slug_list(&self.providers);
        if !providers.is_empty() {
            query = query.filter_in(&["provider", "slug"], &providers);
        }
        let categories = slug_list(&self.categories);
        if !categories.is_empty() {
            query = query.filter_in(&["categories", "slug"], &categories);
        }
        if let Some(term) = self.search_term() {
            query = query
                .or_filter(0, &["title"], FilterOp::ContainsI, term)
                .or_filter(1, &["provider", "title"], FilterOp::ContainsI, term);
        }

        query = match self.sort.unwrap_or_default() {
            GameSort::Newest => query.sort("createdAt", SortDir::Desc),
            GameSort::Rating => query
                .sort("ratingAvg", SortDir::Desc)
                .sort("ratingCount", SortDir::Desc),
            GameSort::Title => query.sort("title", SortDir::Asc),
        };

        query.page(self.page(), self.page_size())
    }
}

/// Listing result; serialises as `{ games, total, page, pageCount }`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GamesPage {
    pub games: Vec<Game>,
    pub total: u64,
    pub page: u32,
    pub page_count: u32,
}

impl GamesPage {
    pub fn empty(page: u32) -> Self {
        Self {
            games: Vec::new(),
            total: 0,
            page,
            page_count: 0,
        }
    }
}

/// Games listing. CMS failures are logged and produce an empty page.
pub async fn list(state: &AppState, filters: &GameFilters) -> GamesPage {
    match try_list(state, filters).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!(error = %e, "failed to load games, serving empty listing");
            GamesPage::empty(filters.page())
        }
    }
}

async fn try_list(state: &AppState, filters: &GameFilters) -> CmsResult<GamesPage> {
    let query = filters.to_query();
    let key = keys::collection(GAMES, &query.fingerprint());
    let cms = state.cms.clone();

    state
        .cache
        .get_or_fetch(&key, collection_policy(state, GAMES), move || async move {
            let found: Collection<Game> = cms.find(GAMES, &query).await?;
            let pagination = found.pagination();
            Ok::<_, CmsError>(GamesPage {
                games: found.data,
                total: pagination.total,
                page: pagination.page.max(1),
                page_count: pagination.page_count,
            })
        })
        .await
}

fn detail_query() -> StrapiQuery {
    StrapiQuery::new()
        .populate("images")
        .populate("provider")
        .populate("categories")
        .populate("seo")
        .populate_nested("author", "photo")
}

/// A single game by slug
pub async fn by_slug(state: &AppState, slug: &str) -> CmsResult<Option<Game>> {
    let cms = state.cms.clone();
    let owned = slug.to_string();
    state
        .cache
        .get_or_fetch(
            &keys::entry(GAMES, slug),
            entry_policy(state, GAMES, slug),
            move || async move { cms.find_by_slug::<Game>(GAMES, &owned, detail_query()).await },
        )
        .await
}

/// Other games from the same provider
pub async fn related(state: &AppState, game: &Game, limit: u32) -> Vec<Game> {
    let Some(provider) = &game.provider else {
        return Vec::new();
    };

    let query = StrapiQuery::new()
        .filter(&["provider", "slug"], FilterOp::Eq, &provider.slug)
        .filter(&["slug"], FilterOp::Ne, &game.slug)
        .populate("images")
        .sort("ratingAvg", SortDir::Desc)
        .page(1, limit.clamp(1, MAX_PAGE_SIZE));

    match super::cached_page::<Game>(state, GAMES, query).await {
        Ok(page) => page.items,
        Err(e) => {
            tracing::warn!(game = %game.slug, error = %e, "failed to load related games");
            Vec::new()
        }
    }
}

/// Most recently added games
pub async fn latest(state: &AppState, limit: u32) -> CmsResult<Vec<Game>> {
    let query = StrapiQuery::new()
        .populate("images")
        .populate("provider")
        .sort("createdAt", SortDir::Desc)
        .page(1, limit.clamp(1, MAX_PAGE_SIZE));
    Ok(super::cached_page::<Game>(state, GAMES, query).await?.items)
}
