//! Author profile pages: the author plus everything they wrote.

use serde::{Deserialize, Serialize};

use super::{entry_policy, AUTHORS, BLOGS, CASINOS};
use crate::api::AppState;
use crate::cache::keys;
use crate::cms::types::{Author, Blog, Casino};
use crate::cms::{CmsError, FilterOp, SortDir, StrapiClient, StrapiQuery};

const LISTED_PER_TYPE: u32 = 12;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthorProfile {
    pub author: Author,
    pub casinos: Vec<Casino>,
    pub blogs: Vec<Blog>,
}

fn by_author(slug: &str, fields: &[&str]) -> StrapiQuery {
    StrapiQuery::new()
        .filter(&["author", "slug"], FilterOp::Eq, slug)
        .fields(fields)
        .sort("updatedAt", SortDir::Desc)
        .page(1, LISTED_PER_TYPE)
}

async fn load_profile(cms: StrapiClient, slug: String) -> Result<Option<AuthorProfile>, CmsError> {
    let author = match cms
        .find_by_slug::<Author>(AUTHORS, &slug, StrapiQuery::new().populate("photo"))
        .await?
    {
        Some(author) => author,
        None => return Ok(None),
    };

    let casino_query = by_author(&slug, &["title", "slug", "ratingAvg", "ratingCount", "updatedAt"]).populate("logo");
    let blog_query = by_author(&slug, &["title", "slug", "excerpt", "publishedAt", "updatedAt"]).populate("image");

    let (casinos, blogs) = tokio::try_join!(
        cms.find::<Casino>(CASINOS, &casino_query),
        cms.find::<Blog>(BLOGS, &blog_query),
    )?;

    Ok(Some(AuthorProfile {
        author,
        casinos: casinos.data,
        blogs: blogs.data,
    }))
}

/// Author profile by slug. Tagged with the casino and blog collections too,
/// since the page lists their entries.
pub async fn by_slug(state: &AppState, slug: &str) -> Result<Option<AuthorProfile>, CmsError> {
    let policy = entry_policy(state, AUTHORS, slug)
        .tagged(keys::tags::collection(CASINOS))
        .tagged(keys::tags::collection(BLOGS));

    state
        .cache
        .get_or_fetch(
            &keys::entry(AUTHORS, slug),
            policy,
            {
                let cms = state.cms.clone();
                let slug = slug.to_string();
                move || load_profile(cms, slug)
            },
        )
        .await
}
