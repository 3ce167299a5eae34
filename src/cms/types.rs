//! Content types returned by the CMS.
//!
//! Shapes follow the Strapi v5 REST format: entries are flat objects carrying
//! `id` and `documentId`, collections are wrapped in `{ data, meta }`.

use serde::{Deserialize, Serialize};

/// Pagination block of a collection response
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub total: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// `{ data: [...], meta: {...} }`
#[derive(Clone, Debug, Deserialize)]
pub struct Collection<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Meta,
}

impl<T> Collection<T> {
    pub fn pagination(&self) -> Pagination {
        self.meta.pagination.clone().unwrap_or_else(|| Pagination {
            page: 1,
            page_size: self.data.len() as u32,
            page_count: 1,
            total: self.data.len() as u64,
        })
    }
}

/// `{ data: {...} }`
#[derive(Clone, Debug, Deserialize)]
pub struct Single<T> {
    pub data: Option<T>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub alternative_text: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Image {
    /// Resolve the image URL against the media base when the CMS returns a relative path
    pub fn absolute_url(&self, media_base: &str) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") || self.url.starts_with("//") {
            self.url.clone()
        } else {
            format!("{}/{}", media_base.trim_end_matches('/'), self.url.trim_start_matches('/'))
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Seo {
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default, rename = "canonicalURL")]
    pub canonical_url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub document_id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo: Option<Image>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(default)]
    pub id: u64,
    pub title: String,
    pub slug: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: u64,
    pub title: String,
    pub slug: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Casino {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub document_id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub rating_avg: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub logo: Option<Image>,
    #[serde(default)]
    pub bonus_text: Option<String>,
    #[serde(default)]
    pub affiliate_link: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub seo: Option<Seo>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub document_id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub rating_avg: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub images: Option<Image>,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub seo: Option<Seo>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub document_id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub seo: Option<Seo>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    #[serde(default)]
    pub id: u64,
    pub redirect_url: String,
    pub destination: String,
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub title: String,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub seo: Option<Seo>,
}

/// Rating aggregate fields shared by rateable collections
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingFields {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub rating_avg: f64,
    #[serde(default)]
    pub rating_count: u32,
}

/// Slug + modification time, enough for sitemaps
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlugEntry {
    pub slug: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Users-permissions user as returned by `/api/users/me` and the auth endpoints
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CmsUser {
    pub id: u64,
    #[serde(default)]
    pub document_id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Successful login/registration response
#[derive(Clone, Debug, Deserialize)]
pub struct AuthSession {
    pub jwt: String,
    pub user: CmsUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_game_collection() {
        let body = json!({
            "data": [{
                "id": 3,
                "documentId": "abc123",
                "title": "Book of Dead",
                "slug": "book-of-dead",
                "ratingAvg": 4.25,
                "ratingCount": 8,
                "provider": { "id": 1, "title": "Play'n GO", "slug": "playn-go" },
                "categories": [{ "id": 2, "title": "Slots", "slug": "slots" }],
                "images": { "url": "/uploads/book.png" }
            }],
            "meta": { "pagination": { "page": 1, "pageSize": 24, "pageCount": 3, "total": 61 } }
        });

        let games: Collection<Game> = serde_json::from_value(body).unwrap();
        assert_eq!(games.data.len(), 1);
        assert_eq!(games.data[0].document_id, "abc123");
        assert_eq!(games.data[0].rating_count, 8);
        assert_eq!(games.data[0].categories[0].slug, "slots");
        assert_eq!(games.pagination().total, 61);
        assert_eq!(games.pagination().page_count, 3);
    }

    #[test]
    fn test_missing_pagination_defaults_to_data_len() {
        let body = json!({ "data": [{ "redirectUrl": "/old", "destination": "/new" }] });
        let redirects: Collection<Redirect> = serde_json::from_value(body).unwrap();
        let pagination = redirects.pagination();
        assert_eq!(pagination.total, 1);
        assert!(!redirects.data[0].permanent);
    }

    #[test]
    fn test_image_absolute_url() {
        let relative = Image { url: "/uploads/logo.png".into(), ..Default::default() };
        assert_eq!(
            relative.absolute_url("https://cdn.example.com/"),
            "https://cdn.example.com/uploads/logo.png"
        );

        let absolute = Image { url: "https://img.example.com/a.png".into(), ..Default::default() };
        assert_eq!(absolute.absolute_url("https://cdn.example.com"), "https://img.example.com/a.png");
    }

    #[test]
    fn test_seo_canonical_rename() {
        let seo: Seo = serde_json::from_value(json!({
            "metaTitle": "Best casinos",
            "canonicalURL": "https://example.com/casinos"
        }))
        .unwrap();
        assert_eq!(seo.canonical_url.as_deref(), Some("https://example.com/casinos"));
        assert!(seo.meta_description.is_none());
    }
}
