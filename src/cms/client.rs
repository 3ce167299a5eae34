//! HTTP client for the Strapi REST API.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use super::query::{FilterOp, StrapiQuery};
use super::types::{AuthSession, Collection, CmsUser, Single};

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("CMS responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("CMS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected CMS payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CmsError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CmsError::NotFound(_) => Some(404),
            CmsError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }
}

pub type CmsResult<T> = Result<T, CmsError>;

/// Strapi error envelope: `{ "error": { "status", "name", "message" } }`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct DataBody<T> {
    data: T,
}

/// Strapi REST client.
///
/// Content reads and writes use the server API token when one is configured;
/// user-scoped calls (`me`) forward the user's own JWT instead.
#[derive(Clone)]
pub struct StrapiClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl StrapiClient {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> CmsResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("casino-site/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, query: Option<&StrapiQuery>) -> RequestBuilder {
        let url = format!("{}/api/{}", self.base_url, path.trim_start_matches('/'));

        let mut builder = self.http.request(method, url);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            builder = builder.query(query.pairs());
        }
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> CmsResult<T> {
        let response = builder.header(header::ACCEPT, "application/json").send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(CmsError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            tracing::warn!(status = status.as_u16(), what = %what, message = %message, "CMS request failed");
            return Err(CmsError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// List entries of a collection type
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &StrapiQuery,
    ) -> CmsResult<Collection<T>> {
        tracing::debug!(collection = %collection, query = %query.to_query_string(), "CMS find");
        self.send(self.request(Method::GET, collection, Some(query)), collection)
            .await
    }

    /// First entry matching the query, if any
    pub async fn find_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &StrapiQuery,
    ) -> CmsResult<Option<T>> {
        let query = query.clone().page(1, 1);
        let found: Collection<T> = self.find(collection, &query).await?;
        Ok(found.data.into_iter().next())
    }

    /// Entry of a collection looked up by slug
    pub async fn find_by_slug<T: DeserializeOwned>(
        &self,
        collection: &str,
        slug: &str,
        query: StrapiQuery,
    ) -> CmsResult<Option<T>> {
        let query = query.filter(&["slug"], FilterOp::Eq, slug);
        self.find_one(collection, &query).await
    }

    /// Fetch a single type (e.g. the home page)
    pub async fn single<T: DeserializeOwned>(&self, single_type: &str, query: &StrapiQuery) -> CmsResult<T> {
        let single: Single<T> = self
            .send(self.request(Method::GET, single_type, Some(query)), single_type)
            .await?;
        single.data.ok_or_else(|| CmsError::NotFound(single_type.to_string()))
    }

    /// Partially update an entry: `PUT /api/{collection}/{documentId}` with `{ data }`
    pub async fn update<T, D>(&self, collection: &str, document_id: &str, data: &D) -> CmsResult<T>
    where
        T: DeserializeOwned,
        D: Serialize,
    {
        let path = format!("{}/{}", collection, document_id);
        let single: Single<T> = self
            .send(
                self.request(Method::PUT, &path, None).json(&DataBody { data }),
                &path,
            )
            .await?;
        single.data.ok_or(CmsError::NotFound(path))
    }

    /// Exchange credentials for a JWT (`POST /api/auth/local`)
    pub async fn login(&self, identifier: &str, password: &str) -> CmsResult<AuthSession> {
        // Auth endpoints are public; the API token must not be attached.
        let url = format!("{}/api/auth/local", self.base_url);
        let builder = self.http.post(url).json(&LoginBody { identifier, password });
        self.send(builder, "auth/local").await
    }

    /// Create an account (`POST /api/auth/local/register`)
    pub async fn register(&self, username: &str, email: &str, password: &str) -> CmsResult<AuthSession> {
        let url = format!("{}/api/auth/local/register", self.base_url);
        let builder = self.http.post(url).json(&RegisterBody {
            username,
            email,
            password,
        });
        self.send(builder, "auth/local/register").await
    }

    /// Current user for a user JWT (`GET /api/users/me`)
    pub async fn me(&self, jwt: &str) -> CmsResult<CmsUser> {
        let url = format!("{}/api/users/me", self.base_url);
        let builder = self.http.get(url).bearer_auth(jwt);
        self.send(builder, "users/me").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::types::Game;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> StrapiClient {
        StrapiClient::new(&server.uri(), token.map(String::from), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_find_sends_query_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/games"))
            .and(query_param("filters[slug][$eq]", "starburst"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "documentId": "g1", "title": "Starburst", "slug": "starburst" }],
                "meta": { "pagination": { "page": 1, "pageSize": 1, "pageCount": 1, "total": 1 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cms = client(&server, Some("secret-token"));
        let game: Option<Game> = cms
            .find_by_slug("games", "starburst", StrapiQuery::new())
            .await
            .unwrap();
        assert_eq!(game.unwrap().document_id, "g1");
    }

    #[tokio::test]
    async fn test_error_envelope_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/local"))
            .and(body_json(json!({ "identifier": "bob", "password": "nope" })))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "data": null,
                "error": { "status": 400, "name": "ValidationError", "message": "Invalid identifier or password" }
            })))
            .mount(&server)
            .await;

        let err = client(&server, None).login("bob", "nope").await.unwrap_err();
        match err {
            CmsError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid identifier or password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_single_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/homepage"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .single::<serde_json::Value>("homepage", &StrapiQuery::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_wraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/casinos/doc-9"))
            .and(body_json(json!({ "data": { "ratingAvg": 4.5, "ratingCount": 2 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "documentId": "doc-9", "ratingAvg": 4.5, "ratingCount": 2 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let updated: serde_json::Value = client(&server, Some("t"))
            .update("casinos", "doc-9", &json!({ "ratingAvg": 4.5, "ratingCount": 2 }))
            .await
            .unwrap();
        assert_eq!(updated["ratingCount"], 2);
    }

    #[tokio::test]
    async fn test_me_uses_user_jwt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/me"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "username": "alice", "email": "alice@example.com"
            })))
            .mount(&server)
            .await;

        let user = client(&server, Some("server-token")).me("user-jwt").await.unwrap();
        assert_eq!(user.username, "alice");
    }
}
