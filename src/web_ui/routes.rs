//! Web UI route handlers.

mod auth_handlers;
mod sitemaps;
mod utils;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::content::games::GameFilters;
use crate::content::{authors, blogs, casinos, games, home};
use utils::{base_context, insert_seo, render_failure, render_not_found, render_template};

const RELATED_GAMES: u32 = 4;

/// Create the web UI router
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/casinos", get(casinos_list))
        .route("/casinos/:slug", get(casino_detail))
        .route("/games", get(games_list))
        .route("/games/:slug", get(game_detail))
        .route("/blog", get(blogs_list))
        .route("/blog/:slug", get(blog_detail))
        .route("/authors/:slug", get(author_detail))
        .route(
            "/authentication/login",
            get(auth_handlers::login_page).post(auth_handlers::login_submit),
        )
        .route(
            "/authentication/register",
            get(auth_handlers::register_page).post(auth_handlers::register_submit),
        )
        .route("/authentication/logout", get(auth_handlers::logout))
        .route("/dashboard", get(auth_handlers::dashboard))
        .route("/sitemap.xml", get(sitemaps::sitemap_index))
        .route("/sitemaps/:file", get(sitemaps::sitemap_file))
        .route("/robots.txt", get(sitemaps::robots))
        .fallback(not_found)
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Home page
async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let home = home::load(&state).await;

    let mut context = base_context(&state, &headers);
    insert_seo(&mut context, &state, home.page.seo.as_ref(), &home.page.title, "/");
    context.insert("home", &home);
    render_template("index.html", &context)
}

async fn casinos_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    match casinos::list(&state, query.page()).await {
        Ok(listing) => {
            let mut context = base_context(&state, &headers);
            insert_seo(&mut context, &state, None, "Casino reviews", "/casinos");
            context.insert("listing", &listing);
            render_template("casinos.html", &context)
        }
        Err(e) => render_failure(&state, &headers, e.into()),
    }
}

async fn casino_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    match casinos::by_slug(&state, &slug).await {
        Ok(Some(casino)) => {
            let mut context = base_context(&state, &headers);
            let path = format!("/casinos/{}", casino.slug);
            insert_seo(&mut context, &state, casino.seo.as_ref(), &casino.title, &path);
            context.insert("casino", &casino);
            render_template("casino.html", &context)
        }
        Ok(None) => render_not_found(&state, &headers, &format!("Casino '{}' not found", slug)),
        Err(e) => render_failure(&state, &headers, e.into()),
    }
}

/// Filters carried over to pagination links, page excluded
fn filter_query(filters: &GameFilters) -> String {
    let mut query = String::new();
    let params = [
        ("pageSize", filters.page_size.map(|size| size.to_string())),
        ("providers", filters.providers.clone()),
        ("categories", filters.categories.clone()),
        ("search", filters.search_term().map(str::to_string)),
        (
            "sort",
            filters
                .sort
                .and_then(|sort| serde_json::to_value(sort).ok())
                .and_then(|value| value.as_str().map(str::to_string)),
        ),
    ];
    for (key, value) in params {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            query.push_str(&format!("&{}={}", key, urlencoding::encode(&value)));
        }
    }
    query
}

async fn games_list(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<GameFilters>,
    headers: HeaderMap,
) -> Response {
    let listing = games::list(&state, &filters).await;

    let mut context = base_context(&state, &headers);
    insert_seo(&mut context, &state, None, "Games", "/games");
    context.insert("listing", &listing);
    context.insert("filter_query", &filter_query(&filters));
    if let Some(search) = filters.search_term() {
        context.insert("search", search);
    }
    render_template("games.html", &context)
}

async fn game_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    let game = match games::by_slug(&state, &slug).await {
        Ok(Some(game)) => game,
        Ok(None) => return render_not_found(&state, &headers, &format!("Game '{}' not found", slug)),
        Err(e) => return render_failure(&state, &headers, e.into()),
    };
    let related = games::related(&state, &game, RELATED_GAMES).await;

    let mut context = base_context(&state, &headers);
    let path = format!("/games/{}", game.slug);
    insert_seo(&mut context, &state, game.seo.as_ref(), &game.title, &path);
    context.insert("game", &game);
    context.insert("related", &related);
    render_template("game.html", &context)
}

async fn blogs_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    match blogs::list(&state, query.page()).await {
        Ok(listing) => {
            let mut context = base_context(&state, &headers);
            insert_seo(&mut context, &state, None, "Blog", "/blog");
            context.insert("listing", &listing);
            render_template("blogs.html", &context)
        }
        Err(e) => render_failure(&state, &headers, e.into()),
    }
}

async fn blog_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    match blogs::by_slug(&state, &slug).await {
        Ok(Some(blog)) => {
            let mut context = base_context(&state, &headers);
            let path = format!("/blog/{}", blog.slug);
            insert_seo(&mut context, &state, blog.seo.as_ref(), &blog.title, &path);
            if blog.seo.as_ref().and_then(|s| s.meta_description.as_ref()).is_none() {
                if let Some(excerpt) = &blog.excerpt {
                    context.insert("seo_description", excerpt);
                }
            }
            context.insert("blog", &blog);
            render_template("blog.html", &context)
        }
        Ok(None) => render_not_found(&state, &headers, &format!("Post '{}' not found", slug)),
        Err(e) => render_failure(&state, &headers, e.into()),
    }
}

async fn author_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    match authors::by_slug(&state, &slug).await {
        Ok(Some(profile)) => {
            let mut context = base_context(&state, &headers);
            let path = format!("/authors/{}", profile.author.slug);
            insert_seo(&mut context, &state, None, &profile.author.name, &path);
            context.insert("profile", &profile);
            render_template("author.html", &context)
        }
        Ok(None) => render_not_found(&state, &headers, &format!("Author '{}' not found", slug)),
        Err(e) => render_failure(&state, &headers, e.into()),
    }
}

/// Fallback for unmatched paths
async fn not_found(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    render_not_found(&state, &headers, "The page you are looking for does not exist.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_text, TestEnv};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_filter_query_keeps_filters() {
        let filters = GameFilters {
            page: Some(3),
            providers: Some("netent,pragmatic".into()),
            search: Some(" big bass ".into()),
            sort: Some(games::GameSort::Rating),
            ..Default::default()
        };
        assert_eq!(
            filter_query(&filters),
            "&providers=netent%2Cpragmatic&search=big%20bass&sort=rating"
        );
    }

    #[tokio::test]
    async fn test_home_page_renders_sections() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/homepage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "title": "Best Casinos", "heading": "Trusted casino reviews" }
            })))
            .mount(&env.cms)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/casinos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "title": "Royal Spins", "slug": "royal-spins", "ratingAvg": 4.7, "ratingCount": 12 }]
            })))
            .mount(&env.cms)
            .await;
        for collection in ["/api/games", "/api/blogs"] {
            Mock::given(method("GET"))
                .and(path(collection))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
                .mount(&env.cms)
                .await;
        }

        let response = env.router().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Trusted casino reviews"));
        assert!(html.contains("Royal Spins"));
        assert!(html.contains("No games yet."));
    }

    #[tokio::test]
    async fn test_casino_page() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/casinos"))
            .and(query_param("filters[slug][$eq]", "royal-spins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "title": "Royal Spins",
                    "slug": "royal-spins",
                    "ratingAvg": 4.5,
                    "ratingCount": 2,
                    "content": "<p>Solid welcome offer.</p>",
                    "seo": { "metaTitle": "Royal Spins review", "metaDescription": "Our verdict" }
                }]
            })))
            .mount(&env.cms)
            .await;

        let response = env.router().oneshot(get("/casinos/royal-spins")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<title>Royal Spins review | Casino Reviews</title>"));
        assert!(html.contains("<p>Solid welcome offer.</p>"));
        assert!(html.contains("Our verdict"));
    }

    #[tokio::test]
    async fn test_unknown_slug_renders_404() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/games"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&env.cms)
            .await;

        let response = env.router().oneshot(get("/games/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Game &#x27;missing&#x27; not found"));
    }

    #[tokio::test]
    async fn test_cms_outage_renders_error_page() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&env.cms)
            .await;

        let response = env.router().oneshot(get("/blog/some-post")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response).await.contains("Something went wrong"));
    }

    #[tokio::test]
    async fn test_games_page_survives_cms_failure() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/games"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&env.cms)
            .await;

        let response = env.router().oneshot(get("/games?search=book")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No games match these filters."));
    }

    #[tokio::test]
    async fn test_fallback_is_404_page() {
        let env = TestEnv::start().await;
        let response = env.router().oneshot(get("/definitely/not/here")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }
}
