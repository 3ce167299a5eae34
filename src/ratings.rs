//! User ratings for games and casinos.
//!
//! The CMS stores only the aggregate (`ratingAvg`, `ratingCount`), so a new
//! rating is a read-modify-write. Updates for the same entry are serialised
//! through a per-entry async lock; this covers one server process only, and
//! concurrent writers in other processes can still overwrite each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::{keys, CacheManager};
use crate::cms::types::RatingFields;
use crate::cms::{FilterOp, StrapiClient, StrapiQuery};
use crate::content::{CASINOS, GAMES};
use crate::error::{Result, ServerError};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Rateable collections
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatedCollection {
    Games,
    Casinos,
}

impl RatedCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatedCollection::Games => GAMES,
            RatedCollection::Casinos => CASINOS,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub collection: RatedCollection,
    pub document_id: String,
    /// Kept as a raw JSON number so fractions and out-of-range values
    /// reach validation instead of failing deserialization
    pub rating: serde_json::Number,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub rating_avg: f64,
    pub rating_count: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RatingUpdate {
    rating_avg: f64,
    rating_count: u32,
}

/// Slug needed to drop the entry's cache tag after an update
#[derive(Deserialize)]
struct SlugOnly {
    #[serde(default)]
    slug: String,
}

/// New aggregate after adding one rating, rounded to two decimals
pub fn recompute(avg: f64, count: u32, rating: u8) -> RatingOutcome {
    let avg = if avg.is_finite() { avg.clamp(0.0, MAX_RATING as f64) } else { 0.0 };
    let new_count = count.saturating_add(1);
    let total = avg * count as f64 + rating as f64;
    let new_avg = total / new_count as f64;

    RatingOutcome {
        rating_avg: (new_avg * 100.0).round() / 100.0,
        rating_count: new_count,
    }
}

/// Records ratings, holding one lock per entry being updated
#[derive(Default)]
pub struct RatingService {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RatingService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop locks nobody is holding or waiting on
    fn release(&self, key: &str) {
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    /// Entries currently locked or awaited
    pub fn pending(&self) -> usize {
        self.locks.lock().len()
    }

    /// Record one rating and return the new aggregate
    pub async fn submit(
        &self,
        cms: &StrapiClient,
        cache: &CacheManager,
        request: &RatingRequest,
    ) -> Result<RatingOutcome> {
        let rating = request.validate()?;

        let collection = request.collection.as_str();
        let document_id = request.document_id.trim();
        let lock_key = format!("{}:{}", collection, document_id);

        let lock = self.lock_for(&lock_key);
        let outcome = {
            let _guard = lock.lock().await;
            apply(cms, cache, collection, document_id, rating).await
        };
        drop(lock);
        self.release(&lock_key);

        outcome
    }
}

impl RatingRequest {
    /// Check the request and return the rating as a whole star count
    pub fn validate(&self) -> Result<u8> {
        let rating = self
            .rating
            .as_u64()
            .and_then(|r| u8::try_from(r).ok())
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or_else(|| {
                ServerError::InvalidRequest(format!(
                    "rating must be an integer between {} and {}",
                    MIN_RATING, MAX_RATING
                ))
            })?;
        if self.document_id.trim().is_empty() {
            return Err(ServerError::InvalidRequest("documentId is required".to_string()));
        }
        Ok(rating)
    }
}

async fn apply(
    cms: &StrapiClient,
    cache: &CacheManager,
    collection: &'static str,
    document_id: &str,
    rating: u8,
) -> Result<RatingOutcome> {
    // Always read the current aggregate straight from the CMS, never from cache.
    let query = StrapiQuery::new()
        .filter(&["documentId"], FilterOp::Eq, document_id)
        .fields(&["ratingAvg", "ratingCount", "slug"]);
    let current: RatingFields = cms
        .find_one(collection, &query)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("{} {}", collection, document_id)))?;

    let outcome = recompute(current.rating_avg, current.rating_count, rating);
    let updated: SlugOnly = cms
        .update(
            collection,
            document_id,
            &RatingUpdate {
                rating_avg: outcome.rating_avg,
                rating_count: outcome.rating_count,
            },
        )
        .await?;

    tracing::info!(
        collection = %collection,
        document_id = %document_id,
        rating,
        rating_avg = outcome.rating_avg,
        rating_count = outcome.rating_count,
        "rating recorded"
    );

    let mut tags = vec![keys::tags::collection(collection)];
    if !updated.slug.is_empty() {
        tags.push(keys::tags::entry(collection, &updated.slug));
    }
    for tag in tags {
        if let Err(e) = cache.invalidate_tag(&tag).await {
            tracing::warn!(tag = %tag, error = %e, "failed to invalidate after rating");
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    #[test]
    fn test_recompute() {
        assert_eq!(recompute(0.0, 0, 4), RatingOutcome { rating_avg: 4.0, rating_count: 1 });
        assert_eq!(recompute(4.0, 1, 5), RatingOutcome { rating_avg: 4.5, rating_count: 2 });
        assert_eq!(recompute(4.5, 2, 1), RatingOutcome { rating_avg: 3.33, rating_count: 3 });
        assert_eq!(recompute(f64::NAN, 3, 5).rating_avg, 1.25);
    }

    #[test]
    fn test_validate() {
        let request = |rating: u8, document_id: &str| RatingRequest {
            collection: RatedCollection::Games,
            document_id: document_id.to_string(),
            rating: rating.into(),
        };
        assert!(request(0, "g1").validate().is_err());
        assert!(request(6, "g1").validate().is_err());
        assert!(request(3, "  ").validate().is_err());
        assert_eq!(request(5, "g1").validate().unwrap(), 5);
    }

    #[test]
    fn test_validate_rejects_non_star_numbers() {
        for rating in [json!(4.5), json!(300), json!(-1)] {
            let request: RatingRequest = serde_json::from_value(json!({
                "collection": "games", "documentId": "g1", "rating": rating
            }))
            .unwrap();
            assert!(matches!(request.validate(), Err(ServerError::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_collection_names() {
        let request: RatingRequest = serde_json::from_value(json!({
            "collection": "casinos", "documentId": "c1", "rating": 5
        }))
        .unwrap();
        assert_eq!(request.collection.as_str(), "casinos");
    }

    #[tokio::test]
    async fn test_submit_reads_then_writes_aggregate() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/games"))
            .and(query_param("filters[documentId][$eq]", "g1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "documentId": "g1", "ratingAvg": 4.0, "ratingCount": 3, "slug": "starburst" }]
            })))
            .mount(&env.cms)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/games/g1"))
            .and(body_json(json!({ "data": { "ratingAvg": 4.25, "ratingCount": 4 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "documentId": "g1", "slug": "starburst", "ratingAvg": 4.25, "ratingCount": 4 }
            })))
            .expect(1)
            .mount(&env.cms)
            .await;

        let state = &env.state;
        let outcome = state
            .ratings
            .submit(
                &state.cms,
                &state.cache,
                &RatingRequest {
                    collection: RatedCollection::Games,
                    document_id: "g1".into(),
                    rating: 5.into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome, RatingOutcome { rating_avg: 4.25, rating_count: 4 });
        assert_eq!(state.ratings.pending(), 0);
    }

    #[tokio::test]
    async fn test_submit_unknown_entry() {
        let env = TestEnv::start().await;
        Mock::given(method("GET"))
            .and(path("/api/casinos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&env.cms)
            .await;

        let state = &env.state;
        let err = state
            .ratings
            .submit(
                &state.cms,
                &state.cache,
                &RatingRequest {
                    collection: RatedCollection::Casinos,
                    document_id: "missing".into(),
                    rating: 3.into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }
}
