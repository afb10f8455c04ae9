use crate::core::distance::{bounding_box, is_nearby};
use crate::core::ports::RepositoryError;
use crate::models::{CandidateProfile, Location, Match, UserProfile};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use thiserror::Error;

/// Appwrite caps `notEqual` filters per request; the rest is filtered locally
const MAX_SERVER_EXCLUSIONS: usize = 100;

/// Page size multiplier when some exclusions can only be applied locally
const OVERFETCH_FACTOR: usize = 5;

/// Upper bound on pages scanned by one candidate query
const MAX_CANDIDATE_PAGES: usize = 10;

/// Results requested per search
const SEARCH_LIMIT: usize = 50;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for RepositoryError {
    fn from(err: AppwriteError) -> Self {
        match err {
            AppwriteError::RequestError(e) if e.is_connect() || e.is_timeout() => {
                RepositoryError::Network(e.to_string())
            }
            AppwriteError::Unauthorized => RepositoryError::Unauthorized,
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub user_profiles: String,
    pub user_matches: String,
}

/// Appwrite API client
///
/// Handles the read side of the discovery feed:
/// - Fetching the signed in user's profile
/// - Querying candidate profiles
/// - Listing mutual matches
/// - Full-text profile search
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Profile document as stored in Appwrite
#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "displayName")]
    display_name: String,
    #[serde(default)]
    age: Option<u8>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(rename = "contentTags", default)]
    content_tags: BTreeSet<String>,
    #[serde(rename = "collaborationTypes", default)]
    collaboration_types: BTreeSet<String>,
    #[serde(rename = "isVerified", default)]
    is_verified: bool,
    #[serde(rename = "followerCount", default)]
    follower_count: u64,
    #[serde(rename = "mediaUrls", default)]
    media_urls: Vec<String>,
    #[serde(rename = "preferredGenders", default)]
    preferred_genders: Vec<String>,
    #[serde(rename = "minAge", default)]
    min_age: Option<u8>,
    #[serde(rename = "maxAge", default)]
    max_age: Option<u8>,
    #[serde(rename = "maxDistanceKm", default)]
    max_distance_km: Option<u16>,
    #[serde(rename = "$createdAt", default)]
    created_at: Option<DateTime<Utc>>,
}

impl ProfileDocument {
    fn location(&self) -> Option<Location> {
        Some(Location {
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            latitude: self.latitude?,
            longitude: self.longitude?,
            is_nearby: false,
        })
    }

    fn into_user_profile(self) -> UserProfile {
        let location = self.location();
        let mut profile = UserProfile {
            user_id: self.user_id,
            display_name: self.display_name,
            gender: self.gender,
            location,
            preferences: Default::default(),
        };
        profile.preferences.preferred_genders = self.preferred_genders;
        if let Some(min_age) = self.min_age {
            profile.preferences.min_age = min_age;
        }
        if let Some(max_age) = self.max_age {
            profile.preferences.max_age = max_age;
        }
        if let Some(max_distance_km) = self.max_distance_km {
            profile.preferences.max_distance_km = max_distance_km;
        }
        profile
    }

    /// Convert to a candidate, tagging proximity relative to `viewer`
    fn into_candidate(self, viewer: Option<&UserProfile>) -> CandidateProfile {
        let mut location = self.location();
        if let (Some(candidate), Some(viewer)) = (location.as_mut(), viewer) {
            if let Some(origin) = &viewer.location {
                let radius = viewer.preferences.max_distance_km as f64;
                candidate.is_nearby = is_nearby(origin, candidate, radius);
            }
        }

        CandidateProfile {
            user_id: self.user_id,
            display_name: self.display_name,
            age: self.age,
            location,
            content_tags: self.content_tags,
            collaboration_types: self.collaboration_types,
            is_verified: self.is_verified,
            follower_count: self.follower_count,
            media_urls: self.media_urls,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Match document as stored in Appwrite
#[derive(Debug, Deserialize)]
struct MatchDocument {
    #[serde(rename = "user1Id")]
    user1_id: String,
    #[serde(rename = "user2Id")]
    user2_id: String,
    #[serde(rename = "matchedAt", default)]
    matched_at: Option<DateTime<Utc>>,
    #[serde(rename = "hasConversation", default)]
    has_conversation: bool,
    #[serde(rename = "$createdAt", default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<MatchDocument> for Match {
    fn from(doc: MatchDocument) -> Self {
        Match {
            user1_id: doc.user1_id,
            user2_id: doc.user2_id,
            matched_at: doc.matched_at.or(doc.created_at).unwrap_or_else(Utc::now),
            has_conversation: doc.has_conversation,
        }
    }
}

/// Quote a string for use inside an Appwrite query
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

fn quoted_list<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    values.into_iter().map(|v| quoted(v)).collect::<Vec<_>>().join(",")
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str, queries: &[String]) -> String {
        let url = format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        );

        if queries.is_empty() {
            return url;
        }

        let params = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(q)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", url, params)
    }

    /// List raw documents of a collection
    async fn list_documents(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<Vec<Value>, AppwriteError> {
        let url = self.documents_url(collection, queries);

        tracing::debug!("Listing documents from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppwriteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Appwrite request to {} failed: {} - {}", collection, status, body);
            return Err(AppwriteError::ApiError(format!(
                "Failed to list {}: {}",
                collection, status
            )));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        Ok(documents
            .iter()
            .map(|doc| doc.get("data").unwrap_or(doc).clone())
            .collect())
    }

    fn parse_profiles(documents: Vec<Value>) -> Vec<ProfileDocument> {
        documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value::<ProfileDocument>(doc) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!("Skipping malformed profile document: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Fetch a user's own profile, `None` if they never created one
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppwriteError> {
        tracing::debug!("Fetching profile for user: {}", user_id);

        let queries = vec![
            format!("equal(\"userId\", [{}])", quoted(user_id)),
            "limit(1)".to_string(),
        ];
        let documents = self
            .list_documents(&self.collections.user_profiles, &queries)
            .await?;

        let Some(doc) = documents.into_iter().next() else {
            return Ok(None);
        };

        serde_json::from_value::<ProfileDocument>(doc)
            .map(|doc| Some(doc.into_user_profile()))
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }

    /// Query candidates compatible with `for_user`
    pub async fn query_candidates(
        &self,
        for_user: &UserProfile,
        limit: usize,
        exclude_ids: &[String],
    ) -> Result<Vec<CandidateProfile>, AppwriteError> {
        let prefs = &for_user.preferences;

        let mut queries = vec![
            format!("notEqual(\"userId\", [{}])", quoted(&for_user.user_id)),
            format!("greaterThanEqual(\"age\", {})", prefs.min_age),
            format!("lessThanEqual(\"age\", {})", prefs.max_age),
        ];

        if !prefs.preferred_genders.is_empty() {
            queries.push(format!(
                "equal(\"gender\", [{}])",
                quoted_list(&prefs.preferred_genders)
            ));
        }

        if let Some(origin) = &for_user.location {
            let bbox = bounding_box(origin.latitude, origin.longitude, prefs.max_distance_km as f64);
            queries.push(format!("between(\"latitude\", {}, {})", bbox.min_lat, bbox.max_lat));
            queries.push(format!("between(\"longitude\", {}, {})", bbox.min_lon, bbox.max_lon));
        }

        for id in exclude_ids.iter().take(MAX_SERVER_EXCLUSIONS) {
            queries.push(format!("notEqual(\"userId\", [{}])", quoted(id)));
        }

        // Exclusions past the cap are dropped locally, so pages can come back
        // mostly filtered out; ask for more and keep paging until `limit` survive
        let page_size = if exclude_ids.len() > MAX_SERVER_EXCLUSIONS {
            limit * OVERFETCH_FACTOR
        } else {
            limit
        };
        let excluded: HashSet<&str> = exclude_ids.iter().map(String::as_str).collect();

        let mut candidates: Vec<CandidateProfile> = Vec::with_capacity(limit);
        let mut scanned = 0;

        for page in 0..MAX_CANDIDATE_PAGES {
            let mut page_queries = queries.clone();
            page_queries.push(format!("limit({})", page_size));
            if page > 0 {
                page_queries.push(format!("offset({})", page * page_size));
            }

            let documents = self
                .list_documents(&self.collections.user_profiles, &page_queries)
                .await?;
            let returned = documents.len();
            scanned += returned;

            candidates.extend(
                Self::parse_profiles(documents)
                    .into_iter()
                    .filter(|p| p.user_id != for_user.user_id && !excluded.contains(p.user_id.as_str()))
                    .map(|p| p.into_candidate(Some(for_user))),
            );

            if candidates.len() >= limit || returned < page_size {
                break;
            }
        }

        candidates.truncate(limit);

        tracing::debug!("Queried {} candidates ({} documents)", candidates.len(), scanned);

        Ok(candidates)
    }

    /// All matches the user takes part in, on either side of the pair
    pub async fn list_matches(&self, user_id: &str) -> Result<Vec<Match>, AppwriteError> {
        let mut matches = Vec::new();

        for field in ["user1Id", "user2Id"] {
            let queries = vec![format!("equal(\"{}\", [{}])", field, quoted(user_id))];
            let documents = self
                .list_documents(&self.collections.user_matches, &queries)
                .await?;

            matches.extend(documents.into_iter().filter_map(|doc| {
                serde_json::from_value::<MatchDocument>(doc).ok().map(Match::from)
            }));
        }

        Ok(matches)
    }

    /// Full-text search on display names, narrowed to profiles with any of `tags`
    pub async fn search_profiles(
        &self,
        query: &str,
        tags: &[String],
    ) -> Result<Vec<CandidateProfile>, AppwriteError> {
        let mut queries = vec![format!("search(\"displayName\", {})", quoted(query))];
        if !tags.is_empty() {
            queries.push(format!("contains(\"contentTags\", [{}])", quoted_list(tags)));
        }
        queries.push(format!("limit({})", SEARCH_LIMIT));

        let documents = self
            .list_documents(&self.collections.user_profiles, &queries)
            .await?;

        Ok(Self::parse_profiles(documents)
            .into_iter()
            .map(|p| p.into_candidate(None))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn collections() -> AppwriteCollections {
        AppwriteCollections {
            user_profiles: "profiles".to_string(),
            user_matches: "matches".to_string(),
        }
    }

    fn client(base_url: String) -> AppwriteClient {
        AppwriteClient::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            collections(),
        )
        .unwrap()
    }

    fn viewer() -> UserProfile {
        let mut viewer = UserProfile {
            user_id: "me".to_string(),
            display_name: "Me".to_string(),
            gender: None,
            location: Some(Location {
                city: Some("Berlin".to_string()),
                state: None,
                country: Some("DE".to_string()),
                latitude: 52.5200,
                longitude: 13.4050,
                is_nearby: false,
            }),
            preferences: Default::default(),
        };
        viewer.preferences.max_distance_km = 50;
        viewer
    }

    #[test]
    fn test_documents_url_encodes_queries() {
        let client = client("https://appwrite.test/v1/".to_string());
        let url = client.documents_url("profiles", &["limit(5)".to_string()]);
        assert_eq!(
            url,
            "https://appwrite.test/v1/databases/test_db/collections/profiles/documents?queries[]=limit%285%29"
        );
    }

    #[tokio::test]
    async fn test_query_candidates_marks_nearby() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/databases/test_db/collections/profiles/documents".to_string()))
            .match_query(Matcher::Any)
            .match_header("X-Appwrite-Project", "test_project")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "total": 3,
                    "documents": [
                        {"userId": "potsdam", "displayName": "P", "age": 27, "latitude": 52.3906, "longitude": 13.0645, "$createdAt": "2025-01-01T00:00:00Z"},
                        {"userId": "munich", "displayName": "M", "age": 30, "latitude": 48.1351, "longitude": 11.5820},
                        {"userId": "skipped", "displayName": "S"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client(server.url());
        let candidates = client
            .query_candidates(&viewer(), 10, &["skipped".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].is_nearby());
        assert!(!candidates[1].is_nearby());
    }

    #[tokio::test]
    async fn test_query_candidates_pages_past_local_exclusions() {
        let mut server = mockito::Server::new_async().await;
        let excluded: Vec<String> = (0..150).map(|i| format!("x{}", i)).collect();

        // Ids past the first 100 exclusions only get filtered here
        let first_page: Vec<_> = (100..110)
            .map(|i| json!({"userId": format!("x{}", i), "displayName": "X"}))
            .collect();
        let first = server
            .mock("GET", Matcher::Regex(r"^/databases/test_db/collections/profiles/documents".to_string()))
            .match_query(Matcher::Regex(r"limit(\(|%28)10(\)|%29)$".to_string()))
            .with_status(200)
            .with_body(json!({"total": 13, "documents": first_page}).to_string())
            .create_async()
            .await;
        let second = server
            .mock("GET", Matcher::Regex(r"^/databases/test_db/collections/profiles/documents".to_string()))
            .match_query(Matcher::Regex(r"offset(\(|%28)10(\)|%29)$".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "total": 13,
                    "documents": [
                        {"userId": "f1", "displayName": "F1"},
                        {"userId": "f2", "displayName": "F2"},
                        {"userId": "f3", "displayName": "F3"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client(server.url());
        let candidates = client.query_candidates(&viewer(), 2, &excluded).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let ids: Vec<&str> = candidates.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "f2"]);
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/databases/test_db/collections/profiles/documents".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"total": 0, "documents": []}).to_string())
            .create_async()
            .await;

        let client = client(server.url());
        assert!(client.get_profile("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_repository_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/databases/test_db/collections/matches/documents".to_string()))
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = client(server.url());
        let err = client.list_matches("me").await.unwrap_err();
        assert!(matches!(err, AppwriteError::Unauthorized));
        assert_eq!(RepositoryError::from(err), RepositoryError::Unauthorized);
    }
}
