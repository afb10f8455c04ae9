use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use validator::Validate;

use crate::core::{DiscoveryFeed, FeedError, FeedSettings, ProfileRepository, RepositoryError, UndoOutcome};
use crate::models::{
    ErrorResponse, FeedRequest, HealthResponse, LoadFeedRequest, PresenceRequest, SearchRequest,
    SwipeRequest, SwipeResponse, UndoResponse, UpdateFiltersRequest,
};
use crate::services::{InMemoryPresence, PostgresClient};

pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// One feed per user, created on first load
///
/// Holds at most `capacity` feeds. The least recently used one is dropped to
/// make room; that user starts from a fresh feed on their next load.
pub struct FeedSessions {
    feeds: Mutex<LruCache<String, DiscoveryFeed>>,
}

impl Default for FeedSessions {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl FeedSessions {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            feeds: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, DiscoveryFeed>> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, user_id: &str) -> Option<DiscoveryFeed> {
        self.lock().get(user_id).cloned()
    }

    pub fn get_or_insert_with<F>(&self, user_id: &str, create: F) -> DiscoveryFeed
    where
        F: FnOnce() -> DiscoveryFeed,
    {
        let mut feeds = self.lock();
        if let Some(feed) = feeds.get(user_id) {
            return feed.clone();
        }

        let feed = create();
        if let Some((evicted, _)) = feeds.push(user_id.to_string(), feed.clone()) {
            tracing::info!("Session limit reached, dropped feed of {}", evicted);
        }
        feed
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.lock().contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ProfileRepository>,
    pub presence: Arc<InMemoryPresence>,
    pub postgres: Option<Arc<PostgresClient>>,
    pub feed_settings: FeedSettings,
    pub sessions: Arc<FeedSessions>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn ProfileRepository>,
        presence: Arc<InMemoryPresence>,
        feed_settings: FeedSettings,
    ) -> Self {
        Self {
            repository,
            presence,
            postgres: None,
            feed_settings,
            sessions: Arc::new(FeedSessions::default()),
        }
    }

    /// Bound the number of feeds held in memory
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.sessions = Arc::new(FeedSessions::new(max_sessions));
        self
    }

    /// Report PostgreSQL health on `/health`
    pub fn with_postgres(mut self, postgres: Arc<PostgresClient>) -> Self {
        self.postgres = Some(postgres);
        self
    }

    fn feed_for(&self, user_id: &str) -> DiscoveryFeed {
        self.sessions.get_or_insert_with(user_id, || {
            tracing::debug!("Creating feed session for {}", user_id);
            DiscoveryFeed::new(
                self.repository.clone(),
                self.presence.clone(),
                self.feed_settings.clone(),
            )
        })
    }
}

/// Configure all feed routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/feed/load", web::post().to(load_feed))
        .route("/feed/more", web::post().to(load_more))
        .route("/feed/refresh", web::post().to(refresh_feed))
        .route("/feed/swipe", web::post().to(swipe))
        .route("/feed/undo", web::post().to(undo))
        .route("/feed/filters", web::put().to(update_filters))
        .route("/feed/search", web::post().to(search))
        .route("/feed/{user_id}", web::get().to(get_feed))
        .route("/presence/{user_id}", web::put().to(set_presence));
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn feed_not_loaded(user_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: "feed_not_loaded".to_string(),
        message: format!("No feed loaded for user {}", user_id),
        status_code: 404,
    })
}

/// Map an engine error to its HTTP response
fn feed_error(err: &FeedError) -> HttpResponse {
    let (status, error) = match err {
        FeedError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "not_authenticated"),
        FeedError::ProfileNotFound => (StatusCode::NOT_FOUND, "profile_not_found"),
        FeedError::NetworkUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "network_unavailable"),
        FeedError::CandidateUnavailable(_) => (StatusCode::CONFLICT, "candidate_unavailable"),
        FeedError::Repository(RepositoryError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
        FeedError::Repository(_) => (StatusCode::BAD_GATEWAY, "repository_error"),
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = match &state.postgres {
        Some(postgres) => postgres.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_feeds: state.sessions.len(),
        timestamp: chrono::Utc::now(),
    })
}

/// Load (or reload) a user's feed
///
/// POST /api/v1/feed/load
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "excludePreviouslyDecided": true
/// }
/// ```
async fn load_feed(state: web::Data<AppState>, req: web::Json<LoadFeedRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let feed = state.feed_for(&req.user_id);
    match feed.load(Some(req.user_id.as_str()), req.exclude_previously_decided).await {
        Ok(outcome) => {
            tracing::debug!("Load for {} finished: {:?}", req.user_id, outcome);
            HttpResponse::Ok().json(feed.snapshot())
        }
        Err(e) => feed_error(&e),
    }
}

/// Append another page to a loaded feed
///
/// POST /api/v1/feed/more
async fn load_more(state: web::Data<AppState>, req: web::Json<FeedRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let Some(feed) = state.sessions.get(&req.user_id) else {
        return feed_not_loaded(&req.user_id);
    };

    match feed.load_more().await {
        Ok(_) => HttpResponse::Ok().json(feed.snapshot()),
        Err(e) => feed_error(&e),
    }
}

/// Forget exclusions and history, then reload
///
/// POST /api/v1/feed/refresh
async fn refresh_feed(state: web::Data<AppState>, req: web::Json<FeedRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let Some(feed) = state.sessions.get(&req.user_id) else {
        return feed_not_loaded(&req.user_id);
    };

    match feed.refresh().await {
        Ok(_) => HttpResponse::Ok().json(feed.snapshot()),
        Err(e) => feed_error(&e),
    }
}

/// Current snapshot of a feed
///
/// GET /api/v1/feed/{user_id}
async fn get_feed(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();
    match state.sessions.get(&user_id) {
        Some(feed) => HttpResponse::Ok().json(feed.snapshot()),
        None => feed_not_loaded(&user_id),
    }
}

/// Swipe on a candidate currently in the queue
///
/// POST /api/v1/feed/swipe
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "targetUserId": "string",
///   "action": "pass|like|superLike"
/// }
/// ```
async fn swipe(state: web::Data<AppState>, req: web::Json<SwipeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let Some(feed) = state.sessions.get(&req.user_id) else {
        return feed_not_loaded(&req.user_id);
    };

    let Some(profile) = feed.find_candidate(&req.target_user_id) else {
        return HttpResponse::NotFound().json(ErrorResponse {
            error: "candidate_not_in_queue".to_string(),
            message: format!("{} is not in the feed of {}", req.target_user_id, req.user_id),
            status_code: 404,
        });
    };

    match feed.handle_swipe(&profile, req.action).await {
        Ok(outcome) => HttpResponse::Ok().json(SwipeResponse {
            is_match: outcome.matched.is_some(),
            entry_id: outcome.entry_id.to_string(),
            feed: feed.snapshot(),
        }),
        Err(e) => feed_error(&e),
    }
}

/// Undo the most recent swipe
///
/// POST /api/v1/feed/undo
async fn undo(state: web::Data<AppState>, req: web::Json<FeedRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let Some(feed) = state.sessions.get(&req.user_id) else {
        return feed_not_loaded(&req.user_id);
    };

    match feed.undo_last().await {
        Ok(outcome) => HttpResponse::Ok().json(UndoResponse {
            restored: outcome == UndoOutcome::Restored,
            feed: feed.snapshot(),
        }),
        Err(e) => feed_error(&e),
    }
}

/// Change filters and sort order; omitted fields are kept
///
/// PUT /api/v1/feed/filters
async fn update_filters(
    state: web::Data<AppState>,
    req: web::Json<UpdateFiltersRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let Some(feed) = state.sessions.get(&req.user_id) else {
        return feed_not_loaded(&req.user_id);
    };

    let req = req.into_inner();
    feed.update_filters(|criteria| {
        match (req.min_age, req.max_age) {
            (Some(min), Some(max)) => criteria.set_age_range(min, max),
            (Some(min), None) => criteria.set_min_age(min),
            (None, Some(max)) => criteria.set_max_age(max),
            (None, None) => {}
        }
        if let Some(verified_only) = req.verified_only {
            criteria.verified_only = verified_only;
        }
        if let Some(online_only) = req.online_only {
            criteria.online_only = online_only;
        }
        if let Some(max_distance_km) = req.max_distance_km {
            criteria.max_distance_km = max_distance_km;
        }
        if let Some(content_tags) = req.content_tags {
            criteria.content_tags = content_tags;
        }
        if let Some(collaboration_types) = req.collaboration_types {
            criteria.collaboration_types = collaboration_types;
        }
    });

    if let Some(order) = req.sort_order {
        feed.set_sort_order(order);
    }

    HttpResponse::Ok().json(feed.snapshot())
}

/// Search keystroke; results land in the feed after the debounce delay
///
/// POST /api/v1/feed/search
async fn search(state: web::Data<AppState>, req: web::Json<SearchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let Some(feed) = state.sessions.get(&req.user_id) else {
        return feed_not_loaded(&req.user_id);
    };

    feed.search(&req.query);

    HttpResponse::Accepted().json(feed.snapshot())
}

/// Report a user online or offline
///
/// PUT /api/v1/presence/{user_id}
async fn set_presence(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<PresenceRequest>,
) -> impl Responder {
    let user_id = path.into_inner();
    state.presence.set_online(&user_id, req.online);
    HttpResponse::NoContent().finish()
}
