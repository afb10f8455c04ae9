// Route exports
pub mod feed;

pub use feed::{AppState, FeedSessions};

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(feed::configure),
    );
}
