pub mod events;
pub mod rsvps;
pub mod teams;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(rsvps::routes())
        .merge(teams::routes())
}
