//! `GET /api/sites`: the domains the server allows.

use axum::Json;
use axum::extract::State;
use namescan_core::SiteDomain;

use crate::handler::AppState;

pub async fn list_sites(State(state): State<AppState>) -> Json<Vec<SiteDomain>> {
    Json(state.allow_list().iter().cloned().collect())
}
