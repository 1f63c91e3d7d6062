use axum::{
    Json,
    extract::{Query, State},
};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{DonorSummary, SearchFilters};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub count: usize,
    pub donors: Vec<DonorSummary>,
}

/// ドナー検索ハンドラー
///
/// GET /api/donors?blood_group=O%2B&wilaya=Alger&emergency_only=true
pub async fn search_donors(
    State(state): State<AppState>,
    Query(filters): Query<SearchFilters>,
) -> Result<Json<SearchResponse>, AppError> {
    let donors = state.user_repo.search_donors(&filters).await?;

    tracing::debug!(count = donors.len(), "ドナー検索");

    Ok(Json(SearchResponse {
        count: donors.len(),
        donors,
    }))
}
