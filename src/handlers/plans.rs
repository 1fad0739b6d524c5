use axum::{extract::State, Json};

use crate::{app::AppState, models::Plan, utils::ApiError};

/// List every plan, cheapest first
/// GET /api/plans
#[utoipa::path(
    get,
    path = "/api/plans",
    tag = "Plans",
    operation_id = "listPlans",
    responses(
        (status = 200, description = "All plans ordered by price", body = [Plan]),
        (status = 500, description = "Store unavailable", body = crate::handlers::docs::ErrorBody)
    )
)]
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>, ApiError> {
    let plans = state.issuance.list_plans().await?;
    Ok(Json(plans))
}
