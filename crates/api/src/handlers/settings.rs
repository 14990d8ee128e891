//! Handlers for system settings.
//!
//! The settings store is a key/value table; today it carries the two
//! time-tracking caps. Annotator clients read them to drive their local
//! timers, admins change them.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use labelkit_core::timing::{self, SETTING_MAX_ANNOTATION_TIME, SETTING_MAX_REWORK_TIME};
use labelkit_db::models::setting::{TimeLimitsResponse, UpdateTimeLimits};
use labelkit_db::repositories::SettingsRepo;

use crate::error::AppResult;
use crate::middleware::rbac::{RequireAdmin, RequireAnnotator};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/admin/settings
pub async fn get_settings(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let limits = SettingsRepo::time_limits(&state.pool).await?;
    Ok(Json(DataResponse {
        data: TimeLimitsResponse::from(limits),
    }))
}

/// PUT /api/admin/settings
///
/// Update the time caps. Values below the minimum are rejected before
/// anything is written.
pub async fn update_settings(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<UpdateTimeLimits>,
) -> AppResult<impl IntoResponse> {
    if let Some(secs) = input.max_annotation_time_seconds {
        timing::validate_time_limit(secs)?;
    }
    if let Some(secs) = input.max_rework_time_seconds {
        timing::validate_time_limit(secs)?;
    }

    if let Some(secs) = input.max_annotation_time_seconds {
        SettingsRepo::set(&state.pool, SETTING_MAX_ANNOTATION_TIME, &secs.to_string()).await?;
    }
    if let Some(secs) = input.max_rework_time_seconds {
        SettingsRepo::set(&state.pool, SETTING_MAX_REWORK_TIME, &secs.to_string()).await?;
    }

    let limits = SettingsRepo::time_limits(&state.pool).await?;

    tracing::info!(
        admin_id = admin.user_id,
        max_annotation_secs = limits.max_annotation_secs,
        max_rework_secs = limits.max_rework_secs,
        "System settings updated"
    );

    Ok(Json(DataResponse {
        data: TimeLimitsResponse::from(limits),
    }))
}

/// GET /api/annotator/settings/time-limits
///
/// The effective time caps, for annotator clients to drive their local
/// timers.
pub async fn time_limits(
    RequireAnnotator(_user): RequireAnnotator,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let limits = SettingsRepo::time_limits(&state.pool).await?;
    Ok(Json(DataResponse {
        data: TimeLimitsResponse::from(limits),
    }))
}
