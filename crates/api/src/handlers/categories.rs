//! Handler for the admin category catalogue.
//!
//! Categories and their options are seeded by migration; the API only
//! reads them. Assignment of categories to annotators lives in the
//! user-management surface.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use labelkit_db::repositories::CategoryRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/admin/categories
///
/// Every category with its option set, in display order.
pub async fn list_categories(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let categories = CategoryRepo::list_with_options(&state.pool).await?;
    Ok(Json(DataResponse { data: categories }))
}
