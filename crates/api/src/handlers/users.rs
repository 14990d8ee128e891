//! Handlers for admin user management.
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use labelkit_core::error::CoreError;
use labelkit_core::roles::{ROLE_ADMIN, ROLE_ANNOTATOR};
use labelkit_core::types::DbId;
use labelkit_db::models::assignment::AssignCategories;
use labelkit_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use labelkit_db::repositories::{AnnotationRepo, AssignmentRepo, CategoryRepo, UserRepo};
use serde::Deserialize;
use serde_json::json;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

/// Minimum password length enforced on user creation and password change.
const MIN_PASSWORD_LENGTH: usize = 12;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub role: String,
}

/// Request body for `PUT /admin/users/{user_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// User CRUD
// ---------------------------------------------------------------------------

/// POST /api/admin/users
///
/// Create a new user. Validates password strength, hashes it, and returns
/// a safe [`UserResponse`] with 201 Created.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    check_role(&input.role)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create_dto = CreateUser {
        username: input.username,
        display_name: input.display_name,
        password_hash: hashed,
        role: input.role,
    };

    let user = UserRepo::create(&state.pool, &create_dto).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/admin/users
///
/// List all users, including inactive ones.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;
    let responses: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(responses))
}

/// PUT /api/admin/users/{user_id}
///
/// Update a user's profile, role, password, or active flag. Only the
/// provided fields change.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(user_id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    if let Some(role) = &input.role {
        check_role(role)?;
    }
    let password_hash = match &input.password {
        Some(password) => {
            validate_password_strength(password, MIN_PASSWORD_LENGTH)
                .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
            let hashed = hash_password(password)
                .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
            Some(hashed)
        }
        None => None,
    };

    let update_dto = UpdateUser {
        display_name: input.display_name,
        password_hash,
        role: input.role,
        is_active: input.is_active,
    };

    let user = UserRepo::update(&state.pool, user_id, &update_dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;

    tracing::info!(user_id, "User updated");

    Ok(Json(UserResponse::from(user)))
}

// ---------------------------------------------------------------------------
// Category assignment
// ---------------------------------------------------------------------------

/// PUT /api/admin/users/{user_id}/categories
///
/// Replace an annotator's category set. Categories can only be assigned
/// to active annotators, and every id must name an existing category.
pub async fn assign_categories(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(user_id): Path<DbId>,
    Json(input): Json<AssignCategories>,
) -> AppResult<Json<serde_json::Value>> {
    let user = require_active_annotator(&state, user_id).await?;

    let known = CategoryRepo::list_all(&state.pool).await?;
    for id in &input.category_ids {
        if !known.iter().any(|c| c.id == *id) {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Category",
                id: *id,
            }));
        }
    }

    AssignmentRepo::replace_categories(&state.pool, user_id, &input.category_ids).await?;
    let assigned = CategoryRepo::assigned_categories(&state.pool, user_id).await?;

    tracing::info!(
        user_id,
        username = %user.username,
        categories = assigned.len(),
        "Category assignments replaced"
    );

    Ok(Json(json!({ "data": assigned })))
}

// ---------------------------------------------------------------------------
// Progress dashboard
// ---------------------------------------------------------------------------

/// GET /api/admin/progress
///
/// Per-annotator progress: overall record counts plus queue completion
/// for each assigned category, under the configured allocation mode.
pub async fn progress(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<serde_json::Value>> {
    let users = UserRepo::list(&state.pool).await?;
    let annotators: Vec<&User> = users
        .iter()
        .filter(|u| u.role == ROLE_ANNOTATOR && u.is_active)
        .collect();

    let mut payload = Vec::with_capacity(annotators.len());
    for user in annotators {
        let counts = AnnotationRepo::status_counts(&state.pool, user.id).await?;
        let totals = |status: &str| -> i64 {
            counts.iter().filter(|c| c.status == status).map(|c| c.count).sum()
        };

        let assigned = CategoryRepo::assigned_categories(&state.pool, user.id).await?;
        let mut categories = Vec::with_capacity(assigned.len());
        for category in &assigned {
            let queue = AnnotationRepo::category_queue(
                &state.pool,
                user.id,
                category.id,
                state.config.allocation_mode,
            )
            .await?;
            let completed = queue.iter().filter(|e| e.satisfied).count();
            categories.push(json!({
                "id": category.id,
                "name": category.name,
                "completed": completed,
                "total": queue.len(),
            }));
        }

        payload.push(json!({
            "user_id": user.id,
            "username": user.username,
            "display_name": user.display_name,
            "totals": {
                "completed": totals("completed"),
                "in_progress": totals("in_progress"),
                "skipped": totals("skipped"),
            },
            "categories": categories,
        }));
    }

    Ok(Json(json!({ "data": payload })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject role strings outside the fixed role set.
fn check_role(role: &str) -> AppResult<()> {
    if role != ROLE_ADMIN && role != ROLE_ANNOTATOR {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: admin, annotator"
        ))));
    }
    Ok(())
}

/// Look up a user who must be an active annotator to receive work.
pub(super) async fn require_active_annotator(state: &AppState, user_id: DbId) -> AppResult<User> {
    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;
    if user.role != ROLE_ANNOTATOR {
        return Err(AppError::Core(CoreError::Validation(
            "Work can only be assigned to annotators".into(),
        )));
    }
    if !user.is_active {
        return Err(AppError::Core(CoreError::Validation(
            "Work cannot be assigned to a deactivated user".into(),
        )));
    }
    Ok(user)
}
