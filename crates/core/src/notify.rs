//! Well-known notification type names.
//!
//! The engine only ever *writes* notification rows; delivery is external.

/// An admin sent an image's annotations back for rework.
pub const NOTIFY_REWORK_REQUEST: &str = "rework_request";

/// An admin approved an edit request, unlocking the image for one submit.
pub const NOTIFY_EDIT_REQUEST_APPROVED: &str = "edit_request_approved";

/// An admin rejected an edit request.
pub const NOTIFY_EDIT_REQUEST_REJECTED: &str = "edit_request_rejected";
