//! Domain core for the labelkit annotation platform.
//!
//! Pure, storage-free building blocks shared by the `labelkit-db` and
//! `labelkit-api` crates:
//!
//! - [`error::CoreError`] -- the closed error taxonomy every rejected
//!   operation is reported through.
//! - [`lifecycle`] -- annotation status/review enums and the transition
//!   guards that make up the annotation state machine.
//! - [`queue`] -- task-queue ordering and resume-index arithmetic.
//! - [`selection`] -- submission content validation.
//! - [`timing`] -- elapsed-time clamping and the admin-tunable caps.
//! - [`roles`] / [`notify`] -- well-known role and notification type names.

pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod queue;
pub mod roles;
pub mod selection;
pub mod timing;
pub mod types;
