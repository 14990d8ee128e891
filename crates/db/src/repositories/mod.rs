//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-statement flows open
//! their own transaction and enforce the lifecycle guards inside it.

pub mod annotation_repo;
pub mod assignment_repo;
pub mod category_repo;
pub mod edit_request_repo;
pub mod image_repo;
pub mod notification_repo;
pub mod review_repo;
pub mod settings_repo;
pub mod user_repo;

pub use annotation_repo::AnnotationRepo;
pub use assignment_repo::AssignmentRepo;
pub use category_repo::CategoryRepo;
pub use edit_request_repo::EditRequestRepo;
pub use image_repo::ImageRepo;
pub use notification_repo::NotificationRepo;
pub use review_repo::ReviewRepo;
pub use settings_repo::SettingsRepo;
pub use user_repo::UserRepo;
