//! Orgchart - organization hierarchy and membership management
//!
//! The organization forest lives in a flat table keyed by id. Every
//! structural change goes through [`service::OrganizationService`], which
//! rejects self-parenting and cycles before anything is written. User
//! memberships are tracked by [`service::MembershipService`] with an
//! append-only change log.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod fixtures;
pub mod handlers;
pub mod identity;
pub mod notifier;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod tree;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use identity::{UserIdentity, UserRef};
pub use state::AppState;
