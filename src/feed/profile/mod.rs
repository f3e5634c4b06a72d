//! 用户资料模块

pub mod api;
pub mod models;
pub mod service;
pub mod types;

pub use api::ProfileApi;
pub use models::{Profile, ProfileImage, ProfileStorage, PROFILE_TTL};
pub use service::ProfileService;
pub use types::{ProfileResult, UserResult};
