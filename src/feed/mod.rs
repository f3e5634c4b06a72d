//! 照片信息流客户端核心

pub mod auth;
pub mod client;
pub mod db;
pub mod error;
mod flight;
pub mod photo;
pub mod profile;
pub mod token;
