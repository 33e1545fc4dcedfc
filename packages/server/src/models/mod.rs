pub mod auth;
pub mod item;
