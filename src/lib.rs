//! User-account service: credential checks, bearer tokens and guarded bulk
//! administration of the user directory.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod users;
