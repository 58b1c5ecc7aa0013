//! Admin console server: GraphQL for users and impersonation, JSON routes
//! for configuration entries.

pub mod config;
pub mod configurations;
pub mod graphql;
pub mod http;
pub mod session;

pub use config::AppConfig;
pub use http::{AppState, build_router};
