//! sea-orm models backing the admin console.

pub mod configurations;
pub mod impersonations;
pub mod users;
