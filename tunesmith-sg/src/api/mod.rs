//! HTTP API handlers

pub mod generate;
pub mod health;
pub mod songs;

pub use generate::generate_routes;
pub use health::health_routes;
pub use songs::song_routes;
