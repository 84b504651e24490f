//! HTTP API handlers for nfcbox-registry

pub mod health;
pub mod tags;

pub use health::health_routes;
pub use tags::tag_routes;
