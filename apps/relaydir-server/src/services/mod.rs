pub mod access_logger;
pub mod credential_service;
pub mod geo_service;
pub mod node_service;
pub mod peer_selector;
pub mod rate_limiter;
