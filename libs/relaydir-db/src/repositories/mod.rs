pub mod access_log_repo;
pub mod credential_repo;
pub mod node_repo;
