pub mod access_log;
pub mod admin;
pub mod credential;
pub mod node;
