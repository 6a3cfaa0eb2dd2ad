pub mod auth_cmd;
pub mod checkin;
pub mod common;
pub mod completions;
pub mod config;
pub mod queue;
pub mod vote;
pub mod watch;
