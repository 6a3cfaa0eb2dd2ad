//! Local libSQL database backing durable client state

mod connection;
mod migrations;

pub use connection::Database;
