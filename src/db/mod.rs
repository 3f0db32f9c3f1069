pub mod connection;
pub mod schema;
pub mod reviews;
pub mod reviewers;
pub mod comments;
pub mod audit;
pub mod triage;
mod rows;

pub use connection::Database;
