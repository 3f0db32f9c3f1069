pub mod comments;
pub mod events;
pub mod health;
pub mod reviewers;
pub mod reviews;
pub mod stats;
pub mod triage;
