pub mod commands;
pub mod query;
pub mod serve;
pub mod validate;

pub use commands::{Cli, Commands};
