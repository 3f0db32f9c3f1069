pub mod types;
pub mod classification;

pub use types::CyberHuntError;
pub use classification::ErrorClassification;
