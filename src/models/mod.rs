pub mod review;
pub mod reviewer;
pub mod comment;
pub mod audit;
pub mod triage;

pub use review::*;
pub use reviewer::*;
pub use comment::*;
pub use audit::*;
pub use triage::*;
