//! Database models split into domain-specific modules.

pub mod recording;
pub mod report;
pub mod user;

pub use recording::*;
pub use report::*;
pub use user::*;
