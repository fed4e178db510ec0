//! Data models

mod membership;
mod organization;
mod principal;
mod project;

pub use membership::*;
pub use organization::*;
pub use principal::*;
pub use project::*;
