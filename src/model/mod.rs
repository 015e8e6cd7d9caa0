pub mod common;
pub mod draft;
pub mod tweet;
pub mod user;

pub use common::*;
pub use draft::*;
pub use tweet::*;
pub use user::*;
