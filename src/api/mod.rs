pub mod auth_extractor;
pub mod draft_handlers;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use auth_extractor::*;
pub use error::*;
pub use extract::*;
pub use routes::*;
pub use state::*;
