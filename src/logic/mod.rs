pub mod generator;
pub mod rate_limit;
pub mod token;
pub mod tweet_filter;

pub use generator::*;
pub use rate_limit::*;
pub use token::*;
pub use tweet_filter::*;
