pub mod twitter_clone;

pub use twitter_clone::*;
