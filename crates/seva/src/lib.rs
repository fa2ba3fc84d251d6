pub mod client;
pub mod daemon;
pub mod error;
pub mod output;
pub mod store;
pub mod types;
