pub mod client;
pub mod models;

pub use client::{FetchClient, FetchError};
pub use models::FetchConfig;
