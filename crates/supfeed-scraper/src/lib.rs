pub mod client;
pub mod error;
pub mod extract;
pub(crate) mod rate_limit;

pub use client::{decode_body, Credentials, FeedClient};
pub use error::ScraperError;
pub use extract::{extract_offers, ExtractOutcome};
