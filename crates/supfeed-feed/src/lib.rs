//! Feed assembly, persistence, and merging.

pub mod assemble;
pub mod error;
pub mod merge;
pub mod write;

pub use assemble::{assemble, feed_offset, next_build_at, parse_counts, FeedCounts, FeedHeader};
pub use error::FeedError;
pub use merge::{merge, offer_blocks, MergeOutcome};
pub use write::{decode_feed, read_feed, write_if_changed};
