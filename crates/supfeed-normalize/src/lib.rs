//! Normalization core shared by every supplier adapter.
//!
//! Everything here is pure: no I/O, no environment lookups. Callers build a
//! [`Pipeline`] once per supplier and feed [`supfeed_core::CanonicalOffer`]s
//! through [`normalize_offer`].

pub mod description;
pub mod error;
pub mod keywords;
pub mod offer;
pub mod params;
pub mod pricing;
pub mod text;
pub mod validate;
pub mod vendor;

pub use description::{build_description, DescriptionTemplate};
pub use error::{ValidationError, Violation, ViolationKind};
pub use keywords::{build_keywords, KeywordConfig};
pub use offer::{normalize_offer, render_offer, Pipeline};
pub use params::{clean_params, sort_params, ParamPolicy};
pub use pricing::{compute_price, parse_raw_price};
pub use validate::{validate, FeedStats, ValidationRules};
pub use vendor::{pick_vendor, BrandTable};
