pub mod keyword;
pub mod popularity;
pub mod recency;

pub use keyword::{Decoded, KeywordPair, MalformedCompositeKey, RejectCode};
