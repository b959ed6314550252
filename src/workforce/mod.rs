//! Deterministic workforce analytics.
//!
//! Uploaded personnel datasets ([`record`]), a tolerant read-only view over
//! them ([`accessor`]), aggregate statistics ([`stats`]), and the keyword rule
//! engine that turns a question into one answer sentence ([`query_engine`]).

pub mod accessor;
pub mod query_engine;
pub mod record;
pub mod stats;

pub use accessor::{DatasetAccessor, Direction, GroupCounts};
pub use query_engine::{answer, match_query, Operation, QueryMatch, CAPABILITY_RESPONSE, RULES};
pub use record::{Dataset, Field, Record};
