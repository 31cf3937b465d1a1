//! Domain layer - Key model, records, collections and port definitions
//!
//! This module holds the resolution logic itself and the traits (ports)
//! that storage adapters implement, following hexagonal architecture
//! principles.

pub mod collection;
pub mod keys;
pub mod ports;
pub mod record;

pub use collection::{match_segments, ContentCollection, MatchScore};
pub use keys::{derive_origin_key, derive_path_key, parse_url, OriginKey, PathKey, WILDCARD};
pub use ports::{cancellable, ContentRepository, ContentRepositoryRef};
pub use record::{ContentRecord, VideoPayload, RECORD_SCHEMA_VERSION};
