//! Resolves a visitor's network address into a single location record by
//! querying an ordered list of geolocation providers and merging what they
//! return.

pub mod config;
pub mod merge;
pub mod metrics_defs;
pub mod providers;
pub mod public_ip;
pub mod resolver;
pub mod types;

pub use merge::MergePolicy;
pub use providers::{GeoProvider, ProviderError};
pub use resolver::{GeoError, GeoResolver};
pub use types::{GeoRecord, PartialGeo, UNKNOWN};
