// Round-trip fare search: trip expansion, paced provider dispatch, caching and ranking

pub mod aggregate;
pub mod config;
pub mod dispatcher;
pub mod models;
pub mod provider;
pub mod ranking;
pub mod report;
pub mod response_cache;
pub mod search;
pub mod trip_spec;

// Re-export key types for convenience
pub use aggregate::{aggregate, Aggregation};
pub use config::{ConfigError, RunFlags, SearchConfig, TripFile};
pub use dispatcher::{DispatchConfig, DispatchError, DispatchStats, RateLimitedDispatcher};
pub use models::{DirectionItinerary, FlightSegment, ItineraryResult, PricedOption};
pub use provider::{HttpTransport, ProviderError, Transport};
pub use ranking::RankingComparator;
pub use response_cache::{CacheError, CacheStats, FileCache, MemoryCache, ResponseCache};
pub use search::{FlightSearch, SearchError};
pub use trip_spec::{DirectionSpec, ExpansionError, ItineraryRequest, TimeWindow, TripSpec};
