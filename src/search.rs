// End-to-end search: expand, dispatch, aggregate, rank

use thiserror::Error;
use tracing::info;

use crate::aggregate::{aggregate, Aggregation};
use crate::dispatcher::{DispatchConfig, DispatchError, RateLimitedDispatcher};
use crate::ranking::RankingComparator;
use crate::trip_spec::{ExpansionError, TripSpec};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Could not expand trip: {0}")]
    Expansion(#[from] ExpansionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

pub struct FlightSearch {
    dispatcher: RateLimitedDispatcher,
    comparator: RankingComparator,
}

impl FlightSearch {
    pub fn new(dispatcher: RateLimitedDispatcher, comparator: RankingComparator) -> Self {
        Self {
            dispatcher,
            comparator,
        }
    }

    pub fn dispatcher(&self) -> &RateLimitedDispatcher {
        &self.dispatcher
    }

    /// Runs one full search. The returned options are ranked best first.
    ///
    /// Expansion errors surface before anything is sent.
    pub async fn run(
        &self,
        spec: &TripSpec,
        config: &DispatchConfig,
    ) -> Result<Aggregation, SearchError> {
        let requests = spec.expand()?;
        info!(requests = requests.len(), "Expanded trip into itinerary requests");

        let results = self.dispatcher.dispatch(requests, config).await?;
        let mut aggregated = aggregate(results);
        self.comparator.rank(&mut aggregated.options);

        info!(
            options = aggregated.options.len(),
            successes = aggregated.successes,
            attempted = aggregated.attempted,
            "Search complete"
        );
        Ok(aggregated)
    }
}
