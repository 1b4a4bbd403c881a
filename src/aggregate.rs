// Flattening of per-request results into one pool of priced options

use crate::models::{ItineraryResult, PricedOption};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub options: Vec<PricedOption>,
    pub attempted: usize,
    pub successes: usize,
}

impl Aggregation {
    pub fn all_succeeded(&self) -> bool {
        self.successes == self.attempted
    }

    pub fn failures(&self) -> usize {
        self.attempted - self.successes
    }
}

/// Concatenates the options of every successful result in arrival order.
/// Failed results contribute nothing but still count as attempted.
pub fn aggregate(results: Vec<ItineraryResult>) -> Aggregation {
    let attempted = results.len();
    let mut successes = 0;
    let mut options = Vec::new();

    for result in results.into_iter().filter(|r| r.success) {
        successes += 1;
        options.extend(result.options);
    }

    Aggregation {
        options,
        attempted,
        successes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DirectionItinerary;

    fn option(price: f64) -> PricedOption {
        let empty = DirectionItinerary {
            duration_minutes: 0,
            segments: vec![],
        };
        PricedOption {
            price,
            outbound: empty.clone(),
            inbound: empty,
        }
    }

    #[test]
    fn test_only_successful_results_contribute() {
        let results = vec![
            ItineraryResult::failed(),
            ItineraryResult::succeeded(vec![option(100.0), option(200.0), option(300.0)]),
            ItineraryResult::failed(),
            ItineraryResult::succeeded(vec![option(150.0)]),
            ItineraryResult::failed(),
        ];

        let aggregated = aggregate(results);

        assert_eq!(aggregated.options.len(), 4);
        assert_eq!(aggregated.successes, 2);
        assert_eq!(aggregated.attempted, 5);
        assert_eq!(aggregated.failures(), 3);
        assert!(!aggregated.all_succeeded());

        let prices: Vec<f64> = aggregated.options.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![100.0, 200.0, 300.0, 150.0]);
    }

    #[test]
    fn test_failed_result_options_are_ignored() {
        let stray = ItineraryResult {
            success: false,
            options: vec![option(1.0)],
        };
        let aggregated = aggregate(vec![stray, ItineraryResult::succeeded(vec![])]);

        assert!(aggregated.options.is_empty());
        assert_eq!(aggregated.successes, 1);
    }

    #[test]
    fn test_empty_run_counts_as_full_success() {
        let aggregated = aggregate(vec![]);
        assert!(aggregated.all_succeeded());
        assert_eq!(aggregated, Aggregation::default());
    }
}
