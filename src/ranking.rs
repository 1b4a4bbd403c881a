// Total order over priced options
// Cheapest ten-unit price bucket first, then the longest trip, then the most
// segments flown on the preferred carrier.

use std::cmp::Ordering;

use crate::models::PricedOption;

pub const DEFAULT_PREFERRED_CARRIER: &str = "JetBlue";

/// Price rounded down to the nearest multiple of ten.
pub fn price_bucket(option: &PricedOption) -> i64 {
    ((option.price / 10.0).floor() * 10.0) as i64
}

#[derive(Debug, Clone)]
pub struct RankingComparator {
    preferred_carrier: String,
}

impl Default for RankingComparator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFERRED_CARRIER)
    }
}

impl RankingComparator {
    pub fn new(preferred_carrier: &str) -> Self {
        Self {
            preferred_carrier: preferred_carrier.to_lowercase(),
        }
    }

    /// Segments across both directions whose carrier name mentions the
    /// preferred carrier, ignoring case.
    pub fn preferred_carrier_score(&self, option: &PricedOption) -> usize {
        if self.preferred_carrier.is_empty() {
            return 0;
        }
        option
            .segments()
            .filter(|s| s.carrier.to_lowercase().contains(&self.preferred_carrier))
            .count()
    }

    // Descending on trip length is intended: the longer trip wins inside a bucket.
    pub fn compare(&self, a: &PricedOption, b: &PricedOption) -> Ordering {
        price_bucket(a)
            .cmp(&price_bucket(b))
            .then_with(|| b.trip_length().cmp(&a.trip_length()))
            .then_with(|| {
                self.preferred_carrier_score(b)
                    .cmp(&self.preferred_carrier_score(a))
            })
    }

    /// Stable sort, so options equal on every key keep their arrival order.
    pub fn rank(&self, options: &mut [PricedOption]) {
        options.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DirectionItinerary, FlightSegment};
    use chrono::{DateTime, Duration, FixedOffset};
    use rand::seq::SliceRandom;

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn segment(carrier: &str, departure: DateTime<FixedOffset>, hours: i64) -> FlightSegment {
        FlightSegment {
            carrier: carrier.to_string(),
            flight_number: "XX 1".to_string(),
            origin: "SFO".to_string(),
            destination: "BOS".to_string(),
            departure,
            arrival: departure + Duration::hours(hours),
            num_legs: 1,
        }
    }

    // Trip of `days` days, `preferred` of the two segments flown on JetBlue
    fn option(price: f64, days: i64, preferred: usize) -> PricedOption {
        let start = at("2017-03-22T21:00:00-07:00");
        let carrier = |i: usize| {
            if i < preferred {
                "JetBlue Airways Corporation"
            } else {
                "United Airlines, Inc."
            }
        };
        PricedOption {
            price,
            outbound: DirectionItinerary {
                duration_minutes: 330,
                segments: vec![segment(carrier(0), start, 5)],
            },
            inbound: DirectionItinerary {
                duration_minutes: 390,
                segments: vec![segment(carrier(1), start + Duration::days(days), 6)],
            },
        }
    }

    #[test]
    fn test_price_bucket_floors_to_ten() {
        assert_eq!(price_bucket(&option(123.0, 1, 0)), 120);
        assert_eq!(price_bucket(&option(127.99, 1, 0)), 120);
        assert_eq!(price_bucket(&option(130.0, 1, 0)), 130);
        assert_eq!(price_bucket(&option(95.0, 1, 0)), 90);
    }

    #[test]
    fn test_same_bucket_prefers_longer_trip() {
        let comparator = RankingComparator::default();
        let mut options = vec![
            option(123.0, 3, 2),
            option(127.0, 5, 0),
            option(95.0, 1, 0),
        ];

        comparator.rank(&mut options);

        let prices: Vec<f64> = options.iter().map(|o| o.price).collect();
        // 95 is alone in the cheapest bucket; 127 beats 123 on trip length
        assert_eq!(prices, vec![95.0, 127.0, 123.0]);
    }

    #[test]
    fn test_equal_length_falls_through_to_preferred_carrier() {
        let comparator = RankingComparator::default();
        let mut options = vec![option(127.0, 4, 0), option(123.0, 4, 2), option(125.0, 4, 1)];

        comparator.rank(&mut options);

        let scores: Vec<usize> = options
            .iter()
            .map(|o| comparator.preferred_carrier_score(o))
            .collect();
        assert_eq!(scores, vec![2, 1, 0]);
    }

    #[test]
    fn test_full_ties_keep_arrival_order() {
        let comparator = RankingComparator::default();
        let mut options = vec![option(121.0, 2, 1), option(129.0, 2, 1), option(120.0, 2, 1)];

        comparator.rank(&mut options);

        let prices: Vec<f64> = options.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![121.0, 129.0, 120.0]);
    }

    #[test]
    fn test_ranking_is_deterministic_for_any_arrival_order() {
        let comparator = RankingComparator::default();
        let mut expected: Vec<PricedOption> = (0..40)
            .map(|i| {
                let price = 80.0 + (i * 7 % 50) as f64;
                option(price, (i % 4) as i64 + 1, (i % 3) as usize)
            })
            .collect();
        comparator.rank(&mut expected);

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let mut shuffled = expected.clone();
            shuffled.shuffle(&mut rng);
            comparator.rank(&mut shuffled);

            let keys = |opts: &[PricedOption]| -> Vec<(i64, Duration, usize)> {
                opts.iter()
                    .map(|o| {
                        (
                            price_bucket(o),
                            o.trip_length(),
                            comparator.preferred_carrier_score(o),
                        )
                    })
                    .collect()
            };
            assert_eq!(keys(shuffled.as_slice()), keys(expected.as_slice()));
        }
    }

    #[test]
    fn test_preferred_carrier_match_ignores_case() {
        let option = option(100.0, 2, 2);
        assert_eq!(RankingComparator::new("jetblue").preferred_carrier_score(&option), 2);
        assert_eq!(RankingComparator::new("Jetblue").preferred_carrier_score(&option), 2);
        assert_eq!(RankingComparator::new("").preferred_carrier_score(&option), 0);
    }

    #[test]
    fn test_missing_segments_rank_as_zero_length() {
        let comparator = RankingComparator::default();
        let mut empty = option(100.0, 2, 0);
        empty.inbound.segments.clear();
        assert_eq!(empty.trip_length(), Duration::zero());

        let mut options = vec![empty.clone(), option(100.0, 2, 0)];
        comparator.rank(&mut options);
        assert_eq!(options[1], empty);
    }
}
