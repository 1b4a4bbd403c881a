// Priced itinerary data handed from the provider adapter to aggregation and ranking

use chrono::{DateTime, Duration, FixedOffset};

/// One flight number within a direction. A segment can still span several
/// physical legs when the flight makes a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSegment {
    pub carrier: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<FixedOffset>,
    pub arrival: DateTime<FixedOffset>,
    pub num_legs: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionItinerary {
    pub duration_minutes: i64,
    pub segments: Vec<FlightSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedOption {
    pub price: f64,
    pub outbound: DirectionItinerary,
    pub inbound: DirectionItinerary,
}

impl PricedOption {
    pub fn directions(&self) -> [&DirectionItinerary; 2] {
        [&self.outbound, &self.inbound]
    }

    pub fn segments(&self) -> impl Iterator<Item = &FlightSegment> {
        self.outbound.segments.iter().chain(self.inbound.segments.iter())
    }

    /// First outbound departure to last inbound arrival. Zero when either
    /// direction carries no segments.
    pub fn trip_length(&self) -> Duration {
        match (self.outbound.segments.first(), self.inbound.segments.last()) {
            (Some(first), Some(last)) => last.arrival.signed_duration_since(first.departure),
            _ => Duration::zero(),
        }
    }
}

/// Outcome of pricing one itinerary request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItineraryResult {
    pub success: bool,
    pub options: Vec<PricedOption>,
}

impl ItineraryResult {
    pub fn succeeded(options: Vec<PricedOption>) -> Self {
        Self {
            success: true,
            options,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}
