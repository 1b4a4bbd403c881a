// Pricing provider adapter: wire request/response schema, translation to and from
// the itinerary model, and the HTTP transport.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DirectionItinerary, FlightSegment, ItineraryResult, PricedOption};
use crate::trip_spec::{DirectionRequest, ItineraryRequest, DATE_FORMAT};

/// Timestamp form the provider uses on legs, e.g. `2017-03-29T07:00-07:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M%:z";

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/qpxExpress/v1/trips/search";

const UNKNOWN_CARRIER: &str = "Unknown";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Provider reported error: {reason} - {message}")]
    Reported { reason: String, message: String },

    #[error("Could not interpret price: {0:?}")]
    CurrencyParse(String),
}

impl ProviderError {
    /// A price that cannot be read poisons the whole run, everything else only
    /// fails the request it happened on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::CurrencyParse(_))
    }
}

// Wire request

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub request: RequestContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestContent {
    pub passengers: PassengerCounts,
    pub slice: [SliceInput; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerCounts {
    pub adult_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceInput {
    pub origin: String,
    pub destination: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stops: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permitted_departure_time: Option<TimeOfDayRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDayRange {
    pub earliest_time: String,
    pub latest_time: String,
}

// Wire response

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderResponse {
    pub trips: TripsResult,
    pub error: ResponseErrors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TripsResult {
    pub data: TripData,
    pub trip_option: Vec<TripOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TripData {
    pub carrier: Vec<Carrier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Carrier {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TripOption {
    pub sale_total: String,
    pub slice: Vec<SliceResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SliceResult {
    pub duration: i64,
    pub segment: Vec<SegmentResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SegmentResult {
    pub flight: FlightDetail,
    pub leg: Vec<Leg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightDetail {
    pub carrier: String,
    pub number: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Leg {
    pub arrival_time: String,
    pub departure_time: String,
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseErrors {
    pub errors: Vec<ResponseErrorEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseErrorEntry {
    pub domain: String,
    pub reason: String,
    pub message: String,
}

impl ProviderResponse {
    pub fn reported_error(&self) -> Option<ProviderError> {
        self.error.errors.first().map(|e| ProviderError::Reported {
            reason: e.reason.clone(),
            message: e.message.clone(),
        })
    }

    fn carrier_name(&self, code: &str) -> &str {
        self.trips
            .data
            .carrier
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.name.as_str())
            .unwrap_or(UNKNOWN_CARRIER)
    }
}

fn encode_slice(direction: &DirectionRequest) -> SliceInput {
    SliceInput {
        origin: direction.origin.clone(),
        destination: direction.destination.clone(),
        date: direction.date.format(DATE_FORMAT).to_string(),
        max_stops: direction.max_legs.filter(|legs| *legs > 0).map(|legs| legs - 1),
        permitted_departure_time: direction
            .time_window
            .as_ref()
            .filter(|w| !w.is_open())
            .map(|w| TimeOfDayRange {
                earliest_time: w.earliest.clone(),
                latest_time: w.latest.clone(),
            }),
    }
}

/// Translates an itinerary request into the provider's wire schema.
pub fn encode(request: &ItineraryRequest) -> ProviderRequest {
    ProviderRequest {
        request: RequestContent {
            passengers: PassengerCounts {
                adult_count: request.num_passengers,
            },
            slice: [encode_slice(&request.outbound), encode_slice(&request.inbound)],
        },
    }
}

/// Parses raw response bytes and rejects responses that carry provider errors.
pub fn parse_response(raw: &[u8]) -> Result<ProviderResponse, ProviderError> {
    let response: ProviderResponse =
        serde_json::from_slice(raw).map_err(|e| ProviderError::Decode(e.to_string()))?;

    match response.reported_error() {
        Some(err) => Err(err),
        None => Ok(response),
    }
}

// Expected input: USD316.40
pub fn parse_currency(amount: &str) -> Result<f64, ProviderError> {
    let numeric = amount.trim().trim_start_matches(|c: char| c.is_ascii_alphabetic());
    match numeric.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ProviderError::CurrencyParse(amount.to_string())),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, ProviderError> {
    DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|_| ProviderError::Decode(format!("could not interpret timestamp {raw:?}")))
}

fn decode_segment(
    response: &ProviderResponse,
    segment: &SegmentResult,
) -> Result<FlightSegment, ProviderError> {
    let (first, last) = match (segment.leg.first(), segment.leg.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ProviderError::Decode(format!(
                "segment {} {} has no legs",
                segment.flight.carrier, segment.flight.number
            )))
        }
    };

    Ok(FlightSegment {
        carrier: response.carrier_name(&segment.flight.carrier).to_string(),
        flight_number: format!("{} {}", segment.flight.carrier, segment.flight.number),
        origin: first.origin.clone(),
        destination: last.destination.clone(),
        departure: parse_timestamp(&first.departure_time)?,
        arrival: parse_timestamp(&last.arrival_time)?,
        num_legs: segment.leg.len() as u32,
    })
}

fn decode_slice(
    response: &ProviderResponse,
    slice: &SliceResult,
) -> Result<DirectionItinerary, ProviderError> {
    let segments = slice
        .segment
        .iter()
        .map(|s| decode_segment(response, s))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DirectionItinerary {
        duration_minutes: slice.duration,
        segments,
    })
}

/// Interprets a parsed response as priced options.
pub fn decode(response: &ProviderResponse) -> Result<ItineraryResult, ProviderError> {
    let mut options = Vec::with_capacity(response.trips.trip_option.len());

    for trip in &response.trips.trip_option {
        let price = parse_currency(&trip.sale_total)?;

        let (outbound, inbound) = match trip.slice.as_slice() {
            [outbound, inbound] => (outbound, inbound),
            other => {
                return Err(ProviderError::Decode(format!(
                    "expected 2 slices per trip option, got {}",
                    other.len()
                )))
            }
        };

        options.push(PricedOption {
            price,
            outbound: decode_slice(response, outbound)?,
            inbound: decode_slice(response, inbound)?,
        });
    }

    Ok(ItineraryResult::succeeded(options))
}

/// Sends an encoded request and hands back the raw response body.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &ProviderRequest) -> Result<Bytes, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ProviderRequest) -> Result<Bytes, ProviderError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key)]);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            // Error responses usually carry the provider's own reason
            if let Err(err @ ProviderError::Reported { .. }) = parse_response(&body) {
                return Err(err);
            }
            return Err(ProviderError::Transport(format!("HTTP {status}")));
        }

        Ok(body)
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_RESPONSE: &str = r#"{
  "kind": "qpxExpress#tripsSearch",
  "trips": {
    "data": {
      "carrier": [
        { "code": "B6", "name": "JetBlue Airways Corporation" },
        { "code": "UA", "name": "United Airlines, Inc." }
      ]
    },
    "tripOption": [
      {
        "saleTotal": "USD316.40",
        "slice": [
          {
            "duration": 285,
            "segment": [
              {
                "flight": { "carrier": "UA", "number": "1234" },
                "leg": [
                  {
                    "origin": "SFO",
                    "destination": "ORD",
                    "departureTime": "2017-03-29T07:00-07:00",
                    "arrivalTime": "2017-03-29T13:45-05:00"
                  }
                ]
              }
            ]
          },
          {
            "duration": 400,
            "segment": [
              {
                "flight": { "carrier": "B6", "number": "88" },
                "leg": [
                  {
                    "origin": "ORD",
                    "destination": "DEN",
                    "departureTime": "2017-03-30T08:00-05:00",
                    "arrivalTime": "2017-03-30T09:30-06:00"
                  },
                  {
                    "origin": "DEN",
                    "destination": "SFO",
                    "departureTime": "2017-03-30T10:30-06:00",
                    "arrivalTime": "2017-03-30T12:40-07:00"
                  }
                ]
              }
            ]
          }
        ]
      }
    ]
  }
}"#;
