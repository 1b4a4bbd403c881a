// Trip specification and its expansion into concrete itinerary requests
// A compact spec (airport sets, date sets, trip length bounds) fans out into the
// full cross product of outbound/inbound pairs that get priced one by one.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calendar form every date in a trip spec must follow.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Departure window forced onto a red-eye direction.
pub const RED_EYE_EARLIEST: &str = "19:00";
pub const RED_EYE_LATEST: &str = "23:59";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("Invalid date format: {0:?} (expected YYYY-MM-DD)")]
    InvalidDateFormat(String),
}

// Permitted departure time-of-day, "HH:MM" on both ends. Empty means open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeWindow {
    pub earliest: String,
    pub latest: String,
}

impl TimeWindow {
    pub fn new(earliest: &str, latest: &str) -> Self {
        Self {
            earliest: earliest.to_string(),
            latest: latest.to_string(),
        }
    }

    pub fn red_eye() -> Self {
        Self::new(RED_EYE_EARLIEST, RED_EYE_LATEST)
    }

    pub fn is_open(&self) -> bool {
        self.earliest.is_empty() && self.latest.is_empty()
    }
}

/// Search parameters for one direction of the trip.
///
/// Candidate dates come from the first of these that is set: `date`, `dates`,
/// `date_range`. Weekday exclusions only filter the range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectionSpec {
    pub date: Option<String>,
    pub dates: Vec<String>,
    pub date_range: Option<(String, String)>,
    /// One-letter weekday codes to skip: U M T W R F S (Sunday..Saturday).
    pub weekday_exclusions: String,
    pub red_eye_only: bool,
    pub max_legs: Option<u32>,
    pub time_window: Option<TimeWindow>,
}

impl DirectionSpec {
    pub fn on(date: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            ..Default::default()
        }
    }

    pub fn between(start: &str, end: &str) -> Self {
        Self {
            date_range: Some((start.to_string(), end.to_string())),
            ..Default::default()
        }
    }

    /// Red-eye wins over any explicit window.
    pub fn effective_time_window(&self) -> Option<TimeWindow> {
        if self.red_eye_only {
            return Some(TimeWindow::red_eye());
        }
        self.time_window.clone().filter(|w| !w.is_open())
    }

    /// Red-eye directions are always limited to a single leg.
    pub fn effective_max_legs(&self) -> Option<u32> {
        if self.red_eye_only {
            return Some(1);
        }
        self.max_legs.filter(|legs| *legs > 0)
    }

    pub fn candidate_dates(&self) -> Result<Vec<NaiveDate>, ExpansionError> {
        if let Some(date) = self.date.as_deref().filter(|d| !d.is_empty()) {
            return Ok(vec![parse_date(date)?]);
        }

        if !self.dates.is_empty() {
            return self.dates.iter().map(|d| parse_date(d)).collect();
        }

        match &self.date_range {
            Some((start, end)) => {
                let start = parse_date(start)?;
                let end = parse_date(end)?;
                Ok(start
                    .iter_days()
                    .take_while(|d| *d <= end)
                    .filter(|d| is_day_allowed(d.weekday(), &self.weekday_exclusions))
                    .collect())
            }
            None => Ok(vec![]),
        }
    }
}

/// Everything needed to fan out a round-trip search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TripSpec {
    pub origin_airport: Option<String>,
    pub origin_airports: Vec<String>,
    pub dest_airport: Option<String>,
    pub dest_airports: Vec<String>,
    pub outbound: DirectionSpec,
    pub inbound: DirectionSpec,
    #[serde(alias = "minTripLength")]
    pub min_trip_length_days: Option<u32>,
    #[serde(alias = "maxTripLength")]
    pub max_trip_length_days: Option<u32>,
    pub num_passengers: u32,
}

// A single explicit airport takes precedence over the list.
fn airport_set(single: &Option<String>, list: &[String]) -> Vec<String> {
    match single.as_deref().filter(|a| !a.is_empty()) {
        Some(airport) => vec![airport.to_string()],
        None => list.to_vec(),
    }
}

impl TripSpec {
    pub fn origin_airports(&self) -> Vec<String> {
        airport_set(&self.origin_airport, &self.origin_airports)
    }

    pub fn dest_airports(&self) -> Vec<String> {
        airport_set(&self.dest_airport, &self.dest_airports)
    }

    /// Every (outbound, inbound) date pair whose gap in days falls within the
    /// trip length bounds. Unset minimum is zero, unset maximum is unbounded.
    pub fn valid_date_pairs(&self) -> Result<Vec<(NaiveDate, NaiveDate)>, ExpansionError> {
        let outbound_dates = self.outbound.candidate_dates()?;
        let inbound_dates = self.inbound.candidate_dates()?;

        let min_days = i64::from(self.min_trip_length_days.unwrap_or(0));
        let max_days = self.max_trip_length_days.map(i64::from);

        let mut pairs = Vec::new();
        for outbound in &outbound_dates {
            for inbound in &inbound_dates {
                let gap = (*inbound - *outbound).num_days();
                if gap >= min_days && max_days.map_or(true, |max| gap <= max) {
                    pairs.push((*outbound, *inbound));
                }
            }
        }
        Ok(pairs)
    }

    /// Expands into the full cross product of concrete requests. The inbound leg
    /// flies from the outbound destinations back to the outbound origins.
    ///
    /// Any malformed date aborts the whole expansion.
    pub fn expand(&self) -> Result<Vec<ItineraryRequest>, ExpansionError> {
        let origins = self.origin_airports();
        let destinations = self.dest_airports();
        let date_pairs = self.valid_date_pairs()?;

        let outbound_window = self.outbound.effective_time_window();
        let outbound_legs = self.outbound.effective_max_legs();
        let inbound_window = self.inbound.effective_time_window();
        let inbound_legs = self.inbound.effective_max_legs();

        let airport_combinations =
            origins.len() * destinations.len() * destinations.len() * origins.len();
        let mut requests = Vec::with_capacity(airport_combinations * date_pairs.len());

        for outbound_origin in &origins {
            for outbound_dest in &destinations {
                for inbound_origin in &destinations {
                    for inbound_dest in &origins {
                        for (outbound_date, inbound_date) in &date_pairs {
                            requests.push(ItineraryRequest {
                                num_passengers: self.num_passengers,
                                outbound: DirectionRequest {
                                    origin: outbound_origin.clone(),
                                    destination: outbound_dest.clone(),
                                    date: *outbound_date,
                                    time_window: outbound_window.clone(),
                                    max_legs: outbound_legs,
                                },
                                inbound: DirectionRequest {
                                    origin: inbound_origin.clone(),
                                    destination: inbound_dest.clone(),
                                    date: *inbound_date,
                                    time_window: inbound_window.clone(),
                                    max_legs: inbound_legs,
                                },
                            });
                        }
                    }
                }
            }
        }

        Ok(requests)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectionRequest {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub time_window: Option<TimeWindow>,
    pub max_legs: Option<u32>,
}

/// One concrete outbound + inbound pairing to be priced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItineraryRequest {
    pub num_passengers: u32,
    pub outbound: DirectionRequest,
    pub inbound: DirectionRequest,
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ExpansionError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ExpansionError::InvalidDateFormat(raw.to_string()))
}

pub fn weekday_code(day: Weekday) -> char {
    match day {
        Weekday::Sun => 'U',
        Weekday::Mon => 'M',
        Weekday::Tue => 'T',
        Weekday::Wed => 'W',
        Weekday::Thu => 'R',
        Weekday::Fri => 'F',
        Weekday::Sat => 'S',
    }
}

pub fn is_day_allowed(day: Weekday, exclusions: &str) -> bool {
    !exclusions.contains(weekday_code(day))
}
