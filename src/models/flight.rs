//! Flight descriptor.
//!
//! Supplied by an external flight-data source. Departure and arrival are
//! kept as the raw local wall-clock strings the source delivers; they are
//! resolved against the airports' IANA zones during validation.

use serde::{Deserialize, Serialize};

/// A single flight leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Carrier flight number (display only).
    pub flight_number: String,
    /// Origin airport IATA code.
    pub origin: String,
    /// Destination airport IATA code.
    pub destination: String,
    /// Departure, local time at the origin (e.g. `2024-01-01T08:00:00`).
    pub departure_time: String,
    /// Arrival, local time at the destination.
    pub arrival_time: String,
    /// Duration label from the source (e.g. `"08:00"`), display only.
    pub duration: String,
}

impl Flight {
    /// Creates a flight from origin/destination codes and local times.
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_time: impl Into<String>,
        arrival_time: impl Into<String>,
    ) -> Self {
        Self {
            flight_number: String::new(),
            origin: origin.into(),
            destination: destination.into(),
            departure_time: departure_time.into(),
            arrival_time: arrival_time.into(),
            duration: String::new(),
        }
    }

    /// Sets the flight number.
    pub fn with_flight_number(mut self, flight_number: impl Into<String>) -> Self {
        self.flight_number = flight_number.into();
        self
    }

    /// Sets the duration label.
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    /// Route label, e.g. `"LHR → PEK"`.
    pub fn route(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}
