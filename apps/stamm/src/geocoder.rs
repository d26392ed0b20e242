//! # Nominatim Geocoder
//!
//! Blocking HTTP adapter behind the core's `Geocoder` trait. One request
//! per place, spaced by a direct `governor` rate limiter.
//!
//! Transport and decoding failures are logged and reported to the core
//! as "no match", which marks the place `failed`.

use crate::config::GeocoderConfig;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use stamm_core::{Coordinates, Geocoder, StammError};
use std::time::Duration;
use tracing::{debug, warn};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Errors from a single lookup.
#[derive(Debug)]
pub enum GeocodeError {
    /// The request could not be sent or timed out.
    ConnectionFailed(String),
    /// The service answered with a non-success status.
    Status(u16),
    /// The body was not the expected JSON.
    ParseError(String),
}

impl std::fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(msg) => write!(f, "Cannot reach geocoder: {msg}"),
            Self::Status(status) => write!(f, "Geocoder returned status {status}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for GeocodeError {}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Decode a Nominatim `format=json` search body. The first hit wins.
pub fn parse_response(body: &str) -> Result<Option<Coordinates>, GeocodeError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| GeocodeError::ParseError(e.to_string()))?;
    let Some(hit) = hits.first() else {
        return Ok(None);
    };
    let latitude = hit
        .lat
        .trim()
        .parse::<f64>()
        .map_err(|e| GeocodeError::ParseError(format!("lat '{}': {}", hit.lat, e)))?;
    let longitude = hit
        .lon
        .trim()
        .parse::<f64>()
        .map_err(|e| GeocodeError::ParseError(format!("lon '{}': {}", hit.lon, e)))?;
    Ok(Some(Coordinates {
        latitude,
        longitude,
    }))
}

pub struct NominatimGeocoder {
    http: reqwest::blocking::Client,
    url: String,
    clock: DefaultClock,
    limiter: Option<DirectRateLimiter>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, StammError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StammError::Io(format!("geocoder client: {}", e)))?;

        let clock = DefaultClock::default();
        // A zero interval has no quota and disables limiting.
        let limiter = Quota::with_period(Duration::from_millis(config.min_interval_ms))
            .map(|quota| RateLimiter::direct_with_clock(quota, clock.clone()));

        Ok(Self {
            http,
            url: config.url.clone(),
            clock,
            limiter,
        })
    }

    /// Block until the limiter admits the next request.
    fn throttle(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        while let Err(not_until) = limiter.check() {
            std::thread::sleep(not_until.wait_time_from(self.clock.now()));
        }
    }

    pub fn lookup(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        self.throttle();
        let response = self
            .http
            .get(&self.url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .map_err(|e| GeocodeError::ConnectionFailed(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;
        parse_response(&body)
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&mut self, query: &str) -> Option<Coordinates> {
        match self.lookup(query) {
            Ok(found) => {
                debug!(%query, hit = found.is_some(), "geocoder answered");
                found
            }
            Err(e) => {
                warn!(%query, error = %e, "geocoding request failed");
                None
            }
        }
    }
}
