//! # WorldTides Data Fetching
//!
//! This module handles all network operations against the WorldTides API. Two
//! request shapes are supported: a station search around the reference point,
//! and a tide request returning extrema, the height curve, a plot image and
//! optionally the datum table.
//!
//! ## Request Model
//!
//! - **One try**: each fetch issues exactly one GET with a fixed 10 second timeout.
//!   There is no retry; call again to refresh.
//! - **Snapshot**: the outcome of the last call of each kind is kept as a
//!   [`FetchOutcome`] and replaced on every call, whether it succeeded or not.
//! - **No partial data**: a non-200 status or a body that is not valid JSON
//!   yields no dataset at all.
//!
//! ## Error Handling
//!
//! Failures are recorded in the outcome as a [`FetchError`]:
//! - **Status**: the server answered with something other than 200
//! - **Transport**: connection failure, TLS problem or timeout
//! - **Parse**: the body could not be decoded as the expected JSON document

use crate::config::{ServerParameters, DEFAULT_BASE_URL};
use crate::TideDataset;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Timeout applied to every request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while fetching tide data.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Server answered with a non-200 status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Request never completed (network, TLS or timeout)
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body is not the expected JSON document
    #[error("invalid JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result of one request, kept until the next request of the same kind.
#[derive(Debug)]
pub struct FetchOutcome {
    result: Result<TideDataset, FetchError>,
    requested_at: DateTime<Utc>,
    credit: u32,
}

impl FetchOutcome {
    pub fn new(result: Result<TideDataset, FetchError>, requested_at: DateTime<Utc>) -> Self {
        let credit = result.as_ref().map(|data| data.call_count).unwrap_or(0);
        FetchOutcome {
            result,
            requested_at,
            credit,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// Parsed dataset, absent when the request failed
    pub fn data(&self) -> Option<&TideDataset> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.result.as_ref().err()
    }

    /// When the request was issued
    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// API credits consumed, 0 for a failed request
    pub fn credit(&self) -> u32 {
        self.credit
    }

    pub fn into_data(self) -> Option<TideDataset> {
        self.result.ok()
    }
}

/// Turn a status code and body into a dataset or an error.
///
/// Anything but 200 is a failure regardless of the body.
pub fn interpret_response(status: u16, body: &str) -> Result<TideDataset, FetchError> {
    if status != StatusCode::OK.as_u16() {
        return Err(FetchError::Status(status));
    }
    Ok(serde_json::from_str(body)?)
}

/// Client for the WorldTides API holding the last outcome of each request kind.
///
/// # Example
/// ```no_run
/// use tide_info_lib::config::Config;
/// use tide_info_lib::tide_data::WorldTidesServer;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut server = WorldTidesServer::new(Config::load().server_parameters())?;
/// let outcome = server.fetch_tide_data(true).await;
/// if let Some(data) = outcome.data() {
///     println!("{} extremes", data.extremes.as_ref().map_or(0, |e| e.len()));
/// }
/// # Ok(())
/// # }
/// ```
pub struct WorldTidesServer {
    params: ServerParameters,
    base_url: String,
    client: reqwest::Client,
    stations: Option<FetchOutcome>,
    tides: Option<FetchOutcome>,
}

impl WorldTidesServer {
    pub fn new(params: ServerParameters) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(WorldTidesServer {
            params,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            stations: None,
            tides: None,
        })
    }

    /// Point the client at another endpoint root (no trailing slash).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn parameters(&self) -> &ServerParameters {
        &self.params
    }

    /// Move the reference point used by the next requests.
    pub fn change_ref_point(&mut self, lat: f64, lon: f64) {
        self.params.change_ref_point(lat, lon);
    }

    /// URL of the station search request.
    pub fn stations_url(&self) -> String {
        let p = &self.params;
        format!(
            "{}/{}?stations&key={}&lat={}&lon={}&stationDistance={}",
            self.base_url,
            p.version(),
            p.key(),
            p.latitude(),
            p.longitude(),
            p.station_distance(),
        )
    }

    /// URL of the tide request.
    ///
    /// One day is added to the prediction duration so that queries just after
    /// midnight at the end of the window can still be answered.
    pub fn tide_url(&self, include_datums: bool) -> String {
        let p = &self.params;
        let days = p.prediction_duration() + 1;
        let datums = if include_datums { "&datums" } else { "" };
        format!(
            "{}/{}?extremes&days={}&date=today&heights&plot&timemode=24&step=900\
             &key={}&lat={}&lon={}&datum={}&stationDistance={}&color={}&background={}&units={}{}",
            self.base_url,
            p.version(),
            days,
            p.key(),
            p.latitude(),
            p.longitude(),
            p.vertical_ref(),
            p.station_distance(),
            p.plot_color(),
            p.plot_background(),
            p.units(),
            datums,
        )
    }

    /// Search for tide stations around the reference point.
    pub async fn fetch_stations(&mut self) -> &FetchOutcome {
        let url = self.stations_url();
        let outcome = self.request("stations", &url).await;
        self.stations.insert(outcome)
    }

    /// Fetch extrema, heights and plot, with the datum table when asked.
    pub async fn fetch_tide_data(&mut self, include_datums: bool) -> &FetchOutcome {
        let url = self.tide_url(include_datums);
        let outcome = self.request("tides", &url).await;
        self.tides.insert(outcome)
    }

    /// Outcome of the last station search, if any was made
    pub fn station_outcome(&self) -> Option<&FetchOutcome> {
        self.stations.as_ref()
    }

    /// Outcome of the last tide request, if any was made
    pub fn tide_outcome(&self) -> Option<&FetchOutcome> {
        self.tides.as_ref()
    }

    /// Hand out the last tide outcome, leaving none stored.
    ///
    /// Lets a caller keep the dataset (e.g. as the previous one for
    /// [`crate::fallback::CurrentOrPrevious`]) without cloning it.
    pub fn take_tide_outcome(&mut self) -> Option<FetchOutcome> {
        self.tides.take()
    }

    async fn request(&self, kind: &str, url: &str) -> FetchOutcome {
        let requested_at = Utc::now();
        debug!(kind, url = %self.redact(url), "sending request");

        let outcome = FetchOutcome::new(self.get(url).await, requested_at);
        match outcome.error() {
            None => info!(kind, credit = outcome.credit(), "request succeeded"),
            Some(e) => warn!(kind, error = %e, "request failed"),
        }
        outcome
    }

    async fn get(&self, url: &str) -> Result<TideDataset, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = if status == StatusCode::OK {
            response.text().await?
        } else {
            String::new()
        };
        interpret_response(status.as_u16(), &body)
    }

    fn redact(&self, url: &str) -> String {
        let key = self.params.key();
        if key.is_empty() {
            return url.to_string();
        }
        url.replace(&format!("key={key}"), "key=***")
    }
}
