//! # Tide Info Core Library
//!
//! This library fetches tide predictions from the WorldTides API and answers
//! questions about the tide at an arbitrary instant: the next or previous
//! high/low, the last known water height, station metadata and datum offsets.
//!
//! ## Data Flow
//! 1. **Fetch**: [`tide_data::WorldTidesServer`] builds the request URL from
//!    [`config::ServerParameters`] and stores the parsed response as a
//!    [`tide_data::FetchOutcome`]
//! 2. **Decode**: [`decoder::TideInfo`] answers point-in-time queries against one
//!    [`TideDataset`]
//! 3. **Fall back**: [`fallback::CurrentOrPrevious`] retries a failed query
//!    against the previous dataset, so a bad refresh never blanks the answers
//!
//! ## Core Types
//!
//! The dataset mirrors the JSON document returned by the API. Every top-level
//! field is optional: the API only includes what was requested, and each
//! accessor maps an absent field to a named [`decoder::LookupError`].
//!
//! Times are Unix epoch seconds (`dt` in the API), which is also what the
//! query functions take.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod datums;
pub mod decoder;
pub mod fallback;
pub mod renderer;
pub mod tide_data;

#[cfg(test)]
mod tests;

/// A recorded high or low tide event.
///
/// # Example
/// ```
/// use tide_info_lib::{Extreme, TideType};
///
/// let high = Extreme {
///     dt: 1_700_000_000,
///     date: "2023-11-14T22:13+0000".to_string(),
///     height: 2.1,
///     kind: "High".to_string(),
/// };
/// assert_eq!(high.tide_type(), TideType::High);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    /// Epoch seconds
    pub dt: i64,
    /// ISO 8601 date string as sent by the API
    #[serde(default)]
    pub date: String,
    /// Height relative to the response datum
    pub height: f64,
    /// Raw type string, normally "High" or "Low"
    #[serde(rename = "type")]
    pub kind: String,
}

impl Extreme {
    /// Classify the raw type string.
    pub fn tide_type(&self) -> TideType {
        TideType::classify(&self.kind)
    }
}

/// A single sample of the predicted height curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightSample {
    pub dt: i64,
    #[serde(default)]
    pub date: String,
    pub height: f64,
}

/// A tide station near the reference point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub timezone: String,
}

/// A vertical reference plane and its height relative to the response datum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub name: String,
    pub height: f64,
}

/// The JSON document returned by one API call.
///
/// Produced by a single fetch and never modified afterwards. `extremes` and
/// `heights` are expected in ascending `dt` order; lookups rely on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TideDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extremes: Option<Vec<Extreme>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heights: Option<Vec<HeightSample>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stations: Option<Vec<Station>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datums: Option<Vec<Datum>>,
    /// Datum the heights are expressed against (e.g. "LAT")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_datum: Option<String>,
    /// Name of the station the predictions were computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
    /// Base64 PNG with a `data:image/png;base64,` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// API credits consumed by the call
    #[serde(default)]
    pub call_count: u32,
}

/// Kind of a tide extremum.
///
/// Anything the API sends that is neither "High" nor "Low" maps to `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideType {
    High,
    Low,
    None,
}

impl TideType {
    /// Classify by substring, "High" taking precedence over "Low".
    pub fn classify(raw: &str) -> Self {
        if raw.contains("High") {
            TideType::High
        } else if raw.contains("Low") {
            TideType::Low
        } else {
            TideType::None
        }
    }
}

impl std::fmt::Display for TideType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TideType::High => "High",
            TideType::Low => "Low",
            TideType::None => "None",
        };
        f.write_str(label)
    }
}
