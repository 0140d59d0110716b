//! Spring tide offsets from a datum table.

use crate::decoder::LookupError;
use crate::Datum;
use serde::Serialize;

/// Mean High/Low Water Springs heights relative to the response datum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpringTideOffsets {
    #[serde(rename = "datum_offset_MHWS")]
    pub datum_offset_mhws: f64,
    #[serde(rename = "datum_offset_MLWS")]
    pub datum_offset_mlws: f64,
}

impl SpringTideOffsets {
    /// Pick the "MHWS" and "MLWS" entries, the last one winning on duplicates.
    ///
    /// A name that never appears falls back to the first entry of the table.
    pub fn from_datums(datums: Option<&[Datum]>) -> Result<Self, LookupError> {
        let datums = datums.ok_or(LookupError::NoData)?;
        let first = datums.first().ok_or(LookupError::Missing("datums"))?;

        let height_of = |name: &str| {
            datums
                .iter()
                .rev()
                .find(|d| d.name == name)
                .unwrap_or(first)
                .height
        };
        Ok(SpringTideOffsets {
            datum_offset_mhws: height_of("MHWS"),
            datum_offset_mlws: height_of("MLWS"),
        })
    }
}
