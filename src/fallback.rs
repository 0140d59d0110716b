//! # Fallback To The Previous Dataset
//!
//! A refresh can fail, or succeed with a response that lacks a field the last
//! one had. [`CurrentOrPrevious`] keeps the last two datasets and answers every
//! query from the current one, falling back to the previous one when the
//! current answer is an error.
//!
//! The previous answer is returned as-is, error included. Results are never
//! merged across the two datasets.

use crate::datums::SpringTideOffsets;
use crate::decoder::{
    CurrentHeight, ExtremaRange, HeightRange, HighLowTide, LookupError, StationsAround, TideEvent,
    TideInfo, UsedStation,
};
use crate::{Datum, Station, TideDataset};
use tracing::debug;

/// Query surface over the current and the previous dataset.
#[derive(Clone, Copy, Debug)]
pub struct CurrentOrPrevious<'a> {
    current: TideInfo<'a>,
    previous: TideInfo<'a>,
}

impl<'a> CurrentOrPrevious<'a> {
    pub fn new(current: Option<&'a TideDataset>, previous: Option<&'a TideDataset>) -> Self {
        CurrentOrPrevious {
            current: TideInfo::new(current),
            previous: TideInfo::new(previous),
        }
    }

    fn or_previous<T>(
        &self,
        query: &str,
        ask: impl Fn(&TideInfo<'a>) -> Result<T, LookupError>,
    ) -> Result<T, LookupError> {
        ask(&self.current).or_else(|error| {
            debug!(query, %error, "current dataset cannot answer, using previous");
            ask(&self.previous)
        })
    }

    pub fn tide_at(&self, at: i64, want_next: bool) -> Result<TideEvent, LookupError> {
        self.or_previous("tide_at", |info| info.tide_at(at, want_next))
    }

    pub fn next_tide(&self, at: i64) -> Result<TideEvent, LookupError> {
        self.tide_at(at, true)
    }

    pub fn previous_tide(&self, at: i64) -> Result<TideEvent, LookupError> {
        self.tide_at(at, false)
    }

    pub fn high_low_at(&self, at: i64, want_next: bool) -> Result<HighLowTide, LookupError> {
        self.or_previous("high_low_at", |info| info.high_low_at(at, want_next))
    }

    pub fn next_high_low(&self, at: i64) -> Result<HighLowTide, LookupError> {
        self.high_low_at(at, true)
    }

    pub fn current_high_low(&self, at: i64) -> Result<HighLowTide, LookupError> {
        self.high_low_at(at, false)
    }

    pub fn current_height(&self, at: i64) -> Result<CurrentHeight, LookupError> {
        self.or_previous("current_height", |info| info.current_height(at))
    }

    pub fn extrema_in_range(&self, min: i64, max: i64) -> Result<ExtremaRange, LookupError> {
        self.or_previous("extrema_in_range", |info| info.extrema_in_range(min, max))
    }

    pub fn heights_in_range(&self, min: i64, max: i64) -> Result<HeightRange, LookupError> {
        self.or_previous("heights_in_range", |info| info.heights_in_range(min, max))
    }

    pub fn vertical_ref(&self) -> Result<&'a str, LookupError> {
        self.or_previous("vertical_ref", TideInfo::vertical_ref)
    }

    pub fn tidal_station_used(&self) -> Result<&'a str, LookupError> {
        self.or_previous("tidal_station_used", TideInfo::tidal_station_used)
    }

    pub fn station_list(&self) -> Result<&'a [Station], LookupError> {
        self.or_previous("station_list", TideInfo::station_list)
    }

    pub fn used_station(&self) -> Result<UsedStation, LookupError> {
        self.or_previous("used_station", TideInfo::used_station)
    }

    pub fn used_station_by_name(&self, name: &str) -> Result<UsedStation, LookupError> {
        self.or_previous("used_station_by_name", |info| info.used_station_by_name(name))
    }

    pub fn stations_around(&self) -> Result<StationsAround, LookupError> {
        self.or_previous("stations_around", TideInfo::stations_around)
    }

    pub fn nearest_station_time_zone(&self) -> Result<&'a str, LookupError> {
        self.or_previous("nearest_station_time_zone", TideInfo::nearest_station_time_zone)
    }

    pub fn datums(&self) -> Result<&'a [Datum], LookupError> {
        self.or_previous("datums", TideInfo::datums)
    }

    pub fn spring_tide_offsets(&self) -> Result<SpringTideOffsets, LookupError> {
        self.or_previous("spring_tide_offsets", TideInfo::spring_tide_offsets)
    }

    pub fn plot_image(&self) -> Result<&'a str, LookupError> {
        self.or_previous("plot_image", TideInfo::plot_image)
    }

    pub fn plot_png(&self) -> Result<Vec<u8>, LookupError> {
        self.or_previous("plot_png", TideInfo::plot_png)
    }
}
