//! # Tide Dataset Decoder
//!
//! Point-in-time queries against one fetched [`TideDataset`]: the next or
//! previous extremum, a high/low pair, the last known height, range queries
//! and projections of station, datum and plot fields.
//!
//! ## Lookup Rules
//!
//! Every time-based query starts from the latest record strictly before the
//! query time. When no record precedes it, the scan settles on index 0 rather
//! than reporting absence; the next/previous checks that follow then decide
//! whether index 0 is an acceptable answer. For the height curve that means a
//! query before the first sample returns the first sample.
//!
//! Heights are a step function: the answer is the last sample before the query
//! time, not an interpolation between neighbours.
//!
//! All failures come back as [`LookupError`] values so callers (and
//! [`crate::fallback::CurrentOrPrevious`]) can branch on them.

use crate::datums::SpringTideOffsets;
use crate::{Datum, Extreme, Station, TideDataset, TideType};
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

/// Header the API puts in front of the base64 plot
pub const PLOT_HEADER: &str = "data:image/png;base64,";

/// Why a query could not be answered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// No dataset was ever fetched successfully
    #[error("no data")]
    NoData,

    /// Query time is past the end of the fetched window
    #[error("no date in future")]
    NoFutureData,

    /// Query time is before the start of the fetched window
    #[error("no date in past")]
    NoPastData,

    /// The response does not contain the named field
    #[error("missing field: {0}")]
    Missing(&'static str),

    /// No station with that name in the station list
    #[error("station not found: {0}")]
    StationNotFound(String),

    /// Plot field is not valid base64
    #[error("plot is not valid base64: {0}")]
    PlotEncoding(#[from] base64::DecodeError),
}

/// A single extremum located relative to a query time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TideEvent {
    pub tide_type: TideType,
    /// Epoch seconds
    pub tide_time: i64,
}

/// A high tide and a low tide taken from adjacent extrema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HighLowTide {
    pub high_tide_time_utc: String,
    pub high_tide_time_epoch: i64,
    pub high_tide_height: f64,
    pub low_tide_time_utc: String,
    pub low_tide_time_epoch: i64,
    pub low_tide_height: f64,
}

/// Last known sample of the height curve.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentHeight {
    pub current_height: f64,
    pub current_height_utc: String,
    pub current_height_epoch: i64,
}

/// Extrema inside a time window, as parallel sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExtremaRange {
    pub extrema_value: Vec<f64>,
    pub extrema_epoch: Vec<i64>,
    pub extrema_type: Vec<String>,
}

/// Height samples inside a time window, as parallel sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HeightRange {
    pub height_value: Vec<f64>,
    pub height_epoch: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsedStation {
    pub tide_station_used_name: String,
    pub tide_station_lat: f64,
    pub tide_station_long: f64,
    /// Only filled in by a lookup by name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tide_station_timezone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationsAround {
    pub station_around_nb: usize,
    /// Every name prefixed with "; ", or "None" when the list is empty
    pub station_around_name: String,
}

/// Index of the latest item with a timestamp strictly before `at`, 0 if none.
fn last_index_before<T>(items: &[T], at: i64, dt: impl Fn(&T) -> i64) -> usize {
    items.iter().rposition(|item| dt(item) < at).unwrap_or(0)
}

/// Locate the extremum answering a next (`want_next`) or previous query.
fn locate_extreme(extremes: &[Extreme], at: i64, want_next: bool) -> Result<usize, LookupError> {
    // Past the last extremum the window cannot tell what came in between.
    match extremes.last() {
        Some(last) if last.dt >= at => {}
        _ => return Err(LookupError::NoFutureData),
    }

    let mut index = last_index_before(extremes, at, |e| e.dt);
    if want_next && extremes[index].dt < at {
        index += 1;
    }
    if index >= extremes.len() {
        return Err(LookupError::NoFutureData);
    }
    Ok(index)
}

/// A previous query must not land on an extremum after `at`.
fn ensure_not_after(found: &Extreme, at: i64, want_next: bool) -> Result<(), LookupError> {
    if !want_next && found.dt > at {
        return Err(LookupError::NoPastData);
    }
    Ok(())
}

/// Query surface over one (possibly absent) dataset.
///
/// Cheap to copy; it only borrows the dataset.
#[derive(Clone, Copy, Debug)]
pub struct TideInfo<'a> {
    data: Option<&'a TideDataset>,
}

impl<'a> TideInfo<'a> {
    pub fn new(data: Option<&'a TideDataset>) -> Self {
        TideInfo { data }
    }

    fn data(&self) -> Result<&'a TideDataset, LookupError> {
        self.data.ok_or(LookupError::NoData)
    }

    fn extremes(&self) -> Result<&'a [Extreme], LookupError> {
        self.data()?
            .extremes
            .as_deref()
            .ok_or(LookupError::Missing("extremes"))
    }

    /// Extremum following (`want_next`) or preceding `at`.
    pub fn tide_at(&self, at: i64, want_next: bool) -> Result<TideEvent, LookupError> {
        let extremes = self.extremes()?;
        let found = &extremes[locate_extreme(extremes, at, want_next)?];
        ensure_not_after(found, at, want_next)?;
        Ok(TideEvent {
            tide_type: found.tide_type(),
            tide_time: found.dt,
        })
    }

    pub fn next_tide(&self, at: i64) -> Result<TideEvent, LookupError> {
        self.tide_at(at, true)
    }

    pub fn previous_tide(&self, at: i64) -> Result<TideEvent, LookupError> {
        self.tide_at(at, false)
    }

    /// The located extremum paired with the one after it.
    ///
    /// Adjacent records are assumed to alternate; this is not checked. An
    /// entry that is neither High nor Low is treated as a Low.
    pub fn high_low_at(&self, at: i64, want_next: bool) -> Result<HighLowTide, LookupError> {
        let extremes = self.extremes()?;
        let index = locate_extreme(extremes, at, want_next)?;
        // The pair needs a following entry; that is checked before the past check.
        let following = extremes.get(index + 1).ok_or(LookupError::NoFutureData)?;
        let located = &extremes[index];
        ensure_not_after(located, at, want_next)?;

        let (high, low) = match located.tide_type() {
            TideType::High => (located, following),
            TideType::Low | TideType::None => (following, located),
        };
        Ok(HighLowTide {
            high_tide_time_utc: high.date.clone(),
            high_tide_time_epoch: high.dt,
            high_tide_height: high.height,
            low_tide_time_utc: low.date.clone(),
            low_tide_time_epoch: low.dt,
            low_tide_height: low.height,
        })
    }

    pub fn next_high_low(&self, at: i64) -> Result<HighLowTide, LookupError> {
        self.high_low_at(at, true)
    }

    pub fn current_high_low(&self, at: i64) -> Result<HighLowTide, LookupError> {
        self.high_low_at(at, false)
    }

    /// Last height sample strictly before `at` (first sample if none precedes).
    ///
    /// A `heights` list that is present but empty has no sample to return and
    /// is reported like an absent one, as `Missing("heights")`.
    pub fn current_height(&self, at: i64) -> Result<CurrentHeight, LookupError> {
        let heights = self
            .data()?
            .heights
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or(LookupError::Missing("heights"))?;
        let sample = &heights[last_index_before(heights, at, |h| h.dt)];
        Ok(CurrentHeight {
            current_height: sample.height,
            current_height_utc: sample.date.clone(),
            current_height_epoch: sample.dt,
        })
    }

    /// Extrema with `min < dt < max`.
    pub fn extrema_in_range(&self, min: i64, max: i64) -> Result<ExtremaRange, LookupError> {
        let mut range = ExtremaRange::default();
        for e in self.extremes()?.iter().filter(|e| e.dt > min && e.dt < max) {
            range.extrema_value.push(e.height);
            range.extrema_epoch.push(e.dt);
            range.extrema_type.push(e.kind.clone());
        }
        Ok(range)
    }

    /// Height samples with `min < dt < max`.
    pub fn heights_in_range(&self, min: i64, max: i64) -> Result<HeightRange, LookupError> {
        let heights = self
            .data()?
            .heights
            .as_deref()
            .ok_or(LookupError::Missing("heights"))?;
        let (height_value, height_epoch) = heights
            .iter()
            .filter(|h| h.dt > min && h.dt < max)
            .map(|h| (h.height, h.dt))
            .unzip();
        Ok(HeightRange {
            height_value,
            height_epoch,
        })
    }

    /// Datum the heights are expressed against (e.g. "LAT").
    pub fn vertical_ref(&self) -> Result<&'a str, LookupError> {
        self.data()?
            .response_datum
            .as_deref()
            .ok_or(LookupError::Missing("responseDatum"))
    }

    /// Name of the station the predictions were computed for.
    pub fn tidal_station_used(&self) -> Result<&'a str, LookupError> {
        self.data()?
            .station
            .as_deref()
            .ok_or(LookupError::Missing("station"))
    }

    pub fn station_list(&self) -> Result<&'a [Station], LookupError> {
        self.data()?
            .stations
            .as_deref()
            .ok_or(LookupError::Missing("stations"))
    }

    fn nearest_station(&self) -> Result<&'a Station, LookupError> {
        self.station_list()?
            .first()
            .ok_or(LookupError::Missing("stations"))
    }

    /// The nearest station, which is the first one listed.
    pub fn used_station(&self) -> Result<UsedStation, LookupError> {
        let station = self.nearest_station()?;
        Ok(UsedStation {
            tide_station_used_name: station.name.clone(),
            tide_station_lat: station.lat,
            tide_station_long: station.lon,
            tide_station_timezone: None,
        })
    }

    /// Station with the given name; the last one wins on duplicates.
    pub fn used_station_by_name(&self, name: &str) -> Result<UsedStation, LookupError> {
        let station = self
            .station_list()?
            .iter()
            .rev()
            .find(|s| s.name == name)
            .ok_or_else(|| LookupError::StationNotFound(name.to_string()))?;
        Ok(UsedStation {
            tide_station_used_name: station.name.clone(),
            tide_station_lat: station.lat,
            tide_station_long: station.lon,
            tide_station_timezone: Some(station.timezone.clone()),
        })
    }

    pub fn stations_around(&self) -> Result<StationsAround, LookupError> {
        let stations = self.station_list()?;
        let station_around_name = if stations.is_empty() {
            "None".to_string()
        } else {
            stations.iter().map(|s| format!("; {}", s.name)).collect()
        };
        Ok(StationsAround {
            station_around_nb: stations.len(),
            station_around_name,
        })
    }

    pub fn nearest_station_time_zone(&self) -> Result<&'a str, LookupError> {
        Ok(&self.nearest_station()?.timezone)
    }

    pub fn datums(&self) -> Result<&'a [Datum], LookupError> {
        self.data()?
            .datums
            .as_deref()
            .ok_or(LookupError::Missing("datums"))
    }

    /// MHWS/MLWS offsets from the datum table of this dataset.
    pub fn spring_tide_offsets(&self) -> Result<SpringTideOffsets, LookupError> {
        SpringTideOffsets::from_datums(Some(self.datums()?))
    }

    /// Base64 plot without its `data:image/png;base64,` header.
    pub fn plot_image(&self) -> Result<&'a str, LookupError> {
        let plot = self
            .data()?
            .plot
            .as_deref()
            .ok_or(LookupError::Missing("plot"))?;
        Ok(plot.strip_prefix(PLOT_HEADER).unwrap_or(plot))
    }

    /// Plot decoded to PNG bytes.
    pub fn plot_png(&self) -> Result<Vec<u8>, LookupError> {
        Ok(base64::engine::general_purpose::STANDARD.decode(self.plot_image()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeightSample;

    fn extreme(dt: i64, kind: &str, height: f64) -> Extreme {
        Extreme {
            dt,
            date: format!("date-{dt}"),
            height,
            kind: kind.to_string(),
        }
    }

    fn station(name: &str, lat: f64, timezone: &str) -> Station {
        Station {
            id: None,
            name: name.to_string(),
            lat,
            lon: -4.5,
            timezone: timezone.to_string(),
        }
    }

    fn dataset() -> TideDataset {
        TideDataset {
            extremes: Some(vec![
                extreme(100, "High", 2.1),
                extreme(400, "Low", 0.3),
                extreme(700, "High", 2.4),
                extreme(1000, "Low", 0.2),
            ]),
            heights: Some(
                (0..=10)
                    .map(|i| HeightSample {
                        dt: i * 100,
                        date: format!("h-{i}"),
                        height: i as f64 * 0.1,
                    })
                    .collect(),
            ),
            stations: Some(vec![
                station("Brest", 48.38, "Europe/Paris"),
                station("Le Conquet", 48.36, "Europe/Paris"),
                station("Brest", 48.40, "UTC"),
            ]),
            datums: Some(vec![
                Datum {
                    name: "LAT".to_string(),
                    height: 0.0,
                },
                Datum {
                    name: "MHWS".to_string(),
                    height: 7.2,
                },
                Datum {
                    name: "MLWS".to_string(),
                    height: 1.1,
                },
            ]),
            response_datum: Some("LAT".to_string()),
            station: Some("Brest".to_string()),
            plot: Some(format!("{PLOT_HEADER}iVBORw0KGgo=")),
            call_count: 1,
        }
    }

    #[test]
    fn test_tide_between_extrema() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        assert_eq!(
            info.next_tide(200).unwrap(),
            TideEvent {
                tide_type: TideType::Low,
                tide_time: 400
            }
        );
        assert_eq!(
            info.previous_tide(200).unwrap(),
            TideEvent {
                tide_type: TideType::High,
                tide_time: 100
            }
        );
    }

    #[test]
    fn test_tide_exactly_on_extremum() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        // An extremum at the query time is not "before" it
        assert_eq!(info.next_tide(400).unwrap().tide_time, 400);
        assert_eq!(info.previous_tide(400).unwrap().tide_time, 100);
    }

    #[test]
    fn test_tide_before_first_extremum() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.previous_tide(50), Err(LookupError::NoPastData));
        assert_eq!(info.next_tide(50).unwrap().tide_time, 100);
    }

    #[test]
    fn test_tide_after_last_extremum() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.next_tide(1001), Err(LookupError::NoFutureData));
        assert_eq!(info.previous_tide(1001), Err(LookupError::NoFutureData));
    }

    #[test]
    fn test_unknown_type_maps_to_none() {
        let data = TideDataset {
            extremes: Some(vec![extreme(100, "Slack", 1.0), extreme(200, "Low", 0.1)]),
            ..Default::default()
        };
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.next_tide(50).unwrap().tide_type, TideType::None);
    }

    #[test]
    fn test_unknown_type_pairs_as_low() {
        let data = TideDataset {
            extremes: Some(vec![extreme(100, "Slack", 1.0), extreme(400, "High", 2.0)]),
            ..Default::default()
        };
        let pair = TideInfo::new(Some(&data)).next_high_low(50).unwrap();
        assert_eq!(pair.high_tide_time_epoch, 400);
        assert_eq!(pair.low_tide_time_epoch, 100);
    }

    #[test]
    fn test_high_low_following_checked_before_past() {
        let data = TideDataset {
            extremes: Some(vec![extreme(100, "High", 2.0)]),
            ..Default::default()
        };
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.current_high_low(50), Err(LookupError::NoFutureData));
        // The single extremum still answers a plain previous query with NoPastData
        assert_eq!(info.previous_tide(50), Err(LookupError::NoPastData));
    }

    #[test]
    fn test_missing_or_empty_extremes() {
        let info = TideInfo::new(None);
        assert_eq!(info.next_tide(0), Err(LookupError::NoData));

        let data = TideDataset::default();
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.next_tide(0), Err(LookupError::Missing("extremes")));

        let data = TideDataset {
            extremes: Some(vec![]),
            ..Default::default()
        };
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.next_tide(0), Err(LookupError::NoFutureData));
    }

    #[test]
    fn test_next_high_low_from_low() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let pair = info.next_high_low(200).unwrap();
        assert_eq!(pair.low_tide_time_epoch, 400);
        assert_eq!(pair.low_tide_time_utc, "date-400");
        assert_eq!(pair.low_tide_height, 0.3);
        assert_eq!(pair.high_tide_time_epoch, 700);
        assert_eq!(pair.high_tide_height, 2.4);
    }

    #[test]
    fn test_current_high_low_from_high() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let pair = info.current_high_low(200).unwrap();
        assert_eq!(pair.high_tide_time_epoch, 100);
        assert_eq!(pair.low_tide_time_epoch, 400);
    }

    #[test]
    fn test_high_low_needs_following_entry() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.next_high_low(800), Err(LookupError::NoFutureData));
        assert_eq!(info.current_high_low(50), Err(LookupError::NoPastData));
    }

    #[test]
    fn test_current_height_is_step_function() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let height = info.current_height(450).unwrap();
        assert_eq!(height.current_height_epoch, 400);
        assert_eq!(height.current_height_utc, "h-4");
        assert!((height.current_height - 0.4).abs() < 1e-9);

        // Exactly on a sample: the previous one is still the answer
        assert_eq!(info.current_height(500).unwrap().current_height_epoch, 400);
    }

    #[test]
    fn test_current_height_edges() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        // Nothing before: settles on the first sample
        assert_eq!(info.current_height(-10).unwrap().current_height_epoch, 0);
        // Past the end: last sample
        assert_eq!(info.current_height(5000).unwrap().current_height_epoch, 1000);

        assert_eq!(TideInfo::new(None).current_height(0), Err(LookupError::NoData));
        let empty = TideDataset::default();
        assert_eq!(
            TideInfo::new(Some(&empty)).current_height(0),
            Err(LookupError::Missing("heights"))
        );
        let no_samples = TideDataset {
            heights: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(
            TideInfo::new(Some(&no_samples)).current_height(0),
            Err(LookupError::Missing("heights"))
        );
    }

    #[test]
    fn test_extrema_in_range_is_exclusive() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let range = info.extrema_in_range(100, 1000).unwrap();
        assert_eq!(range.extrema_epoch, vec![400, 700]);
        assert_eq!(range.extrema_value, vec![0.3, 2.4]);
        assert_eq!(range.extrema_type, vec!["Low", "High"]);

        assert_eq!(info.extrema_in_range(500, 500).unwrap(), ExtremaRange::default());
    }

    #[test]
    fn test_heights_in_range() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let range = info.heights_in_range(250, 600).unwrap();
        assert_eq!(range.height_epoch, vec![300, 400, 500]);
        assert_eq!(range.height_value.len(), 3);
        assert!(info.heights_in_range(2000, 3000).unwrap().height_epoch.is_empty());
        assert_eq!(TideInfo::new(None).heights_in_range(0, 1), Err(LookupError::NoData));
    }

    #[test]
    fn test_reference_fields() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.vertical_ref(), Ok("LAT"));
        assert_eq!(info.tidal_station_used(), Ok("Brest"));
        assert_eq!(info.datums().unwrap().len(), 3);

        let empty = TideDataset::default();
        let info = TideInfo::new(Some(&empty));
        assert_eq!(info.vertical_ref(), Err(LookupError::Missing("responseDatum")));
        assert_eq!(info.tidal_station_used(), Err(LookupError::Missing("station")));
        assert_eq!(info.datums().err(), Some(LookupError::Missing("datums")));
        assert_eq!(info.plot_image(), Err(LookupError::Missing("plot")));
    }

    #[test]
    fn test_used_station() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let used = info.used_station().unwrap();
        assert_eq!(used.tide_station_used_name, "Brest");
        assert_eq!(used.tide_station_lat, 48.38);
        assert_eq!(used.tide_station_timezone, None);
        assert_eq!(info.nearest_station_time_zone(), Ok("Europe/Paris"));
    }

    #[test]
    fn test_station_by_name_last_match_wins() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let found = info.used_station_by_name("Brest").unwrap();
        assert_eq!(found.tide_station_lat, 48.40);
        assert_eq!(found.tide_station_timezone.as_deref(), Some("UTC"));
        assert_eq!(
            info.used_station_by_name("Roscoff"),
            Err(LookupError::StationNotFound("Roscoff".to_string()))
        );
    }

    #[test]
    fn test_stations_around() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        let around = info.stations_around().unwrap();
        assert_eq!(around.station_around_nb, 3);
        assert_eq!(around.station_around_name, "; Brest; Le Conquet; Brest");

        let none = TideDataset {
            stations: Some(vec![]),
            ..Default::default()
        };
        let info = TideInfo::new(Some(&none));
        let around = info.stations_around().unwrap();
        assert_eq!(around.station_around_nb, 0);
        assert_eq!(around.station_around_name, "None");
        assert_eq!(info.used_station(), Err(LookupError::Missing("stations")));
        assert_eq!(info.nearest_station_time_zone(), Err(LookupError::Missing("stations")));
    }

    #[test]
    fn test_plot_image_and_png() {
        let data = dataset();
        let info = TideInfo::new(Some(&data));
        assert_eq!(info.plot_image(), Ok("iVBORw0KGgo="));
        let png = info.plot_png().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn test_plot_not_base64() {
        let data = TideDataset {
            plot: Some(format!("{PLOT_HEADER}not base64!")),
            ..Default::default()
        };
        let info = TideInfo::new(Some(&data));
        assert!(matches!(info.plot_png(), Err(LookupError::PlotEncoding(_))));
    }

    #[test]
    fn test_spring_tide_offsets_from_dataset() {
        let data = dataset();
        let offsets = TideInfo::new(Some(&data)).spring_tide_offsets().unwrap();
        assert_eq!(offsets.datum_offset_mhws, 7.2);
        assert_eq!(offsets.datum_offset_mlws, 1.1);
    }
}
