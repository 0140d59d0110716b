//! # Terminal Rendering
//!
//! Human-readable output for the command line: a short summary of the tide
//! state and an ASCII chart of the height curve around the query time.

use crate::decoder::HeightRange;
use crate::fallback::CurrentOrPrevious;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Chart height in text rows
const ROWS: usize = 16;
/// Space for Y-axis labels
const Y_AXIS_WIDTH: usize = 6;
/// Samples are 15 minutes apart, so one marker every 4 columns is an hour
const COLUMNS_PER_HOUR: usize = 4;
/// Spacing of the requested height samples (`step=900`)
const SAMPLE_INTERVAL_SECS: i64 = 15 * 60;

/// Format an epoch time as "HH:MM" in the given timezone.
fn clock_time<Tz: TimeZone>(epoch: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: Display,
{
    DateTime::from_timestamp(epoch, 0).map(|t| t.with_timezone(tz).format("%H:%M").to_string())
}

/// "High tide at 14:05" for the next extremum after `at`, if one is known.
pub fn next_tide_state<Tz: TimeZone>(info: &CurrentOrPrevious, at: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: Display,
{
    let next = info.next_tide(at).ok()?;
    let time = clock_time(next.tide_time, tz)?;
    Some(format!("{} tide at {}", next.tide_type, time))
}

/// Summary lines: current height, next tide, datum and station.
pub fn summary<Tz: TimeZone>(info: &CurrentOrPrevious, at: i64, tz: &Tz) -> Vec<String>
where
    Tz::Offset: Display,
{
    let mut lines = Vec::new();

    match info.current_height(at) {
        Ok(h) => lines.push(format!("current height : {:.2}", h.current_height)),
        Err(e) => lines.push(format!("current height : unavailable ({e})")),
    }
    match next_tide_state(info, at, tz) {
        Some(state) => lines.push(format!("next tide      : {state}")),
        None => lines.push("next tide      : unavailable".to_string()),
    }
    if let Ok(pair) = info.next_high_low(at) {
        lines.push(format!(
            "high / low     : {:.2} / {:.2}",
            pair.high_tide_height, pair.low_tide_height
        ));
    }
    if let Ok(datum) = info.vertical_ref() {
        lines.push(format!("vertical ref   : {datum}"));
    }
    if let Ok(station) = info.used_station() {
        lines.push(format!("station        : {}", station.tide_station_used_name));
    }
    lines
}

/// Render the height samples as chart rows, marking the sample in effect at `at` with X.
pub fn render_ascii(range: &HeightRange, at: i64) -> Vec<String> {
    let sample_count = range.height_value.len();
    if sample_count == 0 {
        return vec!["no height data".to_string()];
    }

    let (min_height, max_height) = range
        .height_value
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &h| {
            (min.min(h), max.max(h))
        });
    let span = (max_height - min_height).max(f64::EPSILON);

    let height_to_row = |h: f64| {
        let normalized = (h - min_height) / span;
        ((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize
    };

    let mut grid = vec![vec![' '; sample_count + Y_AXIS_WIDTH]; ROWS];

    // Labels on the top and bottom rows only; the curve fills the rest
    for (row, value) in [(0, max_height), (ROWS - 1, min_height)] {
        let label = format!("{:<width$.1}", value, width = Y_AXIS_WIDTH - 1);
        for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
            grid[row][i] = ch;
        }
    }
    for row in grid.iter_mut() {
        row[Y_AXIS_WIDTH - 1] = '│';
    }

    let now_index = range.height_epoch.iter().rposition(|&dt| dt < at);
    for (column, &h) in range.height_value.iter().enumerate() {
        let marker = if Some(column) == now_index { 'X' } else { '•' };
        grid[height_to_row(h)][column + Y_AXIS_WIDTH] = marker;
    }

    let mut lines: Vec<String> = grid.into_iter().map(|row| row.into_iter().collect()).collect();

    // Hour markers below the chart
    let padding = " ".repeat(Y_AXIS_WIDTH);
    let markers: String = (0..sample_count)
        .map(|i| if i % COLUMNS_PER_HOUR == 0 { '|' } else { ' ' })
        .collect();
    lines.push(format!("{padding}{markers}"));
    lines
}

/// Exclusive bounds of the charted samples for `hours` hours after `at`.
///
/// Reaches one sample interval (plus a second) back so the sample in effect at
/// `at` is kept even when `at` sits exactly on a sample time.
fn chart_window(at: i64, hours: i64) -> (i64, i64) {
    let min = at.saturating_sub(SAMPLE_INTERVAL_SECS + 1);
    let max = at.saturating_add(hours.saturating_mul(3600));
    (min, max)
}

/// Print the summary and the chart for the next `hours` hours to stdout.
pub fn draw_ascii<Tz: TimeZone>(info: &CurrentOrPrevious, at: i64, hours: i64, tz: &Tz)
where
    Tz::Offset: Display,
{
    for line in summary(info, at, tz) {
        println!("{line}");
    }
    println!();

    let (min, max) = chart_window(at, hours);
    match info.heights_in_range(min, max) {
        Ok(range) => {
            for line in render_ascii(&range, at) {
                println!("{line}");
            }
        }
        Err(e) => println!("no height curve: {e}"),
    }
}
