use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::dates;

/// Controls what scale the timeline displays. Only affects the time axis,
/// never bar or edge computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineScale {
    Day,
    #[default]
    Week,
    Month,
}

impl TimelineScale {
    pub fn all() -> &'static [TimelineScale] {
        &[TimelineScale::Day, TimelineScale::Week, TimelineScale::Month]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimelineScale::Day => "Day",
            TimelineScale::Week => "Week",
            TimelineScale::Month => "Month",
        }
    }

    /// Header rows, coarse first.
    pub fn tiers(&self) -> [ScaleTier; 2] {
        match self {
            TimelineScale::Day => [
                ScaleTier::new(ScaleUnit::Month, "%B %Y"),
                ScaleTier::new(ScaleUnit::Day, "%d"),
            ],
            TimelineScale::Week => [
                ScaleTier::new(ScaleUnit::Month, "%B %Y"),
                ScaleTier::new(ScaleUnit::Week, "W%V"),
            ],
            TimelineScale::Month => [
                ScaleTier::new(ScaleUnit::Year, "%Y"),
                ScaleTier::new(ScaleUnit::Month, "%B"),
            ],
        }
    }

    pub fn default_pixels_per_day(&self) -> f32 {
        match self {
            TimelineScale::Day => 36.0,
            TimelineScale::Week => 18.0,
            TimelineScale::Month => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleUnit {
    Day,
    Week,
    Month,
    Year,
}

/// One header row of the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleTier {
    pub unit: ScaleUnit,
    pub step: u32,
    pub format: &'static str,
}

impl ScaleTier {
    const fn new(unit: ScaleUnit, format: &'static str) -> Self {
        Self {
            unit,
            step: 1,
            format,
        }
    }

    /// First boundary of this unit at or before `date`.
    pub fn floor(&self, date: NaiveDate) -> NaiveDate {
        match self.unit {
            ScaleUnit::Day => date,
            ScaleUnit::Week => {
                dates::add_days(date, -i64::from(date.weekday().num_days_from_monday()))
            }
            ScaleUnit::Month => date.with_day(1).unwrap_or(date),
            ScaleUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Boundary following `date`, which must itself be a boundary.
    pub fn next(&self, date: NaiveDate) -> NaiveDate {
        match self.unit {
            ScaleUnit::Day => dates::add_days(date, i64::from(self.step)),
            ScaleUnit::Week => dates::add_days(date, 7 * i64::from(self.step)),
            ScaleUnit::Month => {
                let months = date.month0() + self.step;
                let year = date.year() + (months / 12) as i32;
                NaiveDate::from_ymd_opt(year, months % 12 + 1, 1)
                    .unwrap_or_else(|| dates::add_days(date, 30))
            }
            ScaleUnit::Year => NaiveDate::from_ymd_opt(date.year() + self.step as i32, 1, 1)
                .unwrap_or_else(|| dates::add_days(date, 365)),
        }
    }

    pub fn format(&self, date: NaiveDate) -> String {
        date.format(self.format).to_string()
    }
}

/// Earliest start and latest due of the plotted bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

/// Human label for the plotted range, phrased for the active scale.
pub fn range_label(scale: TimelineScale, bounds: Option<TimelineBounds>) -> String {
    let Some(TimelineBounds { min, max }) = bounds else {
        return "No dated tasks yet".to_string();
    };
    let full = |d: NaiveDate| d.format("%b %-d, %Y").to_string();
    match scale {
        TimelineScale::Day => {
            if min == max {
                full(min)
            } else {
                format!("{} – {}", full(min), full(max))
            }
        }
        TimelineScale::Week => {
            if min == max {
                format!("Week of {}", full(min))
            } else if min.year() == max.year() {
                format!(
                    "{} – {}, {}",
                    min.format("%b %-d"),
                    max.format("%b %-d"),
                    min.year()
                )
            } else {
                format!("{} – {}", min.format("%b %-d"), full(max))
            }
        }
        TimelineScale::Month => {
            let month = |d: NaiveDate| d.format("%B %Y").to_string();
            if min.year() == max.year() && min.month() == max.month() {
                month(min)
            } else {
                format!("{} – {}", month(min), month(max))
            }
        }
    }
}

/// Manages the visible viewport of the timeline.
#[derive(Debug, Clone)]
pub struct TimelineViewport {
    /// The leftmost visible date.
    pub start: NaiveDate,
    /// The rightmost visible date.
    pub end: NaiveDate,
    /// Current display scale.
    pub scale: TimelineScale,
    /// Pixels per day (controls zoom level).
    pub pixels_per_day: f32,
}

impl TimelineViewport {
    pub fn new(start: NaiveDate, end: NaiveDate, scale: TimelineScale) -> Self {
        Self {
            start,
            end,
            scale,
            pixels_per_day: scale.default_pixels_per_day(),
        }
    }

    /// A viewport around today, used before any task is loaded.
    pub fn around_today(scale: TimelineScale) -> Self {
        let today = dates::today();
        Self::new(dates::add_days(today, -7), dates::add_days(today, 30), scale)
    }

    pub fn set_scale(&mut self, scale: TimelineScale) {
        self.scale = scale;
        self.pixels_per_day = scale.default_pixels_per_day();
    }

    /// Convert a date to an x-pixel offset from the viewport start.
    pub fn date_to_x(&self, date: NaiveDate) -> f32 {
        let days = (date - self.start).num_days() as f32;
        days * self.pixels_per_day
    }

    /// Convert an x-pixel offset back to a date.
    pub fn x_to_date(&self, x: f32) -> NaiveDate {
        dates::add_days(self.start, self.pixels_to_days(x))
    }

    /// Whole days covered by a horizontal drag.
    pub fn pixels_to_days(&self, delta_x: f32) -> i64 {
        (delta_x / self.pixels_per_day).round() as i64
    }

    /// Total width in pixels for the visible range.
    pub fn total_width(&self) -> f32 {
        self.date_to_x(dates::add_days(self.end, 1))
    }

    /// Zoom in (increase pixels per day).
    pub fn zoom_in(&mut self) {
        self.pixels_per_day = (self.pixels_per_day * 1.2).min(80.0);
    }

    /// Zoom out (decrease pixels per day).
    pub fn zoom_out(&mut self) {
        self.pixels_per_day = (self.pixels_per_day / 1.2).max(2.0);
    }

    /// Frame the plotted tasks with a week of lead-in and a month of tail.
    pub fn fit(&mut self, bounds: Option<TimelineBounds>) {
        if let Some(bounds) = bounds {
            self.start = dates::add_days(bounds.min, -7);
            self.end = dates::add_days(bounds.max, 30);
        }
    }

    /// Shift the window so `date` is in view, keeping its width.
    pub fn show_date(&mut self, date: NaiveDate) {
        if date >= self.start && date <= self.end {
            return;
        }
        let span = (self.end - self.start).num_days();
        self.start = dates::add_days(date, -7);
        self.end = dates::add_days(self.start, span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bounds(min: NaiveDate, max: NaiveDate) -> Option<TimelineBounds> {
        Some(TimelineBounds { min, max })
    }

    #[test]
    fn range_labels() {
        assert_eq!(range_label(TimelineScale::Day, None), "No dated tasks yet");
        assert_eq!(
            range_label(TimelineScale::Day, bounds(d(2024, 3, 1), d(2024, 3, 1))),
            "Mar 1, 2024"
        );
        assert_eq!(
            range_label(TimelineScale::Day, bounds(d(2024, 3, 1), d(2024, 3, 5))),
            "Mar 1, 2024 – Mar 5, 2024"
        );
        assert_eq!(
            range_label(TimelineScale::Week, bounds(d(2024, 3, 1), d(2024, 3, 1))),
            "Week of Mar 1, 2024"
        );
        assert_eq!(
            range_label(TimelineScale::Week, bounds(d(2024, 3, 1), d(2024, 3, 5))),
            "Mar 1 – Mar 5, 2024"
        );
        assert_eq!(
            range_label(TimelineScale::Week, bounds(d(2023, 12, 28), d(2024, 1, 5))),
            "Dec 28 – Jan 5, 2024"
        );
        assert_eq!(
            range_label(TimelineScale::Month, bounds(d(2024, 3, 1), d(2024, 3, 30))),
            "March 2024"
        );
        assert_eq!(
            range_label(TimelineScale::Month, bounds(d(2024, 3, 1), d(2024, 4, 2))),
            "March 2024 – April 2024"
        );
    }

    #[test]
    fn tiers_per_scale() {
        let [top, bottom] = TimelineScale::Week.tiers();
        assert_eq!(top.unit, ScaleUnit::Month);
        assert_eq!(bottom.unit, ScaleUnit::Week);
        assert_eq!(bottom.floor(d(2024, 3, 7)), d(2024, 3, 4));
        assert_eq!(top.next(d(2024, 12, 1)), d(2025, 1, 1));
    }

    #[test]
    fn pixel_mapping_round_trips_whole_days() {
        let vp = TimelineViewport::new(d(2024, 1, 1), d(2024, 2, 1), TimelineScale::Day);
        let x = vp.date_to_x(d(2024, 1, 11));
        assert_eq!(x, 10.0 * vp.pixels_per_day);
        assert_eq!(vp.x_to_date(x), d(2024, 1, 11));
        assert_eq!(vp.pixels_to_days(vp.pixels_per_day * 2.4), 2);
        assert_eq!(vp.pixels_to_days(-vp.pixels_per_day * 0.6), -1);
    }

    #[test]
    fn fit_pads_bounds() {
        let mut vp = TimelineViewport::around_today(TimelineScale::Week);
        vp.fit(bounds(d(2024, 3, 10), d(2024, 3, 20)));
        assert_eq!(vp.start, d(2024, 3, 3));
        assert_eq!(vp.end, d(2024, 4, 19));
    }
}
