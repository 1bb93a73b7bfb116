//! Weekly congestion chart. Only daytime hours are drawn; the backend reports
//! all 24.

use serde::Serialize;
use washcall_core::{CongestionTable, Weekday};

use crate::Locale;
use crate::card::{BAR_WIDTH, progress_bar};

/// First and last hour shown, inclusive.
pub const FIRST_HOUR: usize = 9;
pub const LAST_HOUR: usize = 21;

pub fn day_label(day: Weekday, locale: Locale) -> &'static str {
    match (locale, day) {
        (Locale::En, Weekday::Mon) => "Mon",
        (Locale::En, Weekday::Tue) => "Tue",
        (Locale::En, Weekday::Wed) => "Wed",
        (Locale::En, Weekday::Thu) => "Thu",
        (Locale::En, Weekday::Fri) => "Fri",
        (Locale::En, Weekday::Sat) => "Sat",
        (Locale::En, Weekday::Sun) => "Sun",
        (Locale::Ko, Weekday::Mon) => "월요일",
        (Locale::Ko, Weekday::Tue) => "화요일",
        (Locale::Ko, Weekday::Wed) => "수요일",
        (Locale::Ko, Weekday::Thu) => "목요일",
        (Locale::Ko, Weekday::Fri) => "금요일",
        (Locale::Ko, Weekday::Sat) => "토요일",
        (Locale::Ko, Weekday::Sun) => "일요일",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBar {
    pub hour: usize,
    pub value: f64,
    pub percent: u8,
}

/// One day of the chart, scaled against the busiest hour of the week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayChart {
    pub day: Weekday,
    pub label: &'static str,
    pub hours: Vec<HourBar>,
}

impl DayChart {
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.hours.len() + 1);
        lines.push(format!("{}:", self.label));
        for bar in &self.hours {
            lines.push(format!(
                "  {:02}:00 {} {:.1}",
                bar.hour,
                progress_bar(bar.percent, BAR_WIDTH),
                bar.value
            ));
        }
        lines
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(value: f64, peak: f64) -> u8 {
    if peak <= 0.0 {
        return 0;
    }
    ((value / peak) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Chart for every day in `table`, or just `only` when given.
pub fn congestion_chart(table: &CongestionTable, only: Option<Weekday>, locale: Locale) -> Vec<DayChart> {
    let peak = table.peak();
    table
        .days()
        .filter(|(day, _)| only.is_none_or(|o| o == *day))
        .map(|(day, hours)| DayChart {
            day,
            label: day_label(day, locale),
            hours: hours
                .iter()
                .enumerate()
                .take(LAST_HOUR + 1)
                .skip(FIRST_HOUR)
                .map(|(hour, &value)| HourBar {
                    hour,
                    value,
                    percent: percent(value, peak),
                })
                .collect(),
        })
        .collect()
}
