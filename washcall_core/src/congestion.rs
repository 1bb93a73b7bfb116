//! Weekly congestion statistics: average machines in use per weekday and hour.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Key the backend uses for this day.
    pub fn as_wire(self) -> &'static str {
        match self {
            Weekday::Mon => "월",
            Weekday::Tue => "화",
            Weekday::Wed => "수",
            Weekday::Thu => "목",
            Weekday::Fri => "금",
            Weekday::Sat => "토",
            Weekday::Sun => "일",
        }
    }

    fn english(self) -> &'static str {
        match self {
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
            Weekday::Sun => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for Weekday {
    type Err = ClientError;

    /// Accepts the backend's Korean keys (`월`, `월요일`) and English names.
    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        let t = t.strip_suffix("요일").unwrap_or(t);
        let lower = t.to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_wire() == t || lower == d.english() || lower == d.english()[..3])
            .ok_or_else(|| ClientError::UnrecognizedEnum {
                field: "weekday",
                value: s.to_string(),
            })
    }
}

/// Hourly averages for the days the backend reported, Monday first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionTable {
    days: Vec<(Weekday, Vec<f64>)>,
}

impl CongestionTable {
    /// Hourly values for `day`, index 0 being midnight.
    pub fn day(&self, day: Weekday) -> Option<&[f64]> {
        self.days
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, hours)| hours.as_slice())
    }

    pub fn days(&self) -> impl Iterator<Item = (Weekday, &[f64])> + '_ {
        self.days.iter().map(|(d, h)| (*d, h.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Highest value across the table; scales bar charts.
    pub fn peak(&self) -> f64 {
        self.days
            .iter()
            .flat_map(|(_, h)| h.iter().copied())
            .fold(0.0, f64::max)
    }
}

fn hours(day: Weekday, raw: &Value) -> Option<Vec<f64>> {
    let items = raw.as_array()?;
    if items.len() != HOURS_PER_DAY {
        tracing::warn!(%day, len = items.len(), "congestion row is not 24 hours long");
        return None;
    }
    items
        .iter()
        .map(|v| v.as_f64().filter(|f| f.is_finite() && *f >= 0.0))
        .collect()
}

/// Decode `{"월": [24 numbers], "화": [...], ...}`. Unknown keys and malformed
/// rows are skipped; a body that is not an object is an error.
pub fn decode_congestion(body: &str) -> Result<CongestionTable> {
    let value: Value = serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(ClientError::Decode(
            "congestion response is not an object".to_string(),
        ));
    };
    let mut days = Vec::with_capacity(obj.len());
    for (key, raw) in &obj {
        let Ok(day) = key.parse::<Weekday>() else {
            tracing::warn!(key = %key, "skipping unknown congestion day");
            continue;
        };
        match hours(day, raw) {
            Some(h) => days.push((day, h)),
            None => tracing::warn!(%day, "skipping malformed congestion row"),
        }
    }
    days.sort_by_key(|(d, _)| *d);
    days.dedup_by_key(|(d, _)| *d);
    Ok(CongestionTable { days })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("월", Weekday::Mon)]
    #[case("수요일", Weekday::Wed)]
    #[case("sat", Weekday::Sat)]
    #[case("Sunday", Weekday::Sun)]
    fn weekday_spellings(#[case] raw: &str, #[case] day: Weekday) {
        assert_eq!(raw.parse::<Weekday>().unwrap(), day);
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        assert!("someday".parse::<Weekday>().is_err());
        assert!("s".parse::<Weekday>().is_err());
    }

    #[test]
    fn rows_come_back_monday_first() {
        let row = |v: u32| format!("[{}]", vec![v.to_string(); 24].join(","));
        let body = format!(r#"{{"일":{},"월":{},"화":[1,2]}}"#, row(5), row(1));
        let table = decode_congestion(&body).unwrap();
        let days: Vec<_> = table.days().map(|(d, _)| d).collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Sun]);
        assert_eq!(table.day(Weekday::Sun).unwrap()[9], 5.0);
        assert_eq!(table.day(Weekday::Tue), None);
        assert_eq!(table.peak(), 5.0);
    }

    #[test]
    fn non_object_body_is_a_decode_error() {
        assert!(matches!(decode_congestion("[]"), Err(ClientError::Decode(_))));
    }
}
