//! Working-week calendar: days, hourly slots and date arithmetic.
//!
//! Slots are whole hours. The wire form of a slot is the 12-hour label the
//! front end renders (`"9:00 AM"`, `"1:00 PM"`); 24-hour `"13:00"` is also
//! accepted on input.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Day
// ---------------------------------------------------------------------------

/// A teaching day. Ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    #[serde(alias = "Mon")]
    Monday,
    #[serde(alias = "Tue")]
    Tuesday,
    #[serde(alias = "Wed")]
    Wednesday,
    #[serde(alias = "Thu")]
    Thursday,
    #[serde(alias = "Fri")]
    Friday,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        }
    }

    /// Zero-based offset from Monday.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// The teaching day for a calendar weekday; weekends have none.
    pub fn from_weekday(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(Day::Monday),
            Weekday::Tue => Some(Day::Tuesday),
            Weekday::Wed => Some(Day::Wednesday),
            Weekday::Thu => Some(Day::Thursday),
            Weekday::Fri => Some(Day::Friday),
            Weekday::Sat | Weekday::Sun => None,
        }
    }

    pub fn of_date(date: NaiveDate) -> Option<Self> {
        Self::from_weekday(date.weekday())
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Day {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Day::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(trimmed) || d.name()[..3].eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::invalid("day", format!("unknown day \"{trimmed}\"")))
    }
}

// ---------------------------------------------------------------------------
// TimeSlot
// ---------------------------------------------------------------------------

/// A one-hour teaching slot identified by its starting hour (0-23).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot {
    hour: u8,
}

impl TimeSlot {
    pub fn new(hour: u8) -> Option<Self> {
        (hour < 24).then_some(Self { hour })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    /// The 12-hour label used on the wire, e.g. `"9:00 AM"`.
    pub fn label(self) -> String {
        let (display, suffix) = match self.hour {
            0 => (12, "AM"),
            h @ 1..=11 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        format!("{display}:00 {suffix}")
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for TimeSlot {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::invalid("time_slot", format!("unrecognised time slot \"{s}\""));
        let trimmed = s.trim();

        let upper = trimmed.to_ascii_uppercase();
        let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (upper.as_str(), None)
        };

        let (hour_str, minute_str) = clock.split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hour_str.trim().parse().map_err(|_| invalid())?;
        if minute_str.trim() != "00" {
            return Err(CoreError::invalid(
                "time_slot",
                format!("slots start on the hour, got \"{s}\""),
            ));
        }

        let hour = match meridiem {
            Some(pm) => {
                if !(1..=12).contains(&hour) {
                    return Err(invalid());
                }
                match (hour, pm) {
                    (12, false) => 0,
                    (12, true) => 12,
                    (h, false) => h,
                    (h, true) => h + 12,
                }
            }
            None => hour,
        };

        TimeSlot::new(hour).ok_or_else(invalid)
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// WorkingWeek
// ---------------------------------------------------------------------------

/// Default first teaching hour (9:00).
pub const DEFAULT_FIRST_HOUR: u8 = 9;

/// Default last teaching hour (17:00 slot, ending 18:00).
pub const DEFAULT_LAST_HOUR: u8 = 17;

/// Default lunch hour removed when a lunch break is requested (13:00).
pub const DEFAULT_LUNCH_HOUR: u8 = 13;

/// The schedulable grid: Monday to Friday, one slot per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingWeek {
    pub first_hour: u8,
    pub last_hour: u8,
    pub lunch_hour: u8,
}

impl Default for WorkingWeek {
    fn default() -> Self {
        Self {
            first_hour: DEFAULT_FIRST_HOUR,
            last_hour: DEFAULT_LAST_HOUR,
            lunch_hour: DEFAULT_LUNCH_HOUR,
        }
    }
}

impl WorkingWeek {
    /// Hourly slots of a single day, earliest first.
    ///
    /// The lunch slot is the same for every day of the week.
    pub fn hours(&self, include_lunch_break: bool) -> Vec<TimeSlot> {
        (self.first_hour..=self.last_hour)
            .filter(|h| !(include_lunch_break && *h == self.lunch_hour))
            .filter_map(TimeSlot::new)
            .collect()
    }

    /// The full weekly pool, ordered by day then hour.
    pub fn slots(&self, include_lunch_break: bool) -> Vec<(Day, TimeSlot)> {
        let hours = self.hours(include_lunch_break);
        Day::ALL
            .into_iter()
            .flat_map(|day| hours.iter().map(move |slot| (day, *slot)))
            .collect()
    }

    pub fn contains(&self, slot: TimeSlot) -> bool {
        (self.first_hour..=self.last_hour).contains(&slot.hour())
    }
}

// ---------------------------------------------------------------------------
// Date helpers
// ---------------------------------------------------------------------------

/// The Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// The calendar date of `day` in the week starting on `monday`.
pub fn date_in_week(monday: NaiveDate, day: Day) -> NaiveDate {
    monday + Days::new(u64::from(day.index()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn labels_use_twelve_hour_clock() {
        assert_eq!(TimeSlot::new(9).unwrap().label(), "9:00 AM");
        assert_eq!(TimeSlot::new(12).unwrap().label(), "12:00 PM");
        assert_eq!(TimeSlot::new(13).unwrap().label(), "1:00 PM");
        assert_eq!(TimeSlot::new(0).unwrap().label(), "12:00 AM");
    }

    #[test]
    fn parses_labels_and_24h_form() {
        assert_eq!("9:00 AM".parse::<TimeSlot>().unwrap().hour(), 9);
        assert_eq!("12:00 PM".parse::<TimeSlot>().unwrap().hour(), 12);
        assert_eq!("5:00 pm".parse::<TimeSlot>().unwrap().hour(), 17);
        assert_eq!("13:00".parse::<TimeSlot>().unwrap().hour(), 13);
    }

    #[test]
    fn rejects_partial_hours_and_garbage() {
        assert!("9:30 AM".parse::<TimeSlot>().is_err());
        assert!("noon".parse::<TimeSlot>().is_err());
        assert!("13:00 PM".parse::<TimeSlot>().is_err());
        assert!("25:00".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn slot_serializes_as_label() {
        let json = serde_json::to_string(&TimeSlot::new(14).unwrap()).unwrap();
        assert_eq!(json, "\"2:00 PM\"");
        let back: TimeSlot = serde_json::from_str("\"2:00 PM\"").unwrap();
        assert_eq!(back.hour(), 14);
    }

    #[test]
    fn day_accepts_short_names() {
        assert_eq!("wed".parse::<Day>().unwrap(), Day::Wednesday);
        assert_eq!("Friday".parse::<Day>().unwrap(), Day::Friday);
        assert!("Saturday".parse::<Day>().is_err());
        let day: Day = serde_json::from_str("\"Tue\"").unwrap();
        assert_eq!(day, Day::Tuesday);
    }

    #[test]
    fn default_week_has_nine_hours() {
        let week = WorkingWeek::default();
        assert_eq!(week.hours(false).len(), 9);
        assert_eq!(week.slots(false).len(), 45);
    }

    #[test]
    fn lunch_break_removes_one_slot_per_day() {
        let week = WorkingWeek::default();
        let hours = week.hours(true);
        assert_eq!(hours.len(), 8);
        assert!(hours.iter().all(|s| s.hour() != DEFAULT_LUNCH_HOUR));
        assert_eq!(week.slots(true).len(), 40);
    }

    #[test]
    fn slots_are_ordered_by_day_then_hour() {
        let slots = WorkingWeek::default().slots(false);
        assert_eq!(slots[0], (Day::Monday, TimeSlot::new(9).unwrap()));
        assert_eq!(slots[8], (Day::Monday, TimeSlot::new(17).unwrap()));
        assert_eq!(slots[9], (Day::Tuesday, TimeSlot::new(9).unwrap()));
    }

    #[test]
    fn week_start_is_monday() {
        // 2025-03-13 is a Thursday.
        assert_eq!(week_start(date(2025, 3, 13)), date(2025, 3, 10));
        assert_eq!(week_start(date(2025, 3, 10)), date(2025, 3, 10));
        // Sunday belongs to the week that started the previous Monday.
        assert_eq!(week_start(date(2025, 3, 16)), date(2025, 3, 10));
    }

    #[test]
    fn date_in_week_offsets_from_monday() {
        let monday = date(2025, 3, 10);
        assert_eq!(date_in_week(monday, Day::Friday), date(2025, 3, 14));
        assert_eq!(Day::of_date(date(2025, 3, 15)), None);
        assert_eq!(Day::of_date(date(2025, 3, 12)), Some(Day::Wednesday));
    }
}
