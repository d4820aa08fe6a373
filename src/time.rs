// Copyright  (C) 2020, Kisio Digital and/or its affiliates. All rights reserved.
//
// This file is part of Navitia,
// the software to build cool stuff with public transport.
//
// Hope you'll enjoy and contribute to this project,
// powered by Kisio Digital (www.kisio.com).
// Help us simplify mobility and open public transport:
// a non ending quest to the responsive locomotion way of traveling!
//
// This contribution is a part of the research and development work of the
// IVA Project which aims to enhance traveler information and is carried out
// under the leadership of the Technological Research Institute SystemX,
// with the partnership and support of the transport organization authority
// Ile-De-France Mobilités (IDFM), SNCF, and public funds
// under the scope of the French Program "Investissements d’Avenir".
//
// LICENCE: This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.
//
// Stay tuned using
// twitter @navitia
// channel `#navitia` on riot https://riot.im/app/#/room/#navitia:matrix.org
// https://groups.google.com/d/forum/navitia
// www.navitia.io

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

// a trip may run past midnight of its service day, and we allow
// expected times to drift one more day past that
const MAX_SECONDS_SINCE_SERVICE_DAY_START: i64 = 48 * 60 * 60; // 48h

#[derive(Debug, Eq, PartialEq, Clone, Copy, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PositiveDuration {
    seconds: u32,
}

impl PositiveDuration {
    pub fn zero() -> Self {
        Self { seconds: 0 }
    }

    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> PositiveDuration {
        let total_seconds = seconds + 60 * minutes + 60 * 60 * hours;
        PositiveDuration {
            seconds: total_seconds,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.seconds as u64
    }

    pub fn as_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.total_seconds())
    }
}

impl Display for PositiveDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hours = self.seconds / (60 * 60);
        let minutes_in_secs = self.seconds % (60 * 60);
        let minutes = minutes_in_secs / 60;
        let seconds = minutes_in_secs % 60;
        if hours != 0 {
            write!(f, "{}h{:02}m{:02}s", hours, minutes, seconds)
        } else if minutes != 0 {
            write!(f, "{}m{:02}s", minutes, seconds)
        } else {
            write!(f, "{}s", seconds)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositiveDurationError {
    BadFormat(String),
    MinutesOutOfRange(u32),
    SecondsOutOfRange(u32),
}

impl std::error::Error for PositiveDurationError {}

impl Display for PositiveDurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PositiveDurationError::BadFormat(input) => {
                write!(f, "'{}' is not a duration formatted as HH:MM:SS", input)
            }
            PositiveDurationError::MinutesOutOfRange(minutes) => {
                write!(f, "Minutes must be in [0, 59]. Got {}", minutes)
            }
            PositiveDurationError::SecondsOutOfRange(seconds) => {
                write!(f, "Seconds must be in [0, 59]. Got {}", seconds)
            }
        }
    }
}

// "HH:MM:SS", hours may exceed 24
impl FromStr for PositiveDuration {
    type Err = PositiveDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad_format = || PositiveDurationError::BadFormat(s.to_string());
        let mut parts = s.trim().split(':');
        let mut next_number = || -> Result<u32, PositiveDurationError> {
            parts
                .next()
                .ok_or_else(bad_format)?
                .parse::<u32>()
                .map_err(|_| bad_format())
        };
        let hours = next_number()?;
        let minutes = next_number()?;
        let seconds = next_number()?;
        if parts.next().is_some() {
            return Err(bad_format());
        }
        if minutes > 59 {
            return Err(PositiveDurationError::MinutesOutOfRange(minutes));
        }
        if seconds > 59 {
            return Err(PositiveDurationError::SecondsOutOfRange(seconds));
        }
        Ok(PositiveDuration::from_hms(hours, minutes, seconds))
    }
}

impl TryFrom<String> for PositiveDuration {
    type Error = PositiveDurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PositiveDuration::from_str(&value)
    }
}

impl From<PositiveDuration> for String {
    fn from(duration: PositiveDuration) -> Self {
        let hours = duration.seconds / (60 * 60);
        let minutes = (duration.seconds % (60 * 60)) / 60;
        let seconds = duration.seconds % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Start of the service day `date` in `timezone`.
///
/// Computed as local noon minus twelve hours, so that times of a trip
/// keep their meaning on days with a daylight saving time change.
pub fn service_day_start(date: NaiveDate, timezone: &Tz) -> Option<DateTime<Tz>> {
    let noon = date.and_hms_opt(12, 0, 0)?;
    let local_noon = timezone.from_local_datetime(&noon).single()?;
    Some(local_noon - Duration::hours(12))
}

/// Number of seconds between `service_day_start` and `datetime`.
///
/// Returns None when the result does not fit in the range a trip may cover.
pub fn seconds_since_service_day_start<T: TimeZone>(
    datetime: &DateTime<T>,
    service_day_start: &DateTime<Tz>,
) -> Option<i32> {
    let seconds = datetime.timestamp() - service_day_start.timestamp();
    if !(-MAX_SECONDS_SINCE_SERVICE_DAY_START..=MAX_SECONDS_SINCE_SERVICE_DAY_START)
        .contains(&seconds)
    {
        return None;
    }
    i32::try_from(seconds).ok()
}

/// A delay can not move a time further than a trip may run from its service day.
pub fn is_valid_delay(delay: i32) -> bool {
    i64::from(delay).abs() <= MAX_SECONDS_SINCE_SERVICE_DAY_START
}

pub fn local_date<T: TimeZone>(datetime: &DateTime<T>, timezone: &Tz) -> NaiveDate {
    datetime.with_timezone(timezone).date_naive()
}

/// "HH:MM:SS" rendering of seconds since the service day start, for logs.
pub fn format_seconds(seconds: i32) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let abs = seconds.unsigned_abs();
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        abs / 3600,
        (abs % 3600) / 60,
        abs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn parse_and_display_positive_duration() {
        let duration = PositiveDuration::from_str("01:02:03").unwrap();
        assert_eq!(duration, PositiveDuration::from_hms(1, 2, 3));
        assert_eq!(duration.to_string(), "1h02m03s");
        assert_eq!(String::from(duration), "01:02:03");

        assert!(PositiveDuration::from_str("00:61:00").is_err());
        assert!(PositiveDuration::from_str("00:00").is_err());
        assert!(PositiveDuration::from_str("a:b:c").is_err());
    }

    #[test]
    fn service_day_start_handles_daylight_saving_change() {
        let timezone = chrono_tz::Europe::Paris;
        // 2022-03-27 is the spring forward day in Paris
        let date = NaiveDate::from_ymd_opt(2022, 3, 27).unwrap();
        let start = service_day_start(date, &timezone).unwrap();
        let ten_am = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2022, 3, 27, 10, 0, 0)
            .unwrap();
        // one hour less elapsed since local midnight, but 10 hours since noon - 12h
        assert_eq!(seconds_since_service_day_start(&ten_am, &start), Some(10 * 3600));
    }

    #[test]
    fn seconds_since_start_is_bounded() {
        let timezone = chrono_tz::UTC;
        let date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let start = service_day_start(date, &timezone).unwrap();
        let far_away = timezone.with_ymd_and_hms(2022, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(seconds_since_service_day_start(&far_away, &start), None);
        assert_eq!(format_seconds(3 * 3600 + 61), "03:01:01");
        assert_eq!(format_seconds(-60), "-00:01:00");
    }
}
