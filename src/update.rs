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

//! Real time updates, as delivered by the update feeds.
//!
//! Field names follow the SIRI vocabulary (estimated timetables and vehicle monitoring).
//! Stop, line, operator and journey references are ids local to the feed of the batch.

use crate::time::local_date;
use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A batch of estimated vehicle journeys from one feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Empty when the feed is the default one of the source.
    #[serde(default)]
    pub feed_id: String,
    /// When set, the batch replaces all real time data previously received for the feed.
    #[serde(default)]
    pub full_dataset: bool,
    #[serde(default)]
    pub journeys: Vec<EstimatedVehicleJourney>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JourneyKind {
    /// Update of a scheduled journey.
    Update,
    /// A journey that is not in the static schedule.
    ExtraJourney,
    /// Cancellation of a scheduled journey.
    Cancellation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramedVehicleJourneyRef {
    pub data_frame_ref: NaiveDate,
    pub dated_vehicle_journey_ref: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatedVehicleJourney {
    pub line_ref: Option<String>,
    pub operator_ref: Option<String>,
    pub vehicle_ref: Option<String>,
    pub dated_vehicle_journey_ref: Option<String>,
    pub framed_vehicle_journey_ref: Option<FramedVehicleJourneyRef>,
    /// Id of the trip to create, for extra journeys.
    pub estimated_vehicle_journey_code: Option<String>,
    pub destination_name: Option<String>,
    pub extra_journey: bool,
    pub cancellation: bool,
    pub monitored: Option<bool>,
    pub prediction_inaccurate: bool,
    /// Calls already made, in stop order.
    pub recorded_calls: Vec<Call>,
    /// Calls still to come, in stop order.
    pub estimated_calls: Vec<Call>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallStatus {
    #[default]
    Scheduled,
    /// The vehicle will not stop.
    Skipped,
    /// No prediction is available for this stop.
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalBoardingActivity {
    Alighting,
    NoAlighting,
    PassThru,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartureBoardingActivity {
    Boarding,
    NoBoarding,
    PassThru,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Call {
    pub stop_point_ref: String,
    /// 1-based position of the call in the journey.
    pub order: Option<u32>,
    pub status: CallStatus,
    pub aimed_arrival_time: Option<DateTime<FixedOffset>>,
    pub expected_arrival_time: Option<DateTime<FixedOffset>>,
    pub actual_arrival_time: Option<DateTime<FixedOffset>>,
    pub aimed_departure_time: Option<DateTime<FixedOffset>>,
    pub expected_departure_time: Option<DateTime<FixedOffset>>,
    pub actual_departure_time: Option<DateTime<FixedOffset>>,
    pub arrival_boarding_activity: Option<ArrivalBoardingActivity>,
    pub departure_boarding_activity: Option<DepartureBoardingActivity>,
    pub prediction_inaccurate: bool,
}

impl Call {
    pub fn new(stop_point_ref: impl Into<String>) -> Self {
        Self {
            stop_point_ref: stop_point_ref.into(),
            ..Default::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == CallStatus::Skipped
    }

    pub fn is_no_data(&self) -> bool {
        self.status == CallStatus::NoData
    }

    /// Observed time when there is one, predicted time otherwise.
    pub fn real_time_arrival(&self) -> Option<&DateTime<FixedOffset>> {
        self.actual_arrival_time
            .as_ref()
            .or(self.expected_arrival_time.as_ref())
    }

    pub fn real_time_departure(&self) -> Option<&DateTime<FixedOffset>> {
        self.actual_departure_time
            .as_ref()
            .or(self.expected_departure_time.as_ref())
    }

    pub fn aimed_departure_or_arrival(&self) -> Option<&DateTime<FixedOffset>> {
        self.aimed_departure_time
            .as_ref()
            .or(self.aimed_arrival_time.as_ref())
    }

    /// None when the call does not say anything, otherwise whether boarding is possible.
    pub fn can_board(&self) -> Option<bool> {
        self.departure_boarding_activity
            .map(|activity| activity == DepartureBoardingActivity::Boarding)
    }

    pub fn can_alight(&self) -> Option<bool> {
        self.arrival_boarding_activity
            .map(|activity| activity == ArrivalBoardingActivity::Alighting)
    }
}

impl EstimatedVehicleJourney {
    pub fn kind(&self) -> JourneyKind {
        if self.extra_journey {
            JourneyKind::ExtraJourney
        } else if self.cancellation {
            JourneyKind::Cancellation
        } else {
            JourneyKind::Update
        }
    }

    /// Journeys are monitored unless explicitly stated otherwise.
    pub fn is_monitored(&self) -> bool {
        self.monitored != Some(false)
    }

    pub fn calls(&self) -> impl Iterator<Item = &Call> + '_ {
        self.recorded_calls.iter().chain(self.estimated_calls.iter())
    }

    pub fn nb_of_calls(&self) -> usize {
        self.recorded_calls.len() + self.estimated_calls.len()
    }

    /// Id of the scheduled journey this update is about, when given explicitly.
    pub fn exact_journey_ref(&self) -> Option<&str> {
        self.framed_vehicle_journey_ref
            .as_ref()
            .map(|framed_ref| framed_ref.dated_vehicle_journey_ref.as_str())
            .or(self.dated_vehicle_journey_ref.as_deref())
    }

    /// The operating day of the journey.
    ///
    /// Given by the framed journey ref when present, otherwise by the aimed departure
    /// of the first recorded call, or of the first estimated call.
    pub fn service_date(&self, timezone: &Tz) -> Option<NaiveDate> {
        if let Some(framed_ref) = &self.framed_vehicle_journey_ref {
            return Some(framed_ref.data_frame_ref);
        }
        let first_call = self
            .recorded_calls
            .first()
            .or_else(|| self.estimated_calls.first())?;
        first_call
            .aimed_departure_or_arrival()
            .map(|datetime| local_date(datetime, timezone))
    }

    /// Short description used in logs.
    pub fn describe(&self) -> String {
        let reference = self
            .exact_journey_ref()
            .or(self.estimated_vehicle_journey_code.as_deref())
            .or(self.vehicle_ref.as_deref())
            .unwrap_or("unknown journey");
        format!(
            "{} (line {})",
            reference,
            self.line_ref.as_deref().unwrap_or("unknown")
        )
    }
}

/// A batch of vehicle positions from one feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleMonitoringBatch {
    #[serde(default)]
    pub feed_id: String,
    #[serde(default)]
    pub activities: Vec<VehicleActivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredCall {
    pub stop_point_ref: String,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleActivity {
    pub line_ref: Option<String>,
    pub vehicle_ref: Option<String>,
    pub framed_vehicle_journey_ref: Option<FramedVehicleJourneyRef>,
    pub origin_ref: Option<String>,
    pub origin_aimed_departure_time: Option<DateTime<FixedOffset>>,
    pub destination_ref: Option<String>,
    pub monitored: Option<bool>,
    /// Current delay of the vehicle, in seconds.
    pub delay: Option<i32>,
    pub monitored_call: Option<MonitoredCall>,
}

impl VehicleActivity {
    pub fn is_monitored(&self) -> bool {
        self.monitored != Some(false)
    }

    pub fn service_date(&self, timezone: &Tz) -> Option<NaiveDate> {
        if let Some(framed_ref) = &self.framed_vehicle_journey_ref {
            return Some(framed_ref.data_frame_ref);
        }
        self.origin_aimed_departure_time
            .as_ref()
            .map(|datetime| local_date(datetime, timezone))
    }

    pub fn describe(&self) -> String {
        format!(
            "vehicle {} (line {})",
            self.vehicle_ref.as_deref().unwrap_or("unknown"),
            self.line_ref.as_deref().unwrap_or("unknown")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_batch() {
        let json = r#"{
            "feed_id": "F",
            "journeys": [{
                "line_ref": "L1",
                "dated_vehicle_journey_ref": "1.1",
                "estimated_calls": [
                    {
                        "stop_point_ref": "A",
                        "order": 1,
                        "aimed_departure_time": "2022-01-01T23:30:00+01:00",
                        "expected_departure_time": "2022-01-01T23:31:00+01:00"
                    },
                    {
                        "stop_point_ref": "B",
                        "status": "Skipped",
                        "departure_boarding_activity": "NoBoarding"
                    }
                ]
            }]
        }"#;
        let batch: UpdateBatch = serde_json::from_str(json).unwrap();
        assert!(!batch.full_dataset);
        let journey = &batch.journeys[0];
        assert_eq!(journey.kind(), JourneyKind::Update);
        assert!(journey.is_monitored());
        assert_eq!(journey.exact_journey_ref(), Some("1.1"));
        assert_eq!(journey.nb_of_calls(), 2);
        // local date of the aimed departure, not the UTC one
        assert_eq!(
            journey.service_date(&chrono_tz::Europe::Paris),
            NaiveDate::from_ymd_opt(2022, 1, 1)
        );
        assert_eq!(
            journey.service_date(&chrono_tz::Asia::Tokyo),
            NaiveDate::from_ymd_opt(2022, 1, 2)
        );
        let skipped = &journey.estimated_calls[1];
        assert!(skipped.is_skipped());
        assert_eq!(skipped.can_board(), Some(false));
        assert_eq!(skipped.can_alight(), None);
    }

    #[test]
    fn extra_journey_wins_over_cancellation() {
        let journey = EstimatedVehicleJourney {
            extra_journey: true,
            cancellation: true,
            ..Default::default()
        };
        assert_eq!(journey.kind(), JourneyKind::ExtraJourney);
    }
}
