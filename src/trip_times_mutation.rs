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

//! Building new trip times from real time calls.
//!
//! All functions work on copies: the trip times given as input are never modified.

use crate::{
    model::{FeedScopedId, FlowDirection, StopPattern, Trip},
    time::{is_valid_delay, seconds_since_service_day_start},
    timetable::{RealTimeState, StopRealTimeFlags, TripTimes, TripTimesError},
    update::Call,
};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    TooManyCalls { nb_of_calls: usize, nb_of_stops: usize },
    CallNotInPattern { stop_ref: String },
    CallOrderOutOfRange { order: u32, nb_of_stops: usize },
    CallsOutOfOrder { stop_ref: String },
    MissingAimedTime { stop_ref: String },
    TimeOutOfRange { stop_ref: String },
    DelayOutOfRange(i32),
    InvalidTripTimes(TripTimesError),
}

impl std::error::Error for MutationError {}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationError::TooManyCalls {
                nb_of_calls,
                nb_of_stops,
            } => write!(
                f,
                "The journey has {} calls but the pattern has only {} stops.",
                nb_of_calls, nb_of_stops
            ),
            MutationError::CallNotInPattern { stop_ref } => {
                write!(f, "The call at {} does not match any stop of the pattern.", stop_ref)
            }
            MutationError::CallOrderOutOfRange { order, nb_of_stops } => write!(
                f,
                "Call order {} is out of range for a pattern with {} stops.",
                order, nb_of_stops
            ),
            MutationError::CallsOutOfOrder { stop_ref } => {
                write!(f, "The call at {} comes before a previous call.", stop_ref)
            }
            MutationError::MissingAimedTime { stop_ref } => {
                write!(f, "The call at {} has no aimed time.", stop_ref)
            }
            MutationError::TimeOutOfRange { stop_ref } => write!(
                f,
                "A time of the call at {} is too far away from its service day.",
                stop_ref
            ),
            MutationError::DelayOutOfRange(delay) => {
                write!(f, "A delay of {} seconds is out of range.", delay)
            }
            MutationError::InvalidTripTimes(error) => write!(f, "{}", error),
        }
    }
}

impl From<TripTimesError> for MutationError {
    fn from(error: TripTimesError) -> Self {
        MutationError::InvalidTripTimes(error)
    }
}

/// A call and the position of the pattern stop it refers to.
pub type AlignedCall<'c> = (usize, &'c Call);

/// Finds the pattern position of each call.
///
/// A call with an `order` goes at position `order - 1`. Otherwise, when there are
/// as many calls as stops, calls are taken in stop order. Otherwise the call goes
/// to the next stop with the same id.
pub fn align_calls<'c>(
    calls: &[&'c Call],
    stop_pattern: &StopPattern,
    feed_id: &str,
) -> Result<Vec<AlignedCall<'c>>, MutationError> {
    let nb_of_stops = stop_pattern.len();
    if calls.len() > nb_of_stops {
        return Err(MutationError::TooManyCalls {
            nb_of_calls: calls.len(),
            nb_of_stops,
        });
    }
    let complete = calls.len() == nb_of_stops;
    let mut next_position = 0;
    let mut aligned = Vec::with_capacity(calls.len());
    for (index, call) in calls.iter().enumerate() {
        let position = match call.order {
            Some(order) => {
                let position = (order as usize).checked_sub(1).filter(|p| *p < nb_of_stops);
                position.ok_or(MutationError::CallOrderOutOfRange { order, nb_of_stops })?
            }
            None if complete => index,
            None => {
                let stop_id = FeedScopedId::new(feed_id, call.stop_point_ref.as_str());
                stop_pattern
                    .stops()
                    .iter()
                    .enumerate()
                    .skip(next_position)
                    .find(|(_, stop)| **stop == stop_id)
                    .map(|(position, _)| position)
                    .ok_or_else(|| MutationError::CallNotInPattern {
                        stop_ref: call.stop_point_ref.clone(),
                    })?
            }
        };
        if position < next_position {
            return Err(MutationError::CallsOutOfOrder {
                stop_ref: call.stop_point_ref.clone(),
            });
        }
        next_position = position + 1;
        aligned.push((position, *call));
    }
    Ok(aligned)
}

fn to_seconds(
    datetime: Option<&DateTime<FixedOffset>>,
    service_day_start: &DateTime<Tz>,
    call: &Call,
) -> Result<Option<i32>, MutationError> {
    datetime
        .map(|datetime| {
            seconds_since_service_day_start(datetime, service_day_start).ok_or_else(|| {
                MutationError::TimeOutOfRange {
                    stop_ref: call.stop_point_ref.clone(),
                }
            })
        })
        .transpose()
}

fn call_flags(call: &Call, journey_prediction_inaccurate: bool) -> StopRealTimeFlags {
    StopRealTimeFlags {
        cancelled: call.is_skipped(),
        no_data: call.is_no_data(),
        prediction_inaccurate: journey_prediction_inaccurate || call.prediction_inaccurate,
    }
}

// Fills the side of a stop the feed did not give.
// The first stop arrival and the last stop departure are the same as the other side,
// elsewhere the delay of the known side is used.
fn complete_stop_times(
    trip_times: &TripTimes,
    stop: usize,
    arrival: Option<i32>,
    departure: Option<i32>,
) -> Option<(i32, i32)> {
    let last_stop = trip_times.number_of_stops() - 1;
    match (arrival, departure) {
        (Some(arrival), Some(departure)) => Some((arrival, departure)),
        (None, Some(departure)) if stop == 0 => Some((departure, departure)),
        (Some(arrival), None) if stop == last_stop => Some((arrival, arrival)),
        (None, Some(departure)) => {
            let delay = departure - trip_times.scheduled_departure_time(stop);
            Some((trip_times.scheduled_arrival_time(stop) + delay, departure))
        }
        (Some(arrival), None) => {
            let delay = arrival - trip_times.scheduled_arrival_time(stop);
            Some((arrival, trip_times.scheduled_departure_time(stop) + delay))
        }
        (None, None) => None,
    }
}

/// Applies the calls of an update to a copy of `baseline`.
///
/// Expected times are stored as delays on the scheduled times. Stops after the
/// last call with times get its departure delay, stops before the first call
/// keep their baseline times.
pub fn updated_trip_times(
    baseline: &TripTimes,
    aligned_calls: &[AlignedCall],
    service_day_start: &DateTime<Tz>,
    journey_prediction_inaccurate: bool,
) -> Result<TripTimes, MutationError> {
    let mut trip_times = baseline.clone();
    if trip_times.is_canceled() {
        for stop in 0..trip_times.number_of_stops() {
            trip_times.set_cancelled_stop(stop, false);
        }
    }

    let mut aligned_calls = aligned_calls.iter().peekable();
    let mut propagated_delay: Option<i32> = None;
    for stop in 0..trip_times.number_of_stops() {
        let call = match aligned_calls.next_if(|(position, _)| *position == stop) {
            Some((_, call)) => *call,
            None => {
                if let Some(delay) = propagated_delay {
                    trip_times.update_arrival_delay(stop, delay);
                    trip_times.update_departure_delay(stop, delay);
                }
                continue;
            }
        };
        trip_times.set_stop_flags(stop, call_flags(call, journey_prediction_inaccurate));

        if call.is_no_data() {
            trip_times.update_arrival_delay(stop, 0);
            trip_times.update_departure_delay(stop, 0);
            propagated_delay = Some(0);
            continue;
        }

        let arrival = to_seconds(call.real_time_arrival(), service_day_start, call)?;
        let departure = to_seconds(call.real_time_departure(), service_day_start, call)?;
        let (arrival, departure) = match complete_stop_times(&trip_times, stop, arrival, departure)
        {
            Some(times) => times,
            None => match propagated_delay {
                Some(delay) => (
                    trip_times.scheduled_arrival_time(stop) + delay,
                    trip_times.scheduled_departure_time(stop) + delay,
                ),
                None => (trip_times.arrival_time(stop), trip_times.departure_time(stop)),
            },
        };
        trip_times.update_arrival_time(stop, arrival);
        trip_times.update_departure_time(stop, departure);
        propagated_delay = Some(departure - trip_times.scheduled_departure_time(stop));
    }

    trip_times.set_real_time_state(RealTimeState::Updated);
    trip_times.validate()?;
    Ok(trip_times)
}

/// Trip times of a trip that is not in the static schedule.
///
/// Aimed times become the scheduled times, expected times the real time ones.
pub fn added_trip_times(
    trip: Arc<Trip>,
    calls: &[&Call],
    service_day_start: &DateTime<Tz>,
    journey_prediction_inaccurate: bool,
    cancelled: bool,
) -> Result<TripTimes, MutationError> {
    let last_call = calls.len().saturating_sub(1);
    let mut arrivals = Vec::with_capacity(calls.len());
    let mut departures = Vec::with_capacity(calls.len());
    for (index, call) in calls.iter().enumerate() {
        let arrival = to_seconds(call.aimed_arrival_time.as_ref(), service_day_start, call)?;
        let departure = to_seconds(call.aimed_departure_time.as_ref(), service_day_start, call)?;
        let (arrival, departure) = match (arrival, departure) {
            (Some(arrival), Some(departure)) => (arrival, departure),
            (None, Some(departure)) => (departure, departure),
            (Some(arrival), None) => (arrival, arrival),
            (None, None) => {
                return Err(MutationError::MissingAimedTime {
                    stop_ref: call.stop_point_ref.clone(),
                })
            }
        };
        // nobody gets off at the first stop or gets on at the last one
        let arrival = if index == 0 { departure } else { arrival };
        let departure = if index == last_call { arrival } else { departure };
        arrivals.push(arrival);
        departures.push(departure);
    }

    let mut trip_times = TripTimes::new(trip, arrivals, departures)?;
    for (stop, call) in calls.iter().enumerate() {
        trip_times.set_stop_flags(stop, call_flags(call, journey_prediction_inaccurate));
        if call.is_no_data() {
            continue;
        }
        let arrival = to_seconds(call.real_time_arrival(), service_day_start, call)?;
        let departure = to_seconds(call.real_time_departure(), service_day_start, call)?;
        if let Some((arrival, departure)) =
            complete_stop_times(&trip_times, stop, arrival, departure)
        {
            trip_times.update_arrival_time(stop, arrival);
            trip_times.update_departure_time(stop, departure);
        }
    }

    if cancelled {
        trip_times.cancel_trip();
    } else {
        trip_times.set_real_time_state(RealTimeState::Added);
    }
    trip_times.validate()?;
    Ok(trip_times)
}

/// Shifts all times from `from_stop` on by `delay` seconds.
pub fn delayed_trip_times(
    baseline: &TripTimes,
    from_stop: usize,
    delay: i32,
) -> Result<TripTimes, MutationError> {
    if !is_valid_delay(delay) {
        return Err(MutationError::DelayOutOfRange(delay));
    }
    let nb_of_stops = baseline.number_of_stops();
    if from_stop >= nb_of_stops {
        return Err(MutationError::CallOrderOutOfRange {
            order: u32::try_from(from_stop + 1).unwrap_or(u32::MAX),
            nb_of_stops,
        });
    }
    let mut trip_times = baseline.clone();
    for stop in from_stop..nb_of_stops {
        trip_times.update_arrival_delay(stop, delay);
        trip_times.update_departure_delay(stop, delay);
    }
    trip_times.set_real_time_state(RealTimeState::Updated);
    trip_times.validate()?;
    Ok(trip_times)
}

pub fn cancelled_trip_times(baseline: &TripTimes) -> TripTimes {
    let mut trip_times = baseline.clone();
    trip_times.cancel_trip();
    trip_times
}

fn call_flow(call: &Call, default: FlowDirection) -> FlowDirection {
    if call.is_skipped() {
        return FlowDirection::NoBoardDebark;
    }
    FlowDirection::from_flags(
        call.can_board().unwrap_or_else(|| default.can_board()),
        call.can_alight().unwrap_or_else(|| default.can_debark()),
    )
}

/// The stop pattern actually served by the journey.
///
/// Calls may serve another stop than the scheduled one, and skipped calls
/// allow neither boarding nor alighting.
pub fn modified_stop_pattern(
    original: &StopPattern,
    aligned_calls: &[AlignedCall],
    feed_id: &str,
) -> StopPattern {
    let mut stops_and_flows: Vec<(FeedScopedId, FlowDirection)> = original
        .iter()
        .map(|(stop, flow)| (stop.clone(), flow))
        .collect();
    for (position, call) in aligned_calls {
        if let Some((stop, flow)) = stops_and_flows.get_mut(*position) {
            *stop = FeedScopedId::new(feed_id, call.stop_point_ref.as_str());
            *flow = call_flow(call, *flow);
        }
    }
    StopPattern::new(stops_and_flows)
}

pub fn added_stop_pattern(calls: &[&Call], feed_id: &str) -> StopPattern {
    StopPattern::new(calls.iter().map(|call| {
        (
            FeedScopedId::new(feed_id, call.stop_point_ref.as_str()),
            call_flow(call, FlowDirection::BoardAndDebark),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{time::service_day_start, update::CallStatus};
    use chrono::{NaiveDate, TimeZone};

    const FEED: &str = "F";

    fn trip() -> Arc<Trip> {
        Arc::new(Trip {
            id: FeedScopedId::new(FEED, "1.1"),
            route_id: FeedScopedId::new(FEED, "route"),
            service_id: FeedScopedId::new(FEED, "service"),
            headsign: None,
            operator_id: None,
        })
    }

    fn day_start() -> DateTime<Tz> {
        service_day_start(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), &chrono_tz::UTC).unwrap()
    }

    fn at(hours: u32, minutes: u32, seconds: u32) -> Option<DateTime<FixedOffset>> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2022, 1, 1, hours, minutes, seconds)
            .single()
    }

    fn seconds(hours: i32, minutes: i32, seconds: i32) -> i32 {
        hours * 3600 + minutes * 60 + seconds
    }

    // A 10:00, B 10:10 / 10:11, C 10:20
    fn scheduled() -> TripTimes {
        TripTimes::new(
            trip(),
            vec![seconds(10, 0, 0), seconds(10, 10, 0), seconds(10, 20, 0)],
            vec![seconds(10, 0, 0), seconds(10, 11, 0), seconds(10, 20, 0)],
        )
        .unwrap()
    }

    fn stop_pattern() -> StopPattern {
        StopPattern::new(
            ["A", "B", "C"]
                .iter()
                .map(|stop| (FeedScopedId::new(FEED, *stop), FlowDirection::BoardAndDebark)),
        )
    }

    #[test]
    fn expected_times_become_delays_and_are_propagated() {
        let call = Call {
            order: Some(2),
            expected_arrival_time: at(10, 11, 0),
            expected_departure_time: at(10, 12, 20),
            ..Call::new("B")
        };
        let calls = [&call];
        let aligned = align_calls(&calls, &stop_pattern(), FEED).unwrap();
        assert_eq!(aligned[0].0, 1);

        let baseline = scheduled();
        let updated = updated_trip_times(&baseline, &aligned, &day_start(), false).unwrap();

        assert_eq!(updated.real_time_state(), RealTimeState::Updated);
        assert_eq!(updated.arrival_delay(0), 0);
        assert_eq!(updated.arrival_delay(1), 60);
        assert_eq!(updated.departure_delay(1), 80);
        assert_eq!(updated.arrival_delay(2), 80);
        assert_eq!(updated.departure_delay(2), 80);
        assert!(baseline.is_scheduled());
        assert_eq!(baseline.departure_delay(1), 0);
    }

    #[test]
    fn endpoints_get_fake_times() {
        let first = Call {
            expected_departure_time: at(10, 2, 0),
            ..Call::new("A")
        };
        let middle = Call {
            expected_departure_time: at(10, 13, 0),
            ..Call::new("B")
        };
        let last = Call {
            expected_arrival_time: at(10, 25, 0),
            ..Call::new("C")
        };
        let calls = [&first, &middle, &last];
        let aligned = align_calls(&calls, &stop_pattern(), FEED).unwrap();
        let updated = updated_trip_times(&scheduled(), &aligned, &day_start(), false).unwrap();

        assert_eq!(updated.arrival_time(0), seconds(10, 2, 0));
        assert_eq!(updated.departure_time(0), seconds(10, 2, 0));
        // same delay as the departure
        assert_eq!(updated.arrival_time(1), seconds(10, 12, 0));
        assert_eq!(updated.departure_time(2), seconds(10, 25, 0));
    }

    #[test]
    fn skipped_and_no_data_calls_set_flags() {
        let first = Call {
            status: CallStatus::NoData,
            expected_departure_time: at(10, 30, 0),
            ..Call::new("A")
        };
        let middle = Call {
            status: CallStatus::Skipped,
            ..Call::new("B")
        };
        let last = Call {
            prediction_inaccurate: true,
            ..Call::new("C")
        };
        let calls = [&first, &middle, &last];
        let aligned = align_calls(&calls, &stop_pattern(), FEED).unwrap();
        let updated = updated_trip_times(&scheduled(), &aligned, &day_start(), false).unwrap();

        assert!(updated.is_no_data_stop(0));
        assert!(!updated.is_cancelled_stop(0));
        assert_eq!(updated.departure_delay(0), 0);
        assert!(updated.is_cancelled_stop(1));
        assert!(updated.is_prediction_inaccurate(2));
        assert!(!updated.is_prediction_inaccurate(1));

        let modified = modified_stop_pattern(&stop_pattern(), &aligned, FEED);
        assert_eq!(modified.flow(1), Some(FlowDirection::NoBoardDebark));
        assert_eq!(modified.stops(), stop_pattern().stops());
        assert_ne!(modified, stop_pattern());
    }

    #[test]
    fn decreasing_expected_times_are_rejected() {
        let call = Call {
            order: Some(3),
            expected_arrival_time: at(9, 0, 0),
            ..Call::new("C")
        };
        let calls = [&call];
        let aligned = align_calls(&calls, &stop_pattern(), FEED).unwrap();
        assert!(matches!(
            updated_trip_times(&scheduled(), &aligned, &day_start(), false),
            Err(MutationError::InvalidTripTimes(TripTimesError::DecreasingTimes(_)))
        ));
    }

    #[test]
    fn calls_must_fit_the_pattern() {
        let unknown = Call::new("Z");
        assert_eq!(
            align_calls(&[&unknown], &stop_pattern(), FEED),
            Err(MutationError::CallNotInPattern {
                stop_ref: "Z".to_string()
            })
        );
        let out_of_range = Call {
            order: Some(4),
            ..Call::new("C")
        };
        assert!(matches!(
            align_calls(&[&out_of_range], &stop_pattern(), FEED),
            Err(MutationError::CallOrderOutOfRange { order: 4, .. })
        ));
        let c = Call {
            order: Some(3),
            ..Call::new("C")
        };
        let a = Call {
            order: Some(1),
            ..Call::new("A")
        };
        assert!(matches!(
            align_calls(&[&c, &a], &stop_pattern(), FEED),
            Err(MutationError::CallsOutOfOrder { .. })
        ));
        // a complete journey may serve other stops
        let (x, y, z) = (Call::new("X"), Call::new("B"), Call::new("C"));
        let aligned = align_calls(&[&x, &y, &z], &stop_pattern(), FEED).unwrap();
        let modified = modified_stop_pattern(&stop_pattern(), &aligned, FEED);
        assert_eq!(modified.first_stop(), Some(&FeedScopedId::new(FEED, "X")));
    }

    #[test]
    fn added_trip_times_use_aimed_times_as_schedule() {
        let first = Call {
            aimed_departure_time: at(10, 0, 0),
            expected_departure_time: at(10, 1, 0),
            ..Call::new("A")
        };
        let middle = Call {
            aimed_arrival_time: at(10, 5, 0),
            aimed_departure_time: at(10, 6, 0),
            ..Call::new("B")
        };
        let last = Call {
            aimed_arrival_time: at(10, 10, 0),
            expected_arrival_time: at(10, 12, 0),
            ..Call::new("C")
        };
        let calls = [&first, &middle, &last];
        let added = added_trip_times(trip(), &calls, &day_start(), false, false).unwrap();

        assert_eq!(added.real_time_state(), RealTimeState::Added);
        assert_eq!(added.scheduled_arrival_time(0), seconds(10, 0, 0));
        assert_eq!(added.departure_delay(0), 60);
        assert_eq!(added.arrival_delay(1), 0);
        assert_eq!(added.departure_time(2), seconds(10, 12, 0));

        let cancelled = added_trip_times(trip(), &calls, &day_start(), false, true).unwrap();
        assert!(cancelled.is_canceled());

        let no_time = Call::new("A");
        assert!(matches!(
            added_trip_times(trip(), &[&no_time], &day_start(), false, false),
            Err(MutationError::MissingAimedTime { .. })
        ));
    }

    #[test]
    fn delay_applies_from_the_monitored_stop() {
        let delayed = delayed_trip_times(&scheduled(), 1, 120).unwrap();
        assert_eq!(delayed.departure_delay(0), 0);
        assert_eq!(delayed.arrival_delay(1), 120);
        assert_eq!(delayed.departure_delay(2), 120);
        assert!(delayed_trip_times(&scheduled(), 3, 120).is_err());
        assert!(delayed_trip_times(&scheduled(), 1, -3600).is_err());
    }

    #[test]
    fn delays_out_of_range_are_rejected() {
        assert_eq!(
            delayed_trip_times(&scheduled(), 0, i32::MAX),
            Err(MutationError::DelayOutOfRange(i32::MAX))
        );
        assert_eq!(
            delayed_trip_times(&scheduled(), 0, i32::MIN),
            Err(MutationError::DelayOutOfRange(i32::MIN))
        );
    }
}
