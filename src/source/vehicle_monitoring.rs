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

use super::{changes::BufferChange, JourneyError};
use crate::{
    fuzzy_matcher::{FuzzyTripMatcher, JourneyReference},
    model::{FeedScopedId, TransitService, Trip},
    snapshot::TimetableSnapshotBuffer,
    time::is_valid_delay,
    timetable::RealTimeState,
    trip_times_mutation::delayed_trip_times,
    update::VehicleActivity,
};
use chrono::NaiveDate;
use std::sync::Arc;

// A framed ref names a scheduled trip or a trip added on that service date.
fn matched_trip(
    service: &dyn TransitService,
    feed_id: &str,
    buffer: &TimetableSnapshotBuffer,
    activity: &VehicleActivity,
    service_date: NaiveDate,
) -> Option<Arc<Trip>> {
    let exact_trip = activity
        .framed_vehicle_journey_ref
        .as_ref()
        .and_then(|framed_ref| {
            let trip_id =
                FeedScopedId::new(feed_id, framed_ref.dated_vehicle_journey_ref.as_str());
            service
                .trip(&trip_id)
                .or_else(|| buffer.realtime_added_trip(&trip_id, service_date))
        });
    if let Some(trip) = exact_trip {
        return Some(trip.clone());
    }
    let reference =
        JourneyReference::from_vehicle_activity(activity, feed_id, service_date, service);
    FuzzyTripMatcher::new(service)
        .with_realtime_patterns(buffer)
        .match_single_trip(&reference)
}

/// Applies the delay of the vehicle to its trip, from its current stop to the end.
pub(super) fn plan_vehicle_activity(
    service: &dyn TransitService,
    feed_id: &str,
    buffer: &TimetableSnapshotBuffer,
    activity: &VehicleActivity,
) -> Result<Vec<BufferChange>, JourneyError> {
    let service_date = activity
        .service_date(&service.timezone())
        .ok_or(JourneyError::MissingServiceDate)?;
    let trip =
        matched_trip(service, feed_id, buffer, activity, service_date).ok_or(JourneyError::NoMatch)?;
    let delay = activity.delay.ok_or(JourneyError::MissingField("Delay"))?;
    if !is_valid_delay(delay) {
        return Err(JourneyError::InvalidTime(format!(
            "Delay of {} seconds for trip {} is out of range.",
            delay, trip.id
        )));
    }

    let (pattern, on_realtime_pattern) = match buffer.realtime_added_pattern(&trip.id, service_date)
    {
        Some(pattern) => (pattern.clone(), true),
        None => {
            let pattern = service
                .pattern_for_trip(&trip.id)
                .ok_or(JourneyError::NoMatch)?;
            (pattern.clone(), false)
        }
    };
    let current = buffer
        .resolve(&pattern, Some(service_date))
        .trip_times(&trip.id)
        .ok_or_else(|| JourneyError::TripNotInTimetable {
            trip_id: trip.id.clone(),
            pattern_id: pattern.id().clone(),
        })?;
    if current.is_canceled() {
        return Err(JourneyError::CanceledTrip(trip.id.clone()));
    }

    let from_stop = activity
        .monitored_call
        .as_ref()
        .and_then(|call| {
            let stop_id = FeedScopedId::new(feed_id, call.stop_point_ref.as_str());
            call.order
                .map(|order| (order as usize).saturating_sub(1))
                .or_else(|| {
                    let stops = pattern.stop_pattern().stops();
                    stops.iter().position(|stop| *stop == stop_id)
                })
        })
        .unwrap_or(0);

    let mut trip_times = delayed_trip_times(current, from_stop, delay)?;
    let state = match current.real_time_state() {
        RealTimeState::Added => RealTimeState::Added,
        _ if on_realtime_pattern => RealTimeState::Modified,
        _ => RealTimeState::Updated,
    };
    trip_times.set_real_time_state(state);
    Ok(vec![BufferChange::update(pattern, trip_times, service_date)])
}
