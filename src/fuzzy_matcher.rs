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

//! Matching of real time journeys without an exact trip id onto scheduled trips.

use crate::{
    model::{FeedScopedId, TransitService, Trip, TripPattern},
    snapshot::TimetableSnapshotBuffer,
    time::{seconds_since_service_day_start, service_day_start},
    update::{EstimatedVehicleJourney, VehicleActivity},
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::trace;

/// What a real time message tells about the journey it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyReference {
    pub feed_id: String,
    pub line_ref: Option<String>,
    pub vehicle_ref: Option<String>,
    pub origin_ref: Option<String>,
    /// Position of the origin stop in the trip.
    pub origin_position: usize,
    pub destination_ref: Option<String>,
    pub service_date: NaiveDate,
    /// Aimed departure at the origin, in seconds since the start of the service day.
    pub aimed_departure: Option<i32>,
}

impl JourneyReference {
    /// Origin is the first call, destination the last one.
    pub fn from_estimated_journey(
        journey: &EstimatedVehicleJourney,
        feed_id: &str,
        service_date: NaiveDate,
        service: &dyn TransitService,
    ) -> Self {
        let first_call = journey.calls().next();
        let last_call = journey.calls().last();
        let aimed_departure = first_call
            .and_then(|call| call.aimed_departure_or_arrival())
            .and_then(|datetime| {
                let day_start = service_day_start(service_date, &service.timezone())?;
                seconds_since_service_day_start(datetime, &day_start)
            });
        Self {
            feed_id: feed_id.to_string(),
            line_ref: journey.line_ref.clone(),
            vehicle_ref: journey.vehicle_ref.clone(),
            origin_ref: first_call.map(|call| call.stop_point_ref.clone()),
            origin_position: first_call
                .and_then(|call| call.order)
                .map_or(0, |order| (order as usize).saturating_sub(1)),
            destination_ref: last_call.map(|call| call.stop_point_ref.clone()),
            service_date,
            aimed_departure,
        }
    }

    pub fn from_vehicle_activity(
        activity: &VehicleActivity,
        feed_id: &str,
        service_date: NaiveDate,
        service: &dyn TransitService,
    ) -> Self {
        let aimed_departure = activity
            .origin_aimed_departure_time
            .as_ref()
            .and_then(|datetime| {
                let day_start = service_day_start(service_date, &service.timezone())?;
                seconds_since_service_day_start(datetime, &day_start)
            });
        Self {
            feed_id: feed_id.to_string(),
            line_ref: activity.line_ref.clone(),
            vehicle_ref: activity.vehicle_ref.clone(),
            origin_ref: activity.origin_ref.clone(),
            origin_position: 0,
            destination_ref: activity.destination_ref.clone(),
            service_date,
            aimed_departure,
        }
    }
}

/// Read only view of the static schedule used to find the trips a journey refers to.
///
/// With real time patterns, a trip already moved to another pattern on the service date
/// also matches the origin and destination it serves now.
pub struct FuzzyTripMatcher<'s> {
    service: &'s dyn TransitService,
    realtime_patterns: Option<&'s TimetableSnapshotBuffer>,
}

impl<'s> FuzzyTripMatcher<'s> {
    pub fn new(service: &'s dyn TransitService) -> Self {
        Self {
            service,
            realtime_patterns: None,
        }
    }

    pub fn with_realtime_patterns(mut self, buffer: &'s TimetableSnapshotBuffer) -> Self {
        self.realtime_patterns = Some(buffer);
        self
    }

    /// All scheduled trips matching `reference`, sorted by id.
    /// An empty result means the journey could not be matched.
    pub fn match_trips(&self, reference: &JourneyReference) -> Vec<Arc<Trip>> {
        let service = self.service;
        let buffer = self.realtime_patterns;
        let stages: [(&str, &dyn Fn(Vec<Arc<Trip>>) -> Vec<Arc<Trip>>); 4] = [
            ("service date", &|trips: Vec<Arc<Trip>>| {
                running_on_service_date(service, reference, trips)
            }),
            ("origin", &|trips: Vec<Arc<Trip>>| {
                starting_at_origin_with(service, buffer, reference, trips)
            }),
            ("destination", &|trips: Vec<Arc<Trip>>| {
                ending_at_destination_with(service, buffer, reference, trips)
            }),
            ("departure time", &|trips: Vec<Arc<Trip>>| {
                departing_at_aimed_time(service, reference, trips)
            }),
        ];
        let mut candidates = candidate_trips(service, reference);
        for (name, stage) in stages {
            if candidates.is_empty() {
                break;
            }
            candidates = stage(candidates);
            trace!("{} candidates left after the {} stage.", candidates.len(), name);
        }
        candidates.sort_by(|lhs, rhs| lhs.id.cmp(&rhs.id));
        candidates.dedup_by(|lhs, rhs| lhs.id == rhs.id);
        candidates
    }

    pub fn match_single_trip(&self, reference: &JourneyReference) -> Option<Arc<Trip>> {
        let trips = self.match_trips(reference);
        disambiguate(reference.line_ref.as_deref(), trips)
    }
}

// The static pattern of the trip, then the one real time moved it to on the service date.
fn patterns_of<'a>(
    service: &'a dyn TransitService,
    buffer: Option<&'a TimetableSnapshotBuffer>,
    trip: &Trip,
    service_date: NaiveDate,
) -> impl Iterator<Item = &'a Arc<TripPattern>> {
    let realtime_pattern =
        buffer.and_then(|buffer| buffer.realtime_added_pattern(&trip.id, service_date));
    service
        .pattern_for_trip(&trip.id)
        .into_iter()
        .chain(realtime_pattern)
}

/// Trip whose id is the vehicle ref, otherwise all trips of the routes of the line.
pub fn candidate_trips(
    service: &dyn TransitService,
    reference: &JourneyReference,
) -> Vec<Arc<Trip>> {
    if let Some(vehicle_ref) = &reference.vehicle_ref {
        let trip_id = FeedScopedId::new(reference.feed_id.as_str(), vehicle_ref.as_str());
        if let Some(trip) = service.trip(&trip_id) {
            return vec![trip.clone()];
        }
    }
    let line_ref = match &reference.line_ref {
        Some(line_ref) => line_ref,
        None => return Vec::new(),
    };
    service
        .routes_for_line(line_ref)
        .into_iter()
        .filter(|route| route.id.belongs_to_feed(&reference.feed_id))
        .flat_map(|route| service.trips_for_route(&route.id).iter().cloned())
        .collect()
}

pub fn running_on_service_date(
    service: &dyn TransitService,
    reference: &JourneyReference,
    candidates: Vec<Arc<Trip>>,
) -> Vec<Arc<Trip>> {
    candidates
        .into_iter()
        .filter(|trip| service.service_runs_on(&trip.service_id, reference.service_date))
        .collect()
}

fn stop_matches(
    service: &dyn TransitService,
    stop_id: &FeedScopedId,
    stop_ref: &FeedScopedId,
) -> bool {
    if stop_id == stop_ref {
        return true;
    }
    match (service.stop(stop_id), service.stop(stop_ref)) {
        (Some(stop), Some(referenced_stop)) => stop.is_part_of_same_station_as(referenced_stop),
        _ => false,
    }
}

pub fn starting_at_origin(
    service: &dyn TransitService,
    reference: &JourneyReference,
    candidates: Vec<Arc<Trip>>,
) -> Vec<Arc<Trip>> {
    starting_at_origin_with(service, None, reference, candidates)
}

fn starting_at_origin_with(
    service: &dyn TransitService,
    buffer: Option<&TimetableSnapshotBuffer>,
    reference: &JourneyReference,
    candidates: Vec<Arc<Trip>>,
) -> Vec<Arc<Trip>> {
    let origin = match &reference.origin_ref {
        Some(origin_ref) => FeedScopedId::new(reference.feed_id.as_str(), origin_ref.as_str()),
        None => return candidates,
    };
    candidates
        .into_iter()
        .filter(|trip| {
            patterns_of(service, buffer, trip, reference.service_date).any(|pattern| {
                pattern
                    .stop(reference.origin_position)
                    .map_or(false, |stop_id| stop_matches(service, stop_id, &origin))
            })
        })
        .collect()
}

pub fn ending_at_destination(
    service: &dyn TransitService,
    reference: &JourneyReference,
    candidates: Vec<Arc<Trip>>,
) -> Vec<Arc<Trip>> {
    ending_at_destination_with(service, None, reference, candidates)
}

fn ending_at_destination_with(
    service: &dyn TransitService,
    buffer: Option<&TimetableSnapshotBuffer>,
    reference: &JourneyReference,
    candidates: Vec<Arc<Trip>>,
) -> Vec<Arc<Trip>> {
    let destination = match &reference.destination_ref {
        Some(destination_ref) => {
            FeedScopedId::new(reference.feed_id.as_str(), destination_ref.as_str())
        }
        None => return candidates,
    };
    candidates
        .into_iter()
        .filter(|trip| {
            patterns_of(service, buffer, trip, reference.service_date).any(|pattern| {
                pattern
                    .stop_pattern()
                    .last_stop()
                    .map_or(false, |stop_id| stop_matches(service, stop_id, &destination))
            })
        })
        .collect()
}

/// The scheduled departure at the origin must be the aimed one, when it is known.
pub fn departing_at_aimed_time(
    service: &dyn TransitService,
    reference: &JourneyReference,
    candidates: Vec<Arc<Trip>>,
) -> Vec<Arc<Trip>> {
    let aimed_departure = match reference.aimed_departure {
        Some(aimed_departure) => aimed_departure,
        None => return candidates,
    };
    candidates
        .into_iter()
        .filter(|trip| {
            service
                .pattern_for_trip(&trip.id)
                .and_then(|pattern| pattern.scheduled_timetable().trip_times(&trip.id))
                .filter(|trip_times| reference.origin_position < trip_times.number_of_stops())
                .map_or(false, |trip_times| {
                    trip_times.scheduled_departure_time(reference.origin_position)
                        == aimed_departure
                })
        })
        .collect()
}

/// Prefers the trip of the route named by the line ref, then the first one.
pub fn disambiguate(line_ref: Option<&str>, trips: Vec<Arc<Trip>>) -> Option<Arc<Trip>> {
    let preferred = line_ref.and_then(|line_ref| {
        trips
            .iter()
            .find(|trip| trip.route_id.id == line_ref)
            .cloned()
    });
    preferred.or_else(|| trips.into_iter().next())
}
