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
    model::{FeedScopedId, Route, TransitService, Trip, TripPattern},
    pattern_cache::PatternCache,
    snapshot::TimetableSnapshotBuffer,
    time::service_day_start,
    timetable::{RealTimeState, TripTimes},
    trip_times_mutation::{
        added_stop_pattern, added_trip_times, align_calls, cancelled_trip_times,
        modified_stop_pattern, updated_trip_times, AlignedCall,
    },
    update::{Call, EstimatedVehicleJourney, JourneyKind},
};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

pub(super) struct JourneyPlan {
    pub changes: Vec<BufferChange>,
    pub added: bool,
}

// A trip on a pattern, as known before the journey is applied.
struct Target {
    trip: Arc<Trip>,
    pattern: Arc<TripPattern>,
    // the trip only exists in real time data
    added: bool,
}

/// Computes the buffer changes of one estimated vehicle journey.
///
/// Only writer-private caches are modified here, the buffer is read only.
pub(super) struct JourneyPlanner<'a> {
    pub service: &'a dyn TransitService,
    pub feed_id: &'a str,
    pub buffer: &'a TimetableSnapshotBuffer,
    pub pattern_cache: &'a mut PatternCache,
    pub realtime_routes: &'a mut HashMap<FeedScopedId, Arc<Route>>,
}

impl JourneyPlanner<'_> {
    pub fn plan(&mut self, journey: &EstimatedVehicleJourney) -> Result<JourneyPlan, JourneyError> {
        let timezone = self.service.timezone();
        let service_date = journey
            .service_date(&timezone)
            .ok_or(JourneyError::MissingServiceDate)?;
        let day_start = service_day_start(service_date, &timezone).ok_or_else(|| {
            JourneyError::InvalidTime(format!("No service day start on {}.", service_date))
        })?;

        let kind = journey.kind();
        if kind == JourneyKind::ExtraJourney {
            let changes = self.plan_added_trip(journey, service_date, &day_start)?;
            return Ok(JourneyPlan {
                changes,
                added: true,
            });
        }

        let mut changes = Vec::new();
        for target in self.targets(journey, service_date)? {
            match kind {
                JourneyKind::Cancellation => {
                    self.plan_cancellation(&target, service_date, &mut changes)?
                }
                _ => {
                    self.plan_update(journey, &target, service_date, &day_start, &mut changes)?
                }
            }
        }
        Ok(JourneyPlan {
            changes,
            added: false,
        })
    }

    fn targets(
        &self,
        journey: &EstimatedVehicleJourney,
        service_date: NaiveDate,
    ) -> Result<Vec<Target>, JourneyError> {
        if let Some(journey_ref) = journey.exact_journey_ref() {
            let trip_id = FeedScopedId::new(self.feed_id, journey_ref);
            if let Some(target) = self.exact_target(&trip_id, service_date)? {
                return Ok(vec![target]);
            }
            debug!(
                "No trip {} on {}, trying to match {}.",
                trip_id,
                service_date,
                journey.describe()
            );
        }

        let reference = JourneyReference::from_estimated_journey(
            journey,
            self.feed_id,
            service_date,
            self.service,
        );
        let trips = FuzzyTripMatcher::new(self.service)
            .with_realtime_patterns(self.buffer)
            .match_trips(&reference);
        if trips.is_empty() {
            return Err(JourneyError::NoMatch);
        }
        trips
            .into_iter()
            .map(|trip| {
                let pattern = self
                    .service
                    .pattern_for_trip(&trip.id)
                    .ok_or(JourneyError::NoMatch)?
                    .clone();
                Ok(Target {
                    trip,
                    pattern,
                    added: false,
                })
            })
            .collect()
    }

    fn exact_target(
        &self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> Result<Option<Target>, JourneyError> {
        if let Some(trip) = self.service.trip(trip_id) {
            if !self.service.service_runs_on(&trip.service_id, service_date) {
                return Err(JourneyError::TripNotRunning {
                    trip_id: trip_id.clone(),
                    service_date,
                });
            }
            let pattern = self
                .service
                .pattern_for_trip(trip_id)
                .ok_or(JourneyError::NoMatch)?;
            return Ok(Some(Target {
                trip: trip.clone(),
                pattern: pattern.clone(),
                added: false,
            }));
        }
        let added_trip = self.buffer.realtime_added_trip(trip_id, service_date);
        let added_pattern = self.buffer.realtime_added_pattern(trip_id, service_date);
        match (added_trip, added_pattern) {
            (Some(trip), Some(pattern)) => Ok(Some(Target {
                trip: trip.clone(),
                pattern: pattern.clone(),
                added: true,
            })),
            _ => Ok(None),
        }
    }

    // trip times of the trip currently stored in the buffer for this date
    fn current_trip_times(
        &self,
        pattern: &TripPattern,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> Result<Arc<TripTimes>, JourneyError> {
        self.buffer
            .resolve(pattern, Some(service_date))
            .trip_times(trip_id)
            .cloned()
            .ok_or_else(|| JourneyError::TripNotInTimetable {
                trip_id: trip_id.clone(),
                pattern_id: pattern.id().clone(),
            })
    }

    fn scheduled_trip_times(
        pattern: &TripPattern,
        trip_id: &FeedScopedId,
    ) -> Result<Arc<TripTimes>, JourneyError> {
        pattern
            .scheduled_timetable()
            .trip_times(trip_id)
            .cloned()
            .ok_or_else(|| JourneyError::TripNotInTimetable {
                trip_id: trip_id.clone(),
                pattern_id: pattern.id().clone(),
            })
    }

    fn plan_cancellation(
        &self,
        target: &Target,
        service_date: NaiveDate,
        changes: &mut Vec<BufferChange>,
    ) -> Result<(), JourneyError> {
        let trip_id = &target.trip.id;
        if target.added {
            let current = self.current_trip_times(&target.pattern, trip_id, service_date)?;
            changes.push(BufferChange::update(
                target.pattern.clone(),
                cancelled_trip_times(&current),
                service_date,
            ));
            return Ok(());
        }

        let scheduled = Self::scheduled_trip_times(&target.pattern, trip_id)?;
        changes.push(BufferChange::update(
            target.pattern.clone(),
            cancelled_trip_times(&scheduled),
            service_date,
        ));
        // a modified trip is cancelled on its realtime pattern too
        if let Some(realtime_pattern) = self.buffer.realtime_added_pattern(trip_id, service_date) {
            if let Ok(current) = self.current_trip_times(realtime_pattern, trip_id, service_date) {
                changes.push(BufferChange::update(
                    realtime_pattern.clone(),
                    cancelled_trip_times(&current),
                    service_date,
                ));
            }
        }
        Ok(())
    }

    fn check_stops_exist(&self, calls: &[&Call]) -> Result<(), JourneyError> {
        for call in calls {
            let stop_id = FeedScopedId::new(self.feed_id, call.stop_point_ref.as_str());
            if self.service.stop(&stop_id).is_none() {
                return Err(JourneyError::UnknownStop(stop_id));
            }
        }
        Ok(())
    }

    // Calls are placed on the stops of the pattern, or on the stops a previous update
    // moved the trip to on this date.
    fn aligned_calls<'c>(
        &self,
        calls: &[&'c Call],
        target: &Target,
        service_date: NaiveDate,
    ) -> Result<Vec<AlignedCall<'c>>, JourneyError> {
        let err = match align_calls(calls, target.pattern.stop_pattern(), self.feed_id) {
            Ok(aligned_calls) => return Ok(aligned_calls),
            Err(err) => err,
        };
        if target.added {
            return Err(err.into());
        }
        match self
            .buffer
            .realtime_added_pattern(&target.trip.id, service_date)
        {
            Some(realtime_pattern) => {
                Ok(align_calls(calls, realtime_pattern.stop_pattern(), self.feed_id)?)
            }
            None => Err(err.into()),
        }
    }

    fn plan_update(
        &mut self,
        journey: &EstimatedVehicleJourney,
        target: &Target,
        service_date: NaiveDate,
        day_start: &DateTime<Tz>,
        changes: &mut Vec<BufferChange>,
    ) -> Result<(), JourneyError> {
        let trip_id = &target.trip.id;
        let calls: Vec<&Call> = journey.calls().collect();
        self.check_stops_exist(&calls)?;
        let aligned_calls = self.aligned_calls(&calls, target, service_date)?;

        let baseline = if target.added {
            self.current_trip_times(&target.pattern, trip_id, service_date)?
        } else {
            Self::scheduled_trip_times(&target.pattern, trip_id)?
        };
        let mut trip_times = updated_trip_times(
            &baseline,
            &aligned_calls,
            day_start,
            journey.prediction_inaccurate,
        )?;
        let stop_pattern =
            modified_stop_pattern(target.pattern.stop_pattern(), &aligned_calls, self.feed_id);

        if &stop_pattern == target.pattern.stop_pattern() {
            if target.added {
                trip_times.set_real_time_state(RealTimeState::Added);
            } else {
                changes.push(BufferChange::RemovePreviousRealtimeUpdate {
                    trip_id: trip_id.clone(),
                    service_date,
                });
            }
            changes.push(BufferChange::update(
                target.pattern.clone(),
                trip_times,
                service_date,
            ));
            return Ok(());
        }

        // the journey does not serve the stops of its pattern anymore
        let original_pattern = if target.added {
            trip_times.set_real_time_state(RealTimeState::Added);
            target.pattern.original_pattern().cloned()
        } else {
            trip_times.set_real_time_state(RealTimeState::Modified);
            changes.push(BufferChange::update(
                target.pattern.clone(),
                cancelled_trip_times(&baseline),
                service_date,
            ));
            Some(target.pattern.id().clone())
        };
        let pattern = self.pattern_cache.get_or_create(
            &stop_pattern,
            &target.trip,
            target.pattern.route(),
            original_pattern.as_ref(),
            service_date,
        );
        changes.push(BufferChange::RemovePreviousRealtimeUpdate {
            trip_id: trip_id.clone(),
            service_date,
        });
        changes.push(BufferChange::RegisterAddedPattern {
            trip_id: trip_id.clone(),
            service_date,
            pattern: pattern.clone(),
        });
        changes.push(BufferChange::update(pattern, trip_times, service_date));
        Ok(())
    }

    fn plan_added_trip(
        &mut self,
        journey: &EstimatedVehicleJourney,
        service_date: NaiveDate,
        day_start: &DateTime<Tz>,
    ) -> Result<Vec<BufferChange>, JourneyError> {
        let code = journey
            .estimated_vehicle_journey_code
            .as_deref()
            .ok_or(JourneyError::MissingField("EstimatedVehicleJourneyCode"))?;
        let line_ref = journey
            .line_ref
            .as_deref()
            .ok_or(JourneyError::MissingField("LineRef"))?;
        let operator_ref = journey
            .operator_ref
            .as_deref()
            .ok_or(JourneyError::MissingField("OperatorRef"))?;
        let calls: Vec<&Call> = journey.calls().collect();
        if calls.is_empty() {
            return Err(JourneyError::MissingField("EstimatedCalls"));
        }

        let trip_id = FeedScopedId::new(self.feed_id, code);
        if self.service.trip(&trip_id).is_some() {
            return Err(JourneyError::AddedTripAlreadyExists(trip_id));
        }
        let operator_id = FeedScopedId::new(self.feed_id, operator_ref);
        if self.service.operator(&operator_id).is_none() {
            return Err(JourneyError::UnknownOperator(operator_id));
        }
        self.check_stops_exist(&calls)?;
        let route = self.route_for_added_trip(line_ref, &operator_id)?;

        let trip = Arc::new(Trip {
            id: trip_id.clone(),
            route_id: route.id.clone(),
            service_id: self.service.service_id_for_date(self.feed_id, service_date),
            headsign: journey.destination_name.clone(),
            operator_id: Some(operator_id),
        });
        let trip_times = added_trip_times(
            trip.clone(),
            &calls,
            day_start,
            journey.prediction_inaccurate,
            journey.cancellation,
        )?;
        let stop_pattern = added_stop_pattern(&calls, self.feed_id);
        let pattern =
            self.pattern_cache
                .get_or_create(&stop_pattern, &trip, &route, None, service_date);

        Ok(vec![
            BufferChange::RemovePreviousRealtimeUpdate {
                trip_id: trip_id.clone(),
                service_date,
            },
            BufferChange::RegisterAddedTrip { trip, service_date },
            BufferChange::RegisterAddedPattern {
                trip_id,
                service_date,
                pattern: pattern.clone(),
            },
            BufferChange::update(pattern, trip_times, service_date),
        ])
    }

    // The static route of the line, or a route created for it by a previous added trip.
    // Otherwise a new route gets the agency of the first route of the operator.
    fn route_for_added_trip(
        &mut self,
        line_ref: &str,
        operator_id: &FeedScopedId,
    ) -> Result<Arc<Route>, JourneyError> {
        let route_id = FeedScopedId::new(self.feed_id, line_ref);
        if let Some(route) = self.service.route(&route_id) {
            return Ok(route.clone());
        }
        if let Some(route) = self.realtime_routes.get(&route_id) {
            return Ok(route.clone());
        }
        let agency_id = self
            .service
            .routes_for_operator(operator_id)
            .first()
            .map(|route| route.agency_id.clone())
            .ok_or_else(|| JourneyError::NoAgencyForOperator(operator_id.clone()))?;
        debug!(
            "Creating route {} with agency {} for added trips.",
            route_id, agency_id
        );
        let route = Arc::new(Route {
            id: route_id.clone(),
            short_name: Some(line_ref.to_string()),
            line_ref: Some(line_ref.to_string()),
            agency_id,
            operator_id: Some(operator_id.clone()),
        });
        self.realtime_routes.insert(route_id, route.clone());
        Ok(route)
    }
}
