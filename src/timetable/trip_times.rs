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

use crate::model::{FeedScopedId, Trip, TripPattern};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RealTimeState {
    Scheduled,
    Updated,
    /// A trip that does not exist in the static schedule.
    Added,
    /// A scheduled trip moved to a pattern created by real time.
    Modified,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopRealTimeFlags {
    pub cancelled: bool,
    pub no_data: bool,
    pub prediction_inaccurate: bool,
}

/// Times of one trip along the stops of its pattern, in seconds since the
/// start of the service day.
///
/// Scheduled times are shared between all copies of a trip times, real time
/// times are only allocated once the trip times are updated.
#[derive(Debug, Clone, PartialEq)]
pub struct TripTimes {
    trip: Arc<Trip>,
    scheduled_arrival_times: Arc<[i32]>,
    scheduled_departure_times: Arc<[i32]>,
    arrival_times: Option<Vec<i32>>,
    departure_times: Option<Vec<i32>>,
    stop_flags: Vec<StopRealTimeFlags>,
    real_time_state: RealTimeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPair {
    pub upstream: usize,
    pub downstream: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripTimesError {
    NoStops,
    StopCountMismatch { expected: usize, actual: usize },
    DepartureBeforeArrival(usize),
    DecreasingTimes(PositionPair),
}

impl std::error::Error for TripTimesError {}

impl Display for TripTimesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TripTimesError::NoStops => write!(f, "Trip times without any stop."),
            TripTimesError::StopCountMismatch { expected, actual } => write!(
                f,
                "Trip times have {} stops, but {} were expected.",
                actual, expected
            ),
            TripTimesError::DepartureBeforeArrival(position) => write!(
                f,
                "Departure happens before arrival at stop position {}.",
                position
            ),
            TripTimesError::DecreasingTimes(position_pair) => write!(
                f,
                "Arrival at stop position {} happens before departure from upstream stop position {}.",
                position_pair.downstream, position_pair.upstream
            ),
        }
    }
}

impl TripTimes {
    pub fn new(
        trip: Arc<Trip>,
        arrival_times: Vec<i32>,
        departure_times: Vec<i32>,
    ) -> Result<Self, TripTimesError> {
        if arrival_times.is_empty() {
            return Err(TripTimesError::NoStops);
        }
        if arrival_times.len() != departure_times.len() {
            return Err(TripTimesError::StopCountMismatch {
                expected: arrival_times.len(),
                actual: departure_times.len(),
            });
        }
        let nb_of_stops = arrival_times.len();
        let trip_times = Self {
            trip,
            scheduled_arrival_times: arrival_times.into(),
            scheduled_departure_times: departure_times.into(),
            arrival_times: None,
            departure_times: None,
            stop_flags: vec![StopRealTimeFlags::default(); nb_of_stops],
            real_time_state: RealTimeState::Scheduled,
        };
        trip_times.validate()?;
        Ok(trip_times)
    }

    pub fn trip(&self) -> &Arc<Trip> {
        &self.trip
    }

    pub fn trip_id(&self) -> &FeedScopedId {
        &self.trip.id
    }

    pub fn number_of_stops(&self) -> usize {
        self.scheduled_arrival_times.len()
    }

    pub fn real_time_state(&self) -> RealTimeState {
        self.real_time_state
    }

    pub fn is_canceled(&self) -> bool {
        self.real_time_state == RealTimeState::Canceled
    }

    pub fn is_scheduled(&self) -> bool {
        self.real_time_state == RealTimeState::Scheduled
    }

    pub fn scheduled_arrival_time(&self, stop: usize) -> i32 {
        self.scheduled_arrival_times[stop]
    }

    pub fn scheduled_departure_time(&self, stop: usize) -> i32 {
        self.scheduled_departure_times[stop]
    }

    pub fn arrival_time(&self, stop: usize) -> i32 {
        match &self.arrival_times {
            Some(times) => times[stop],
            None => self.scheduled_arrival_times[stop],
        }
    }

    pub fn departure_time(&self, stop: usize) -> i32 {
        match &self.departure_times {
            Some(times) => times[stop],
            None => self.scheduled_departure_times[stop],
        }
    }

    pub fn arrival_delay(&self, stop: usize) -> i32 {
        self.arrival_time(stop) - self.scheduled_arrival_time(stop)
    }

    pub fn departure_delay(&self, stop: usize) -> i32 {
        self.departure_time(stop) - self.scheduled_departure_time(stop)
    }

    pub fn first_departure_time(&self) -> i32 {
        self.departure_time(0)
    }

    pub fn stop_flags(&self, stop: usize) -> StopRealTimeFlags {
        self.stop_flags[stop]
    }

    pub fn is_cancelled_stop(&self, stop: usize) -> bool {
        self.stop_flags[stop].cancelled
    }

    /// A passenger can board at `stop` when the pattern allows it and the stop is served.
    pub fn can_board(&self, pattern: &TripPattern, stop: usize) -> bool {
        stop < self.number_of_stops() && !self.is_cancelled_stop(stop) && pattern.can_board(stop)
    }

    pub fn can_alight(&self, pattern: &TripPattern, stop: usize) -> bool {
        stop < self.number_of_stops() && !self.is_cancelled_stop(stop) && pattern.can_alight(stop)
    }

    pub fn is_no_data_stop(&self, stop: usize) -> bool {
        self.stop_flags[stop].no_data
    }

    pub fn is_prediction_inaccurate(&self, stop: usize) -> bool {
        self.stop_flags[stop].prediction_inaccurate
    }

    pub fn shares_scheduled_times_with(&self, other: &TripTimes) -> bool {
        Arc::ptr_eq(&self.scheduled_arrival_times, &other.scheduled_arrival_times)
            && Arc::ptr_eq(
                &self.scheduled_departure_times,
                &other.scheduled_departure_times,
            )
    }

    pub fn update_arrival_time(&mut self, stop: usize, time: i32) {
        let scheduled = &self.scheduled_arrival_times;
        self.arrival_times
            .get_or_insert_with(|| scheduled.to_vec())[stop] = time;
    }

    pub fn update_departure_time(&mut self, stop: usize, time: i32) {
        let scheduled = &self.scheduled_departure_times;
        self.departure_times
            .get_or_insert_with(|| scheduled.to_vec())[stop] = time;
    }

    pub fn update_arrival_delay(&mut self, stop: usize, delay: i32) {
        let time = self.scheduled_arrival_time(stop).saturating_add(delay);
        self.update_arrival_time(stop, time);
    }

    pub fn update_departure_delay(&mut self, stop: usize, delay: i32) {
        let time = self.scheduled_departure_time(stop).saturating_add(delay);
        self.update_departure_time(stop, time);
    }

    pub fn set_stop_flags(&mut self, stop: usize, flags: StopRealTimeFlags) {
        self.stop_flags[stop] = flags;
    }

    pub fn set_cancelled_stop(&mut self, stop: usize, cancelled: bool) {
        self.stop_flags[stop].cancelled = cancelled;
    }

    pub fn set_no_data_stop(&mut self, stop: usize, no_data: bool) {
        self.stop_flags[stop].no_data = no_data;
    }

    pub fn set_prediction_inaccurate(&mut self, stop: usize, inaccurate: bool) {
        self.stop_flags[stop].prediction_inaccurate = inaccurate;
    }

    pub fn set_real_time_state(&mut self, state: RealTimeState) {
        self.real_time_state = state;
    }

    pub fn cancel_trip(&mut self) {
        for flags in self.stop_flags.iter_mut() {
            flags.cancelled = true;
        }
        self.real_time_state = RealTimeState::Canceled;
    }

    /// Checks that times never go back in time along the trip.
    ///
    /// Cancelled stops are not served, so their times are not checked.
    pub fn validate(&self) -> Result<(), TripTimesError> {
        // position and departure time of the last served stop
        let mut upstream: Option<(usize, i32)> = None;
        for stop in 0..self.number_of_stops() {
            if self.is_cancelled_stop(stop) {
                continue;
            }
            let arrival = self.arrival_time(stop);
            let departure = self.departure_time(stop);
            if departure < arrival {
                return Err(TripTimesError::DepartureBeforeArrival(stop));
            }
            if let Some((upstream_stop, upstream_departure)) = upstream {
                if arrival < upstream_departure {
                    return Err(TripTimesError::DecreasingTimes(PositionPair {
                        upstream: upstream_stop,
                        downstream: stop,
                    }));
                }
            }
            upstream = Some((stop, departure));
        }
        Ok(())
    }
}
