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

use super::{
    service::synthetic_service_date, Agency, FeedScopedId, FlowDirection, Operator, Route, Stop,
    StopPattern, TransitService, Trip, TripPattern,
};
use crate::timetable::{FrequencyEntry, Timetable, TimetableEntry, TripTimes, TripTimesError};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt::{Display, Formatter},
    sync::Arc,
};
use tracing::{debug, info};

/// Static schedule, as it is (de)serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleData {
    pub timezone: Tz,
    #[serde(default)]
    pub agencies: Vec<Agency>,
    #[serde(default)]
    pub operators: Vec<Operator>,
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub calendars: Vec<CalendarData>,
    #[serde(default)]
    pub trips: Vec<TripData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarData {
    pub service_id: FeedScopedId,
    pub dates: BTreeSet<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripData {
    #[serde(flatten)]
    pub trip: Trip,
    pub stop_times: Vec<StopTimeData>,
    #[serde(default)]
    pub frequency: Option<FrequencyData>,
}

/// Times are in seconds since the start of the service day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTimeData {
    pub stop_id: FeedScopedId,
    pub arrival_time: i32,
    pub departure_time: i32,
    #[serde(default)]
    pub flow: FlowDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyData {
    pub start_time: i32,
    pub end_time: i32,
    pub headway_secs: i32,
    #[serde(default)]
    pub exact_times: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    DuplicateId(FeedScopedId),
    UnknownStop {
        trip_id: FeedScopedId,
        stop_id: FeedScopedId,
    },
    UnknownRoute {
        trip_id: FeedScopedId,
        route_id: FeedScopedId,
    },
    UnknownAgency {
        route_id: FeedScopedId,
        agency_id: FeedScopedId,
    },
    InvalidTripTimes {
        trip_id: FeedScopedId,
        error: TripTimesError,
    },
}

impl std::error::Error for ModelError {}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::DuplicateId(id) => write!(f, "The id {} is used twice.", id),
            ModelError::UnknownStop { trip_id, stop_id } => {
                write!(f, "Trip {} calls at unknown stop {}.", trip_id, stop_id)
            }
            ModelError::UnknownRoute { trip_id, route_id } => {
                write!(f, "Trip {} belongs to unknown route {}.", trip_id, route_id)
            }
            ModelError::UnknownAgency {
                route_id,
                agency_id,
            } => write!(
                f,
                "Route {} is run by unknown agency {}.",
                route_id, agency_id
            ),
            ModelError::InvalidTripTimes { trip_id, error } => {
                write!(f, "Trip {} has invalid stop times. {}", trip_id, error)
            }
        }
    }
}

/// In memory static schedule, with trips grouped into patterns.
#[derive(Debug)]
pub struct BaseModel {
    timezone: Tz,
    agencies: HashMap<FeedScopedId, Agency>,
    operators: HashMap<FeedScopedId, Operator>,
    stops: HashMap<FeedScopedId, Stop>,
    routes: HashMap<FeedScopedId, Arc<Route>>,
    calendars: HashMap<FeedScopedId, BTreeSet<NaiveDate>>,
    trips: HashMap<FeedScopedId, Arc<Trip>>,
    trips_by_route: HashMap<FeedScopedId, Vec<Arc<Trip>>>,
    patterns: HashMap<FeedScopedId, Arc<TripPattern>>,
    pattern_by_trip: HashMap<FeedScopedId, Arc<TripPattern>>,
}

fn insert_unique<T>(
    map: &mut HashMap<FeedScopedId, T>,
    id: &FeedScopedId,
    value: T,
) -> Result<(), ModelError> {
    if map.insert(id.clone(), value).is_some() {
        return Err(ModelError::DuplicateId(id.clone()));
    }
    Ok(())
}

impl BaseModel {
    pub fn empty(timezone: Tz) -> Self {
        Self {
            timezone,
            agencies: HashMap::new(),
            operators: HashMap::new(),
            stops: HashMap::new(),
            routes: HashMap::new(),
            calendars: HashMap::new(),
            trips: HashMap::new(),
            trips_by_route: HashMap::new(),
            patterns: HashMap::new(),
            pattern_by_trip: HashMap::new(),
        }
    }

    pub fn from_data(data: ScheduleData) -> Result<Self, ModelError> {
        let mut model = Self::empty(data.timezone);

        for agency in data.agencies {
            let id = agency.id.clone();
            insert_unique(&mut model.agencies, &id, agency)?;
        }
        for operator in data.operators {
            let id = operator.id.clone();
            insert_unique(&mut model.operators, &id, operator)?;
        }
        for stop in data.stops {
            let id = stop.id.clone();
            insert_unique(&mut model.stops, &id, stop)?;
        }
        for route in data.routes {
            if !model.agencies.contains_key(&route.agency_id) {
                return Err(ModelError::UnknownAgency {
                    route_id: route.id.clone(),
                    agency_id: route.agency_id.clone(),
                });
            }
            let id = route.id.clone();
            insert_unique(&mut model.routes, &id, Arc::new(route))?;
        }
        for calendar in data.calendars {
            model
                .calendars
                .entry(calendar.service_id)
                .or_default()
                .extend(calendar.dates);
        }

        // trips sharing the same route and stop pattern share a pattern
        let mut entries_by_pattern: BTreeMap<(FeedScopedId, usize), Vec<TimetableEntry>> =
            BTreeMap::new();
        let mut stop_patterns_by_route: HashMap<FeedScopedId, Vec<StopPattern>> = HashMap::new();
        for trip_data in data.trips {
            let trip_id = trip_data.trip.id.clone();
            let route_id = trip_data.trip.route_id.clone();
            if !model.routes.contains_key(&route_id) {
                return Err(ModelError::UnknownRoute { trip_id, route_id });
            }
            if let Some(stop_time) = trip_data
                .stop_times
                .iter()
                .find(|stop_time| !model.stops.contains_key(&stop_time.stop_id))
            {
                return Err(ModelError::UnknownStop {
                    trip_id,
                    stop_id: stop_time.stop_id.clone(),
                });
            }

            let stop_pattern = StopPattern::new(
                trip_data
                    .stop_times
                    .iter()
                    .map(|stop_time| (stop_time.stop_id.clone(), stop_time.flow)),
            );
            let route_patterns = stop_patterns_by_route.entry(route_id.clone()).or_default();
            let pattern_index = match route_patterns
                .iter()
                .position(|pattern| pattern == &stop_pattern)
            {
                Some(index) => index,
                None => {
                    route_patterns.push(stop_pattern);
                    route_patterns.len() - 1
                }
            };

            let trip = Arc::new(trip_data.trip);
            let (arrivals, departures) = trip_data
                .stop_times
                .iter()
                .map(|stop_time| (stop_time.arrival_time, stop_time.departure_time))
                .unzip();
            let trip_times = TripTimes::new(trip.clone(), arrivals, departures).map_err(
                |error| ModelError::InvalidTripTimes {
                    trip_id: trip_id.clone(),
                    error,
                },
            )?;
            let trip_times = Arc::new(trip_times);
            let entry = match trip_data.frequency {
                Some(frequency) => TimetableEntry::Frequency(Arc::new(FrequencyEntry {
                    start_time: frequency.start_time,
                    end_time: frequency.end_time,
                    headway_secs: frequency.headway_secs,
                    exact_times: frequency.exact_times,
                    trip_times,
                })),
                None => TimetableEntry::Scheduled(trip_times),
            };
            entries_by_pattern
                .entry((route_id.clone(), pattern_index))
                .or_default()
                .push(entry);

            insert_unique(&mut model.trips, &trip_id, trip.clone())?;
            model.trips_by_route.entry(route_id).or_default().push(trip);
        }

        for ((route_id, pattern_index), entries) in entries_by_pattern {
            let route = match model.routes.get(&route_id) {
                Some(route) => route.clone(),
                None => continue,
            };
            let stop_pattern = match stop_patterns_by_route
                .get(&route_id)
                .and_then(|patterns| patterns.get(pattern_index))
            {
                Some(stop_pattern) => stop_pattern.clone(),
                None => continue,
            };
            let pattern_id = FeedScopedId::new(
                route_id.feed_id.clone(),
                format!("{}:{:02}", route_id.id, pattern_index),
            );
            let trip_ids: Vec<FeedScopedId> =
                entries.iter().map(|entry| entry.trip_id().clone()).collect();
            let timetable = Timetable::from_entries(pattern_id.clone(), None, entries);
            let pattern = Arc::new(TripPattern::new(
                pattern_id.clone(),
                route,
                stop_pattern,
                timetable,
            ));
            debug!(
                "Pattern {} created with {} trips.",
                pattern_id,
                trip_ids.len()
            );
            for trip_id in trip_ids {
                model.pattern_by_trip.insert(trip_id, pattern.clone());
            }
            model.patterns.insert(pattern_id, pattern);
        }

        for trips in model.trips_by_route.values_mut() {
            trips.sort_by(|lhs, rhs| lhs.id.cmp(&rhs.id));
        }

        info!(
            "Base model built with {} stops, {} routes, {} trips and {} patterns.",
            model.stops.len(),
            model.routes.len(),
            model.trips.len(),
            model.patterns.len()
        );
        Ok(model)
    }

    pub fn nb_of_trips(&self) -> usize {
        self.trips.len()
    }

    pub fn pattern(&self, pattern_id: &FeedScopedId) -> Option<&Arc<TripPattern>> {
        self.patterns.get(pattern_id)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Arc<TripPattern>> + '_ {
        self.patterns.values()
    }

    pub fn agency(&self, agency_id: &FeedScopedId) -> Option<&Agency> {
        self.agencies.get(agency_id)
    }
}

impl TransitService for BaseModel {
    fn timezone(&self) -> Tz {
        self.timezone
    }

    fn trip(&self, trip_id: &FeedScopedId) -> Option<&Arc<Trip>> {
        self.trips.get(trip_id)
    }

    fn pattern_for_trip(&self, trip_id: &FeedScopedId) -> Option<&Arc<TripPattern>> {
        self.pattern_by_trip.get(trip_id)
    }

    fn service_runs_on(&self, service_id: &FeedScopedId, date: NaiveDate) -> bool {
        match self.calendars.get(service_id) {
            Some(dates) => dates.contains(&date),
            None => synthetic_service_date(service_id) == Some(date),
        }
    }

    fn stop(&self, stop_id: &FeedScopedId) -> Option<&Stop> {
        self.stops.get(stop_id)
    }

    fn route(&self, route_id: &FeedScopedId) -> Option<&Arc<Route>> {
        self.routes.get(route_id)
    }

    fn routes_for_line(&self, line_ref: &str) -> Vec<&Arc<Route>> {
        let mut routes: Vec<&Arc<Route>> = self
            .routes
            .values()
            .filter(|route| route.matches_line_ref(line_ref))
            .collect();
        routes.sort_by(|lhs, rhs| lhs.id.cmp(&rhs.id));
        routes
    }

    fn trips_for_route(&self, route_id: &FeedScopedId) -> &[Arc<Trip>] {
        self.trips_by_route
            .get(route_id)
            .map_or(&[], |trips| trips.as_slice())
    }

    fn operator(&self, operator_id: &FeedScopedId) -> Option<&Operator> {
        self.operators.get(operator_id)
    }

    fn routes_for_operator(&self, operator_id: &FeedScopedId) -> Vec<&Arc<Route>> {
        let mut routes: Vec<&Arc<Route>> = self
            .routes
            .values()
            .filter(|route| route.operator_id.as_ref() == Some(operator_id))
            .collect();
        routes.sort_by(|lhs, rhs| lhs.id.cmp(&rhs.id));
        routes
    }

    fn service_id_for_date(&self, feed_id: &str, date: NaiveDate) -> FeedScopedId {
        // reuse a calendar of the feed running on this date only, when there is one
        let mut single_day_services: Vec<&FeedScopedId> = self
            .calendars
            .iter()
            .filter(|(service_id, dates)| {
                service_id.belongs_to_feed(feed_id)
                    && dates.len() == 1
                    && dates.contains(&date)
            })
            .map(|(service_id, _)| service_id)
            .collect();
        single_day_services.sort();
        match single_day_services.first() {
            Some(service_id) => (*service_id).clone(),
            None => super::service::synthetic_service_id(feed_id, date),
        }
    }
}
