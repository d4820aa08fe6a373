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

use timetable_snapshot::{
    chrono::NaiveDate,
    chrono_tz::{self, Tz},
    model::{
        base_model::{CalendarData, StopTimeData, TripData},
        Agency, FlowDirection, Operator, Route, ScheduleData, Stop, Trip,
    },
    BaseModel, FeedScopedId,
};

pub const DEFAULT_FEED_ID: &str = "F";
pub const DEFAULT_CALENDAR_ID: &str = "default_service";
pub const DEFAULT_ROUTE_ID: &str = "default_route";
pub const DEFAULT_AGENCY_ID: &str = "default_agency";
pub const DEFAULT_OPERATOR_ID: &str = "default_operator";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::UTC;

pub fn id(id: &str) -> FeedScopedId {
    FeedScopedId::new(DEFAULT_FEED_ID, id)
}

/// Builder used to easily create a `BaseModel`
/// Note: if not explicitly set all the trips run on a default calendar
/// covering every day between the two dates given to `new()`,
/// on a default route of a default agency and operator.
pub struct ModelBuilder {
    data: ScheduleData,
}

/// Builder used to create a new trip
pub struct VehicleJourneyBuilder<'a> {
    model: &'a mut ModelBuilder,
    trip_idx: usize,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        let date = "2022-01-10";
        Self::new(date, date)
    }
}

impl ModelBuilder {
    pub fn new(start_validity_period: impl AsDate, end_validity_period: impl AsDate) -> Self {
        let start_date = start_validity_period.as_date();
        let end_date = end_validity_period.as_date();
        assert!(start_date <= end_date);

        let data = ScheduleData {
            timezone: DEFAULT_TIMEZONE,
            agencies: vec![Agency {
                id: id(DEFAULT_AGENCY_ID),
                name: "default agency".to_string(),
            }],
            operators: vec![Operator {
                id: id(DEFAULT_OPERATOR_ID),
                name: "default operator".to_string(),
            }],
            stops: Vec::new(),
            routes: vec![new_route(DEFAULT_ROUTE_ID)],
            calendars: Vec::new(),
            trips: Vec::new(),
        };
        let dates: Vec<NaiveDate> = start_date
            .iter_days()
            .take_while(|date| *date <= end_date)
            .collect();
        Self { data }.calendar(DEFAULT_CALENDAR_ID, &dates)
    }

    pub fn timezone(mut self, timezone: Tz) -> Self {
        self.data.timezone = timezone;
        self
    }

    /// Add a new trip to the model
    ///
    /// ```ignore
    /// let model = ModelBuilder::default()
    ///        .vj("toto", |vj_builder| {
    ///            vj_builder
    ///                .st("A", "10:00:00")
    ///                .st("B", "11:00:00");
    ///        })
    ///        .build();
    /// ```
    pub fn vj<F>(mut self, name: &str, mut vj_initer: F) -> Self
    where
        F: FnMut(VehicleJourneyBuilder),
    {
        assert!(
            self.data.trips.iter().all(|trip| trip.trip.id.id != name),
            "vj {} already exists",
            name
        );
        self.data.trips.push(TripData {
            trip: Trip {
                id: id(name),
                route_id: id(DEFAULT_ROUTE_ID),
                service_id: id(DEFAULT_CALENDAR_ID),
                headsign: None,
                operator_id: None,
            },
            stop_times: Vec::new(),
            frequency: None,
        });
        let trip_idx = self.data.trips.len() - 1;
        vj_initer(VehicleJourneyBuilder {
            model: &mut self,
            trip_idx,
        });
        self
    }

    /// Add a new route, operated by the default operator unless changed
    pub fn route<F>(mut self, route_id: &str, mut route_initer: F) -> Self
    where
        F: FnMut(&mut Route),
    {
        let mut route = new_route(route_id);
        route_initer(&mut route);
        self.data.routes.retain(|other| other.id != route.id);
        self.data.routes.push(route);
        self
    }

    pub fn stop<F>(mut self, stop_id: &str, mut stop_initer: F) -> Self
    where
        F: FnMut(&mut Stop),
    {
        let mut stop = new_stop(stop_id);
        stop_initer(&mut stop);
        self.data.stops.retain(|other| other.id != stop.id);
        self.data.stops.push(stop);
        self
    }

    pub fn agency(mut self, agency_id: &str) -> Self {
        self.data.agencies.push(Agency {
            id: id(agency_id),
            name: agency_id.to_string(),
        });
        self
    }

    pub fn operator(mut self, operator_id: &str) -> Self {
        self.data.operators.push(Operator {
            id: id(operator_id),
            name: operator_id.to_string(),
        });
        self
    }

    /// Add a new Calendar or add dates to an existing one
    pub fn calendar(mut self, calendar_id: &str, dates: &[impl AsDate]) -> Self {
        let service_id = id(calendar_id);
        let dates = dates.iter().map(|date| date.as_date());
        match self
            .data
            .calendars
            .iter_mut()
            .find(|calendar| calendar.service_id == service_id)
        {
            Some(calendar) => calendar.dates.extend(dates),
            None => self.data.calendars.push(CalendarData {
                service_id,
                dates: dates.collect(),
            }),
        }
        self
    }

    /// Consume the builder to create a base model.
    /// Stops used by trips but not declared are created.
    pub fn build(mut self) -> BaseModel {
        let missing_stops: Vec<FeedScopedId> = self
            .data
            .trips
            .iter()
            .flat_map(|trip| trip.stop_times.iter())
            .map(|stop_time| stop_time.stop_id.clone())
            .filter(|stop_id| self.data.stops.iter().all(|stop| stop.id != *stop_id))
            .collect();
        for stop_id in missing_stops {
            if self.data.stops.iter().all(|stop| stop.id != stop_id) {
                self.data.stops.push(new_stop(&stop_id.id));
            }
        }
        BaseModel::from_data(self.data).unwrap()
    }
}

fn new_route(route_id: &str) -> Route {
    Route {
        id: id(route_id),
        short_name: None,
        line_ref: None,
        agency_id: id(DEFAULT_AGENCY_ID),
        operator_id: Some(id(DEFAULT_OPERATOR_ID)),
    }
}

fn new_stop(stop_id: &str) -> Stop {
    Stop {
        id: id(stop_id),
        name: stop_id.to_string(),
        parent_station: None,
    }
}

impl<'a> VehicleJourneyBuilder<'a> {
    fn trip_data(&mut self) -> &mut TripData {
        &mut self.model.data.trips[self.trip_idx]
    }

    pub fn route(mut self, route_id: &str) -> Self {
        self.trip_data().trip.route_id = id(route_id);
        self
    }

    pub fn calendar(mut self, calendar_id: &str) -> Self {
        self.trip_data().trip.service_id = id(calendar_id);
        self
    }

    /// A stop time arriving and leaving at `time`.
    pub fn st(self, stop_id: &str, time: impl IntoTime) -> Self {
        let time = time.into_time();
        self.st_detailed(stop_id, time, time)
    }

    pub fn st_detailed(
        mut self,
        stop_id: &str,
        arrival_time: impl IntoTime,
        departure_time: impl IntoTime,
    ) -> Self {
        let stop_time = StopTimeData {
            stop_id: id(stop_id),
            arrival_time: arrival_time.into_time(),
            departure_time: departure_time.into_time(),
            flow: FlowDirection::BoardAndDebark,
        };
        self.trip_data().stop_times.push(stop_time);
        self
    }
}

/// Seconds since the start of the service day.
pub trait IntoTime {
    fn into_time(&self) -> i32;
}

impl IntoTime for i32 {
    fn into_time(&self) -> i32 {
        *self
    }
}

impl IntoTime for &str {
    // Note: if the string is not in the right format, this conversion will fail
    fn into_time(&self) -> i32 {
        let parts: Vec<i32> = self
            .split(':')
            .map(|part| part.parse().expect("invalid time format"))
            .collect();
        assert_eq!(parts.len(), 3, "invalid time format {}", self);
        parts[0] * 3600 + parts[1] * 60 + parts[2]
    }
}

pub trait AsDate {
    fn as_date(&self) -> NaiveDate;
}

impl AsDate for NaiveDate {
    fn as_date(&self) -> NaiveDate {
        *self
    }
}

impl AsDate for &NaiveDate {
    fn as_date(&self) -> NaiveDate {
        **self
    }
}

impl AsDate for &str {
    // Note: if the string is not in the right format, this conversion will fail
    fn as_date(&self) -> NaiveDate {
        self.parse().expect("invalid date format")
    }
}
