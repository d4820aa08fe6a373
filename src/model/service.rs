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

use super::{FeedScopedId, Operator, Route, Stop, Trip, TripPattern};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::Arc;

const SYNTHETIC_SERVICE_PREFIX: &str = "RT_SERVICE:";

/// Read access to the static schedule the real time updates are applied on.
pub trait TransitService: Send + Sync {
    /// Timezone in which service days are defined.
    fn timezone(&self) -> Tz;

    fn trip(&self, trip_id: &FeedScopedId) -> Option<&Arc<Trip>>;

    /// The scheduled pattern a trip belongs to.
    fn pattern_for_trip(&self, trip_id: &FeedScopedId) -> Option<&Arc<TripPattern>>;

    fn service_runs_on(&self, service_id: &FeedScopedId, date: NaiveDate) -> bool;

    fn stop(&self, stop_id: &FeedScopedId) -> Option<&Stop>;

    fn route(&self, route_id: &FeedScopedId) -> Option<&Arc<Route>>;

    /// Routes whose id or external line reference equals `line_ref`, sorted by id.
    fn routes_for_line(&self, line_ref: &str) -> Vec<&Arc<Route>>;

    /// Trips of a route, sorted by id.
    fn trips_for_route(&self, route_id: &FeedScopedId) -> &[Arc<Trip>];

    fn operator(&self, operator_id: &FeedScopedId) -> Option<&Operator>;

    /// Routes operated by `operator_id`, sorted by id.
    fn routes_for_operator(&self, operator_id: &FeedScopedId) -> Vec<&Arc<Route>>;

    /// A service id running on `date` only, used for trips created by real time updates.
    fn service_id_for_date(&self, feed_id: &str, date: NaiveDate) -> FeedScopedId {
        synthetic_service_id(feed_id, date)
    }
}

pub fn synthetic_service_id(feed_id: &str, date: NaiveDate) -> FeedScopedId {
    FeedScopedId::new(
        feed_id,
        format!("{}{}", SYNTHETIC_SERVICE_PREFIX, date.format("%Y%m%d")),
    )
}

pub fn synthetic_service_date(service_id: &FeedScopedId) -> Option<NaiveDate> {
    let date = service_id.id.strip_prefix(SYNTHETIC_SERVICE_PREFIX)?;
    NaiveDate::parse_from_str(date, "%Y%m%d").ok()
}
