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

use crate::model::{FeedScopedId, Route, StopPattern, Trip, TripPattern};
use chrono::NaiveDate;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PatternCacheKey {
    stop_pattern: StopPattern,
    route_id: FeedScopedId,
    original_pattern: Option<FeedScopedId>,
}

/// Patterns created by real time updates, indexed by their content so that trips
/// with the same stops on the same route, modified from the same pattern, share one pattern.
///
/// Owned by the writer, readers only see patterns through published snapshots.
#[derive(Debug, Default)]
pub struct PatternCache {
    cache: HashMap<PatternCacheKey, Arc<TripPattern>>,
    counter: u32,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &mut self,
        stop_pattern: &StopPattern,
        trip: &Trip,
        route: &Arc<Route>,
        original_pattern: Option<&FeedScopedId>,
        service_date: NaiveDate,
    ) -> Arc<TripPattern> {
        let key = PatternCacheKey {
            stop_pattern: stop_pattern.clone(),
            route_id: route.id.clone(),
            original_pattern: original_pattern.cloned(),
        };
        if let Some(pattern) = self.cache.get(&key) {
            return pattern.clone();
        }

        let id = self.generate_id(route);
        debug!(
            "Creating pattern {} with {} stops for trip {} on {}.",
            id,
            stop_pattern.len(),
            trip.id,
            service_date
        );
        let pattern = Arc::new(TripPattern::new_realtime(
            id,
            route.clone(),
            stop_pattern.clone(),
            original_pattern.cloned(),
        ));
        self.cache.insert(key, pattern.clone());
        pattern
    }

    // static pattern ids never end with ":RT"
    fn generate_id(&mut self, route: &Route) -> FeedScopedId {
        self.counter += 1;
        FeedScopedId::new(
            route.id.feed_id.clone(),
            format!("{}:{:03}:RT", route.id.id, self.counter),
        )
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowDirection;

    fn id(id: &str) -> FeedScopedId {
        FeedScopedId::new("F", id)
    }

    fn route(route_id: &str) -> Arc<Route> {
        Arc::new(Route {
            id: id(route_id),
            short_name: None,
            line_ref: None,
            agency_id: id("agency"),
            operator_id: None,
        })
    }

    fn trip(trip_id: &str) -> Trip {
        Trip {
            id: id(trip_id),
            route_id: id("r1"),
            service_id: id("service"),
            headsign: None,
            operator_id: None,
        }
    }

    fn stop_pattern(stops: &[&str]) -> StopPattern {
        StopPattern::new(
            stops
                .iter()
                .map(|stop| (id(stop), FlowDirection::BoardAndDebark)),
        )
    }

    #[test]
    fn same_stops_and_route_share_a_pattern() {
        let mut cache = PatternCache::new();
        let date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let r1 = route("r1");

        let first = cache.get_or_create(&stop_pattern(&["A", "B"]), &trip("t1"), &r1, None, date);
        let second = cache.get_or_create(&stop_pattern(&["A", "B"]), &trip("t2"), &r1, None, date);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), &id("r1:001:RT"));
        assert!(first.is_created_by_realtime());
        assert!(first.scheduled_timetable().is_empty());

        let other_stops =
            cache.get_or_create(&stop_pattern(&["A", "C"]), &trip("t1"), &r1, None, date);
        let other_route = cache.get_or_create(
            &stop_pattern(&["A", "B"]),
            &trip("t1"),
            &route("r2"),
            None,
            date,
        );
        assert!(!Arc::ptr_eq(&first, &other_stops));
        assert!(!Arc::ptr_eq(&first, &other_route));
        assert_eq!(other_route.id(), &id("r2:003:RT"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn patterns_modified_from_different_patterns_are_not_shared() {
        let mut cache = PatternCache::new();
        let date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let r1 = route("r1");
        let stops = stop_pattern(&["A", "B"]);

        let from_p1 = cache.get_or_create(&stops, &trip("t1"), &r1, Some(&id("p1")), date);
        let from_p2 = cache.get_or_create(&stops, &trip("t2"), &r1, Some(&id("p2")), date);
        let added = cache.get_or_create(&stops, &trip("t3"), &r1, None, date);
        assert!(!Arc::ptr_eq(&from_p1, &from_p2));
        assert!(!Arc::ptr_eq(&from_p1, &added));
        assert_eq!(from_p1.original_pattern(), Some(&id("p1")));
        assert_eq!(from_p2.original_pattern(), Some(&id("p2")));
        assert_eq!(added.original_pattern(), None);

        let again = cache.get_or_create(&stops, &trip("t4"), &r1, Some(&id("p1")), date);
        assert!(Arc::ptr_eq(&from_p1, &again));
        assert_eq!(cache.len(), 3);
    }
}
