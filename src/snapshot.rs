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

use crate::{
    model::{FeedScopedId, Trip, TripPattern},
    timetable::{Timetable, TripTimes, TripTimesError},
    transit_layer::TransitLayerUpdater,
};
use chrono::NaiveDate;
use std::{
    collections::{BTreeSet, HashMap},
    fmt::{Display, Formatter},
    sync::Arc,
};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimetableKey {
    pub pattern_id: FeedScopedId,
    pub service_date: NaiveDate,
}

impl TimetableKey {
    pub fn new(pattern_id: FeedScopedId, service_date: NaiveDate) -> Self {
        Self {
            pattern_id,
            service_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripOnServiceDate {
    pub trip_id: FeedScopedId,
    pub service_date: NaiveDate,
}

impl TripOnServiceDate {
    pub fn new(trip_id: FeedScopedId, service_date: NaiveDate) -> Self {
        Self {
            trip_id,
            service_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    StopCountMismatch {
        pattern_id: FeedScopedId,
        trip_id: FeedScopedId,
        expected: usize,
        actual: usize,
    },
    InvalidTripTimes {
        trip_id: FeedScopedId,
        error: TripTimesError,
    },
}

impl std::error::Error for UpdateError {}

impl Display for UpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::StopCountMismatch {
                pattern_id,
                trip_id,
                expected,
                actual,
            } => write!(
                f,
                "Trip {} has {} stops but pattern {} has {} stops.",
                trip_id, actual, pattern_id, expected
            ),
            UpdateError::InvalidTripTimes { trip_id, error } => {
                write!(f, "Invalid trip times for trip {}. {}", trip_id, error)
            }
        }
    }
}

/// An immutable view of all real time timetables, shared by readers.
///
/// Nothing reachable from a published snapshot is ever modified, updates
/// are made on copies owned by the `TimetableSnapshotBuffer`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimetableSnapshot {
    generation: u64,
    timetables: HashMap<TimetableKey, Arc<Timetable>>,
    realtime_added_patterns: HashMap<TripOnServiceDate, Arc<TripPattern>>,
    realtime_added_trips: HashMap<TripOnServiceDate, Arc<Trip>>,
}

fn resolve<'a>(
    timetables: &'a HashMap<TimetableKey, Arc<Timetable>>,
    pattern: &'a TripPattern,
    service_date: Option<NaiveDate>,
) -> &'a Timetable {
    service_date
        .and_then(|service_date| {
            timetables.get(&TimetableKey::new(pattern.id().clone(), service_date))
        })
        .map_or(pattern.scheduled_timetable(), |timetable| timetable.as_ref())
}

impl TimetableSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The timetable of `pattern` on `service_date`, or its scheduled timetable
    /// when there is no real time data for that date.
    pub fn resolve<'a>(
        &'a self,
        pattern: &'a TripPattern,
        service_date: Option<NaiveDate>,
    ) -> &'a Timetable {
        resolve(&self.timetables, pattern, service_date)
    }

    pub fn realtime_added_trip_pattern(
        &self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> Option<&Arc<TripPattern>> {
        self.realtime_added_patterns
            .get(&TripOnServiceDate::new(trip_id.clone(), service_date))
    }

    pub fn realtime_added_trip(
        &self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> Option<&Arc<Trip>> {
        self.realtime_added_trips
            .get(&TripOnServiceDate::new(trip_id.clone(), service_date))
    }

    pub fn has_realtime_added_trip_patterns(&self) -> bool {
        !self.realtime_added_patterns.is_empty()
    }

    pub fn timetables(&self) -> impl Iterator<Item = &Arc<Timetable>> + '_ {
        self.timetables.values()
    }

    pub fn timetable(&self, key: &TimetableKey) -> Option<&Arc<Timetable>> {
        self.timetables.get(key)
    }

    pub fn nb_of_timetables(&self) -> usize {
        self.timetables.len()
    }
}

/// The mutable side of the snapshots, owned by the single writer.
#[derive(Debug)]
pub struct TimetableSnapshotBuffer {
    timetables: HashMap<TimetableKey, Arc<Timetable>>,
    realtime_added_patterns: HashMap<TripOnServiceDate, Arc<TripPattern>>,
    realtime_added_trips: HashMap<TripOnServiceDate, Arc<Trip>>,
    dirty: bool,
    // changes not yet pushed to the transit layer
    dirty_timetables: BTreeSet<TimetableKey>,
    removed_timetables: BTreeSet<TimetableKey>,
    published: Arc<TimetableSnapshot>,
}

impl Default for TimetableSnapshotBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimetableSnapshotBuffer {
    pub fn new() -> Self {
        Self {
            timetables: HashMap::new(),
            realtime_added_patterns: HashMap::new(),
            realtime_added_trips: HashMap::new(),
            dirty: false,
            dirty_timetables: BTreeSet::new(),
            removed_timetables: BTreeSet::new(),
            published: Arc::new(TimetableSnapshot::default()),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The last snapshot returned by `commit()`.
    pub fn published(&self) -> &Arc<TimetableSnapshot> {
        &self.published
    }

    pub fn resolve<'a>(
        &'a self,
        pattern: &'a TripPattern,
        service_date: Option<NaiveDate>,
    ) -> &'a Timetable {
        resolve(&self.timetables, pattern, service_date)
    }

    /// Checks that `trip_times` could be stored on `pattern`.
    pub fn check_update(pattern: &TripPattern, trip_times: &TripTimes) -> Result<(), UpdateError> {
        if trip_times.number_of_stops() != pattern.number_of_stops() {
            return Err(UpdateError::StopCountMismatch {
                pattern_id: pattern.id().clone(),
                trip_id: trip_times.trip_id().clone(),
                expected: pattern.number_of_stops(),
                actual: trip_times.number_of_stops(),
            });
        }
        trip_times
            .validate()
            .map_err(|error| UpdateError::InvalidTripTimes {
                trip_id: trip_times.trip_id().clone(),
                error,
            })
    }

    /// Stores `trip_times` in the timetable of `pattern` on `service_date`.
    ///
    /// On the first update of a (pattern, date), the timetable starts as a copy of
    /// the scheduled timetable of the pattern. On error, the buffer is left untouched.
    pub fn update(
        &mut self,
        pattern: &TripPattern,
        trip_times: Arc<TripTimes>,
        service_date: NaiveDate,
    ) -> Result<(), UpdateError> {
        Self::check_update(pattern, &trip_times)?;

        let key = TimetableKey::new(pattern.id().clone(), service_date);
        let timetable = self.timetables.entry(key.clone()).or_insert_with(|| {
            Arc::new(
                pattern
                    .scheduled_timetable()
                    .copy_for_service_date(service_date),
            )
        });
        // copies the timetable if it is shared with the published snapshot
        Arc::make_mut(timetable).set_trip_times(trip_times);

        trace!(
            "Timetable of pattern {} on {} updated.",
            key.pattern_id,
            key.service_date
        );
        self.removed_timetables.remove(&key);
        self.dirty_timetables.insert(key);
        self.dirty = true;
        Ok(())
    }

    /// Removes the trip times of `trip_id` from the dated timetable of `pattern_id`.
    pub fn remove_realtime_updated_trip_times(
        &mut self,
        pattern_id: &FeedScopedId,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> bool {
        let key = TimetableKey::new(pattern_id.clone(), service_date);
        let removed = match self.timetables.get_mut(&key) {
            Some(timetable) if timetable.trip_index(trip_id).is_some() => {
                Arc::make_mut(timetable).remove_trip_times(trip_id)
            }
            _ => false,
        };
        if removed {
            self.dirty_timetables.insert(key);
            self.dirty = true;
        }
        removed
    }

    pub fn realtime_added_pattern(
        &self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> Option<&Arc<TripPattern>> {
        self.realtime_added_patterns
            .get(&TripOnServiceDate::new(trip_id.clone(), service_date))
    }

    /// Associates `pattern` with the trip on this service date, replacing any previous one.
    pub fn add_realtime_added_pattern(
        &mut self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
        pattern: Arc<TripPattern>,
    ) {
        self.realtime_added_patterns
            .insert(TripOnServiceDate::new(trip_id.clone(), service_date), pattern);
        self.dirty = true;
    }

    pub fn realtime_added_trip(
        &self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> Option<&Arc<Trip>> {
        self.realtime_added_trips
            .get(&TripOnServiceDate::new(trip_id.clone(), service_date))
    }

    pub fn add_realtime_added_trip(&mut self, trip: Arc<Trip>, service_date: NaiveDate) {
        self.realtime_added_trips
            .insert(TripOnServiceDate::new(trip.id.clone(), service_date), trip);
        self.dirty = true;
    }

    /// Drops the realtime pattern of the trip on this date, and its trip times on it.
    pub fn remove_previous_realtime_update(
        &mut self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> bool {
        let key = TripOnServiceDate::new(trip_id.clone(), service_date);
        match self.realtime_added_patterns.remove(&key) {
            Some(pattern) => {
                debug!(
                    "Removing previous real time pattern {} of trip {} on {}.",
                    pattern.id(),
                    trip_id,
                    service_date
                );
                self.remove_realtime_updated_trip_times(pattern.id(), trip_id, service_date);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Drops all real time data of a feed.
    pub fn clear(&mut self, feed_id: &str) {
        let removed_timetables =
            self.remove_timetables_where(|key| key.pattern_id.belongs_to_feed(feed_id));
        let removed_others = self.remove_trips_where(|key| key.trip_id.belongs_to_feed(feed_id));
        debug!(
            "Real time data of feed {} cleared, {} timetables removed.",
            feed_id, removed_timetables
        );
        if removed_timetables > 0 || removed_others {
            self.dirty = true;
        }
    }

    /// Drops everything dated strictly before `cutoff`.
    /// Returns whether something was removed.
    pub fn purge_expired_data(&mut self, cutoff: NaiveDate) -> bool {
        let removed_timetables = self.remove_timetables_where(|key| key.service_date < cutoff);
        let removed_others = self.remove_trips_where(|key| key.service_date < cutoff);
        let modified = removed_timetables > 0 || removed_others;
        if modified {
            debug!(
                "Purged {} timetables with a service date before {}.",
                removed_timetables, cutoff
            );
            self.dirty = true;
        }
        modified
    }

    fn remove_timetables_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&TimetableKey) -> bool,
    {
        let keys: Vec<TimetableKey> = self
            .timetables
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in &keys {
            self.timetables.remove(key);
            self.dirty_timetables.remove(key);
            self.removed_timetables.insert(key.clone());
        }
        keys.len()
    }

    fn remove_trips_where<F>(&mut self, predicate: F) -> bool
    where
        F: Fn(&TripOnServiceDate) -> bool,
    {
        let nb_of_patterns = self.realtime_added_patterns.len();
        let nb_of_trips = self.realtime_added_trips.len();
        self.realtime_added_patterns.retain(|key, _| !predicate(key));
        self.realtime_added_trips.retain(|key, _| !predicate(key));
        nb_of_patterns != self.realtime_added_patterns.len()
            || nb_of_trips != self.realtime_added_trips.len()
    }

    /// Publishes the content of the buffer as a new snapshot.
    ///
    /// When nothing changed since the last commit and `force` is false, the last
    /// published snapshot is returned. Otherwise a new snapshot is built, sharing all
    /// timetables with the buffer, and the changed timetables are pushed to
    /// `transit_layer_updater`.
    pub fn commit(
        &mut self,
        transit_layer_updater: &dyn TransitLayerUpdater,
        force: bool,
    ) -> Arc<TimetableSnapshot> {
        if !force && !self.dirty {
            return self.published.clone();
        }

        let generation = self.published.generation + 1;
        let snapshot = Arc::new(TimetableSnapshot {
            generation,
            timetables: self.timetables.clone(),
            realtime_added_patterns: self.realtime_added_patterns.clone(),
            realtime_added_trips: self.realtime_added_trips.clone(),
        });

        let updated_timetables: Vec<Arc<Timetable>> = self
            .dirty_timetables
            .iter()
            .filter_map(|key| self.timetables.get(key).cloned())
            .collect();
        let removed_timetables: Vec<TimetableKey> =
            std::mem::take(&mut self.removed_timetables).into_iter().collect();
        transit_layer_updater.update(generation, &updated_timetables, &removed_timetables);

        debug!(
            "Committed snapshot {} with {} updated and {} removed timetables.",
            generation,
            updated_timetables.len(),
            removed_timetables.len()
        );
        self.dirty_timetables.clear();
        self.dirty = false;
        self.published = snapshot.clone();
        snapshot
    }
}
