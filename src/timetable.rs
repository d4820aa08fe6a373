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

mod trip_times;

pub use trip_times::{PositionPair, RealTimeState, StopRealTimeFlags, TripTimes, TripTimesError};

use crate::model::FeedScopedId;
use chrono::NaiveDate;
use std::sync::Arc;

/// A trip running every `headway_secs` between `start_time` and `end_time`,
/// the template trip times giving the running times between stops.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyEntry {
    pub start_time: i32,
    pub end_time: i32,
    pub headway_secs: i32,
    pub exact_times: bool,
    pub trip_times: Arc<TripTimes>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimetableEntry {
    Scheduled(Arc<TripTimes>),
    Frequency(Arc<FrequencyEntry>),
}

impl TimetableEntry {
    pub fn trip_times(&self) -> &Arc<TripTimes> {
        match self {
            TimetableEntry::Scheduled(trip_times) => trip_times,
            TimetableEntry::Frequency(frequency_entry) => &frequency_entry.trip_times,
        }
    }

    pub fn trip_id(&self) -> &FeedScopedId {
        self.trip_times().trip_id()
    }

    // keeps the kind of entry, only the trip times change
    fn with_trip_times(&self, trip_times: Arc<TripTimes>) -> TimetableEntry {
        match self {
            TimetableEntry::Scheduled(_) => TimetableEntry::Scheduled(trip_times),
            TimetableEntry::Frequency(frequency_entry) => {
                TimetableEntry::Frequency(Arc::new(FrequencyEntry {
                    trip_times,
                    ..FrequencyEntry::clone(frequency_entry)
                }))
            }
        }
    }

    fn first_departure_time(&self) -> i32 {
        match self {
            TimetableEntry::Scheduled(trip_times) => trip_times.first_departure_time(),
            TimetableEntry::Frequency(frequency_entry) => frequency_entry.start_time,
        }
    }
}

/// Trip times of all trips of one pattern, either the scheduled ones
/// (`service_date == None`) or the ones of a given service date.
///
/// Entries are sorted by first departure time, then by trip id.
#[derive(Debug, Clone, PartialEq)]
pub struct Timetable {
    pattern_id: FeedScopedId,
    service_date: Option<NaiveDate>,
    entries: Vec<TimetableEntry>,
}

impl Timetable {
    pub fn new(pattern_id: FeedScopedId, service_date: Option<NaiveDate>) -> Self {
        Self {
            pattern_id,
            service_date,
            entries: Vec::new(),
        }
    }

    pub fn from_entries(
        pattern_id: FeedScopedId,
        service_date: Option<NaiveDate>,
        entries: Vec<TimetableEntry>,
    ) -> Self {
        let mut timetable = Self {
            pattern_id,
            service_date,
            entries,
        };
        timetable.sort();
        timetable
    }

    pub fn pattern_id(&self) -> &FeedScopedId {
        &self.pattern_id
    }

    pub fn service_date(&self) -> Option<NaiveDate> {
        self.service_date
    }

    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn trip_index(&self, trip_id: &FeedScopedId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.trip_id() == trip_id)
    }

    pub fn trip_times(&self, trip_id: &FeedScopedId) -> Option<&Arc<TripTimes>> {
        self.trip_index(trip_id)
            .map(|index| self.entries[index].trip_times())
    }

    pub fn frequency_entry(&self, trip_id: &FeedScopedId) -> Option<&FrequencyEntry> {
        self.entries.iter().find_map(|entry| match entry {
            TimetableEntry::Frequency(frequency_entry) if entry.trip_id() == trip_id => {
                Some(frequency_entry.as_ref())
            }
            _ => None,
        })
    }

    pub fn iter_trip_times(&self) -> impl Iterator<Item = &Arc<TripTimes>> + '_ {
        self.entries.iter().map(TimetableEntry::trip_times)
    }

    /// A timetable for `service_date` sharing all trip times of `self`.
    pub(crate) fn copy_for_service_date(&self, service_date: NaiveDate) -> Timetable {
        Timetable {
            pattern_id: self.pattern_id.clone(),
            service_date: Some(service_date),
            entries: self.entries.clone(),
        }
    }

    pub(crate) fn set_trip_times(&mut self, trip_times: Arc<TripTimes>) {
        match self.trip_index(trip_times.trip_id()) {
            Some(index) => {
                let entry = self.entries[index].with_trip_times(trip_times);
                self.entries[index] = entry;
            }
            None => self.entries.push(TimetableEntry::Scheduled(trip_times)),
        }
        self.sort();
    }

    pub(crate) fn remove_trip_times(&mut self, trip_id: &FeedScopedId) -> bool {
        let nb_of_entries = self.entries.len();
        self.entries.retain(|entry| entry.trip_id() != trip_id);
        self.entries.len() != nb_of_entries
    }

    fn sort(&mut self) {
        self.entries.sort_by(|lhs, rhs| {
            lhs.first_departure_time()
                .cmp(&rhs.first_departure_time())
                .then_with(|| lhs.trip_id().cmp(rhs.trip_id()))
        });
    }
}
