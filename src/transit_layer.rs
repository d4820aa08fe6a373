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

use crate::{snapshot::TimetableKey, timetable::Timetable};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

/// A secondary index built from the timetables (for example the data used by the
/// routing algorithm) that must stay in sync with the published snapshots.
pub trait TransitLayerUpdater: Send + Sync {
    /// Called on each commit, with the timetables changed or removed since the
    /// previous commit and the generation of the snapshot being published.
    fn update(
        &self,
        generation: u64,
        updated_timetables: &[Arc<Timetable>],
        removed_timetables: &[TimetableKey],
    );
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransitLayerUpdater;

impl TransitLayerUpdater for NoopTransitLayerUpdater {
    fn update(&self, _: u64, _: &[Arc<Timetable>], _: &[TimetableKey]) {}
}

/// Keeps the latest version of each dated timetable it was given.
#[derive(Debug, Default)]
pub struct RecordingTransitLayerUpdater {
    inner: Mutex<RecordedTimetables>,
}

#[derive(Debug, Default)]
struct RecordedTimetables {
    generation: u64,
    timetables: HashMap<TimetableKey, Arc<Timetable>>,
}

impl RecordingTransitLayerUpdater {
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn timetable(&self, key: &TimetableKey) -> Option<Arc<Timetable>> {
        self.inner.lock().timetables.get(key).cloned()
    }

    pub fn nb_of_timetables(&self) -> usize {
        self.inner.lock().timetables.len()
    }
}

impl TransitLayerUpdater for RecordingTransitLayerUpdater {
    fn update(
        &self,
        generation: u64,
        updated_timetables: &[Arc<Timetable>],
        removed_timetables: &[TimetableKey],
    ) {
        let mut inner = self.inner.lock();
        for key in removed_timetables {
            inner.timetables.remove(key);
        }
        for timetable in updated_timetables {
            // only dated timetables are stored in snapshots
            if let Some(service_date) = timetable.service_date() {
                let key = TimetableKey::new(timetable.pattern_id().clone(), service_date);
                inner.timetables.insert(key, timetable.clone());
            }
        }
        inner.generation = generation;
    }
}
