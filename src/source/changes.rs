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
    snapshot::{TimetableSnapshotBuffer, UpdateError},
    timetable::TripTimes,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// One modification of the buffer, computed before anything is applied.
#[derive(Debug, Clone)]
pub(crate) enum BufferChange {
    Update {
        pattern: Arc<TripPattern>,
        trip_times: Arc<TripTimes>,
        service_date: NaiveDate,
    },
    RemovePreviousRealtimeUpdate {
        trip_id: FeedScopedId,
        service_date: NaiveDate,
    },
    RegisterAddedPattern {
        trip_id: FeedScopedId,
        service_date: NaiveDate,
        pattern: Arc<TripPattern>,
    },
    RegisterAddedTrip {
        trip: Arc<Trip>,
        service_date: NaiveDate,
    },
}

impl BufferChange {
    pub(crate) fn update(
        pattern: Arc<TripPattern>,
        trip_times: TripTimes,
        service_date: NaiveDate,
    ) -> Self {
        BufferChange::Update {
            pattern,
            trip_times: Arc::new(trip_times),
            service_date,
        }
    }
}

/// Applies all `changes` in order, or none of them.
pub(crate) fn apply_changes(
    buffer: &mut TimetableSnapshotBuffer,
    changes: Vec<BufferChange>,
) -> Result<(), UpdateError> {
    for change in &changes {
        if let BufferChange::Update {
            pattern,
            trip_times,
            ..
        } = change
        {
            TimetableSnapshotBuffer::check_update(pattern, trip_times)?;
        }
    }

    for change in changes {
        match change {
            BufferChange::Update {
                pattern,
                trip_times,
                service_date,
            } => buffer.update(&pattern, trip_times, service_date)?,
            BufferChange::RemovePreviousRealtimeUpdate {
                trip_id,
                service_date,
            } => {
                buffer.remove_previous_realtime_update(&trip_id, service_date);
            }
            BufferChange::RegisterAddedPattern {
                trip_id,
                service_date,
                pattern,
            } => buffer.add_realtime_added_pattern(&trip_id, service_date, pattern),
            BufferChange::RegisterAddedTrip { trip, service_date } => {
                buffer.add_realtime_added_trip(trip, service_date)
            }
        }
    }
    Ok(())
}
