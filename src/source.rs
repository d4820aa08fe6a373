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

//! The single entry point for real time updates, and the snapshots readers use.
//!
//! One writer at a time applies update batches on a private buffer behind a fair mutex.
//! Readers never wait for it: they get the last published snapshot when the writer is busy.

mod changes;
mod estimated_timetable;
mod vehicle_monitoring;

use crate::{
    clock::{Clock, SystemClock},
    config::RealTimeParams,
    model::{FeedScopedId, Route, TransitService},
    pattern_cache::PatternCache,
    snapshot::{TimetableSnapshot, TimetableSnapshotBuffer, UpdateError},
    time::local_date,
    transit_layer::{NoopTransitLayerUpdater, TransitLayerUpdater},
    trip_times_mutation::MutationError,
    update::{JourneyKind, UpdateBatch, VehicleMonitoringBatch},
};
use arc_swap::ArcSwap;
use chrono::{Days, NaiveDate};
use parking_lot::FairMutex;
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    ops::AddAssign,
    sync::Arc,
    time::Instant,
};
use tracing::{debug, info, warn};

use changes::apply_changes;
use estimated_timetable::JourneyPlanner;

/// Number of days real time data is kept after its service date.
const PURGE_MARGIN_IN_DAYS: u64 = 2;

/// Why a journey of a batch was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JourneyError {
    NoMatch,
    MissingServiceDate,
    MissingField(&'static str),
    UnknownOperator(FeedScopedId),
    NoAgencyForOperator(FeedScopedId),
    UnknownStop(FeedScopedId),
    StopCountMismatch { nb_of_calls: usize, nb_of_stops: usize },
    InvalidTime(String),
    AddedTripAlreadyExists(FeedScopedId),
    TripNotRunning {
        trip_id: FeedScopedId,
        service_date: NaiveDate,
    },
    TripNotInTimetable {
        trip_id: FeedScopedId,
        pattern_id: FeedScopedId,
    },
    CanceledTrip(FeedScopedId),
    Mutation(MutationError),
    Update(UpdateError),
}

impl std::error::Error for JourneyError {}

impl Display for JourneyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JourneyError::NoMatch => write!(f, "No scheduled trip matches the journey."),
            JourneyError::MissingServiceDate => {
                write!(f, "The service date of the journey cannot be found.")
            }
            JourneyError::MissingField(field) => write!(f, "Required field {} is missing.", field),
            JourneyError::UnknownOperator(operator_id) => {
                write!(f, "Operator {} does not exist.", operator_id)
            }
            JourneyError::NoAgencyForOperator(operator_id) => {
                write!(f, "No route of operator {} gives an agency.", operator_id)
            }
            JourneyError::UnknownStop(stop_id) => write!(f, "Stop {} does not exist.", stop_id),
            JourneyError::StopCountMismatch {
                nb_of_calls,
                nb_of_stops,
            } => write!(
                f,
                "The journey has {} calls for a pattern of {} stops.",
                nb_of_calls, nb_of_stops
            ),
            JourneyError::InvalidTime(reason) => write!(f, "Invalid time. {}", reason),
            JourneyError::AddedTripAlreadyExists(trip_id) => write!(
                f,
                "Trip {} cannot be added, it already exists in the schedule.",
                trip_id
            ),
            JourneyError::TripNotRunning {
                trip_id,
                service_date,
            } => write!(f, "Trip {} does not run on {}.", trip_id, service_date),
            JourneyError::TripNotInTimetable {
                trip_id,
                pattern_id,
            } => write!(
                f,
                "Trip {} is not in the timetable of pattern {}.",
                trip_id, pattern_id
            ),
            JourneyError::CanceledTrip(trip_id) => write!(f, "Trip {} is canceled.", trip_id),
            JourneyError::Mutation(error) => write!(f, "{}", error),
            JourneyError::Update(error) => write!(f, "{}", error),
        }
    }
}

impl From<MutationError> for JourneyError {
    fn from(error: MutationError) -> Self {
        match error {
            MutationError::TooManyCalls {
                nb_of_calls,
                nb_of_stops,
            } => JourneyError::StopCountMismatch {
                nb_of_calls,
                nb_of_stops,
            },
            MutationError::TimeOutOfRange { .. } => JourneyError::InvalidTime(error.to_string()),
            error => JourneyError::Mutation(error),
        }
    }
}

impl From<UpdateError> for JourneyError {
    fn from(error: UpdateError) -> Self {
        JourneyError::Update(error)
    }
}

/// What happened to the journeys (or vehicle activities) of a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    /// Applied, including added trips.
    pub handled: usize,
    /// Trips created by the batch.
    pub added: usize,
    pub skipped: usize,
    pub not_monitored: usize,
}

impl UpdateResult {
    pub fn total(&self) -> usize {
        self.handled + self.skipped + self.not_monitored
    }
}

impl AddAssign for UpdateResult {
    fn add_assign(&mut self, other: Self) {
        self.handled += other.handled;
        self.added += other.added;
        self.skipped += other.skipped;
        self.not_monitored += other.not_monitored;
    }
}

impl Display for UpdateResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} handled ({} added), {} skipped, {} not monitored",
            self.handled, self.added, self.skipped, self.not_monitored
        )
    }
}

// Everything only the writer may touch.
struct WriterState {
    buffer: TimetableSnapshotBuffer,
    pattern_cache: PatternCache,
    // routes created for added trips of unknown lines
    realtime_routes: HashMap<FeedScopedId, Arc<Route>>,
    last_snapshot_time: Option<Instant>,
    last_purge_date: Option<NaiveDate>,
    nb_of_handled_journeys: u64,
}

pub struct SnapshotSource<S> {
    service: Arc<S>,
    params: RealTimeParams,
    clock: Arc<dyn Clock>,
    transit_layer_updater: Arc<dyn TransitLayerUpdater>,
    writer: FairMutex<WriterState>,
    published: ArcSwap<TimetableSnapshot>,
}

impl<S: TransitService> SnapshotSource<S> {
    pub fn new(service: Arc<S>, params: RealTimeParams) -> Self {
        let buffer = TimetableSnapshotBuffer::new();
        let published = ArcSwap::new(buffer.published().clone());
        Self {
            service,
            params,
            clock: Arc::new(SystemClock),
            transit_layer_updater: Arc::new(NoopTransitLayerUpdater),
            writer: FairMutex::new(WriterState {
                buffer,
                pattern_cache: PatternCache::new(),
                realtime_routes: HashMap::new(),
                last_snapshot_time: None,
                last_purge_date: None,
                nb_of_handled_journeys: 0,
            }),
            published,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transit_layer_updater(mut self, updater: Arc<dyn TransitLayerUpdater>) -> Self {
        self.transit_layer_updater = updater;
        self
    }

    pub fn transit_service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn params(&self) -> &RealTimeParams {
        &self.params
    }

    /// The snapshot a reader should use for a whole query.
    ///
    /// Never blocks: when the writer is busy, the last published snapshot is returned.
    /// Otherwise pending updates are published first, if the throttling delay allows it.
    pub fn timetable_snapshot(&self) -> Arc<TimetableSnapshot> {
        match self.writer.try_lock() {
            Some(mut writer) => self.commit_if_due(&mut writer, false),
            None => self.published.load_full(),
        }
    }

    /// Publishes a new snapshot, even if nothing changed.
    pub fn force_commit(&self) -> Arc<TimetableSnapshot> {
        let mut writer = self.writer.lock();
        self.commit_if_due(&mut writer, true)
    }

    /// Drops real time data too old to be used, and publishes a new snapshot if
    /// something was dropped.
    pub fn purge_expired_data(&self) -> bool {
        let mut writer = self.writer.lock();
        let purged = self.purge_if_needed(&mut writer);
        if purged {
            self.commit_if_due(&mut writer, true);
        }
        purged
    }

    /// Generation of the last snapshot published by the writer.
    pub fn buffer_generation(&self) -> u64 {
        self.writer.lock().buffer.published().generation()
    }

    pub fn apply_estimated_timetable(&self, batch: &UpdateBatch) -> UpdateResult {
        let mut writer = self.writer.lock();
        let feed_id = self.feed_id(&batch.feed_id);
        if batch.full_dataset {
            info!("Full dataset received for feed {}.", feed_id);
            writer.buffer.clear(feed_id);
        }

        let mut result = UpdateResult::default();
        for journey in &batch.journeys {
            if journey.kind() == JourneyKind::Update && !journey.is_monitored() {
                result.not_monitored += 1;
                continue;
            }
            let WriterState {
                buffer,
                pattern_cache,
                realtime_routes,
                ..
            } = &mut *writer;
            let mut planner = JourneyPlanner {
                service: self.service.as_ref(),
                feed_id,
                buffer,
                pattern_cache,
                realtime_routes,
            };
            let applied = planner.plan(journey).and_then(|plan| {
                apply_changes(buffer, plan.changes)?;
                Ok(plan.added)
            });
            match applied {
                Ok(added) => {
                    result.handled += 1;
                    if added {
                        result.added += 1;
                    }
                }
                Err(err) => {
                    log_journey_error(&journey.describe(), &err);
                    result.skipped += 1;
                }
            }
        }

        debug!("Estimated timetable of feed {} applied: {}.", feed_id, result);
        self.finish_batch(&mut writer, result);
        result
    }

    pub fn apply_vehicle_monitoring(&self, batch: &VehicleMonitoringBatch) -> UpdateResult {
        let mut writer = self.writer.lock();
        let feed_id = self.feed_id(&batch.feed_id);

        let mut result = UpdateResult::default();
        for activity in &batch.activities {
            if !activity.is_monitored() {
                result.not_monitored += 1;
                continue;
            }
            let buffer = &mut writer.buffer;
            let applied = vehicle_monitoring::plan_vehicle_activity(
                self.service.as_ref(),
                feed_id,
                buffer,
                activity,
            )
            .and_then(|changes| Ok(apply_changes(buffer, changes)?));
            match applied {
                Ok(()) => result.handled += 1,
                Err(err) => {
                    log_journey_error(&activity.describe(), &err);
                    result.skipped += 1;
                }
            }
        }

        debug!("Vehicle monitoring of feed {} applied: {}.", feed_id, result);
        self.finish_batch(&mut writer, result);
        result
    }

    fn feed_id<'a>(&'a self, batch_feed_id: &'a str) -> &'a str {
        if batch_feed_id.is_empty() {
            &self.params.feed_id
        } else {
            batch_feed_id
        }
    }

    fn finish_batch(&self, writer: &mut WriterState, result: UpdateResult) {
        let before = writer.nb_of_handled_journeys;
        writer.nb_of_handled_journeys += result.handled as u64;
        let log_frequency = self.params.log_frequency;
        if log_frequency > 0 && before / log_frequency != writer.nb_of_handled_journeys / log_frequency
        {
            info!(
                "{} real time journeys handled since start.",
                writer.nb_of_handled_journeys
            );
        }

        let purged = self.params.purge_expired_data && self.purge_if_needed(writer);
        self.commit_if_due(writer, purged);
    }

    // at most one purge per cutoff date
    fn purge_if_needed(&self, writer: &mut WriterState) -> bool {
        let today = local_date(&self.clock.now(), &self.service.timezone());
        let cutoff = match today.checked_sub_days(Days::new(PURGE_MARGIN_IN_DAYS)) {
            Some(cutoff) => cutoff,
            None => return false,
        };
        if matches!(writer.last_purge_date, Some(last_purge_date) if last_purge_date >= cutoff) {
            return false;
        }
        writer.last_purge_date = Some(cutoff);
        let purged = writer.buffer.purge_expired_data(cutoff);
        if purged {
            info!("Real time data with a service date before {} purged.", cutoff);
        }
        purged
    }

    fn commit_if_due(&self, writer: &mut WriterState, force: bool) -> Arc<TimetableSnapshot> {
        let now = self.clock.instant();
        let due = force
            || writer.last_snapshot_time.map_or(true, |last_snapshot_time| {
                now.saturating_duration_since(last_snapshot_time)
                    >= self.params.max_snapshot_frequency()
            });
        if !due {
            return self.published.load_full();
        }

        let snapshot = writer
            .buffer
            .commit(self.transit_layer_updater.as_ref(), force);
        if !Arc::ptr_eq(&snapshot, &self.published.load()) {
            self.published.store(snapshot.clone());
        }
        writer.last_snapshot_time = Some(now);
        snapshot
    }
}

fn log_journey_error(description: &str, err: &JourneyError) {
    match err {
        JourneyError::NoMatch => debug!("Skipping {}. {}", description, err),
        _ => warn!("Skipping {}. {}", description, err),
    }
}
