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

#![allow(dead_code)]
pub mod model_builder;

use anyhow::{format_err, Error};
use model_builder::{id, AsDate, IntoTime, ModelBuilder, DEFAULT_FEED_ID, DEFAULT_TIMEZONE};
use std::sync::Arc;
use timetable_snapshot::{
    chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc},
    update::{Call, FramedVehicleJourneyRef},
    BaseModel, EstimatedVehicleJourney, FixedClock, RealTimeParams, SnapshotSource,
    TimetableSnapshot, TransitService, TripPattern, TripTimes, UpdateBatch,
};
use tracing_subscriber::EnvFilter;

pub const TODAY: &str = "2022-01-10";

pub fn init_logger() {
    // use log level specified by RUST_LOG env var if set
    //  and default to the "debug" level when RUST_LOG is not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn today() -> NaiveDate {
    TODAY.as_date()
}

/// `time` on `date`, in the timezone of the models built by `ModelBuilder`.
pub fn datetime(date: impl AsDate, time: impl IntoTime) -> DateTime<FixedOffset> {
    let midnight = DEFAULT_TIMEZONE
        .from_local_datetime(&date.as_date().and_hms_opt(0, 0, 0).unwrap())
        .unwrap();
    let local = midnight + Duration::seconds(i64::from(time.into_time()));
    local.with_timezone(&FixedOffset::east_opt(0).unwrap())
}

/// `time` today
pub fn at(time: &str) -> Option<DateTime<FixedOffset>> {
    Some(datetime(TODAY, time))
}

/// A clock at noon on `date`.
pub fn clock_at(date: impl AsDate) -> Arc<FixedClock> {
    let noon = date.as_date().and_hms_opt(12, 0, 0).unwrap();
    Arc::new(FixedClock::new(Utc.from_utc_datetime(&noon)))
}

/// Trips "1.1" and "1.2" go through A, B, C and D on line L1.
/// Trip "2.1" goes through E, F and G on line L2.
/// Stop X is not used by any trip.
pub fn default_model() -> BaseModel {
    ModelBuilder::new("2022-01-01", "2022-01-20")
        .route("L1", |_| {})
        .route("L2", |_| {})
        .stop("X", |_| {})
        .vj("1.1", |vj_builder| {
            vj_builder
                .route("L1")
                .st("A", "10:00:00")
                .st_detailed("B", "10:10:00", "10:11:00")
                .st("C", "10:20:00")
                .st("D", "10:30:00");
        })
        .vj("1.2", |vj_builder| {
            vj_builder
                .route("L1")
                .st("A", "11:00:00")
                .st_detailed("B", "11:10:00", "11:11:00")
                .st("C", "11:20:00")
                .st("D", "11:30:00");
        })
        .vj("2.1", |vj_builder| {
            vj_builder
                .route("L2")
                .st("E", "10:00:00")
                .st("F", "10:15:00")
                .st("G", "10:30:00");
        })
        .build()
}

pub fn snapshot_source(
    model: BaseModel,
    params: RealTimeParams,
) -> (SnapshotSource<BaseModel>, Arc<FixedClock>) {
    let clock = clock_at(TODAY);
    let source = SnapshotSource::new(Arc::new(model), params).with_clock(clock.clone());
    (source, clock)
}

/// Params publishing a snapshot after each batch.
pub fn unthrottled_params() -> RealTimeParams {
    RealTimeParams {
        max_snapshot_frequency_ms: 0,
        ..Default::default()
    }
}

pub fn call(stop: &str, order: u32) -> Call {
    Call {
        order: Some(order),
        ..Call::new(stop)
    }
}

/// An update of the scheduled trip `trip_id` running today.
pub fn journey_update(trip_id: &str, calls: Vec<Call>) -> EstimatedVehicleJourney {
    journey_update_on(trip_id, TODAY, calls)
}

pub fn journey_update_on(
    trip_id: &str,
    service_date: impl AsDate,
    calls: Vec<Call>,
) -> EstimatedVehicleJourney {
    EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(FramedVehicleJourneyRef {
            data_frame_ref: service_date.as_date(),
            dated_vehicle_journey_ref: trip_id.to_string(),
        }),
        estimated_calls: calls,
        ..Default::default()
    }
}

pub fn cancellation(trip_id: &str) -> EstimatedVehicleJourney {
    cancellation_on(trip_id, TODAY)
}

pub fn cancellation_on(trip_id: &str, service_date: impl AsDate) -> EstimatedVehicleJourney {
    EstimatedVehicleJourney {
        cancellation: true,
        ..journey_update_on(trip_id, service_date, Vec::new())
    }
}

/// A journey of `trip_id` where it arrives `delay` seconds late at stop position 1 (B).
pub fn delayed_at_b(trip_id: &str, delay: i64) -> EstimatedVehicleJourney {
    let scheduled_arrival = datetime(TODAY, if trip_id == "1.2" { "11:10:00" } else { "10:10:00" });
    let expected = scheduled_arrival + Duration::seconds(delay);
    let call = Call {
        expected_arrival_time: Some(expected),
        expected_departure_time: Some(expected + Duration::seconds(60)),
        ..call("B", 2)
    };
    journey_update(trip_id, vec![call])
}

pub fn batch(journeys: Vec<EstimatedVehicleJourney>) -> UpdateBatch {
    UpdateBatch {
        feed_id: DEFAULT_FEED_ID.to_string(),
        full_dataset: false,
        journeys,
    }
}

pub fn pattern_of(source: &SnapshotSource<BaseModel>, trip_id: &str) -> Result<Arc<TripPattern>, Error> {
    source
        .transit_service()
        .pattern_for_trip(&id(trip_id))
        .cloned()
        .ok_or_else(|| format_err!("No pattern for trip {}", trip_id))
}

/// Trip times of `trip_id` in the timetable of `pattern`, today.
pub fn trip_times_today(
    snapshot: &TimetableSnapshot,
    pattern: &TripPattern,
    trip_id: &str,
) -> Result<Arc<TripTimes>, Error> {
    trip_times_on(snapshot, pattern, trip_id, Some(today()))
}

/// With no service date, the scheduled trip times are returned.
pub fn trip_times_on(
    snapshot: &TimetableSnapshot,
    pattern: &TripPattern,
    trip_id: &str,
    service_date: Option<NaiveDate>,
) -> Result<Arc<TripTimes>, Error> {
    snapshot
        .resolve(pattern, service_date)
        .trip_times(&id(trip_id))
        .cloned()
        .ok_or_else(|| format_err!("Trip {} not found in pattern {}", trip_id, pattern.id()))
}
