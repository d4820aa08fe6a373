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

mod utils;

use anyhow::{format_err, Error};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc, Mutex,
    },
    thread,
    time::Duration,
};
use timetable_snapshot::{BaseModel, RealTimeState, Timetable, TimetableKey, TransitLayerUpdater};
use utils::{
    batch, delayed_at_b, model_builder::ModelBuilder, pattern_of, snapshot_source,
    trip_times_today, unthrottled_params,
};

const NB_OF_WRITERS: usize = 8;
const NB_OF_READERS: usize = 4;
const NB_OF_BATCHES: i64 = 20;
const TIMEOUT: Duration = Duration::from_secs(10);

// one route per writer, so that writers update disjoint patterns
fn model() -> BaseModel {
    let mut builder = ModelBuilder::new("2022-01-01", "2022-01-20");
    for writer in 0..NB_OF_WRITERS {
        let route = format!("R{}", writer);
        builder = builder.route(&route, |_| {}).vj(&format!("{}.1", route), |vj_builder| {
            vj_builder
                .route(&route)
                .st("A", "10:00:00")
                .st_detailed("B", "10:10:00", "10:11:00")
                .st("C", "10:20:00");
        });
    }
    builder.build()
}

#[test]
fn concurrent_writers_and_readers() -> Result<(), Error> {
    utils::init_logger();
    let (source, _) = snapshot_source(model(), unthrottled_params());
    let source = Arc::new(source);
    let writers_done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..NB_OF_READERS)
        .map(|_| {
            let source = source.clone();
            let writers_done = writers_done.clone();
            thread::spawn(move || {
                let mut last_generation = 0;
                let mut nb_of_reads = 0;
                while !writers_done.load(Ordering::Acquire) || nb_of_reads == 0 {
                    let snapshot = source.timetable_snapshot();
                    assert!(snapshot.generation() >= last_generation);
                    last_generation = snapshot.generation();
                    nb_of_reads += 1;
                }
                last_generation
            })
        })
        .collect();

    let writers: Vec<_> = (0..NB_OF_WRITERS)
        .map(|writer| {
            let source = source.clone();
            thread::spawn(move || {
                let trip_id = format!("R{}.1", writer);
                let mut nb_of_handled = 0;
                for delay in 1..=NB_OF_BATCHES {
                    let result = source.apply_estimated_timetable(&batch(vec![delayed_at_b(
                        &trip_id,
                        delay * 10,
                    )]));
                    nb_of_handled += result.handled;
                }
                nb_of_handled
            })
        })
        .collect();

    for writer in writers {
        let nb_of_handled = writer
            .join()
            .map_err(|_| format_err!("writer thread panicked"))?;
        assert_eq!(nb_of_handled, NB_OF_BATCHES as usize);
    }
    writers_done.store(true, Ordering::Release);

    let snapshot = source.force_commit();
    for reader in readers {
        let last_generation = reader
            .join()
            .map_err(|_| format_err!("reader thread panicked"))?;
        assert!(last_generation <= snapshot.generation());
    }

    assert_eq!(snapshot.nb_of_timetables(), NB_OF_WRITERS);
    for writer in 0..NB_OF_WRITERS {
        let trip_id = format!("R{}.1", writer);
        let pattern = pattern_of(&source, &trip_id)?;
        let trip_times = trip_times_today(&snapshot, &pattern, &trip_id)?;
        assert_eq!(trip_times.real_time_state(), RealTimeState::Updated);
        // the last batch of each writer wins
        assert_eq!(trip_times.arrival_delay(1), (NB_OF_BATCHES * 10) as i32);
    }
    Ok(())
}

// Holds the writer inside its commit, once armed, until the test lets it go.
#[derive(Default)]
struct GatedTransitLayer {
    armed: AtomicBool,
    entered: Mutex<Option<mpsc::Sender<u64>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl GatedTransitLayer {
    fn arm(&self) -> (mpsc::Receiver<u64>, mpsc::Sender<()>) {
        let (entered_sender, entered_receiver) = mpsc::channel();
        let (release_sender, release_receiver) = mpsc::channel();
        *self.entered.lock().unwrap() = Some(entered_sender);
        *self.release.lock().unwrap() = Some(release_receiver);
        self.armed.store(true, Ordering::Release);
        (entered_receiver, release_sender)
    }
}

impl TransitLayerUpdater for GatedTransitLayer {
    fn update(&self, generation: u64, _: &[Arc<Timetable>], _: &[TimetableKey]) {
        if !self.armed.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(entered) = self.entered.lock().unwrap().take() {
            entered.send(generation).unwrap();
        }
        if let Some(release) = self.release.lock().unwrap().take() {
            release.recv_timeout(TIMEOUT).unwrap();
        }
    }
}

#[test]
fn readers_are_not_blocked_by_the_writer() -> Result<(), Error> {
    utils::init_logger();
    let gate = Arc::new(GatedTransitLayer::default());
    let (source, _) = snapshot_source(model(), unthrottled_params());
    let source = Arc::new(source.with_transit_layer_updater(gate.clone()));
    source.apply_estimated_timetable(&batch(vec![delayed_at_b("R0.1", 60)]));
    let published = source.timetable_snapshot();

    let (entered, release) = gate.arm();
    let writer = {
        let source = source.clone();
        thread::spawn(move || {
            source.apply_estimated_timetable(&batch(vec![delayed_at_b("R1.1", 120)]))
        })
    };
    // the writer is now committing, with the lock held
    let committed_generation = entered.recv_timeout(TIMEOUT)?;
    assert_eq!(committed_generation, published.generation() + 1);

    let snapshot = source.timetable_snapshot();
    assert!(Arc::ptr_eq(&snapshot, &published));
    let pattern = pattern_of(&source, "R1.1")?;
    assert_eq!(
        trip_times_today(&snapshot, &pattern, "R1.1")?.real_time_state(),
        RealTimeState::Scheduled
    );

    release.send(())?;
    let result = writer
        .join()
        .map_err(|_| format_err!("writer thread panicked"))?;
    assert_eq!(result.handled, 1);

    let snapshot = source.timetable_snapshot();
    assert_eq!(snapshot.generation(), committed_generation);
    assert_eq!(trip_times_today(&snapshot, &pattern, "R1.1")?.arrival_delay(1), 120);
    Ok(())
}
