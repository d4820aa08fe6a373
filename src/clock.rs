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

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Source of time for the snapshot source.
///
/// `now()` gives the wall clock used to compute "today" and purge old service dates,
/// `instant()` gives the monotonic clock used to throttle snapshot publication.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when asked to.
#[derive(Debug)]
pub struct FixedClock {
    origin: Instant,
    state: Mutex<FixedClockState>,
}

#[derive(Debug)]
struct FixedClockState {
    now: DateTime<Utc>,
    elapsed: Duration,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(FixedClockState {
                now,
                elapsed: Duration::ZERO,
            }),
        }
    }

    /// Moves both the wall clock and the monotonic clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.elapsed += duration;
        if let Ok(chrono_duration) = chrono::Duration::from_std(duration) {
            state.now = state.now + chrono_duration;
        }
    }

    /// Changes the wall clock only, the monotonic clock is left untouched.
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state.lock().now = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().now
    }

    fn instant(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }
}
