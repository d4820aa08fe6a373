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

use super::{FeedScopedId, Route};
use crate::timetable::Timetable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FlowDirection {
    BoardOnly,
    DebarkOnly,
    #[default]
    BoardAndDebark,
    NoBoardDebark,
}

impl FlowDirection {
    pub fn from_flags(can_board: bool, can_debark: bool) -> Self {
        match (can_board, can_debark) {
            (true, true) => FlowDirection::BoardAndDebark,
            (true, false) => FlowDirection::BoardOnly,
            (false, true) => FlowDirection::DebarkOnly,
            (false, false) => FlowDirection::NoBoardDebark,
        }
    }

    pub fn can_board(&self) -> bool {
        matches!(self, FlowDirection::BoardOnly | FlowDirection::BoardAndDebark)
    }

    pub fn can_debark(&self) -> bool {
        matches!(self, FlowDirection::DebarkOnly | FlowDirection::BoardAndDebark)
    }
}

/// The ordered stops of a pattern with the allowed flow at each of them.
///
/// Compared structurally, which makes it usable as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StopPattern {
    stops: Vec<FeedScopedId>,
    flows: Vec<FlowDirection>,
}

impl StopPattern {
    pub fn new(stops_and_flows: impl IntoIterator<Item = (FeedScopedId, FlowDirection)>) -> Self {
        let (stops, flows) = stops_and_flows.into_iter().unzip();
        Self { stops, flows }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stops(&self) -> &[FeedScopedId] {
        &self.stops
    }

    pub fn stop(&self, position: usize) -> Option<&FeedScopedId> {
        self.stops.get(position)
    }

    pub fn first_stop(&self) -> Option<&FeedScopedId> {
        self.stops.first()
    }

    pub fn last_stop(&self) -> Option<&FeedScopedId> {
        self.stops.last()
    }

    pub fn flow(&self, position: usize) -> Option<FlowDirection> {
        self.flows.get(position).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeedScopedId, FlowDirection)> + '_ {
        self.stops.iter().zip(self.flows.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripPattern {
    id: FeedScopedId,
    route: Arc<Route>,
    stop_pattern: StopPattern,
    scheduled_timetable: Timetable,
    // the static pattern a realtime pattern was spliced from
    original_pattern: Option<FeedScopedId>,
    created_by_realtime: bool,
}

impl TripPattern {
    pub fn new(
        id: FeedScopedId,
        route: Arc<Route>,
        stop_pattern: StopPattern,
        scheduled_timetable: Timetable,
    ) -> Self {
        Self {
            id,
            route,
            stop_pattern,
            scheduled_timetable,
            original_pattern: None,
            created_by_realtime: false,
        }
    }

    /// A pattern created while applying real time updates.
    /// Its scheduled timetable is empty: its trips only exist on dated timetables.
    pub fn new_realtime(
        id: FeedScopedId,
        route: Arc<Route>,
        stop_pattern: StopPattern,
        original_pattern: Option<FeedScopedId>,
    ) -> Self {
        let scheduled_timetable = Timetable::new(id.clone(), None);
        Self {
            id,
            route,
            stop_pattern,
            scheduled_timetable,
            original_pattern,
            created_by_realtime: true,
        }
    }

    pub fn id(&self) -> &FeedScopedId {
        &self.id
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn stop_pattern(&self) -> &StopPattern {
        &self.stop_pattern
    }

    pub fn number_of_stops(&self) -> usize {
        self.stop_pattern.len()
    }

    pub fn stop(&self, position: usize) -> Option<&FeedScopedId> {
        self.stop_pattern.stop(position)
    }

    pub fn scheduled_timetable(&self) -> &Timetable {
        &self.scheduled_timetable
    }

    pub fn original_pattern(&self) -> Option<&FeedScopedId> {
        self.original_pattern.as_ref()
    }

    pub fn is_created_by_realtime(&self) -> bool {
        self.created_by_realtime
    }

    pub fn can_board(&self, position: usize) -> bool {
        self.stop_pattern
            .flow(position)
            .map_or(false, |flow| flow.can_board())
    }

    pub fn can_alight(&self, position: usize) -> bool {
        self.stop_pattern
            .flow(position)
            .map_or(false, |flow| flow.can_debark())
    }
}
