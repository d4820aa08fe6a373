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

use super::FeedScopedId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub id: FeedScopedId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_station: Option<FeedScopedId>,
}

impl Stop {
    /// Two quays of the same station are interchangeable when matching real time data.
    pub fn is_part_of_same_station_as(&self, other: &Stop) -> bool {
        match (&self.parent_station, &other.parent_station) {
            (Some(station), Some(other_station)) => station == other_station,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: FeedScopedId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: FeedScopedId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: FeedScopedId,
    #[serde(default)]
    pub short_name: Option<String>,
    /// External line reference used by real time feeds, when it differs from the route id.
    #[serde(default)]
    pub line_ref: Option<String>,
    pub agency_id: FeedScopedId,
    #[serde(default)]
    pub operator_id: Option<FeedScopedId>,
}

impl Route {
    pub fn matches_line_ref(&self, line_ref: &str) -> bool {
        self.id.id == line_ref || self.line_ref.as_deref() == Some(line_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: FeedScopedId,
    pub route_id: FeedScopedId,
    pub service_id: FeedScopedId,
    #[serde(default)]
    pub headsign: Option<String>,
    #[serde(default)]
    pub operator_id: Option<FeedScopedId>,
}
