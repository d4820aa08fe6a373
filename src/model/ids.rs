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

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An identifier made unique across feeds by prefixing it with its feed id.
///
/// Serialized as `"<feed_id>:<id>"`. The feed id may not contain ':', the id may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeedScopedId {
    pub feed_id: String,
    pub id: String,
}

impl FeedScopedId {
    pub fn new(feed_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            id: id.into(),
        }
    }

    pub fn belongs_to_feed(&self, feed_id: &str) -> bool {
        self.feed_id == feed_id
    }
}

impl Display for FeedScopedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.feed_id, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadFeedScopedId(pub String);

impl std::error::Error for BadFeedScopedId {}

impl Display for BadFeedScopedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' is not an id of the form <feed_id>:<id> with non empty parts",
            self.0
        )
    }
}

impl TryFrom<String> for FeedScopedId {
    type Error = BadFeedScopedId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once(':') {
            Some((feed_id, id)) if !feed_id.is_empty() && !id.is_empty() => {
                Ok(FeedScopedId::new(feed_id, id))
            }
            _ => Err(BadFeedScopedId(value)),
        }
    }
}

impl From<FeedScopedId> for String {
    fn from(id: FeedScopedId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_colon_separates_the_feed() {
        let id = FeedScopedId::try_from("RUT:Line:1".to_string()).unwrap();
        assert_eq!(id.feed_id, "RUT");
        assert_eq!(id.id, "Line:1");
        assert_eq!(id.to_string(), "RUT:Line:1");

        assert!(FeedScopedId::try_from("no_feed".to_string()).is_err());
        assert!(FeedScopedId::try_from(":empty_feed".to_string()).is_err());
    }
}
