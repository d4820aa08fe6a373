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

use anyhow::{format_err, Error};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr};
use timetable_snapshot::{
    config::parse_env_var, PositiveDuration, RealTimeParams,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// json file with the static schedule
    pub input_data_path: PathBuf,

    /// directory polled for real time batch files
    pub inbox_path: PathBuf,

    #[serde(default)]
    pub realtime: RealTimeParams,

    /// batches received are applied together at this interval
    #[serde(default = "default_update_interval")]
    pub update_interval: PositiveDuration,

    #[serde(default = "default_inbox_poll_interval")]
    pub inbox_poll_interval: PositiveDuration,
}

pub fn default_update_interval() -> PositiveDuration {
    PositiveDuration::from_hms(0, 0, 1)
}

pub fn default_inbox_poll_interval() -> PositiveDuration {
    PositiveDuration::from_hms(0, 0, 2)
}

impl ServerConfig {
    pub fn new(input_data_path: PathBuf, inbox_path: PathBuf) -> Self {
        Self {
            input_data_path,
            inbox_path,
            realtime: RealTimeParams::default(),
            update_interval: default_update_interval(),
            inbox_poll_interval: default_inbox_poll_interval(),
        }
    }

    pub fn new_from_env_vars() -> Result<Self, Error> {
        let input_data_path = std::env::var("SNAPSHOT_INPUT_DATA_PATH")
            .map_err(|err| format_err!("Could not read env var SNAPSHOT_INPUT_DATA_PATH. {}", err))?;
        let inbox_path = std::env::var("SNAPSHOT_INBOX_PATH")
            .map_err(|err| format_err!("Could not read env var SNAPSHOT_INBOX_PATH. {}", err))?;
        let update_interval = parse_env_var(
            "SNAPSHOT_UPDATE_INTERVAL",
            default_update_interval(),
            PositiveDuration::from_str,
        );
        let inbox_poll_interval = parse_env_var(
            "SNAPSHOT_INBOX_POLL_INTERVAL",
            default_inbox_poll_interval(),
            PositiveDuration::from_str,
        );
        Ok(Self {
            input_data_path: PathBuf::from(input_data_path),
            inbox_path: PathBuf::from(inbox_path),
            realtime: RealTimeParams::new_from_env_vars(),
            update_interval,
            inbox_poll_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_toml_config() {
        let content = r#"
            input_data_path = "/data/schedule.json"
            inbox_path = "/data/inbox"
            update_interval = "00:00:05"

            [realtime]
            feed_id = "F"
            max_snapshot_frequency_ms = 0
        "#;
        let config: ServerConfig = toml::from_str(content).unwrap();
        assert_eq!(config.input_data_path, PathBuf::from("/data/schedule.json"));
        assert_eq!(config.update_interval.total_seconds(), 5);
        assert_eq!(config.inbox_poll_interval, default_inbox_poll_interval());
        assert_eq!(config.realtime.feed_id, "F");
        assert_eq!(config.realtime.max_snapshot_frequency_ms, 0);
        assert!(config.realtime.purge_expired_data);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let content = r#"
            input_data_path = "/data/schedule.json"
            inbox_path = "/data/inbox"
            nb_workers = 2
        "#;
        assert!(toml::from_str::<ServerConfig>(content).is_err());
    }
}
