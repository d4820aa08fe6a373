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
use std::{
    fmt::{Debug, Display},
    str::FromStr,
    time::Duration,
};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RealTimeParams {
    /// Feed used for ids created by real time updates when a batch does not name one.
    #[serde(default = "default_feed_id")]
    pub feed_id: String,

    /// Minimum delay between two snapshot publications, in milliseconds.
    #[serde(default = "default_max_snapshot_frequency_ms")]
    pub max_snapshot_frequency_ms: u64,

    /// Drop real time data whose service date is more than two days old.
    #[serde(default = "default_purge_expired_data")]
    pub purge_expired_data: bool,

    /// An info summary is logged each time this number of journeys has been handled.
    #[serde(default = "default_log_frequency")]
    pub log_frequency: u64,
}

pub fn default_feed_id() -> String {
    "RT".to_string()
}

pub fn default_max_snapshot_frequency_ms() -> u64 {
    1000
}

pub fn default_purge_expired_data() -> bool {
    true
}

pub fn default_log_frequency() -> u64 {
    2000
}

impl Default for RealTimeParams {
    fn default() -> Self {
        Self {
            feed_id: default_feed_id(),
            max_snapshot_frequency_ms: default_max_snapshot_frequency_ms(),
            purge_expired_data: default_purge_expired_data(),
            log_frequency: default_log_frequency(),
        }
    }
}

impl RealTimeParams {
    pub fn new_from_env_vars() -> Self {
        let feed_id = read_env_var("SNAPSHOT_FEED_ID", default_feed_id(), |s| s.to_string());
        let max_snapshot_frequency_ms = parse_env_var(
            "SNAPSHOT_MAX_SNAPSHOT_FREQUENCY_MS",
            default_max_snapshot_frequency_ms(),
            u64::from_str,
        );
        let purge_expired_data = parse_env_var(
            "SNAPSHOT_PURGE_EXPIRED_DATA",
            default_purge_expired_data(),
            bool::from_str,
        );
        let log_frequency =
            parse_env_var("SNAPSHOT_LOG_FREQUENCY", default_log_frequency(), u64::from_str);
        Self {
            feed_id,
            max_snapshot_frequency_ms,
            purge_expired_data,
            log_frequency,
        }
    }

    pub fn max_snapshot_frequency(&self) -> Duration {
        Duration::from_millis(self.max_snapshot_frequency_ms)
    }
}

// - var not set -> use default value
// - var set but non-unicode -> warn and use default value
// - var set but not parsable -> warn and use default value
pub fn parse_env_var<T, Parser, ParseErr>(var_name: &str, default_value: T, parser: Parser) -> T
where
    Parser: Fn(&str) -> Result<T, ParseErr>,
    ParseErr: Display,
    T: Debug,
{
    match std::env::var(var_name) {
        Ok(s) => match parser(&s) {
            Ok(val) => val,
            Err(err) => {
                warn!(
                    "Could not parse env var {} : {}. I'll use the default value '{:?}' instead",
                    var_name, err, default_value
                );
                default_value
            }
        },
        Err(std::env::VarError::NotPresent) => default_value,
        Err(std::env::VarError::NotUnicode(err)) => {
            warn!(
                "Badly formed env var {} : {:?}. I'll use the default value {:?} instead",
                var_name, err, default_value
            );
            default_value
        }
    }
}

// for infaillible parser
pub fn read_env_var<T, Parser>(var_name: &str, default_value: T, parser: Parser) -> T
where
    Parser: Fn(&str) -> T,
    T: Debug,
{
    parse_env_var(var_name, default_value, |s| -> Result<T, &'static str> {
        Ok(parser(s))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_get_default_values() {
        let params: RealTimeParams = serde_json::from_str(r#"{"log_frequency": 10}"#).unwrap();
        assert_eq!(params.log_frequency, 10);
        assert_eq!(params.feed_id, "RT");
        assert_eq!(params.max_snapshot_frequency(), Duration::from_secs(1));
        assert!(params.purge_expired_data);

        let unknown = serde_json::from_str::<RealTimeParams>(r#"{"max_snapshot_frequency": 10}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn unparsable_env_var_falls_back_to_default() {
        std::env::set_var("SNAPSHOT_TEST_GOOD_VALUE", "250");
        std::env::set_var("SNAPSHOT_TEST_BAD_VALUE", "soon");
        assert_eq!(parse_env_var("SNAPSHOT_TEST_GOOD_VALUE", 1000, u64::from_str), 250);
        assert_eq!(parse_env_var("SNAPSHOT_TEST_BAD_VALUE", 1000, u64::from_str), 1000);
        assert_eq!(parse_env_var("SNAPSHOT_TEST_UNSET_VALUE", 1000, u64::from_str), 1000);
    }

    #[test]
    fn params_from_env_vars() {
        std::env::set_var("SNAPSHOT_MAX_SNAPSHOT_FREQUENCY_MS", "0");
        std::env::set_var("SNAPSHOT_PURGE_EXPIRED_DATA", "false");
        let params = RealTimeParams::new_from_env_vars();
        assert_eq!(params.max_snapshot_frequency_ms, 0);
        assert!(!params.purge_expired_data);
        assert_eq!(params.log_frequency, default_log_frequency());
    }
}
