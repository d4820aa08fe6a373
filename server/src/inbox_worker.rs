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

use crate::realtime_worker::{non_zero, parse_message, RealTimeMessage};
use anyhow::{format_err, Context, Error};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use timetable_snapshot::tracing::{debug, error, info, trace, warn};
use tokio::{sync::mpsc, time::MissedTickBehavior};

const MESSAGE_EXTENSION: &str = "json";
const FAILED_EXTENSION: &str = "failed";

/// Watches a directory where real time messages are dropped as json files.
///
/// Files are read in lexicographic order of their names, sent to the real time worker
/// and removed. A file that cannot be parsed is renamed with a `.failed` extension.
pub struct InboxWorker {
    inbox_path: PathBuf,
    poll_interval: Duration,
    sender: mpsc::UnboundedSender<RealTimeMessage>,
}

impl InboxWorker {
    pub fn new(
        inbox_path: PathBuf,
        poll_interval: Duration,
        sender: mpsc::UnboundedSender<RealTimeMessage>,
    ) -> Self {
        Self {
            inbox_path,
            poll_interval,
            sender,
        }
    }

    pub async fn run(self) -> Result<(), Error> {
        info!("Watching inbox {:?}", self.inbox_path);
        let mut interval = tokio::time::interval(non_zero(self.poll_interval));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match self.poll_once().await {
                Ok(nb_of_messages) => {
                    if nb_of_messages > 0 {
                        debug!("Read {} messages from the inbox.", nb_of_messages);
                    }
                }
                Err(err) => {
                    if self.sender.is_closed() {
                        return Err(err);
                    }
                    error!("Error while polling the inbox. {:?}", err);
                }
            }
        }
    }

    /// Sends every message currently in the inbox and returns how many were sent.
    pub async fn poll_once(&self) -> Result<usize, Error> {
        let paths = self.message_files().await?;
        let mut nb_of_messages = 0;
        for path in paths {
            trace!("Reading message {:?}", path);
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Could not read {:?}", path))?;
            match parse_message(&content) {
                Ok(message) => {
                    self.sender
                        .send(message)
                        .map_err(|_| format_err!("Real time channel is closed."))?;
                    tokio::fs::remove_file(&path)
                        .await
                        .with_context(|| format!("Could not remove {:?}", path))?;
                    nb_of_messages += 1;
                }
                Err(err) => {
                    warn!("Invalid message {:?}. {:?}", path, err);
                    mark_as_failed(&path).await?;
                }
            }
        }
        Ok(nb_of_messages)
    }

    async fn message_files(&self) -> Result<Vec<PathBuf>, Error> {
        let mut entries = tokio::fs::read_dir(&self.inbox_path)
            .await
            .with_context(|| format!("Could not open inbox {:?}", self.inbox_path))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_message = path.extension().map_or(false, |ext| ext == MESSAGE_EXTENSION);
            if is_message && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

async fn mark_as_failed(path: &Path) -> Result<(), Error> {
    let failed_path = path.with_extension(FAILED_EXTENSION);
    tokio::fs::rename(path, &failed_path)
        .await
        .with_context(|| format!("Could not rename {:?} to {:?}", path, failed_path))
}
