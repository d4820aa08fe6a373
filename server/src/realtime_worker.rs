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
use std::{sync::Arc, time::Duration};
use timetable_snapshot::{
    tracing::{debug, error, info, trace},
    BaseModel, SnapshotSource, UpdateBatch, UpdateResult, VehicleMonitoringBatch,
};
use tokio::{sync::mpsc, time::MissedTickBehavior};

/// A message read from the inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealTimeMessage {
    EstimatedTimetable(UpdateBatch),
    VehicleMonitoring(VehicleMonitoringBatch),
}

impl RealTimeMessage {
    pub fn feed_id(&self) -> &str {
        match self {
            RealTimeMessage::EstimatedTimetable(batch) => &batch.feed_id,
            RealTimeMessage::VehicleMonitoring(batch) => &batch.feed_id,
        }
    }
}

pub struct RealTimeWorker {
    source: Arc<SnapshotSource<BaseModel>>,
    update_interval: Duration,
    receiver: mpsc::UnboundedReceiver<RealTimeMessage>,
    pending: Vec<RealTimeMessage>,
}

impl RealTimeWorker {
    pub fn new(
        source: Arc<SnapshotSource<BaseModel>>,
        update_interval: Duration,
    ) -> (Self, mpsc::UnboundedSender<RealTimeMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Self {
            source,
            update_interval,
            receiver,
            pending: Vec::new(),
        };
        (worker, sender)
    }

    /// Applies the messages received, once per update interval.
    /// Returns when every sender has been dropped, after applying what is left.
    pub async fn run(mut self) -> Result<(), Error> {
        info!("Real time worker started.");
        let mut interval = tokio::time::interval(non_zero(self.update_interval));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    trace!("Real time worker tick.");
                    self.apply_pending().await;
                }
                message = self.receiver.recv() => {
                    match message {
                        Some(message) => {
                            trace!("Received a message for feed '{}'.", message.feed_id());
                            self.pending.push(message);
                        }
                        None => {
                            info!("Real time channel closed. Applying remaining messages.");
                            self.apply_pending().await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    // A failed apply is logged and its messages dropped, the worker keeps running.
    async fn apply_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let messages = std::mem::take(&mut self.pending);
        let source = self.source.clone();
        let nb_of_messages = messages.len();
        // applying takes the writer lock, so it runs outside of the async executor
        match tokio::task::spawn_blocking(move || apply_messages(&source, &messages)).await {
            Ok(result) => debug!("Applied {} real time messages : {}", nb_of_messages, result),
            Err(err) => error!(
                "Real time update task failed, {} messages dropped. {:?}",
                nb_of_messages, err
            ),
        }
    }
}

// tokio intervals cannot have a zero period
pub(crate) fn non_zero(period: Duration) -> Duration {
    period.max(Duration::from_millis(1))
}

pub fn apply_messages(
    source: &SnapshotSource<BaseModel>,
    messages: &[RealTimeMessage],
) -> UpdateResult {
    let mut result = UpdateResult::default();
    for message in messages {
        result += match message {
            RealTimeMessage::EstimatedTimetable(batch) => source.apply_estimated_timetable(batch),
            RealTimeMessage::VehicleMonitoring(batch) => source.apply_vehicle_monitoring(batch),
        };
    }
    result
}

pub fn parse_message(content: &str) -> Result<RealTimeMessage, Error> {
    serde_json::from_str(content).map_err(|err| format_err!("Could not parse message. {}", err))
}
