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

pub mod inbox_worker;
pub mod logger;
pub mod realtime_worker;
pub mod server_config;

use inbox_worker::InboxWorker;
use realtime_worker::RealTimeWorker;
use server_config::ServerConfig;

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Error};
use timetable_snapshot::{
    model::ScheduleData,
    tracing::{debug, info},
    BaseModel, SnapshotSource,
};

pub fn launch_server() -> Result<(), Error> {
    let mut args = std::env::args();
    let config = match args.len() {
        1 => ServerConfig::new_from_env_vars().context("Could not read config from env vars")?,
        2 => {
            // skip the first arg which is the name of the binary launched
            args.next();
            let config_file_path = args
                .next()
                .context("Missing config file path argument")?;
            read_config(Path::new(&config_file_path)).context(format!(
                "Could not read config from file path {}",
                config_file_path
            ))?
        }
        _ => {
            anyhow::bail!("Unexpected number of arguments {}.", args.len());
        }
    };
    debug!("Launching with config : {:#?}", config);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Could not build tokio runtime")?;
    runtime.block_on(run(config))
}

pub fn read_config(config_file_path: &Path) -> Result<ServerConfig, Error> {
    info!("Reading config from file {:?}", &config_file_path);
    let content = fs::read_to_string(config_file_path)
        .with_context(|| format!("Error opening config file {:?}", &config_file_path))?;
    let config: ServerConfig = toml::from_str(&content)?;

    Ok(config)
}

pub fn load_base_model(input_data_path: &Path) -> Result<BaseModel, Error> {
    info!("Reading schedule from {:?}", input_data_path);
    let content = fs::read_to_string(input_data_path)
        .with_context(|| format!("Error opening schedule file {:?}", input_data_path))?;
    let data: ScheduleData = serde_json::from_str(&content)
        .with_context(|| format!("Could not parse schedule file {:?}", input_data_path))?;
    let model = BaseModel::from_data(data)
        .with_context(|| format!("Invalid schedule in {:?}", input_data_path))?;
    Ok(model)
}

pub async fn run(config: ServerConfig) -> Result<(), Error> {
    let model = load_base_model(&config.input_data_path)?;
    let source = Arc::new(SnapshotSource::new(Arc::new(model), config.realtime.clone()));

    let (realtime_worker, sender) =
        RealTimeWorker::new(source.clone(), config.update_interval.as_std());
    let inbox_worker = InboxWorker::new(
        config.inbox_path.clone(),
        config.inbox_poll_interval.as_std(),
        sender,
    );

    let realtime_handle = tokio::spawn(realtime_worker.run());
    let mut inbox_handle = tokio::spawn(inbox_worker.run());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Could not listen to ctrl-c")?;
            info!("Received ctrl-c. Shutting down.");
            // dropping the inbox worker closes the channel, and the real time worker
            // applies what it already received
            inbox_handle.abort();
            realtime_handle.await.context("Real time worker panicked")??;
        }
        result = &mut inbox_handle => {
            result.context("Inbox worker panicked")??;
        }
    }
    let snapshot = source.force_commit();
    info!(
        "Last snapshot has generation {} with {} timetables.",
        snapshot.generation(),
        snapshot.nb_of_timetables()
    );
    Ok(())
}
