//! Fleet assembly: the composition root behind the binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use caravan_api_http::HttpGameApi;
use caravan_core::{EquipmentAdvisor, GameApi, Strategy, WorldKnowledge};
use caravan_runtime::{Agent, Board, Coordinator, CoordinatorConfig, FightSimulator};

use crate::advisor::BestAvailableAdvisor;
use crate::config::FleetConfig;
use crate::strategy::TrainingStrategy;
use crate::world::StaticWorld;

/// A running fleet: one task per agent plus the shutdown switch.
pub struct Fleet {
    pub handles: Vec<JoinHandle<()>>,
    pub shutdown: watch::Sender<bool>,
}

pub fn build_fleet(config: &FleetConfig) -> Result<Fleet> {
    let api: Arc<dyn GameApi> = Arc::new(
        HttpGameApi::new(&config.api_url, &config.token).context("building the API client")?,
    );
    let world: Arc<dyn WorldKnowledge> =
        Arc::new(StaticWorld::load(&config.data_dir).context("loading world content")?);
    let board = Arc::new(Board::new());
    let strategy: Arc<dyn Strategy> = Arc::new(TrainingStrategy::new(Arc::clone(&world)));
    let simulator = Arc::new(FightSimulator::new(Arc::clone(&api)));
    let advisor: Arc<dyn EquipmentAdvisor> =
        Arc::new(BestAvailableAdvisor::new(Arc::clone(&world)));
    let coordinator = Arc::new(Coordinator::new(
        Arc::clone(&board),
        Arc::clone(&world),
        Arc::clone(&strategy),
        Some(simulator),
        CoordinatorConfig {
            team: config.characters.clone(),
            pipeline_enabled: config.pipeline_enabled,
            ..CoordinatorConfig::default()
        },
    ));

    let (shutdown, shutdown_rx) = watch::channel(false);
    let handles = config
        .characters
        .iter()
        .map(|name| {
            let agent = Agent::builder(
                name.clone(),
                Arc::clone(&api),
                Arc::clone(&world),
                Arc::clone(&board),
                shutdown_rx.clone(),
            )
            .coordinator(Arc::clone(&coordinator))
            .strategy(Arc::clone(&strategy))
            .advisor(Arc::clone(&advisor))
            .build();
            info!(agent = %name, "spawning agent");
            tokio::spawn(agent.run())
        })
        .collect();

    Ok(Fleet { handles, shutdown })
}
