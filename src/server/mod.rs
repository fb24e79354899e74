// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

mod context;
pub mod http;
mod initialization;
mod lifecycle;
pub mod runtime;

pub use runtime::RankRuntime;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Connect to the store, load rankings and bind the listener.
    let server_context = initialization::setup(config).await?;

    // 2. Serve requests until a shutdown signal or a core task failure.
    lifecycle::run(server_context).await
}
