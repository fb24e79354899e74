// src/server/context.rs

use super::runtime::RankRuntime;
use crate::config::Config;
use tokio::net::TcpListener;

/// Holds everything initialized before the server starts accepting requests.
pub struct ServerContext {
    pub config: Config,
    pub runtime: RankRuntime,
    pub listener: TcpListener,
}
