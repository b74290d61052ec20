//! da-watchdog polls several EVM JSON-RPC endpoints, checks that they agree
//! on the chain head and on sampled transactions, and turns the result into
//! a 0-100 data-availability score that is pushed to dashboards.

pub mod alerts;
pub mod api;
pub mod config;
pub mod consistency;
pub mod eth;
pub mod health;
pub mod models;
pub mod monitor;
pub mod sampler;
pub mod scorer;
pub mod state;

pub use config::Config;
pub use eth::{ChainSource, EthClient, RpcError};
pub use monitor::{Event, MonitorHandle};
pub use scorer::{score, DaScore, Grade};
