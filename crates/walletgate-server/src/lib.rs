//! HTTP shell for the wallet credential exchange. The pipeline itself
//! lives in the `walletgate` crate; this crate wires it to actix-web plus
//! the operational surface (config, metrics, CORS, rate limiting).

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
