// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod error;
pub mod games;
pub mod ledger;
pub mod protocol;
pub mod server;
pub mod state;
pub mod tiebreak;
pub mod types;
pub mod ws;
