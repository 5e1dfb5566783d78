//! finmetrics - hledger journals as time-series metrics
//!
//! This library aligns sparse, per-account ledger data onto regular date
//! grids, prices the commodities held, and publishes the resulting series to
//! a metrics store. It also keeps journal price directives up to date.

pub mod cli;
pub mod commodity;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod metrics;
pub mod pricing;
pub mod reconcile;
pub mod register;
pub mod series;
pub mod utils;
