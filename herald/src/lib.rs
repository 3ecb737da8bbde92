//! Paced multi-account message dispatch
//!
//! This crate wires the dispatch engine to its surroundings: configuration,
//! the on-disk account profiles, the external send program and the access
//! key gate.

pub mod accounts;
pub mod config;
pub mod controller;
pub mod gate;
pub mod sender;

pub use accounts::{AccountError, AccountInfo, AccountOverview, AccountStore, AccountStoreConfig};
pub use config::Herald;
pub use gate::{GateConfig, GateError, KeyGate, KeySets, KeyValidation};
pub use sender::{
    CheckReport, CommandSender, CommandSenderConfig, DryRunSender, NumberCheck, SenderConfig,
    check_numbers,
};
