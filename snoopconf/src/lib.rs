//! Desired-state reconciliation of IGMP snooping settings on NX-OS switches.
//!
//! A run fetches the current parameters over NX-API, computes the minimal
//! [`Delta`] against the desired parameters, turns it into CLI commands and
//! either applies them or, in check mode, only reports them.

pub mod commands;
pub mod config;
pub mod device;
mod error;
pub mod nxapi;
pub mod params;
pub mod reconciler;
pub mod report;

pub use commands::{CommandBuilder, CommandList, NxosCommandBuilder};
pub use config::{Credentials, Overrides, Settings};
pub use device::{DeviceClient, Protocol, StateFetcher, Target};
pub use error::{Error, Result};
pub use nxapi::NxapiClient;
pub use params::{default_table, Delta, DesiredParams, ParamValue, Parameter, ParameterSet};
pub use reconciler::{diff, reconcile, reconcile_with_defaults, Mode, Reconciler};
pub use report::Report;
