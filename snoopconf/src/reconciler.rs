//! Desired-state reconciliation.
//!
//! The free functions compute a [`Delta`] without any I/O. [`Reconciler`]
//! drives one full fetch / diff / build / apply cycle against a device.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::commands::{CommandBuilder, CommandList};
use crate::device::{DeviceClient, StateFetcher, Target};
use crate::params::{default_table, Delta, ParameterSet};
use crate::report::Report;
use crate::{Error, Result};

/// How the desired state is derived.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Use the values supplied by the caller.
    #[default]
    Present,
    /// Restore the factory defaults, ignoring caller values.
    Default,
}

/// Entries of `desired` whose value differs from, or is missing in, `current`.
pub fn diff(desired: &ParameterSet, current: &ParameterSet) -> Delta {
    desired
        .iter()
        .filter(|(param, value)| current.get(*param) != Some(*value))
        .map(|(param, value)| (param, value.clone()))
        .collect()
}

/// Compute the delta for `mode` using the built-in default table.
pub fn reconcile(desired: &ParameterSet, current: &ParameterSet, mode: Mode) -> Delta {
    reconcile_with_defaults(desired, current, mode, &default_table())
}

/// Compute the delta for `mode`. In [`Mode::Default`] `desired` is ignored and
/// replaced wholesale by `defaults`.
pub fn reconcile_with_defaults(
    desired: &ParameterSet,
    current: &ParameterSet,
    mode: Mode,
    defaults: &ParameterSet,
) -> Delta {
    match mode {
        Mode::Present => diff(desired, current),
        Mode::Default => diff(defaults, current),
    }
}

/// Drives a single reconciliation against one device.
pub struct Reconciler {
    fetcher: Arc<dyn StateFetcher>,
    client: Arc<dyn DeviceClient>,
    builder: Box<dyn CommandBuilder>,
    defaults: ParameterSet,
    check_mode: bool,
}

impl Reconciler {
    pub fn new(
        fetcher: Arc<dyn StateFetcher>,
        client: Arc<dyn DeviceClient>,
        builder: Box<dyn CommandBuilder>,
    ) -> Self {
        Self {
            fetcher,
            client,
            builder,
            defaults: default_table(),
            check_mode: false,
        }
    }

    /// Replace the built-in default table used in [`Mode::Default`].
    pub fn with_defaults(mut self, defaults: ParameterSet) -> Self {
        self.defaults = defaults;
        self
    }

    /// When set, commands are built and reported but never sent to the device.
    pub fn check_mode(mut self, enabled: bool) -> Self {
        self.check_mode = enabled;
        self
    }

    pub async fn run(&self, target: &Target, desired: ParameterSet, mode: Mode) -> Result<Report> {
        let proposed = match mode {
            Mode::Present => desired,
            Mode::Default => self.defaults.clone(),
        };
        for (param, value) in proposed.iter() {
            param.check(value)?;
        }

        let existing = self.fetcher.fetch(target).await?;
        debug!(?existing, "fetched current state from {}", target);

        let delta = reconcile_with_defaults(&proposed, &existing, mode, &self.defaults);
        if delta.is_empty() {
            info!("{} already in desired state, no changes needed", target);
            return Ok(Report {
                proposed,
                end_state: existing.clone(),
                existing,
                mode,
                commands: CommandList::default(),
                changed: false,
            });
        }
        debug!(?delta, "computed delta");

        let commands = self.builder.build(&delta, &existing, mode);
        if commands.is_empty() {
            return Err(Error::Apply(format!(
                "no commands built for changed parameters: {}",
                delta.keys().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
            )));
        }

        if self.check_mode {
            info!("check mode: {} command(s) not sent to {}", commands.len(), target);
            return Ok(Report {
                proposed,
                end_state: existing.clone(),
                existing,
                mode,
                commands,
                changed: true,
            });
        }

        info!("applying {} command(s) to {}", commands.len(), target);
        self.client.apply(target, &commands).await?;

        let end_state = self.fetcher.fetch(target).await?;

        Ok(Report {
            proposed,
            existing,
            end_state,
            mode,
            commands,
            changed: true,
        })
    }
}
