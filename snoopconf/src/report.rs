use serde::Serialize;

use crate::commands::CommandList;
use crate::params::ParameterSet;
use crate::reconciler::Mode;

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// The state that was asked for, after dropping unset parameters.
    pub proposed: ParameterSet,
    /// State observed before any change.
    pub existing: ParameterSet,
    /// State observed after applying, or `existing` when nothing was sent.
    pub end_state: ParameterSet,
    pub mode: Mode,
    pub commands: CommandList,
    pub changed: bool,
}
