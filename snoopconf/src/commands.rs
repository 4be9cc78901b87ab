use serde::Serialize;
use tracing::warn;

use crate::params::{Delta, ParamValue, Parameter, ParameterSet, NEVER};
use crate::reconciler::Mode;

/// Ordered device commands produced from a delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandList(Vec<String>);

impl CommandList {
    pub fn new(commands: Vec<String>) -> Self {
        Self(commands)
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.0.push(command.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for CommandList {
    fn from(commands: Vec<String>) -> Self {
        Self(commands)
    }
}

/// Turns a delta into device commands. Implementations must not perform I/O.
///
/// Callers pass only values accepted by [`Parameter::check`].
pub trait CommandBuilder: Send + Sync {
    fn build(&self, delta: &Delta, current: &ParameterSet, mode: Mode) -> CommandList;
}

/// Emits NX-OS configuration lines for IGMP snooping.
#[derive(Debug, Default, Clone, Copy)]
pub struct NxosCommandBuilder;

const PREFIX: &str = "ip igmp snooping";

impl NxosCommandBuilder {
    fn flag_command(keyword: Option<&str>, on: bool) -> String {
        let negate = if on { "" } else { "no " };
        match keyword {
            Some(kw) => format!("{}{} {}", negate, PREFIX, kw),
            None => format!("{}{}", negate, PREFIX),
        }
    }

    fn group_timeout_command(value: &ParamValue, current: &ParameterSet, mode: Mode) -> String {
        // Restoring "never" removes the line instead of pinning the token.
        let restore = mode == Mode::Default && *value == ParamValue::Enum(NEVER.to_string());
        if !restore {
            return format!("{} group-timeout {}", PREFIX, value);
        }
        match current.get(Parameter::GroupTimeout) {
            Some(existing @ ParamValue::Text(_)) => format!("no {} group-timeout {}", PREFIX, existing),
            _ => format!("no {} group-timeout", PREFIX),
        }
    }
}

impl CommandBuilder for NxosCommandBuilder {
    fn build(&self, delta: &Delta, current: &ParameterSet, mode: Mode) -> CommandList {
        let mut commands = CommandList::default();

        // The feature switch brackets its sub-options: on before, off after.
        let snooping = delta.get(Parameter::Snooping).and_then(ParamValue::as_bool);
        if snooping == Some(true) {
            commands.push(Self::flag_command(None, true));
        }

        for (param, value) in delta.iter() {
            match (param, value) {
                (Parameter::Snooping, ParamValue::Bool(_)) => {}
                (Parameter::GroupTimeout, value) => {
                    commands.push(Self::group_timeout_command(value, current, mode))
                }
                (param, ParamValue::Bool(on)) => {
                    commands.push(Self::flag_command(param.keyword(), *on))
                }
                (param, other) => {
                    warn!("ignoring non-boolean value {} for {}", other, param);
                }
            }
        }

        if snooping == Some(false) {
            commands.push(Self::flag_command(None, false));
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(delta: &Delta, current: &ParameterSet, mode: Mode) -> Vec<String> {
        NxosCommandBuilder.build(delta, current, mode).as_slice().to_vec()
    }

    #[test]
    fn test_enable_snooping_goes_first() {
        let delta = ParameterSet::from([
            (Parameter::ReportSupp, ParamValue::Bool(true)),
            (Parameter::Snooping, ParamValue::Bool(true)),
        ]);
        assert_eq!(
            build(&delta, &ParameterSet::new(), Mode::Present),
            vec!["ip igmp snooping", "ip igmp snooping report-suppression"]
        );
    }

    #[test]
    fn test_disable_snooping_goes_last() {
        let delta = ParameterSet::from([
            (Parameter::Snooping, ParamValue::Bool(false)),
            (Parameter::V3ReportSupp, ParamValue::Bool(false)),
            (Parameter::GroupTimeout, ParamValue::Text("10".to_string())),
        ]);
        assert_eq!(
            build(&delta, &ParameterSet::new(), Mode::Present),
            vec![
                "ip igmp snooping group-timeout 10",
                "no ip igmp snooping v3-report-suppression",
                "no ip igmp snooping",
            ]
        );
    }

    #[test]
    fn test_default_mode_removes_existing_timeout() {
        let delta = ParameterSet::from([(
            Parameter::GroupTimeout,
            ParamValue::Enum("never".to_string()),
        )]);
        let current = ParameterSet::from([(
            Parameter::GroupTimeout,
            ParamValue::Text("300".to_string()),
        )]);
        assert_eq!(
            build(&delta, &current, Mode::Default),
            vec!["no ip igmp snooping group-timeout 300"]
        );
        assert_eq!(
            build(&delta, &ParameterSet::new(), Mode::Default),
            vec!["no ip igmp snooping group-timeout"]
        );
    }

    #[test]
    fn test_default_mode_sets_numeric_timeout() {
        let delta = ParameterSet::from([(
            Parameter::GroupTimeout,
            ParamValue::Text("5".to_string()),
        )]);
        let current = ParameterSet::from([(
            Parameter::GroupTimeout,
            ParamValue::Enum("never".to_string()),
        )]);
        assert_eq!(
            build(&delta, &current, Mode::Default),
            vec!["ip igmp snooping group-timeout 5"]
        );
    }

    #[test]
    fn test_non_boolean_snooping_builds_nothing() {
        let delta = ParameterSet::from([(
            Parameter::Snooping,
            ParamValue::Text("true".to_string()),
        )]);
        assert!(build(&delta, &ParameterSet::new(), Mode::Present).is_empty());
    }

    #[test]
    fn test_link_local_keyword() {
        let delta = ParameterSet::from([(Parameter::LinkLocalGrpSupp, ParamValue::Bool(false))]);
        assert_eq!(
            build(&delta, &ParameterSet::new(), Mode::Present),
            vec!["no ip igmp snooping link-local-groups-suppression"]
        );
    }

    #[test]
    fn test_empty_delta_builds_nothing() {
        assert!(NxosCommandBuilder
            .build(&ParameterSet::new(), &ParameterSet::new(), Mode::Present)
            .is_empty());
    }
}
