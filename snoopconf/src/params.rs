//! IGMP snooping parameters and their canonical value domain.
//!
//! Values coming from the operator and from the device are normalized into
//! [`ParamValue`] here so that comparisons downstream are plain structural
//! equality. A parameter that is not set is simply absent from a
//! [`ParameterSet`]; there is no "null" value.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};

use crate::{Error, Result};

/// Largest group timeout NX-OS accepts, in minutes.
pub const MAX_GROUP_TIMEOUT: u32 = 10080;

/// Token used by the device for a group timeout that never expires.
pub const NEVER: &str = "never";

/// A single independently settable IGMP snooping parameter.
///
/// Declaration order is the canonical order used for iteration, reports and
/// command generation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    EnumIter,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Parameter {
    Snooping,
    GroupTimeout,
    LinkLocalGrpSupp,
    ReportSupp,
    #[serde(rename = "v3_report_supp")]
    #[strum(serialize = "v3_report_supp")]
    V3ReportSupp,
}

impl Parameter {
    /// All known parameters in canonical order.
    pub fn all() -> impl Iterator<Item = Parameter> {
        Parameter::iter()
    }

    /// CLI keyword following `ip igmp snooping` on the device.
    /// `None` for the feature switch itself.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Parameter::Snooping => None,
            Parameter::GroupTimeout => Some("group-timeout"),
            Parameter::LinkLocalGrpSupp => Some("link-local-groups-suppression"),
            Parameter::ReportSupp => Some("report-suppression"),
            Parameter::V3ReportSupp => Some("v3-report-suppression"),
        }
    }

    /// Fails with [`Error::InvalidValue`] unless `value` is in this
    /// parameter's canonical domain.
    pub fn check(&self, value: &ParamValue) -> Result<()> {
        let ok = match (self, value) {
            (Parameter::GroupTimeout, ParamValue::Enum(token)) => token == NEVER,
            (Parameter::GroupTimeout, ParamValue::Text(minutes)) => minutes
                .parse::<u32>()
                .is_ok_and(|m| (1..=MAX_GROUP_TIMEOUT).contains(&m) && m.to_string() == *minutes),
            (Parameter::GroupTimeout, ParamValue::Bool(_)) => false,
            (_, value) => value.as_bool().is_some(),
        };
        if ok {
            return Ok(());
        }

        let expected = match self {
            Parameter::GroupTimeout => {
                format!("expected minutes 1..={} or '{}'", MAX_GROUP_TIMEOUT, NEVER)
            }
            _ => "expected a boolean".to_string(),
        };
        Err(Error::InvalidValue {
            param: self.to_string(),
            value: value.to_string(),
            reason: expected,
        })
    }
}

/// Canonical value of a parameter.
///
/// The variants never compare equal to each other: `Bool(true)` is not
/// `Text("true")`, and `Text("never")` is not `Enum("never")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Text(String),
    Enum(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Normalize a boolean flag as reported by the device.
    ///
    /// NX-OS is inconsistent across releases: some report JSON booleans,
    /// others the strings `"true"`/`"false"` or `"enabled"`/`"disabled"`.
    pub fn from_device_flag(raw: &serde_json::Value) -> ParamValue {
        let on = match raw {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("enabled")
            }
            _ => false,
        };
        ParamValue::Bool(on)
    }

    /// Normalize a group timeout: `never` or a number of minutes.
    pub fn group_timeout(raw: &str) -> Result<ParamValue> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(NEVER) {
            return Ok(ParamValue::Enum(NEVER.to_string()));
        }

        let invalid = |reason: String| Error::InvalidValue {
            param: Parameter::GroupTimeout.to_string(),
            value: raw.to_string(),
            reason,
        };

        let minutes: u32 = trimmed
            .parse()
            .map_err(|_| invalid(format!("expected minutes or '{}'", NEVER)))?;
        if minutes == 0 || minutes > MAX_GROUP_TIMEOUT {
            return Err(invalid(format!("must be between 1 and {}", MAX_GROUP_TIMEOUT)));
        }
        Ok(ParamValue::Text(minutes.to_string()))
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Text(s) | ParamValue::Enum(s) => write!(f, "{}", s),
        }
    }
}

/// Mapping from parameter to value. Iteration follows canonical parameter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<Parameter, ParamValue>);

/// Entries of a desired set that differ from the current set.
pub type Delta = ParameterSet;

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, param: Parameter, value: ParamValue) -> Option<ParamValue> {
        self.0.insert(param, value)
    }

    pub fn get(&self, param: Parameter) -> Option<&ParamValue> {
        self.0.get(&param)
    }

    pub fn contains(&self, param: Parameter) -> bool {
        self.0.contains_key(&param)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &ParamValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Parameter, ParamValue)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (Parameter, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(Parameter, ParamValue); N]> for ParameterSet {
    fn from(entries: [(Parameter, ParamValue); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Factory defaults for IGMP snooping on NX-OS.
pub fn default_table() -> ParameterSet {
    ParameterSet::from([
        (Parameter::Snooping, ParamValue::Bool(true)),
        (Parameter::GroupTimeout, ParamValue::Enum(NEVER.to_string())),
        (Parameter::LinkLocalGrpSupp, ParamValue::Bool(true)),
        (Parameter::ReportSupp, ParamValue::Bool(true)),
        (Parameter::V3ReportSupp, ParamValue::Bool(false)),
    ])
}

/// Parameters requested by the operator. `None` means "leave alone".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredParams {
    pub snooping: Option<bool>,
    pub group_timeout: Option<String>,
    pub link_local_grp_supp: Option<bool>,
    pub report_supp: Option<bool>,
    pub v3_report_supp: Option<bool>,
}

impl DesiredParams {
    /// Convert into a parameter set, dropping every unset field.
    pub fn into_parameter_set(self) -> Result<ParameterSet> {
        let mut set = ParameterSet::new();

        let flags = [
            (Parameter::Snooping, self.snooping),
            (Parameter::LinkLocalGrpSupp, self.link_local_grp_supp),
            (Parameter::ReportSupp, self.report_supp),
            (Parameter::V3ReportSupp, self.v3_report_supp),
        ];
        for (param, value) in flags {
            if let Some(b) = value {
                set.insert(param, ParamValue::Bool(b));
            }
        }

        if let Some(timeout) = self.group_timeout {
            set.insert(Parameter::GroupTimeout, ParamValue::group_timeout(&timeout)?);
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::str::FromStr;

    #[test]
    fn test_group_timeout_never_is_enum() {
        assert_eq!(
            ParamValue::group_timeout("Never").unwrap(),
            ParamValue::Enum("never".to_string())
        );
    }

    #[test]
    fn test_group_timeout_minutes_are_canonical() {
        assert_eq!(
            ParamValue::group_timeout(" 0300 ").unwrap(),
            ParamValue::Text("300".to_string())
        );
    }

    #[test]
    fn test_group_timeout_rejects_out_of_range() {
        assert_matches!(
            ParamValue::group_timeout("0"),
            Err(Error::InvalidValue { .. })
        );
        assert_matches!(
            ParamValue::group_timeout("10081"),
            Err(Error::InvalidValue { .. })
        );
        assert_matches!(
            ParamValue::group_timeout("soon"),
            Err(Error::InvalidValue { .. })
        );
    }

    #[test]
    fn test_representations_never_compare_equal() {
        assert_ne!(ParamValue::Bool(true), ParamValue::Text("true".to_string()));
        assert_ne!(
            ParamValue::Text("never".to_string()),
            ParamValue::Enum("never".to_string())
        );
    }

    #[test]
    fn test_device_flag_normalization() {
        use serde_json::json;
        assert_eq!(ParamValue::from_device_flag(&json!(true)), ParamValue::Bool(true));
        assert_eq!(ParamValue::from_device_flag(&json!("Enabled")), ParamValue::Bool(true));
        assert_eq!(ParamValue::from_device_flag(&json!("true")), ParamValue::Bool(true));
        assert_eq!(ParamValue::from_device_flag(&json!("disabled")), ParamValue::Bool(false));
        assert_eq!(ParamValue::from_device_flag(&json!(null)), ParamValue::Bool(false));
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let desired = DesiredParams {
            report_supp: Some(false),
            ..Default::default()
        };
        let set = desired.into_parameter_set().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(Parameter::ReportSupp), Some(&ParamValue::Bool(false)));
        assert!(!set.contains(Parameter::Snooping));
    }

    #[test]
    fn test_parameter_names_round_trip() {
        for param in Parameter::all() {
            assert_eq!(Parameter::from_str(&param.to_string()).unwrap(), param);
        }
        assert_eq!(Parameter::V3ReportSupp.to_string(), "v3_report_supp");
    }

    #[test]
    fn test_parameter_set_serializes_as_object() {
        let set = ParameterSet::from([
            (Parameter::GroupTimeout, ParamValue::Text("5".to_string())),
            (Parameter::Snooping, ParamValue::Bool(true)),
        ]);
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            serde_json::json!({"snooping": true, "group_timeout": "5"})
        );
    }

    #[test]
    fn test_default_table_covers_every_parameter() {
        let table = default_table();
        assert!(Parameter::all().all(|p| table.contains(p)));
        assert!(table.iter().all(|(p, v)| p.check(v).is_ok()));
    }

    #[test]
    fn test_check_rejects_values_outside_domain() {
        let text = |s: &str| ParamValue::Text(s.to_string());
        assert!(Parameter::Snooping.check(&ParamValue::Bool(false)).is_ok());
        assert!(Parameter::GroupTimeout.check(&text("5")).is_ok());
        assert!(Parameter::GroupTimeout
            .check(&ParamValue::Enum("never".to_string()))
            .is_ok());

        assert_matches!(
            Parameter::Snooping.check(&text("true")),
            Err(Error::InvalidValue { param, .. }) if param == "snooping"
        );
        assert_matches!(
            Parameter::ReportSupp.check(&ParamValue::Enum("never".to_string())),
            Err(Error::InvalidValue { .. })
        );
        assert_matches!(
            Parameter::GroupTimeout.check(&ParamValue::Bool(true)),
            Err(Error::InvalidValue { .. })
        );
        assert_matches!(
            Parameter::GroupTimeout.check(&text("never")),
            Err(Error::InvalidValue { .. })
        );
        assert_matches!(
            Parameter::GroupTimeout.check(&text("007")),
            Err(Error::InvalidValue { .. })
        );
        assert_matches!(
            Parameter::GroupTimeout.check(&text("10081")),
            Err(Error::InvalidValue { .. })
        );
    }
}
