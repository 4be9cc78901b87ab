//! Client for the NX-API JSON ("ins_api") endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::commands::CommandList;
use crate::config::{Credentials, Settings};
use crate::device::{DeviceClient, StateFetcher, Target};
use crate::params::{ParamValue, Parameter, ParameterSet, NEVER};
use crate::{Error, Result};

const ENDPOINT: &str = "/ins";
const SHOW_SNOOPING: &str = "show ip igmp snooping";
const SHOW_GROUP_TIMEOUT: &str = "show running-config | include \"ip igmp snooping group-timeout\"";
const GROUP_TIMEOUT_PREFIX: &str = "ip igmp snooping group-timeout ";

/// Keys in the `show ip igmp snooping` body for each boolean parameter.
const FLAG_KEYS: [(Parameter, &str); 4] = [
    (Parameter::Snooping, "enabled"),
    (Parameter::LinkLocalGrpSupp, "glinklocalgrpsup"),
    (Parameter::ReportSupp, "grepsup"),
    (Parameter::V3ReportSupp, "gv3repsup"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum MessageType {
    CliShow,
    CliShowAscii,
    CliConf,
}

#[derive(Debug, Serialize)]
struct InsApiRequest<'a> {
    ins_api: InsApiBody<'a>,
}

#[derive(Debug, Serialize)]
struct InsApiBody<'a> {
    version: &'static str,
    #[serde(rename = "type")]
    message_type: MessageType,
    chunk: &'static str,
    sid: &'static str,
    input: &'a str,
    output_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct InsApiResponse {
    ins_api: InsApiOutputs,
}

#[derive(Debug, Deserialize)]
struct InsApiOutputs {
    outputs: OutputWrapper,
}

#[derive(Debug, Deserialize)]
struct OutputWrapper {
    output: OneOrMany,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(CommandOutput),
    Many(Vec<CommandOutput>),
}

/// Result of a single command in an NX-API batch.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOutput {
    #[serde(default)]
    pub input: Option<String>,
    pub code: Value,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub clierror: Option<String>,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        match &self.code {
            Value::String(s) => s.trim() == "200",
            Value::Number(n) => n.as_u64() == Some(200),
            _ => false,
        }
    }

    /// The device's own error text.
    pub fn error_text(&self) -> String {
        match &self.clierror {
            Some(e) if !e.trim().is_empty() => e.trim_end().to_string(),
            _ => self.msg.clone(),
        }
    }
}

/// NX-API client implementing both [`StateFetcher`] and [`DeviceClient`].
#[derive(Debug, Clone)]
pub struct NxapiClient {
    http: reqwest::Client,
    credentials: Credentials,
    timeout: Duration,
    accept_invalid_certs: bool,
}

impl NxapiClient {
    /// Build the HTTP stack up front so an unusable client is reported before
    /// any reconciliation starts.
    pub fn new(credentials: Credentials, timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let http = Self::http_builder(timeout, accept_invalid_certs)
            .build()
            .map_err(|e| Error::MissingDependency(e.to_string()))?;

        Ok(Self {
            http,
            credentials,
            timeout,
            accept_invalid_certs,
        })
    }

    fn http_builder(timeout: Duration, accept_invalid_certs: bool) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
    }

    /// HTTP client for `target`. Host names are pinned to the address resolved
    /// up front, so no lookup happens at request time.
    fn http_for(&self, target: &Target) -> Result<reqwest::Client> {
        if target.is_ip_literal() {
            return Ok(self.http.clone());
        }
        Self::http_builder(self.timeout, self.accept_invalid_certs)
            .resolve(&target.host, target.addr)
            .build()
            .map_err(|e| Error::MissingDependency(e.to_string()))
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let credentials = settings.credentials()?;
        Self::new(
            credentials,
            Duration::from_secs(settings.timeout_secs),
            settings.accept_invalid_certs,
        )
    }

    async fn send(
        &self,
        http: &reqwest::Client,
        target: &Target,
        message_type: MessageType,
        input: &str,
    ) -> Result<Vec<CommandOutput>> {
        let url = format!("{}{}", target.base_url(), ENDPOINT);
        let request = InsApiRequest {
            ins_api: InsApiBody {
                version: "1.0",
                message_type,
                chunk: "0",
                sid: "1",
                input,
                output_format: "json",
            },
        };
        debug!("POST {} {:?}: {}", url, message_type, input);

        let response = http
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        trace!("response {}: {}", status, text);

        // NX-API reports CLI errors with a 500 and a regular ins_api body, so
        // only fall back to the HTTP status when the body is not usable.
        let parsed: InsApiResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(Error::Response(format!("malformed ins_api body: {}", e)))
            }
            Err(_) => return Err(Error::Response(format!("HTTP {}", status))),
        };

        Ok(match parsed.ins_api.outputs.output {
            OneOrMany::One(output) => vec![output],
            OneOrMany::Many(outputs) => outputs,
        })
    }

    async fn show(
        &self,
        http: &reqwest::Client,
        target: &Target,
        message_type: MessageType,
        command: &str,
    ) -> Result<Value> {
        let output = self
            .send(http, target, message_type, command)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Response(format!("no output for '{}'", command)))?;

        if !output.is_success() {
            return Err(Error::Response(format!("'{}' failed: {}", command, output.error_text())));
        }
        Ok(output.body)
    }
}

/// Parse the `show ip igmp snooping` body into boolean parameters.
pub fn parse_snooping_flags(body: &Value) -> Result<ParameterSet> {
    let object = body
        .as_object()
        .ok_or_else(|| Error::Response(format!("expected an object from '{}'", SHOW_SNOOPING)))?;

    Ok(FLAG_KEYS
        .iter()
        .map(|(param, key)| {
            let raw = object.get(*key).unwrap_or(&Value::Null);
            (*param, ParamValue::from_device_flag(raw))
        })
        .collect())
}

/// Text of a `cli_show_ascii` body. An empty result may come back as null.
fn ascii_body(body: &Value) -> Result<&str> {
    match body {
        Value::Null => Ok(""),
        Value::String(text) => Ok(text.as_str()),
        other => Err(Error::Response(format!(
            "expected text from '{}', got {}",
            SHOW_GROUP_TIMEOUT, other
        ))),
    }
}

/// Extract the global group timeout from running-config text. No matching
/// line means the platform default.
pub fn parse_group_timeout(running_config: &str) -> Result<ParamValue> {
    // Indented lines belong to per-VLAN configuration and are skipped.
    match running_config
        .lines()
        .find_map(|line| line.strip_prefix(GROUP_TIMEOUT_PREFIX))
    {
        Some(value) => ParamValue::group_timeout(value),
        None => Ok(ParamValue::Enum(NEVER.to_string())),
    }
}

#[async_trait]
impl StateFetcher for NxapiClient {
    async fn fetch(&self, target: &Target) -> Result<ParameterSet> {
        let http = self.http_for(target)?;
        let body = self
            .show(&http, target, MessageType::CliShow, SHOW_SNOOPING)
            .await?;
        let mut state = parse_snooping_flags(&body)?;

        let body = self
            .show(&http, target, MessageType::CliShowAscii, SHOW_GROUP_TIMEOUT)
            .await?;
        state.insert(Parameter::GroupTimeout, parse_group_timeout(ascii_body(&body)?)?);

        Ok(state)
    }
}

#[async_trait]
impl DeviceClient for NxapiClient {
    async fn apply(&self, target: &Target, commands: &CommandList) -> Result<()> {
        let http = self.http_for(target)?;
        let input = commands.as_slice().join(" ;");
        let outputs = match self.send(&http, target, MessageType::CliConf, &input).await {
            Ok(outputs) => outputs,
            Err(Error::Response(msg)) => return Err(Error::Apply(msg)),
            Err(e) => return Err(e),
        };

        if let Some(failed) = outputs.iter().find(|o| !o.is_success()) {
            return Err(Error::Apply(failed.error_text()));
        }
        Ok(())
    }
}
