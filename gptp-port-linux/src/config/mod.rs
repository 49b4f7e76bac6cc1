//! Daemon configuration: one TOML file, one or more `[[port]]` tables.

use std::fs::read_to_string;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use gptp_port::identity::{ClockIdentity, PortIdentity};
use gptp_port::time::{IntervalRequest, LogInterval};
use gptp_port::PortInitDescriptor;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_priority1")]
    pub priority1: u8,
    #[serde(default = "default_priority2")]
    pub priority2: u8,
    #[serde(default, deserialize_with = "deserialize_opt_clock_identity")]
    pub clock_identity: Option<ClockIdentity>,
    #[serde(rename = "port")]
    pub ports: Vec<PortConfig>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PortConfig {
    pub interface: String,
    pub port_number: u16,

    #[serde(default = "default_announce_interval")]
    pub log_announce_interval: i8,
    #[serde(default)]
    pub log_sync_interval: Option<i8>,
    #[serde(default)]
    pub log_pdelay_req_interval: Option<i8>,

    #[serde(default = "default_timeout_multiplier")]
    pub announce_receipt_timeout_multiplier: u8,
    #[serde(default = "default_timeout_multiplier")]
    pub sync_receipt_timeout_multiplier: u8,
    #[serde(default = "default_timeout_multiplier")]
    pub pdelay_resp_receipt_timeout_multiplier: u8,

    #[serde(default)]
    pub force_as_capable: bool,
    #[serde(default)]
    pub external_port_configuration: bool,
    #[serde(default)]
    pub static_port_state_master: bool,
    #[serde(default = "default_true")]
    pub transmit_announce: bool,
    #[serde(default)]
    pub automotive_station_states: bool,
    #[serde(default)]
    pub negotiate_automotive_sync_rate: bool,
    #[serde(default)]
    pub test_mode: bool,
}

impl PortConfig {
    /// Build the descriptor `gptp_port::Port::new` expects, given the
    /// clock identity resolved for this daemon (from config or from the
    /// interface's own MAC address).
    pub fn into_descriptor(self, clock_identity: ClockIdentity) -> PortInitDescriptor {
        PortInitDescriptor {
            port_identity: PortIdentity::new(clock_identity, self.port_number),
            initial_link_up: false,
            initial_log_pdelay_req_interval: self.log_pdelay_req_interval.map(IntervalRequest::literal),
            oper_log_pdelay_req_interval: self.log_pdelay_req_interval.map(LogInterval::from_log_2),
            initial_log_sync_interval: self.log_sync_interval.map(LogInterval::from_log_2),
            oper_log_sync_interval: self.log_sync_interval.map(LogInterval::from_log_2),
            log_announce_interval: LogInterval::from_log_2(self.log_announce_interval),
            announce_receipt_timeout_multiplier: self.announce_receipt_timeout_multiplier,
            sync_receipt_timeout_multiplier: self.sync_receipt_timeout_multiplier,
            pdelay_resp_receipt_timeout_multiplier: self.pdelay_resp_receipt_timeout_multiplier,
            force_as_capable: self.force_as_capable,
            external_port_configuration: self.external_port_configuration,
            static_port_state_master: self.static_port_state_master,
            transmit_announce: self.transmit_announce,
            automotive_station_states: self.automotive_station_states,
            negotiate_automotive_sync_rate: self.negotiate_automotive_sync_rate,
            test_mode: self.test_mode,
        }
    }
}

fn deserialize_opt_clock_identity<'de, D>(deserializer: D) -> Result<Option<ClockIdentity>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use hex::FromHex;
    use serde::de::Error;

    let raw: Option<String> = Deserialize::deserialize(deserializer)?;
    raw.map(|raw| {
        <[u8; 8]>::from_hex(raw)
            .map(ClockIdentity)
            .map_err(|e| D::Error::custom(format!("invalid clock identity: {e}")))
    })
    .transpose()
}

fn default_priority1() -> u8 {
    128
}

fn default_priority2() -> u8 {
    128
}

fn default_announce_interval() -> i8 {
    1
}

fn default_timeout_multiplier() -> u8 {
    3
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let meta = std::fs::metadata(path).map_err(ConfigError::Io)?;
        if meta.permissions().mode() as libc::mode_t & libc::S_IWOTH != 0 {
            warn!("unrestricted config file permissions: others can write");
        }

        let contents = read_to_string(path).map_err(ConfigError::Io)?;
        let config: Config = toml::de::from_str(&contents).map_err(ConfigError::Toml)?;
        config.warn_when_unreasonable();
        Ok(config)
    }

    pub fn warn_when_unreasonable(&self) {
        if self.ports.is_empty() {
            warn!("no ports configured");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error while reading config: {0}")]
    Io(std::io::Error),
    #[error("config toml parsing error: {0}")]
    Toml(toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config() {
        const MINIMAL: &str = r#"
[[port]]
interface = "eth0"
port-number = 1
"#;
        let expected_port = PortConfig {
            interface: "eth0".to_string(),
            port_number: 1,
            log_announce_interval: 1,
            log_sync_interval: None,
            log_pdelay_req_interval: None,
            announce_receipt_timeout_multiplier: 3,
            sync_receipt_timeout_multiplier: 3,
            pdelay_resp_receipt_timeout_multiplier: 3,
            force_as_capable: false,
            external_port_configuration: false,
            static_port_state_master: false,
            transmit_announce: true,
            automotive_station_states: false,
            negotiate_automotive_sync_rate: false,
            test_mode: false,
        };

        let expected = Config {
            priority1: 128,
            priority2: 128,
            clock_identity: None,
            ports: vec![expected_port],
        };

        let actual: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn automotive_port_round_trips() {
        const AUTOMOTIVE: &str = r#"
[[port]]
interface = "eth0"
port-number = 1
automotive-station-states = true
negotiate-automotive-sync-rate = true
"#;
        let config: Config = toml::from_str(AUTOMOTIVE).unwrap();
        assert!(config.ports[0].automotive_station_states);
        assert!(config.ports[0].negotiate_automotive_sync_rate);
    }
}
