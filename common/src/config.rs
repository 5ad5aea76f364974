use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_WIFI_SSID: &str = "YOUR_WIFI_SSID";
pub const DEFAULT_HTTP_PORT: u16 = 80;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
}

impl NetworkConfig {
    pub fn has_station_credentials(&self) -> bool {
        let ssid = self.wifi_ssid.trim();
        !ssid.is_empty() && ssid != PLACEHOLDER_WIFI_SSID
    }
}

/// Timing of the one-shot association attempt made at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapPolicy {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    pub restart_delay_ms: u64,
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_attempts: 30,
            restart_delay_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub network: NetworkConfig,
    #[serde(default)]
    pub bootstrap: BootstrapPolicy,
    pub http_port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            bootstrap: BootstrapPolicy::default(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}
