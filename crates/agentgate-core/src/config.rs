use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8089;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Top-level config (gateway.toml + GATEWAY_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Override the OpenAI-compatible endpoint base (e.g. an Azure OpenAI
    /// proxy). `None` uses the provider's own default.
    #[serde(default)]
    pub openai_base_url: Option<String>,
    /// Override the Anthropic-compatible endpoint base.
    #[serde(default)]
    pub anthropic_base_url: Option<String>,
    /// Destination surfaced to rate-limited clients as `upgrade` in the 429
    /// payload — a billing/upgrade landing page, not a core concern itself.
    #[serde(default = "default_upgrade_url")]
    pub upgrade_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            data_dir: default_data_dir(),
            limits: LimitsConfig::default(),
            openai_base_url: None,
            anthropic_base_url: None,
            upgrade_url: default_upgrade_url(),
        }
    }
}

fn default_upgrade_url() -> String {
    "https://agentgate.example/upgrade".to_string()
}

/// Per-tier quota/capacity overrides. Operators can retune limits without a
/// rebuild; any tier absent from the file keeps the fixed defaults baked
/// into `agentgate_core::tier`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LimitsConfig {
    #[serde(default)]
    pub overrides: Vec<TierOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierOverride {
    pub tier: String,
    pub per_minute: Option<u32>,
    pub per_day: Option<u32>,
    pub memory_capacity: Option<usize>,
}

impl LimitsConfig {
    /// The operator-supplied override row for `tier`, if the config file
    /// named one.
    pub fn override_for(&self, tier: crate::tier::Tier) -> Option<&TierOverride> {
        self.overrides.iter().find(|o| o.tier == tier.to_string())
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.agentgate", home)
}

impl GatewayConfig {
    /// Load config from a TOML file with GATEWAY_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. GATEWAY_CONFIG env var
    ///   3. ~/.agentgate/gateway.toml
    ///
    /// Falls back to built-in defaults when no file is present — a missing
    /// config file is not an error.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("GATEWAY_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: GatewayConfig = Figment::from(Self::default_provider())
            .merge(Toml::file(&path))
            .merge(Env::prefixed("GATEWAY_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }

    fn default_provider() -> figment::providers::Serialized<GatewayConfig> {
        figment::providers::Serialized::defaults(GatewayConfig::default())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.agentgate/gateway.toml", home)
}
