//! Gateway configuration loaded from file, environment, and `.env` toggles.
//!
//! Structured settings (port, Space id, storage path, wait limits) go through
//! the config builder with `VISOLEARN`-prefixed environment overrides. The
//! credential and the transport toggles stay plain environment variables so
//! they can live in `.env` next to the secrets they belong with.

use serde::{Deserialize, Serialize};

fn default_app_name() -> String {
    "VisoLearn Local Gateway".to_string()
}

fn default_space_id() -> String {
    "Compumacy/VisoLearn".to_string()
}

fn default_hub_url() -> String {
    "https://huggingface.co".to_string()
}

/// Structured gateway settings.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | VISOLEARN__PORT / PORT | 5050 | Local web server port. |
/// | VISOLEARN__SPACE_ID | Compumacy/VisoLearn | Hosted Space identifier. |
/// | VISOLEARN__STORAGE_PATH | ./data | Root for session logs and saved images. |
/// | VISOLEARN__VALIDATE_WAIT_SECS | 120 | Bounded wait for a sleeping Space to wake. |
/// | VISOLEARN__REQUEST_TIMEOUT_SECS | 120 | Per-request timeout for remote calls. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_space_id")]
    pub space_id: String,
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_validate_wait")]
    pub validate_wait_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_port() -> u16 {
    5050
}

fn default_storage_path() -> String {
    "./data".to_string()
}

fn default_validate_wait() -> u64 {
    120
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            port: default_port(),
            space_id: default_space_id(),
            hub_url: default_hub_url(),
            storage_path: default_storage_path(),
            validate_wait_secs: default_validate_wait(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Load config from file and environment. Precedence: env `VISOLEARN_CONFIG`
    /// path > `config/gateway.toml` > defaults, then `VISOLEARN__*` env keys.
    /// A bare `PORT` variable wins last so `.env` files with just a port keep
    /// working.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("VISOLEARN_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", default_app_name())?
            .set_default("port", default_port() as i64)?
            .set_default("space_id", default_space_id())?
            .set_default("hub_url", default_hub_url())?
            .set_default("storage_path", default_storage_path())?
            .set_default("validate_wait_secs", default_validate_wait() as i64)?
            .set_default("request_timeout_secs", default_request_timeout() as i64)?;

        let path = std::path::Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VISOLEARN").separator("__"))
            .build()?;

        let mut cfg: Self = built.try_deserialize()?;
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.trim().parse().ok()) {
            cfg.port = port;
        }
        Ok(cfg)
    }

    /// Direct app URL for the Space (`owner/name` -> `owner-name.hf.space`).
    pub fn space_url(&self) -> String {
        let subdomain: String = self
            .space_id
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("https://{}.hf.space", subdomain)
    }

    /// Runtime status endpoint on the hub.
    pub fn runtime_endpoint(&self) -> String {
        format!("{}/api/spaces/{}/runtime", self.hub_url, self.space_id)
    }

    /// Wake endpoint on the hub (for a sleeping Space).
    pub fn wake_endpoint(&self) -> String {
        format!("{}/api/spaces/{}/wake", self.hub_url, self.space_id)
    }
}

/// Plain-environment toggles, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvToggles {
    /// HF_TOKEN: access credential for the hosted Space.
    pub hf_token: Option<String>,
    /// NO_GRADIO_QUEUE: opaque transport-tuning flag, forwarded to the remote
    /// unchanged on every invocation.
    pub disable_queue: bool,
    /// VISOLEARN_FALLBACK: start with the fallback flag already set.
    pub fallback: bool,
}

impl EnvToggles {
    /// Read toggles from the environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        Self {
            hf_token: env_opt_string("HF_TOKEN"),
            disable_queue: env_bool("NO_GRADIO_QUEUE", false),
            fallback: env_bool("VISOLEARN_FALLBACK", false),
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            v.eq_ignore_ascii_case("true") || v == "1" || (v.is_empty() && default)
        }
        Err(_) => default,
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_url_is_derived_from_space_id() {
        let cfg = GatewayConfig {
            space_id: "Compumacy/VisoLearn".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(cfg.space_url(), "https://compumacy-visolearn.hf.space");
    }

    #[test]
    fn hub_endpoints_carry_the_space_id_verbatim() {
        let cfg = GatewayConfig::default();
        assert_eq!(
            cfg.runtime_endpoint(),
            "https://huggingface.co/api/spaces/Compumacy/VisoLearn/runtime"
        );
        assert_eq!(
            cfg.wake_endpoint(),
            "https://huggingface.co/api/spaces/Compumacy/VisoLearn/wake"
        );
    }

    #[test]
    fn defaults_match_the_documented_table() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.port, 5050);
        assert_eq!(cfg.validate_wait_secs, 120);
        assert_eq!(cfg.storage_path, "./data");
    }
}
