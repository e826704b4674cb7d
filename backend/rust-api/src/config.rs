use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::progress_service::ProgressStep;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub strapi: StrapiConfig,
    pub judge: JudgeConfig,
    pub sessions: SessionStoreConfig,
    pub progress: ProgressConfig,
    pub admin_timer: AdminTimerConfig,
    /// `username:password` guarding `/metrics`
    pub metrics_auth: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrapiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_host: String,
    pub language_id: u32,
    pub cpu_time_limit: f64,
    pub memory_limit: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionStoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    pub step: ProgressStep,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminTimerConfig {
    pub tick_millis: u64,
    pub persist_every: u64,
    /// Timers not polled for this long are stopped
    pub idle_timeout_millis: u64,
}

impl StrapiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl JudgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AdminTimerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_millis.max(1))
    }
}

/// Integer setting that must fit `T` (so never negative), or `default`
/// when unset.
fn unsigned<T: TryFrom<i64>>(
    settings: &config::Config,
    key: &str,
    default: T,
) -> Result<T, config::ConfigError> {
    match settings.get_int(key) {
        Ok(raw) => T::try_from(raw).map_err(|_| {
            config::ConfigError::Message(format!(
                "{} must be a non-negative integer, got {}",
                key, raw
            ))
        }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + APP__ overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let lookup = |key: &str, var: &str| settings.get_string(key).or_else(|_| env::var(var));

        let bind_addr = lookup("server.bind_addr", "BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let strapi_url = lookup("strapi.base_url", "STRAPI_URL").unwrap_or_else(|_| {
            eprintln!("WARNING: STRAPI_URL not set, using http://localhost:1337");
            "http://localhost:1337".to_string()
        });
        url::Url::parse(&strapi_url)
            .map_err(|e| config::ConfigError::Message(format!("invalid STRAPI_URL: {}", e)))?;

        let judge_url = lookup("judge.base_url", "JUDGE0_URL")
            .unwrap_or_else(|_| "https://judge0-ce.p.rapidapi.com".to_string());
        url::Url::parse(&judge_url)
            .map_err(|e| config::ConfigError::Message(format!("invalid JUDGE0_URL: {}", e)))?;

        let judge_api_key = match lookup("judge.api_key", "JUDGE0_API_KEY") {
            Ok(key) => key,
            Err(_) if env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JUDGE0_API_KEY must be set in production".to_string(),
                ))
            }
            Err(_) => {
                eprintln!("WARNING: JUDGE0_API_KEY not set, submissions will be rejected by the judge");
                String::new()
            }
        };

        let judge_api_host = lookup("judge.api_host", "JUDGE0_HOST")
            .unwrap_or_else(|_| "judge0-ce.p.rapidapi.com".to_string());

        let session_path = lookup("sessions.path", "SESSION_STORE_PATH")
            .unwrap_or_else(|_| "data/sessions.json".to_string());

        let step = match lookup("progress.step", "PROGRESS_STEP") {
            Ok(raw) => raw
                .parse::<ProgressStep>()
                .map_err(config::ConfigError::Message)?,
            Err(_) => ProgressStep::default(),
        };

        let metrics_auth =
            lookup("metrics.auth", "METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());

        Ok(Config {
            bind_addr,
            strapi: StrapiConfig {
                base_url: strapi_url.trim_end_matches('/').to_string(),
                timeout_secs: unsigned(&settings, "strapi.timeout_secs", 10)?,
            },
            judge: JudgeConfig {
                base_url: judge_url.trim_end_matches('/').to_string(),
                api_key: judge_api_key,
                api_host: judge_api_host,
                language_id: unsigned(&settings, "judge.language_id", 71)?,
                cpu_time_limit: settings.get_float("judge.cpu_time_limit").unwrap_or(2.0),
                memory_limit: unsigned(&settings, "judge.memory_limit", 128_000)?,
                timeout_secs: unsigned(&settings, "judge.timeout_secs", 30)?,
            },
            sessions: SessionStoreConfig {
                path: PathBuf::from(session_path),
            },
            progress: ProgressConfig { step },
            admin_timer: AdminTimerConfig {
                tick_millis: unsigned(&settings, "admin_timer.tick_millis", 1000u64)?.max(1),
                persist_every: unsigned(&settings, "admin_timer.persist_every", 10u64)?.max(1),
                idle_timeout_millis: unsigned(
                    &settings,
                    "admin_timer.idle_timeout_millis",
                    120_000u64,
                )?
                .max(1),
            },
            metrics_auth,
        })
    }
}
