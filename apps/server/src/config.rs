use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use salesflow_core::automation::{AutomationConfig, TriggerPreference};

/// Which store backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// SQLite file; lifecycle hooks drive the cascade.
    Sqlite,
    /// In-process store; replica-set mode exposes a change feed.
    Memory { replicated: bool },
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub store: StoreKind,
    pub automation: AutomationConfig,
    pub event_bus_capacity: usize,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_or("SF_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid SF_LISTEN_ADDR")?;
        let db_path = env_or("SF_DB_PATH", "./db/app.db");

        let store = match env_or("SF_STORE", "sqlite").trim().to_ascii_lowercase().as_str() {
            "sqlite" => StoreKind::Sqlite,
            "memory" => {
                let topology = env_or("SF_MEMORY_TOPOLOGY", "replica-set");
                let replicated = match topology.trim().to_ascii_lowercase().as_str() {
                    "replica-set" | "replicaset" => true,
                    "standalone" => false,
                    other => anyhow::bail!("Invalid SF_MEMORY_TOPOLOGY '{}'", other),
                };
                StoreKind::Memory { replicated }
            }
            other => anyhow::bail!("Invalid SF_STORE '{}'", other),
        };

        let trigger: TriggerPreference = env_or("SF_AUTOMATION_TRIGGER", "auto")
            .parse()
            .context("Invalid SF_AUTOMATION_TRIGGER")?;
        let enabled = !matches!(
            env_or("SF_AUTOMATION_ENABLED", "true")
                .trim()
                .to_ascii_lowercase()
                .as_str(),
            "false" | "0" | "no" | "off"
        );

        let event_bus_capacity: usize = env_or("SF_EVENT_BUS_CAPACITY", "256")
            .parse()
            .unwrap_or(256);
        let cors_allow = env_or("SF_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = env_or("SF_REQUEST_TIMEOUT_MS", "30000")
            .parse()
            .unwrap_or(30000);

        Ok(Self {
            listen_addr,
            db_path,
            store,
            automation: AutomationConfig { enabled, trigger },
            event_bus_capacity: event_bus_capacity.max(1),
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }
}
