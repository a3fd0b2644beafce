use std::time::Instant;

use chrono::{DateTime, Utc};
use db::DBService;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Uptime {
    pub seconds: u64,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub platform: &'static str,
    pub arch: &'static str,
    pub cpus: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub database: &'static str,
    pub uptime: Uptime,
    pub system: SystemInfo,
}

#[derive(Clone)]
pub struct HealthService {
    db: DBService,
    started: Instant,
}

impl HealthService {
    pub fn new(db: DBService) -> Self {
        Self {
            db,
            started: Instant::now(),
        }
    }

    pub async fn check(&self) -> HealthStatus {
        let seconds = self.started.elapsed().as_secs();
        HealthStatus {
            status: "ok",
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            database: if self.db.ping().await {
                "connected"
            } else {
                "disconnected"
            },
            uptime: Uptime {
                seconds,
                formatted: format_uptime(seconds),
            },
            system: SystemInfo {
                platform: std::env::consts::OS,
                arch: std::env::consts::ARCH,
                cpus: std::thread::available_parallelism().map_or(1, |n| n.get()),
            },
        }
    }
}

/// `93784` → `1d 2h 3m 4s`; leading zero units are omitted
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = total_seconds % 86_400 / 3_600;
    let minutes = total_seconds % 3_600 / 60;
    let seconds = total_seconds % 60;
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}
