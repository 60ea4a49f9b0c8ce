use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const BUNDLED: &str = include_str!("../assets/config.toml");

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub preview: PreviewConfig,
    pub permission: PermissionConfig,
    pub ui: UiConfig,
}

/// Requested preview resolution. Backends pick the nearest size the camera supports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    pub request_code: i32,
    pub poll_interval_ms: u64,
    /// How long the watcher waits for the permission dialog to take focus
    /// before trusting the current permission status.
    pub settle_ms: u64,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            request_code: 101,
            poll_interval_ms: 200,
            settle_ms: 1500,
        }
    }
}

impl PermissionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Number of polls that make up the settle period.
    pub fn settle_polls(&self) -> u32 {
        let polls = self.settle_ms / self.poll_interval_ms.max(1);
        polls.clamp(1, u32::MAX as u64) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub notice_duration_ms: u64,
    pub frame_poll_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notice_duration_ms: 2000,
            frame_poll_ms: 10,
        }
    }
}

impl UiConfig {
    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }

    pub fn frame_poll(&self) -> Duration {
        Duration::from_millis(self.frame_poll_ms.max(1))
    }
}

impl AppConfig {
    /// Loads the configuration compiled into the binary.
    pub fn load() -> Result<Self> {
        Self::parse(BUNDLED).context("bundled config.toml is invalid")
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
