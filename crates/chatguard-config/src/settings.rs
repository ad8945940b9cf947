//! Feature flags read by the pipeline

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable snapshot of the user's feature flags. Every flag defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "enabled")]
    pub enable_for_instagram: bool,

    #[serde(default = "enabled")]
    pub enable_highlighting: bool,

    #[serde(default = "enabled")]
    pub enable_auto_replacement: bool,

    #[serde(default = "enabled")]
    pub enable_notifications: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_for_instagram: true,
            enable_highlighting: true,
            enable_auto_replacement: true,
            enable_notifications: true,
        }
    }
}

impl Settings {
    /// Whether monitoring runs on a page served from `hostname`
    pub fn site_enabled(&self, hostname: &str) -> bool {
        if hostname.contains("instagram.com") {
            self.enable_for_instagram
        } else {
            true
        }
    }

    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::EnableForInstagram => self.enable_for_instagram,
            SettingKey::EnableHighlighting => self.enable_highlighting,
            SettingKey::EnableAutoReplacement => self.enable_auto_replacement,
            SettingKey::EnableNotifications => self.enable_notifications,
        }
    }

    /// Copy with one flag changed
    pub fn with(mut self, key: SettingKey, value: bool) -> Self {
        match key {
            SettingKey::EnableForInstagram => self.enable_for_instagram = value,
            SettingKey::EnableHighlighting => self.enable_highlighting = value,
            SettingKey::EnableAutoReplacement => self.enable_auto_replacement = value,
            SettingKey::EnableNotifications => self.enable_notifications = value,
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    EnableForInstagram,
    EnableHighlighting,
    EnableAutoReplacement,
    EnableNotifications,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::EnableForInstagram,
        SettingKey::EnableHighlighting,
        SettingKey::EnableAutoReplacement,
        SettingKey::EnableNotifications,
    ];

    /// Storage key name
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::EnableForInstagram => "enableForInstagram",
            SettingKey::EnableHighlighting => "enableHighlighting",
            SettingKey::EnableAutoReplacement => "enableAutoReplacement",
            SettingKey::EnableNotifications => "enableNotifications",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown setting: {0}")]
pub struct UnknownSetting(pub String);

impl FromStr for SettingKey {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSetting(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_all_enabled() {
        let settings = Settings::default();
        assert!(SettingKey::ALL.iter().all(|key| settings.get(*key)));
    }

    #[test]
    fn test_site_enabled() {
        let settings = Settings::default().with(SettingKey::EnableForInstagram, false);
        assert!(!settings.site_enabled("www.instagram.com"));
        assert!(settings.site_enabled("example.com"));
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(
            "enableHighlighting".parse::<SettingKey>(),
            Ok(SettingKey::EnableHighlighting)
        );
        assert_eq!(
            "ENABLENOTIFICATIONS".parse::<SettingKey>(),
            Ok(SettingKey::EnableNotifications)
        );
        assert!("enableEverything".parse::<SettingKey>().is_err());
    }
}
