//! Build webhook targets and payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::event::ChangeEvent;

/// A hosting service that accepts build webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildService {
    Netlify,
    Vercel,
    /// GitHub repository dispatch
    Github,
    Custom,
}

impl BuildService {
    pub const ALL: [BuildService; 4] = [Self::Netlify, Self::Vercel, Self::Github, Self::Custom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Netlify => "netlify",
            Self::Vercel => "vercel",
            Self::Github => "github",
            Self::Custom => "custom",
        }
    }

    /// Environment variable holding this service's hook URL.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Netlify => "NETLIFY_BUILD_HOOK_URL",
            Self::Vercel => "VERCEL_BUILD_HOOK_URL",
            Self::Github => "GITHUB_BUILD_HOOK_URL",
            Self::Custom => "CUSTOM_BUILD_HOOK_URL",
        }
    }
}

impl fmt::Display for BuildService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| format!("unknown build service: {}", s))
    }
}

/// Hook URLs per service. Loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildWebhookConfig {
    #[serde(default)]
    pub netlify: Option<String>,
    #[serde(default)]
    pub vercel: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub custom: Option<String>,
}

impl BuildWebhookConfig {
    pub fn url(&self, service: BuildService) -> Option<&str> {
        let url = match service {
            BuildService::Netlify => &self.netlify,
            BuildService::Vercel => &self.vercel,
            BuildService::Github => &self.github,
            BuildService::Custom => &self.custom,
        };
        url.as_deref().filter(|u| !u.trim().is_empty())
    }

    pub fn set(&mut self, service: BuildService, url: Option<String>) {
        let slot = match service {
            BuildService::Netlify => &mut self.netlify,
            BuildService::Vercel => &mut self.vercel,
            BuildService::Github => &mut self.github,
            BuildService::Custom => &mut self.custom,
        };
        *slot = url;
    }

    /// Configured targets in declaration order.
    pub fn targets(&self) -> Vec<(BuildService, &str)> {
        BuildService::ALL
            .into_iter()
            .filter_map(|service| self.url(service).map(|url| (service, url)))
            .collect()
    }

    /// Names of configured services, for status output.
    pub fn configured_services(&self) -> Vec<&'static str> {
        self.targets().into_iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn is_configured(&self, service: BuildService) -> bool {
        self.url(service).is_some()
    }
}

/// ISO 8601 timestamp with milliseconds, e.g. `2024-01-01T12:00:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Request body for a webhook target.
pub fn payload(service: BuildService, event: &ChangeEvent, at: DateTime<Utc>) -> Value {
    let timestamp = format_timestamp(at);
    match service {
        BuildService::Github => json!({
            "event_type": "markdown_file_change",
            "client_payload": {
                "changeType": event.change_type,
                "fileName": event.file_name,
                "timestamp": timestamp,
                "trigger": "api_file_change",
            },
        }),
        _ => json!({
            "trigger": "markdown_file_change",
            "changeType": event.change_type,
            "fileName": event.file_name,
            "timestamp": timestamp,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeType;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn generic_payload_shape() {
        let event = ChangeEvent::new(ChangeType::Change, "post.md");

        assert_eq!(
            payload(BuildService::Netlify, &event, at()),
            json!({
                "trigger": "markdown_file_change",
                "changeType": "change",
                "fileName": "post.md",
                "timestamp": "2024-01-02T03:04:05.000Z",
            })
        );
    }

    #[test]
    fn github_payload_uses_repository_dispatch() {
        let event = ChangeEvent::new(ChangeType::Delete, "old.md");

        assert_eq!(
            payload(BuildService::Github, &event, at()),
            json!({
                "event_type": "markdown_file_change",
                "client_payload": {
                    "changeType": "delete",
                    "fileName": "old.md",
                    "timestamp": "2024-01-02T03:04:05.000Z",
                    "trigger": "api_file_change",
                },
            })
        );
    }

    #[test]
    fn lists_configured_targets_in_order() {
        let config = BuildWebhookConfig {
            custom: Some("http://custom".into()),
            netlify: Some("http://netlify".into()),
            vercel: Some("   ".into()),
            github: None,
        };

        assert_eq!(config.configured_services(), vec!["netlify", "custom"]);
        assert!(!config.is_configured(BuildService::Vercel));
    }

    #[test]
    fn parses_service_names() {
        assert_eq!("github".parse::<BuildService>(), Ok(BuildService::Github));
        assert!("gitlab".parse::<BuildService>().is_err());
    }
}
