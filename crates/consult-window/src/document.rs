//! Structured description of a consultation window.
//!
//! A [`WindowDocument`] is everything a runtime needs to build the
//! spawned window: which scripts to load, which configuration values to
//! inline into the window's isolated context, and which widget callbacks
//! feed back into the controller. It carries no markup.

use crate::WindowResult;
use consult_auth::AccessGrant;
use consult_config_and_utils::Config;
use serde::Serialize;
use url::Url;

/// Title of every consultation window.
pub const WINDOW_TITLE: &str = "Teleconsulta";

/// Query parameter carrying the cache buster on the widget script URL.
pub const CACHE_BUSTER_PARAM: &str = "v";

/// Widget-related settings taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSettings {
    pub script_url: String,
    pub locale: String,
    pub theme: String,
}

impl WidgetSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            script_url: config.widget_script_url.clone(),
            locale: config.widget_locale.clone(),
            theme: config.widget_theme.clone(),
        }
    }
}

/// A script the window must load before the widget can start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRef {
    pub src: Url,
}

/// Names of the widget callbacks routed back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackBindings {
    pub on_open: String,
    pub on_close: String,
    pub on_error: String,
}

impl Default for CallbackBindings {
    fn default() -> Self {
        Self {
            on_open: "onOpen".to_string(),
            on_close: "onClose".to_string(),
            on_error: "onError".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowDocument {
    pub title: String,
    pub tab_id: String,
    pub scripts: Vec<ScriptRef>,
    /// Values serialized into the window's own execution context.
    pub inline_config: serde_json::Value,
    pub callbacks: CallbackBindings,
}

impl WindowDocument {
    /// Describe the window for a consultation admitted with `grant`.
    pub fn for_consultation(
        grant: &AccessGrant,
        tab_id: &str,
        settings: &WidgetSettings,
        cache_buster: &str,
    ) -> WindowResult<Self> {
        let mut src = Url::parse(&settings.script_url)?;
        src.query_pairs_mut()
            .append_pair(CACHE_BUSTER_PARAM, cache_buster);

        let inline_config = serde_json::json!({
            "accessGrant": serde_json::to_value(grant)?,
            "tabId": tab_id,
            "locale": settings.locale,
            "theme": settings.theme,
        });

        Ok(Self {
            title: WINDOW_TITLE.to_string(),
            tab_id: tab_id.to_string(),
            scripts: vec![ScriptRef { src }],
            inline_config,
            callbacks: CallbackBindings::default(),
        })
    }

    /// The access token inlined into this document.
    pub fn access_token(&self) -> Option<&str> {
        self.inline_config
            .get("accessGrant")
            .and_then(|grant| grant.get("token"))
            .and_then(|token| token.as_str())
    }

    pub fn locale(&self) -> Option<&str> {
        self.inline_config.get("locale").and_then(|v| v.as_str())
    }

    pub fn theme(&self) -> Option<&str> {
        self.inline_config.get("theme").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WindowError;
    use chrono::Utc;

    fn settings() -> WidgetSettings {
        WidgetSettings {
            script_url: "https://widget.example.com/sdk.js?channel=web".to_string(),
            locale: "pt-BR".to_string(),
            theme: "light".to_string(),
        }
    }

    fn grant() -> AccessGrant {
        AccessGrant {
            token: "abc".to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_script_url_keeps_query_and_adds_cache_buster() {
        let doc = WindowDocument::for_consultation(&grant(), "tab-1", &settings(), "1700").unwrap();

        assert_eq!(doc.scripts.len(), 1);
        assert_eq!(
            doc.scripts[0].src.as_str(),
            "https://widget.example.com/sdk.js?channel=web&v=1700"
        );
    }

    #[test]
    fn test_inline_config_carries_grant_and_presentation() {
        let doc = WindowDocument::for_consultation(&grant(), "tab-1", &settings(), "1").unwrap();

        assert_eq!(doc.access_token(), Some("abc"));
        assert_eq!(doc.locale(), Some("pt-BR"));
        assert_eq!(doc.theme(), Some("light"));
        assert_eq!(doc.inline_config["tabId"], "tab-1");
        assert!(doc.inline_config["accessGrant"]["fetchedAt"].is_string());
        assert_eq!(doc.title, WINDOW_TITLE);
    }

    #[test]
    fn test_serializes_with_camel_case_callbacks() {
        let doc = WindowDocument::for_consultation(&grant(), "tab-1", &settings(), "1").unwrap();
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["callbacks"]["onOpen"], "onOpen");
        assert_eq!(json["tabId"], "tab-1");
    }

    #[test]
    fn test_invalid_script_url_is_rejected() {
        let mut settings = settings();
        settings.script_url = "not a url".to_string();

        assert!(matches!(
            WindowDocument::for_consultation(&grant(), "tab-1", &settings, "1"),
            Err(WindowError::InvalidScriptUrl(_))
        ));
    }
}
