//! Wire messages exchanged between browsing contexts.

use serde::{Deserialize, Serialize};

/// Name of the channel shared by every context of the origin.
pub const CONSULTATION_CHANNEL: &str = "teleconsult:consultation-window";

/// Announcement posted on [`CONSULTATION_CHANNEL`]. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabAnnouncement {
    /// A consultation window named `tab_id` is being spawned.
    #[serde(rename_all = "camelCase")]
    NewTabOpened { tab_id: String, timestamp: i64 },

    /// The window named `tab_id` stays; every other one must close.
    #[serde(rename_all = "camelCase")]
    KeepThisTab { tab_id: String, timestamp: i64 },
}

impl TabAnnouncement {
    pub fn new_tab_opened(tab_id: impl Into<String>, timestamp: i64) -> Self {
        TabAnnouncement::NewTabOpened {
            tab_id: tab_id.into(),
            timestamp,
        }
    }

    pub fn keep_this_tab(tab_id: impl Into<String>, timestamp: i64) -> Self {
        TabAnnouncement::KeepThisTab {
            tab_id: tab_id.into(),
            timestamp,
        }
    }

    pub fn tab_id(&self) -> &str {
        match self {
            TabAnnouncement::NewTabOpened { tab_id, .. }
            | TabAnnouncement::KeepThisTab { tab_id, .. } => tab_id,
        }
    }

    /// Epoch milliseconds at which the sender posted the message.
    pub fn timestamp(&self) -> i64 {
        match self {
            TabAnnouncement::NewTabOpened { timestamp, .. }
            | TabAnnouncement::KeepThisTab { timestamp, .. } => *timestamp,
        }
    }
}

/// Whether an announcement posted at `timestamp` still matters at `now`.
///
/// Clocks of different contexts may disagree, so the distance is taken in
/// both directions.
pub fn is_relevant(timestamp: i64, now: i64, window_ms: i64) -> bool {
    now.saturating_sub(timestamp).unsigned_abs() <= window_ms.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_matches_schema() {
        let json = serde_json::to_value(TabAnnouncement::new_tab_opened("tab-1", 1_700)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "NEW_TAB_OPENED", "tabId": "tab-1", "timestamp": 1_700 })
        );

        let keep: TabAnnouncement = serde_json::from_str(
            r#"{"type":"KEEP_THIS_TAB","tabId":"tab-2","timestamp":5}"#,
        )
        .unwrap();
        assert_eq!(keep, TabAnnouncement::keep_this_tab("tab-2", 5));
        assert_eq!(keep.tab_id(), "tab-2");
        assert_eq!(keep.timestamp(), 5);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<TabAnnouncement>(
            r#"{"type":"CLOSE_ALL","tabId":"x","timestamp":1}"#
        )
        .is_err());
    }

    #[test]
    fn test_relevance_window() {
        let now = 10_000;
        assert!(is_relevant(now, now, 1_000));
        assert!(is_relevant(now - 500, now, 1_000));
        assert!(is_relevant(now - 1_000, now, 1_000));
        assert!(!is_relevant(now - 1_001, now, 1_000));
        assert!(is_relevant(now + 300, now, 1_000));
        assert!(!is_relevant(now + 5_000, now, 1_000));
        assert!(!is_relevant(i64::MIN, now, 1_000));
    }
}
