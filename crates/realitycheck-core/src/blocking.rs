//! Block list applied while an offline session runs.
//!
//! Only the selection is implemented: the apps are recorded on the session
//! and logged. Nothing is enforced at the OS level.

use tracing::info;

use crate::storage::BlockListConfig;

#[derive(Debug, Clone, Default)]
pub struct BlockList {
    apps: Vec<String>,
}

impl BlockList {
    pub fn from_config(config: &BlockListConfig) -> Self {
        let mut apps: Vec<String> = Vec::new();
        for app in config.apps.iter().filter(|app| app.blocked) {
            let name = app.name.trim();
            if !name.is_empty() && !apps.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                apps.push(name.to_string());
            }
        }
        Self { apps }
    }

    pub fn apps_to_block(&self) -> &[String] {
        &self.apps
    }

    /// Select the apps for a starting session and log them.
    pub fn apply(&self, session_id: &str) -> Vec<String> {
        if self.apps.is_empty() {
            info!(session_id, "offline session started with an empty block list");
        } else {
            info!(session_id, apps = ?self.apps, "blocking apps for offline session");
        }
        self.apps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlockedApp;

    #[test]
    fn only_blocked_unique_names_are_selected() {
        let config = BlockListConfig {
            apps: vec![
                BlockedApp { name: "Instagram".into(), blocked: true },
                BlockedApp { name: "Maps".into(), blocked: false },
                BlockedApp { name: " instagram ".into(), blocked: true },
                BlockedApp { name: "".into(), blocked: true },
                BlockedApp { name: "TikTok".into(), blocked: true },
            ],
        };
        let list = BlockList::from_config(&config);
        assert_eq!(list.apps_to_block(), ["Instagram", "TikTok"]);
        assert_eq!(list.apply("s1"), vec!["Instagram".to_string(), "TikTok".to_string()]);
    }

    #[test]
    fn default_config_blocks_something() {
        let list = BlockList::from_config(&BlockListConfig::default());
        assert!(!list.apps_to_block().is_empty());
    }
}
