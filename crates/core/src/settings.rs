//! Skill enablement toggles.
//!
//! Skills are enabled unless explicitly disabled. Names are matched
//! case-insensitively. Every execution takes a [`SkillSettings::snapshot`]
//! at start, so a toggle flipped mid-conversation applies to the next
//! request only.

use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::info;

use crate::registry::SkillRegistry;

#[derive(Debug, Default)]
pub struct SkillSettings {
    disabled: RwLock<HashSet<String>>,
}

impl SkillSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given skills disabled.
    pub fn from_disabled<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            disabled: RwLock::new(names.into_iter().map(|n| n.as_ref().to_lowercase()).collect()),
        }
    }

    pub async fn is_enabled(&self, name: &str) -> bool {
        !self.disabled.read().await.contains(&name.to_lowercase())
    }

    pub async fn enable(&self, name: &str) {
        if self.disabled.write().await.remove(&name.to_lowercase()) {
            info!(skill = %name, "Skill enabled");
        }
    }

    pub async fn disable(&self, name: &str) {
        if self.disabled.write().await.insert(name.to_lowercase()) {
            info!(skill = %name, "Skill disabled");
        }
    }

    /// The subset of `registry` that is currently enabled.
    pub async fn snapshot(&self, registry: &SkillRegistry) -> SkillRegistry {
        let disabled = self.disabled.read().await;
        registry.filtered(|skill| !disabled.contains(&skill.name().to_lowercase()))
    }
}
