//! Skill registry: name → skill lookup, built once at composition time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::provider::ToolDefinition;
use crate::skill::Skill;

/// An ordered registry of available skills.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up skills when the LLM requests them
///
/// Names are matched case-insensitively, the same way enablement toggles
/// are. Cloning is cheap: skills are shared behind `Arc`.
#[derive(Clone, Default)]
pub struct SkillRegistry {
    skills: Vec<Arc<dyn Skill>>,
    index: HashMap<String, usize>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of skills, rejecting duplicate names.
    pub fn from_skills(
        skills: impl IntoIterator<Item = Arc<dyn Skill>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for skill in skills {
            registry.register(skill)?;
        }
        Ok(registry)
    }

    /// Register a skill. A name that is already taken is a configuration
    /// error and leaves the registry unchanged.
    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<(), RegistryError> {
        let key = skill.name().to_lowercase();
        if self.index.contains_key(&key) {
            return Err(RegistryError::DuplicateSkill(skill.name().to_string()));
        }
        self.index.insert(key, self.skills.len());
        self.skills.push(skill);
        Ok(())
    }

    /// Get a skill by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| self.skills[i].clone())
    }

    /// All skills in registration order.
    pub fn all(&self) -> &[Arc<dyn Skill>] {
        &self.skills
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.skills.iter().map(|s| s.to_definition()).collect()
    }

    /// List all registered skill names.
    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// A new registry holding only the skills accepted by `keep`.
    pub fn filtered(&self, mut keep: impl FnMut(&dyn Skill) -> bool) -> Self {
        let mut out = Self::new();
        for skill in self.skills.iter().filter(|s| keep(s.as_ref())) {
            out.index.insert(skill.name().to_lowercase(), out.skills.len());
            out.skills.push(skill.clone());
        }
        out
    }
}

impl fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillRegistry")
            .field("skills", &self.names())
            .finish()
    }
}
