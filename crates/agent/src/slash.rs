//! Slash commands: `/skill_name arguments` typed by the user to invoke a
//! skill directly, without spending a reasoning turn.

use clawpipe_core::Skill;

/// A parsed `/name args` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub name: String,
    pub arguments: String,
}

impl SlashCommand {
    /// Parse `input` as a slash command.
    ///
    /// The name must be word characters only (`[A-Za-z0-9_]`); anything after
    /// the first whitespace is the argument text, trimmed.
    pub fn parse(input: &str) -> Option<Self> {
        let rest = input.trim().strip_prefix('/')?;
        let (name, arguments) = match rest.find(char::is_whitespace) {
            Some(split) => (&rest[..split], rest[split..].trim()),
            None => (rest, ""),
        };

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
    }
}

/// Turn free-form command text into the serialized arguments `skill` expects.
///
/// - empty → `{}`
/// - text starting with `{` → passed through as JSON
/// - anything else → `{"<first declared parameter>": text}`, or `{"input": text}`
///   when the skill declares no parameters
pub fn normalize_arguments(raw: &str, skill: &dyn Skill) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "{}".to_string();
    }
    if raw.starts_with('{') {
        return raw.to_string();
    }

    let key = skill
        .parameters()
        .into_iter()
        .next()
        .map(|p| p.name)
        .unwrap_or_else(|| "input".to_string());

    let mut object = serde_json::Map::new();
    object.insert(key, serde_json::Value::String(raw.to_string()));
    serde_json::Value::Object(object).to_string()
}
