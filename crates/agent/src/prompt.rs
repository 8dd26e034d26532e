//! System prompt composition.

/// Response languages the pipeline can ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    TraditionalChinese,
    SimplifiedChinese,
    Japanese,
    Korean,
}

impl Language {
    /// Parse a client-supplied hint such as `"zh-TW"` or `"ja_JP"`.
    ///
    /// Unrecognized hints yield `None` and are ignored by the caller.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let normalized = hint.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "en" | "en-us" | "en-gb" | "english" => Some(Self::English),
            "zh-tw" | "zh-hk" | "zh-hant" => Some(Self::TraditionalChinese),
            "zh" | "zh-cn" | "zh-sg" | "zh-hans" => Some(Self::SimplifiedChinese),
            "ja" | "ja-jp" | "japanese" => Some(Self::Japanese),
            "ko" | "ko-kr" | "korean" => Some(Self::Korean),
            _ => None,
        }
    }

    /// Instruction appended to the system prompt.
    pub fn directive(&self) -> &'static str {
        match self {
            Self::English => "Always respond in English.",
            Self::TraditionalChinese => {
                "Always respond in Traditional Chinese (繁體中文), using Taiwan conventions."
            }
            Self::SimplifiedChinese => "Always respond in Simplified Chinese (简体中文).",
            Self::Japanese => "Always respond in Japanese (日本語).",
            Self::Korean => "Always respond in Korean (한국어).",
        }
    }
}

/// Join the base prompt and the language directive, if any.
///
/// Returns `None` when there is nothing to say.
pub fn compose_system_prompt(base: Option<&str>, language_hint: Option<&str>) -> Option<String> {
    let base = base.map(str::trim).filter(|b| !b.is_empty());
    let directive = language_hint.and_then(Language::from_hint).map(|l| l.directive());

    match (base, directive) {
        (Some(base), Some(directive)) => Some(format!("{base}\n\n{directive}")),
        (Some(base), None) => Some(base.to_string()),
        (None, Some(directive)) => Some(directive.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_are_normalized() {
        assert_eq!(Language::from_hint("zh-TW"), Some(Language::TraditionalChinese));
        assert_eq!(Language::from_hint(" zh_cn "), Some(Language::SimplifiedChinese));
        assert_eq!(Language::from_hint("JA"), Some(Language::Japanese));
        assert_eq!(Language::from_hint("ko-KR"), Some(Language::Korean));
        assert_eq!(Language::from_hint("en"), Some(Language::English));
    }

    #[test]
    fn unknown_hint_is_ignored() {
        assert_eq!(Language::from_hint("klingon"), None);
        assert_eq!(
            compose_system_prompt(Some("Be helpful."), Some("klingon")),
            Some("Be helpful.".into())
        );
    }

    #[test]
    fn base_and_directive_are_joined() {
        let prompt = compose_system_prompt(Some("Be helpful."), Some("ja")).unwrap();
        assert!(prompt.starts_with("Be helpful.\n\n"));
        assert!(prompt.ends_with(Language::Japanese.directive()));
    }

    #[test]
    fn directive_alone_or_nothing() {
        assert_eq!(
            compose_system_prompt(None, Some("ko")).as_deref(),
            Some(Language::Korean.directive())
        );
        assert_eq!(compose_system_prompt(Some("  "), None), None);
        assert_eq!(compose_system_prompt(None, None), None);
    }
}
