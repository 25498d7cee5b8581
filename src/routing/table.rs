//! Static lookup tables: channel roles and the ordered keyword table.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use tracing::warn;

// Channel roles.

/// Role tag attached to a channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    Support,
    Downloads,
    Updates,
    General,
}

impl ChannelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelRole::Support => "support",
            ChannelRole::Downloads => "downloads",
            ChannelRole::Updates => "updates",
            ChannelRole::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "support" => Some(ChannelRole::Support),
            "downloads" => Some(ChannelRole::Downloads),
            "updates" => Some(ChannelRole::Updates),
            "general" => Some(ChannelRole::General),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable channel id → role map.
#[derive(Debug, Clone, Default)]
pub struct ChannelRoles {
    roles: BTreeMap<String, ChannelRole>,
}

impl ChannelRoles {
    pub fn new(roles: BTreeMap<String, ChannelRole>) -> Self {
        Self { roles }
    }

    /// The role configured for a channel, if any.
    pub fn role_of(&self, channel_id: &str) -> Option<ChannelRole> {
        self.roles.get(channel_id).copied()
    }

    /// The numerically lowest channel id carrying `role`.
    pub fn first_channel(&self, role: ChannelRole) -> Option<&str> {
        self.roles
            .iter()
            .filter(|(_, r)| **r == role)
            .min_by_key(|(id, _)| id.parse::<u64>().unwrap_or(u64::MAX))
            .map(|(id, _)| id.as_str())
    }
}

// Keyword table.

/// One keyword rule as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Phrase matched as a case-insensitive substring.
    pub trigger: String,
    /// Response template (`{channel:<role>}`, `{env:<NAME>}`).
    pub response: String,
    /// Phrases that suppress this rule when present in the input.
    #[serde(default)]
    pub unless: Vec<String>,
}

impl KeywordRule {
    pub fn new(trigger: &str, response: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            response: response.to_string(),
            unless: Vec::new(),
        }
    }

    pub fn unless(mut self, phrase: &str) -> Self {
        self.unless.push(phrase.to_string());
        self
    }
}

/// The built-in keyword table.
///
/// `executors` is declared before `executor` so that both stay reachable.
pub fn default_keywords() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("download", "You can download PrismStrap here: {channel:downloads}."),
        KeywordRule::new("how do i use", "Check out the usage guide in {channel:downloads}."),
        KeywordRule::new("executors", "Supported executors and updates: {channel:updates}."),
        KeywordRule::new("executor", "Supported executors and how to use them are listed in {channel:updates}."),
        KeywordRule::new("injector", "Recommended injectors info: {channel:downloads}."),
        KeywordRule::new("updates", "Latest updates are posted in {channel:updates}."),
        KeywordRule::new("support", "Need help? Head over to {channel:support} for assistance."),
        KeywordRule::new("help", "For support and info, visit {channel:support} or ask me here!").unless("what can you do"),
    ]
}

#[derive(Debug, Clone)]
struct CompiledRule {
    trigger: String,
    unless: Vec<String>,
    response: String,
}

/// Ordered, rendered keyword table. The first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    rules: Vec<CompiledRule>,
}

impl KeywordTable {
    /// Lowercase every phrase and render every response once.
    pub fn compile(rules: &[KeywordRule], channels: &ChannelRoles) -> Self {
        let rules = rules
            .iter()
            .filter(|rule| !rule.trigger.trim().is_empty())
            .map(|rule| CompiledRule {
                trigger: rule.trigger.to_lowercase(),
                unless: rule.unless.iter().map(|u| u.to_lowercase()).collect(),
                response: render_template(&rule.response, channels),
            })
            .collect();

        Self { rules }
    }

    /// Find the response of the first rule whose trigger occurs in `input`.
    pub fn lookup(&self, input: &str) -> Option<&str> {
        let input = input.to_lowercase();

        self.rules
            .iter()
            .find(|rule| input.contains(&rule.trigger) && !rule.unless.iter().any(|u| input.contains(u)))
            .map(|rule| rule.response.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// Templates.

/// Render `{channel:<role>}` and `{env:<NAME>}` placeholders.
///
/// Unknown placeholders are left as written. A role with no configured channel
/// renders as a plain `#role` label.
pub fn render_template(template: &str, channels: &ChannelRoles) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let token = &after[..end];
        match render_placeholder(token, channels) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(token);
                out.push('}');
            }
        }

        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn render_placeholder(token: &str, channels: &ChannelRoles) -> Option<String> {
    if let Some(role) = token.strip_prefix("channel:") {
        let role = ChannelRole::parse(role)?;

        return Some(match channels.first_channel(role) {
            Some(id) => format!("<#{id}>"),
            None => format!("#{role}"),
        });
    }

    if let Some(name) = token.strip_prefix("env:") {
        let name = name.trim();

        return Some(match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                warn!("Template variable `{}` is not set; rendering it empty.", name);
                String::new()
            }
        });
    }

    None
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> ChannelRoles {
        ChannelRoles::new(BTreeMap::from([
            ("100".to_string(), ChannelRole::Downloads),
            ("200".to_string(), ChannelRole::Updates),
            ("300".to_string(), ChannelRole::Support),
        ]))
    }

    #[test]
    fn test_render_channel_placeholder() {
        let rendered = render_template("Grab it in {channel:downloads}.", &channels());
        assert_eq!(rendered, "Grab it in <#100>.");
    }

    #[test]
    fn test_render_missing_role_falls_back_to_label() {
        let rendered = render_template("See {channel:general}", &channels());
        assert_eq!(rendered, "See #general");
    }

    #[test]
    fn test_render_env_placeholder() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("PRISM_BOT_TEST_RENDER_LINK", "https://example.invalid/get") };

        let rendered = render_template("Link: {env:PRISM_BOT_TEST_RENDER_LINK}", &channels());
        assert_eq!(rendered, "Link: https://example.invalid/get");
    }

    #[test]
    fn test_render_unset_env_placeholder_is_empty() {
        let rendered = render_template("Download here: {env:PRISM_BOT_TEST_RENDER_UNSET}.", &channels());
        assert_eq!(rendered, "Download here: .");
    }

    #[test]
    fn test_first_channel_compares_ids_numerically() {
        let roles = ChannelRoles::new(BTreeMap::from([
            ("100".to_string(), ChannelRole::Support),
            ("99".to_string(), ChannelRole::Support),
            ("5".to_string(), ChannelRole::Downloads),
        ]));

        assert_eq!(roles.first_channel(ChannelRole::Support), Some("99"));
        assert_eq!(roles.first_channel(ChannelRole::Updates), None);
        assert_eq!(render_template("{channel:support}", &roles), "<#99>");
    }

    #[test]
    fn test_render_leaves_unknown_and_unclosed_braces() {
        assert_eq!(render_template("{nope} and {channel:bogus}", &channels()), "{nope} and {channel:bogus}");
        assert_eq!(render_template("dangling {channel:support", &channels()), "dangling {channel:support");
    }

    #[test]
    fn test_lookup_first_declared_match_wins() {
        let rules = vec![KeywordRule::new("exec", "first"), KeywordRule::new("executor", "second")];
        let table = KeywordTable::compile(&rules, &channels());

        assert_eq!(table.lookup("which EXECUTOR works?"), Some("first"));
    }

    #[test]
    fn test_lookup_is_substring_match() {
        let table = KeywordTable::compile(&default_keywords(), &channels());

        // "help" matches inside "helpful".
        assert_eq!(table.lookup("that was helpful"), Some("For support and info, visit <#300> or ask me here!"));
    }

    #[test]
    fn test_lookup_respects_unless() {
        let table = KeywordTable::compile(&default_keywords(), &channels());

        assert_eq!(table.lookup("help, what can you do?"), None);
    }

    #[test]
    fn test_default_table_keeps_both_executor_rules_reachable() {
        let table = KeywordTable::compile(&default_keywords(), &channels());

        assert_eq!(table.lookup("list the executors"), Some("Supported executors and updates: <#200>."));
        assert_eq!(table.lookup("is my executor ok"), Some("Supported executors and how to use them are listed in <#200>."));
    }

    #[test]
    fn test_compile_skips_blank_triggers() {
        let rules = vec![KeywordRule::new("  ", "never"), KeywordRule::new("ping", "pong")];
        let table = KeywordTable::compile(&rules, &channels());

        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("anything"), None);
    }

    #[test]
    fn test_channel_role_parse() {
        assert_eq!(ChannelRole::parse(" Support "), Some(ChannelRole::Support));
        assert_eq!(ChannelRole::parse("lobby"), None);
    }
}
