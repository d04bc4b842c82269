use crate::config::{Config, DetailsLevel};
use std::collections::BTreeMap;

/// Read-only state shared by every executor invocation of a suite.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Command aliases, alias name to real command.
    pub aliases: BTreeMap<String, String>,

    /// Progress detail level.
    pub details: DetailsLevel,

    /// Name of the suite being run. Empty outside a suite.
    pub suite: String,
}

impl RunContext {
    /// Build a context from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            aliases: parse_aliases(&config.run.alias),
            details: config.run.details,
            suite: String::new(),
        }
    }

    /// Copy of this context scoped to one suite.
    pub fn for_suite(&self, name: &str) -> Self {
        Self {
            suite: name.to_string(),
            ..self.clone()
        }
    }

    /// Replace the first occurrence of `alias ` in `command` with `real `.
    ///
    /// Aliases are tried in name order; every alias is applied at most once.
    pub fn apply_aliases(&self, command: &str) -> String {
        let mut out = command.to_string();
        for (alias, real) in &self.aliases {
            out = out.replacen(&format!("{alias} "), &format!("{real} "), 1);
        }
        out
    }
}

/// Parse `alias:real` strings. Entries without a `:` are ignored.
pub fn parse_aliases(entries: &[String]) -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    for entry in entries {
        match entry.split_once(':') {
            Some((alias, real)) if !alias.is_empty() => {
                aliases.insert(alias.to_string(), real.to_string());
            }
            _ => log::warn!("ignoring malformed alias {entry:?}, expected alias:command"),
        }
    }
    aliases
}
