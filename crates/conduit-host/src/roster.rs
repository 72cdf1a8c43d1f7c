//! Online players and item ids, for resolving typed command arguments.

use std::collections::BTreeSet;

use conduit_commands::{ArgumentResolver, ItemRef};
use parking_lot::RwLock;

/// Namespace assumed for item ids without one.
const DEFAULT_NAMESPACE: &str = "minecraft";

/// Players currently online.
///
/// Player tokens match case-insensitively and resolve to the stored spelling.
#[derive(Debug, Default)]
pub struct Roster {
    players: RwLock<BTreeSet<String>>,
}

impl Roster {
    /// Create a roster with these players online.
    pub fn new(players: impl IntoIterator<Item = String>) -> Self {
        Self {
            players: RwLock::new(players.into_iter().collect()),
        }
    }

    /// Mark a player online. Returns `false` if already online.
    pub fn join(&self, name: &str) -> bool {
        if self.find(name).is_some() {
            return false;
        }
        self.players.write().insert(name.to_string())
    }

    /// Mark a player offline. Returns `false` if not online.
    pub fn leave(&self, name: &str) -> bool {
        match self.find(name) {
            Some(stored) => self.players.write().remove(&stored),
            None => false,
        }
    }

    /// Online players, sorted.
    pub fn players(&self) -> Vec<String> {
        self.players.read().iter().cloned().collect()
    }

    fn find(&self, token: &str) -> Option<String> {
        self.players
            .read()
            .iter()
            .find(|p| p.eq_ignore_ascii_case(token))
            .cloned()
    }
}

impl ArgumentResolver for Roster {
    fn resolve_player(&self, token: &str) -> Result<String, String> {
        self.find(token)
            .ok_or_else(|| format!("No player was found: {token}"))
    }

    fn resolve_item(&self, token: &str) -> Result<ItemRef, String> {
        let (namespace, path) = token
            .split_once(':')
            .unwrap_or((DEFAULT_NAMESPACE, token));
        if !is_valid_part(namespace, false) || !is_valid_part(path, true) {
            return Err(format!("Invalid item id: {token}"));
        }
        Ok(ItemRef {
            id: format!("{namespace}:{path}"),
            translation_key: format!("item.{namespace}.{}", path.replace('/', ".")),
        })
    }
}

fn is_valid_part(part: &str, allow_slash: bool) -> bool {
    !part.is_empty()
        && part.chars().all(|c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.') || (allow_slash && c == '/')
        })
}
