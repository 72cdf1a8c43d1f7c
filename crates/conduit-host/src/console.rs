//! Built-in host commands.
//!
//! These are checked before installed custom commands, so a custom command
//! with a built-in name is shadowed.

/// Built-in command names, sorted.
pub const BUILTIN_NAMES: [&str; 6] = ["help", "join", "leave", "list", "say", "stop"];

/// A parsed built-in command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// List available commands.
    Help,
    /// Mark a player online.
    Join(String),
    /// Mark a player offline.
    Leave(String),
    /// List online players.
    List,
    /// Broadcast a message from the sender.
    Say(String),
    /// Stop the host.
    Stop,
}

impl Builtin {
    /// Parse a command line (without leading `/`).
    ///
    /// `None` means the line is not a built-in. `Some(Err(usage))` means it
    /// names a built-in but the arguments are wrong.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let parsed = match head {
            "help" => Ok(Self::Help),
            "list" => Ok(Self::List),
            "stop" => Ok(Self::Stop),
            "say" => non_empty(rest, "say <message>").map(Self::Say),
            "join" => single_word(rest, "join <player>").map(Self::Join),
            "leave" => single_word(rest, "leave <player>").map(Self::Leave),
            _ => return None,
        };
        Some(parsed)
    }

    /// Whether `name` is reserved by a built-in.
    pub fn is_reserved(name: &str) -> bool {
        BUILTIN_NAMES.binary_search(&name).is_ok()
    }
}

fn non_empty(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

fn single_word(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() || rest.contains(' ') {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_builtins() {
        assert_eq!(Builtin::parse("help"), Some(Ok(Builtin::Help)));
        assert_eq!(Builtin::parse("list"), Some(Ok(Builtin::List)));
        assert_eq!(
            Builtin::parse("say hello  there "),
            Some(Ok(Builtin::Say("hello  there".into())))
        );
        assert_eq!(Builtin::parse("join Steve"), Some(Ok(Builtin::Join("Steve".into()))));
    }

    #[test]
    fn usage_errors() {
        assert_eq!(Builtin::parse("say"), Some(Err("Usage: say <message>".into())));
        assert_eq!(Builtin::parse("leave a b"), Some(Err("Usage: leave <player>".into())));
    }

    #[test]
    fn other_lines_are_not_builtins() {
        assert_eq!(Builtin::parse("heal Steve"), None);
        assert_eq!(Builtin::parse("sayhello"), None);
    }

    #[test]
    fn reserved_names() {
        assert!(BUILTIN_NAMES.is_sorted());
        assert!(Builtin::is_reserved("stop"));
        assert!(!Builtin::is_reserved("heal"));
    }
}
