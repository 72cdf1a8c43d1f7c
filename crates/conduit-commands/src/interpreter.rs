//! Host-side command interpreter.
//!
//! Owns the installed command roots and runs input lines against them.
//! Tokens are separated by single spaces. At each node literal children are
//! tried before argument children, and a branch that fails deeper in the
//! tree is backtracked so a sibling can still match.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::dispatcher::{Dispatcher, Invocation, SenderKind};
use crate::errors::{ArgumentError, InterpretError};
use crate::node::{CommandNode, Executable, NodeKind, ParameterType};

/// A resolved item argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRef {
    /// Namespaced id, e.g. `minecraft:diamond`.
    pub id: String,
    /// Translation key reported in events, e.g. `item.minecraft.diamond`.
    pub translation_key: String,
}

/// Resolves world-dependent argument tokens.
pub trait ArgumentResolver: Send + Sync {
    /// Resolve a player token to the player's name.
    fn resolve_player(&self, token: &str) -> Result<String, String>;

    /// Resolve an item token.
    fn resolve_item(&self, token: &str) -> Result<ItemRef, String>;
}

/// Command source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    /// Display name.
    pub name: String,
    /// Classification.
    pub kind: SenderKind,
}

impl Sender {
    /// The server console.
    pub fn console() -> Self {
        Self {
            name: "Server".to_string(),
            kind: SenderKind::Console,
        }
    }

    /// A player.
    pub fn player(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SenderKind::Player,
        }
    }
}

/// Result of running one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A compiled leaf ran and returned this status.
    Dispatched(i32),
    /// A feedback-only node answered.
    Feedback(String),
}

#[derive(Clone, Debug, PartialEq)]
enum Parsed {
    Text(String),
    Integer(i32),
    Player(String),
    Item(ItemRef),
}

/// Installed command roots plus the collaborators needed to run them.
pub struct Interpreter {
    roots: BTreeMap<String, CommandNode>,
    dispatcher: Dispatcher,
    resolver: Arc<dyn ArgumentResolver>,
}

impl Interpreter {
    /// Create an empty interpreter.
    pub fn new(dispatcher: Dispatcher, resolver: Arc<dyn ArgumentResolver>) -> Self {
        Self {
            roots: BTreeMap::new(),
            dispatcher,
            resolver,
        }
    }

    /// Install a root literal, merging into an existing root of the same name.
    pub fn install(&mut self, node: CommandNode) {
        if node.kind != NodeKind::Literal {
            debug!(name = %node.name, "ignoring non-literal root");
            return;
        }
        match self.roots.get_mut(&node.name) {
            Some(existing) => existing.merge(node),
            None => {
                let _ = self.roots.insert(node.name.clone(), node);
            }
        }
    }

    /// Whether a root with this name is installed.
    pub fn contains(&self, name: &str) -> bool {
        self.roots.contains_key(name)
    }

    /// Installed root names, sorted.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    /// Look up an installed root.
    pub fn root(&self, name: &str) -> Option<&CommandNode> {
        self.roots.get(name)
    }

    /// Parse and run one input line. A single leading `/` is ignored.
    #[instrument(skip(self, sender), fields(sender = %sender.name))]
    pub fn execute(&self, input: &str, sender: &Sender) -> Result<Outcome, InterpretError> {
        let line = input.trim_end();
        let line = line.strip_prefix('/').unwrap_or(line);

        let end = token_end(line, 0);
        let head = &line[..end];
        let root = self
            .roots
            .get(head)
            .ok_or_else(|| InterpretError::UnknownCommand(head.to_string()))?;

        let mut values = Vec::new();
        let executable = self.walk(root, line, end, &mut values)?;

        match executable {
            Executable::Dispatch(leaf) => {
                let invocation = ParsedInvocation {
                    sender,
                    values: values.into_iter().collect(),
                };
                Ok(Outcome::Dispatched(self.dispatcher.execute(leaf, &invocation)))
            }
            Executable::Feedback(text) => Ok(Outcome::Feedback(text.clone())),
        }
    }

    fn walk<'n>(
        &self,
        node: &'n CommandNode,
        line: &str,
        pos: usize,
        values: &mut Vec<(String, Parsed)>,
    ) -> Result<&'n Executable, InterpretError> {
        if pos >= line.len() {
            return node
                .executes
                .as_ref()
                .ok_or_else(|| InterpretError::Incomplete(line.to_string()));
        }

        let trailing = || InterpretError::TrailingInput {
            position: pos,
            remaining: line[pos..].trim_start().to_string(),
        };
        if !line[pos..].starts_with(' ') || node.children.is_empty() {
            return Err(trailing());
        }
        let start = pos + 1;

        let literals = node.children.iter().filter(|c| c.kind == NodeKind::Literal);
        let arguments = node.children.iter().filter(|c| c.kind != NodeKind::Literal);

        let mut deeper: Option<InterpretError> = None;
        let mut rejected: Option<InterpretError> = None;

        for child in literals.chain(arguments) {
            let end = match self.parse_token(child, line, start) {
                Ok((end, parsed)) => {
                    if let Some(parsed) = parsed {
                        values.push((child.name.clone(), parsed));
                    }
                    end
                }
                Err(reason) => {
                    if rejected.is_none() && child.kind != NodeKind::Literal {
                        rejected = Some(InterpretError::InvalidArgument {
                            argument: child.name.clone(),
                            reason,
                        });
                    }
                    continue;
                }
            };

            match self.walk(child, line, end, values) {
                Ok(executable) => return Ok(executable),
                Err(e) => {
                    if child.kind != NodeKind::Literal {
                        let _ = values.pop();
                    }
                    let _ = deeper.get_or_insert(e);
                }
            }
        }

        Err(deeper.or(rejected).unwrap_or_else(trailing))
    }

    /// Parse the token for `node` starting at `start`. Returns the end offset
    /// and, for argument nodes, the typed value.
    fn parse_token(
        &self,
        node: &CommandNode,
        line: &str,
        start: usize,
    ) -> Result<(usize, Option<Parsed>), String> {
        let parameter = match node.kind {
            NodeKind::Literal => {
                let end = token_end(line, start);
                return if line[start..end] == node.name {
                    Ok((end, None))
                } else {
                    Err(format!("expected '{}'", node.name))
                };
            }
            NodeKind::Argument(parameter) => parameter,
        };

        if parameter == ParameterType::String && line[start..].starts_with(&['"', '\''][..]) {
            let (end, text) = read_quoted(line, start)?;
            return Ok((end, Some(Parsed::Text(text))));
        }

        let end = token_end(line, start);
        let token = &line[start..end];
        if token.is_empty() {
            return Err(format!("expected {}", parameter.as_str()));
        }

        let parsed = match parameter {
            ParameterType::String => Parsed::Text(token.to_string()),
            ParameterType::Word => {
                if !token.chars().all(is_word_char) {
                    return Err(format!("'{token}' is not a single word"));
                }
                Parsed::Text(token.to_string())
            }
            ParameterType::Integer => Parsed::Integer(
                token
                    .parse::<i32>()
                    .map_err(|_| format!("'{token}' is not a valid integer"))?,
            ),
            ParameterType::Player => Parsed::Player(self.resolver.resolve_player(token)?),
            ParameterType::Item => Parsed::Item(self.resolver.resolve_item(token)?),
        };
        Ok((end, Some(parsed)))
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("roots", &self.roots.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')
}

fn token_end(line: &str, start: usize) -> usize {
    line[start..].find(' ').map_or(line.len(), |i| start + i)
}

/// Read a quoted string at `start`. Backslash escapes the quote or itself.
fn read_quoted(line: &str, start: usize) -> Result<(usize, String), String> {
    let mut chars = line[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err("expected quote".to_string());
    };

    let mut text = String::new();
    let mut escaped = false;
    for (offset, c) in chars {
        if escaped {
            if c != quote && c != '\\' {
                return Err(format!("invalid escape sequence '\\{c}'"));
            }
            text.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((start + offset + c.len_utf8(), text));
        } else {
            text.push(c);
        }
    }
    Err("unclosed quoted string".to_string())
}

struct ParsedInvocation<'a> {
    sender: &'a Sender,
    values: HashMap<String, Parsed>,
}

impl ParsedInvocation<'_> {
    fn get(&self, name: &str) -> Result<&Parsed, ArgumentError> {
        self.values
            .get(name)
            .ok_or_else(|| ArgumentError::Missing(name.to_string()))
    }

    fn mismatch(name: &str, expected: &'static str) -> ArgumentError {
        ArgumentError::TypeMismatch {
            name: name.to_string(),
            expected,
        }
    }

    fn text(&self, name: &str, expected: &'static str) -> Result<String, ArgumentError> {
        match self.get(name)? {
            Parsed::Text(s) => Ok(s.clone()),
            _ => Err(Self::mismatch(name, expected)),
        }
    }
}

impl Invocation for ParsedInvocation<'_> {
    fn sender_name(&self) -> &str {
        &self.sender.name
    }

    fn sender_kind(&self) -> SenderKind {
        self.sender.kind
    }

    fn string(&self, name: &str) -> Result<String, ArgumentError> {
        self.text(name, "string")
    }

    fn integer(&self, name: &str) -> Result<i32, ArgumentError> {
        match self.get(name)? {
            Parsed::Integer(n) => Ok(*n),
            _ => Err(Self::mismatch(name, "integer")),
        }
    }

    fn player(&self, name: &str) -> Result<String, ArgumentError> {
        match self.get(name)? {
            Parsed::Player(p) => Ok(p.clone()),
            _ => Err(Self::mismatch(name, "player")),
        }
    }

    fn item(&self, name: &str) -> Result<String, ArgumentError> {
        match self.get(name)? {
            Parsed::Item(item) => Ok(item.translation_key.clone()),
            _ => Err(Self::mismatch(name, "item")),
        }
    }

    fn word(&self, name: &str) -> Result<String, ArgumentError> {
        self.text(name, "word")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{PLACEHOLDER_FEEDBACK, compile, placeholder};
    use crate::dispatcher::COMMAND_SUCCESS;
    use crate::dispatcher::test_support::RecordingSink;
    use assert_matches::assert_matches;
    use conduit_core::{ArgumentSpec, ArgumentType, CommandSpec, SubcommandSpec};
    use serde_json::{Value, json};

    struct Roster;

    impl ArgumentResolver for Roster {
        fn resolve_player(&self, token: &str) -> Result<String, String> {
            ["Steve", "Alex"]
                .iter()
                .find(|p| p.eq_ignore_ascii_case(token))
                .map(|p| (*p).to_string())
                .ok_or_else(|| format!("no player named '{token}'"))
        }

        fn resolve_item(&self, token: &str) -> Result<ItemRef, String> {
            let id = if token.contains(':') {
                token.to_string()
            } else {
                format!("minecraft:{token}")
            };
            let (ns, path) = id.split_once(':').ok_or("bad id")?;
            if path != "diamond" && path != "stone" {
                return Err(format!("unknown item '{id}'"));
            }
            Ok(ItemRef {
                translation_key: format!("item.{ns}.{path}"),
                id,
            })
        }
    }

    fn setup(specs: &[CommandSpec]) -> (Interpreter, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let mut interp = Interpreter::new(Dispatcher::new(sink.clone()), Arc::new(Roster));
        for spec in specs {
            interp.install(compile(spec));
        }
        (interp, sink)
    }

    fn arg(name: &str, kind: ArgumentType) -> ArgumentSpec {
        ArgumentSpec::new(name, kind)
    }

    fn last_event(sink: &RecordingSink) -> Value {
        sink.events.lock().last().and_then(|e| e.data.clone()).unwrap()
    }

    #[test]
    fn heal_player_scenario() {
        let heal = CommandSpec::new("heal").with_arguments(vec![arg("target", ArgumentType::Player)]);
        let (interp, sink) = setup(&[heal]);

        let out = interp.execute("heal Steve", &Sender::player("Alex")).unwrap();
        assert_eq!(out, Outcome::Dispatched(COMMAND_SUCCESS));
        assert_eq!(sink.events.lock().len(), 1);
        assert_eq!(
            last_event(&sink),
            json!({
                "command": "heal",
                "sender": "Alex",
                "senderType": "player",
                "arguments": {"target": "Steve"}
            })
        );
    }

    #[test]
    fn console_sender_and_slash_prefix() {
        let (interp, sink) = setup(&[CommandSpec::new("ping")]);
        let _ = interp.execute("/ping", &Sender::console()).unwrap();
        assert_eq!(
            last_event(&sink),
            json!({"command": "ping", "sender": "Server", "senderType": "console"})
        );
    }

    #[test]
    fn typed_arguments() {
        let give = CommandSpec::new("give").with_arguments(vec![
            arg("target", ArgumentType::Player),
            arg("what", ArgumentType::Item),
            arg("amount", ArgumentType::Integer),
        ]);
        let (interp, sink) = setup(&[give]);
        let _ = interp
            .execute("give alex minecraft:diamond -3", &Sender::console())
            .unwrap();
        assert_eq!(
            last_event(&sink)["arguments"],
            json!({"target": "Alex", "what": "item.minecraft.diamond", "amount": -3})
        );
    }

    #[test]
    fn quoted_string_argument() {
        let say = CommandSpec::new("announce").with_arguments(vec![
            arg("msg", ArgumentType::String),
            arg("times", ArgumentType::Integer),
        ]);
        let (interp, sink) = setup(&[say]);
        let _ = interp
            .execute(r#"announce "hello \"big\" world" 2"#, &Sender::console())
            .unwrap();
        assert_eq!(
            last_event(&sink)["arguments"],
            json!({"msg": "hello \"big\" world", "times": 2})
        );
    }

    #[test]
    fn unclosed_quote_is_invalid_argument() {
        let say = CommandSpec::new("announce").with_arguments(vec![arg("msg", ArgumentType::String)]);
        let (interp, _) = setup(&[say]);
        assert_matches!(
            interp.execute(r#"announce "oops"#, &Sender::console()),
            Err(InterpretError::InvalidArgument { argument, .. }) if argument == "msg"
        );
    }

    #[test]
    fn unknown_type_parses_as_word() {
        let spec = CommandSpec::new("face")
            .with_arguments(vec![arg("dir", ArgumentType::Other("direction".into()))]);
        let (interp, sink) = setup(&[spec]);
        let _ = interp.execute("face north", &Sender::console()).unwrap();
        assert_eq!(last_event(&sink)["arguments"], json!({"dir": "north"}));
        assert_matches!(
            interp.execute("face no/rth", &Sender::console()),
            Err(InterpretError::InvalidArgument { .. })
        );
    }

    #[test]
    fn unknown_command() {
        let (interp, _) = setup(&[]);
        assert_eq!(
            interp.execute("nope 1", &Sender::console()),
            Err(InterpretError::UnknownCommand("nope".into()))
        );
    }

    #[test]
    fn command_runs_without_its_arguments() {
        let heal = CommandSpec::new("heal").with_arguments(vec![arg("target", ArgumentType::Player)]);
        let (interp, sink) = setup(&[heal]);

        let out = interp.execute("heal", &Sender::console()).unwrap();
        assert_eq!(out, Outcome::Dispatched(COMMAND_SUCCESS));
        assert_eq!(sink.events.lock().len(), 1);
        assert_eq!(
            last_event(&sink),
            json!({
                "command": "heal",
                "sender": "Server",
                "senderType": "console",
                "arguments": {}
            })
        );
    }

    #[test]
    fn missing_middle_argument_is_incomplete() {
        let give = CommandSpec::new("give").with_arguments(vec![
            arg("target", ArgumentType::Player),
            arg("amount", ArgumentType::Integer),
        ]);
        let (interp, sink) = setup(&[give]);
        assert_matches!(
            interp.execute("give Steve", &Sender::console()),
            Err(InterpretError::Incomplete(_))
        );
        assert!(sink.events.lock().is_empty());
    }

    #[test]
    fn extra_input_is_trailing() {
        let (interp, _) = setup(&[CommandSpec::new("ping")]);
        assert_eq!(
            interp.execute("ping pong", &Sender::console()),
            Err(InterpretError::TrailingInput {
                position: 4,
                remaining: "pong".into(),
            })
        );
    }

    #[test]
    fn bad_integer_is_invalid_argument() {
        let spec = CommandSpec::new("count").with_arguments(vec![arg("n", ArgumentType::Integer)]);
        let (interp, _) = setup(&[spec]);
        assert_matches!(
            interp.execute("count many", &Sender::console()),
            Err(InterpretError::InvalidArgument { argument, .. }) if argument == "n"
        );
        assert_matches!(
            interp.execute("count 99999999999", &Sender::console()),
            Err(InterpretError::InvalidArgument { .. })
        );
    }

    #[test]
    fn offline_player_is_invalid_argument() {
        let heal = CommandSpec::new("heal").with_arguments(vec![arg("target", ArgumentType::Player)]);
        let (interp, _) = setup(&[heal]);
        assert_matches!(
            interp.execute("heal Herobrine", &Sender::console()),
            Err(InterpretError::InvalidArgument { reason, .. }) if reason.contains("Herobrine")
        );
    }

    #[test]
    fn subcommands_without_top_level_arguments() {
        let files = CommandSpec::new("files").with_subcommands(vec![
            SubcommandSpec {
                name: "list".into(),
                arguments: None,
            },
            SubcommandSpec {
                name: "move".into(),
                arguments: Some(vec![arg("from", ArgumentType::String), arg("to", ArgumentType::String)]),
            },
        ]);
        let (interp, sink) = setup(&[files]);

        assert_matches!(
            interp.execute("files", &Sender::console()),
            Err(InterpretError::Incomplete(_))
        );

        let _ = interp.execute("files list", &Sender::console()).unwrap();
        assert_eq!(
            last_event(&sink),
            json!({"command": "files", "subcommand": "list", "sender": "Server", "senderType": "console"})
        );

        let _ = interp.execute("files move", &Sender::console()).unwrap();
        assert_eq!(
            last_event(&sink),
            json!({
                "command": "files",
                "subcommand": "move",
                "sender": "Server",
                "senderType": "console",
                "arguments": {}
            })
        );

        let _ = interp.execute("files move a.txt b.txt", &Sender::console()).unwrap();
        assert_eq!(
            last_event(&sink)["arguments"],
            json!({"from": "a.txt", "to": "b.txt"})
        );
    }

    #[test]
    fn literal_preferred_over_argument_with_backtracking() {
        let warp = CommandSpec::new("warp")
            .with_arguments(vec![arg("place", ArgumentType::Word)])
            .with_subcommands(vec![SubcommandSpec {
                name: "list".into(),
                arguments: Some(vec![arg("page", ArgumentType::Integer)]),
            }]);
        let (interp, sink) = setup(&[warp]);

        let _ = interp.execute("warp list 2", &Sender::console()).unwrap();
        assert_eq!(last_event(&sink)["subcommand"], "list");

        // the literal wins over the word argument even without a page
        let _ = interp.execute("warp list", &Sender::console()).unwrap();
        let event = last_event(&sink);
        assert_eq!(event["subcommand"], "list");
        assert_eq!(event["arguments"], json!({}));

        // "north" has no literal, so the argument branch takes it
        let _ = interp.execute("warp north", &Sender::console()).unwrap();
        assert_eq!(last_event(&sink)["arguments"], json!({"place": "north"}));

        let _ = interp.execute("warp", &Sender::console()).unwrap();
        let event = last_event(&sink);
        assert!(event.get("subcommand").is_none());
        assert_eq!(event["arguments"], json!({}));

        let _ = interp.execute("warp spawn", &Sender::console()).unwrap();
        assert_eq!(last_event(&sink)["arguments"], json!({"place": "spawn"}));
    }

    #[test]
    fn placeholder_merges_into_existing_root() {
        let heal = CommandSpec::new("heal").with_arguments(vec![arg("target", ArgumentType::Player)]);
        let (mut interp, sink) = setup(&[heal.clone()]);
        interp.install(placeholder(&heal));

        assert_eq!(
            interp.execute("heal", &Sender::console()).unwrap(),
            Outcome::Feedback(PLACEHOLDER_FEEDBACK.to_string())
        );
        assert!(sink.events.lock().is_empty());

        let _ = interp.execute("heal Steve", &Sender::console()).unwrap();
        assert_eq!(sink.events.lock().len(), 1);
    }

    #[test]
    fn commands_are_listed_sorted() {
        let (interp, _) = setup(&[CommandSpec::new("zap"), CommandSpec::new("alpha")]);
        assert_eq!(interp.commands().collect::<Vec<_>>(), vec!["alpha", "zap"]);
        assert!(interp.contains("zap"));
        assert!(!interp.contains("beta"));
    }

    #[test]
    fn read_quoted_single_quotes() {
        assert_eq!(read_quoted("'a b' c", 0), Ok((5, "a b".to_string())));
        assert!(read_quoted(r"'a\x'", 0).is_err());
    }
}
