//! Command tree nodes.
//!
//! A tree is rooted at a literal named after the command. Literal children
//! match a fixed token; argument children parse a typed token. A node with an
//! [`Executable`] can end an input line.

use std::sync::Arc;

use conduit_core::{ArgumentSpec, ArgumentType};

/// Parser attached to an argument node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// Quoted phrase or a single word.
    String,
    /// Signed 32-bit integer.
    Integer,
    /// Online player.
    Player,
    /// Item reference.
    Item,
    /// Single unquoted word.
    Word,
}

impl ParameterType {
    /// Human-readable type name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Player => "player",
            Self::Item => "item",
            Self::Word => "word",
        }
    }
}

impl From<&ArgumentType> for ParameterType {
    fn from(kind: &ArgumentType) -> Self {
        match kind {
            ArgumentType::String => Self::String,
            ArgumentType::Integer => Self::Integer,
            ArgumentType::Player => Self::Player,
            ArgumentType::Item => Self::Item,
            ArgumentType::Word | ArgumentType::Other(_) => Self::Word,
        }
    }
}

/// What a node matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Exact token equal to the node name.
    Literal,
    /// Typed token stored under the node name.
    Argument(ParameterType),
}

/// Binding of an executable leaf to the spec it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    /// Top-level command name.
    pub command: String,
    /// Subcommand name when the leaf sits under a subcommand literal.
    pub subcommand: Option<String>,
    /// Declared arguments, in order. `None` when the spec had no list.
    pub arguments: Option<Vec<ArgumentSpec>>,
}

/// Action run when input ends on a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Executable {
    /// Run the dispatcher for this leaf.
    Dispatch(Arc<Leaf>),
    /// Reply with fixed feedback text, emit nothing.
    Feedback(String),
}

/// One node of a compiled command tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandNode {
    /// Match kind.
    pub kind: NodeKind,
    /// Literal text or argument name.
    pub name: String,
    /// Child nodes, in insertion order.
    pub children: Vec<CommandNode>,
    /// Action when input ends here.
    pub executes: Option<Executable>,
}

impl CommandNode {
    /// A literal node.
    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Literal,
            name: name.into(),
            children: Vec::new(),
            executes: None,
        }
    }

    /// A typed argument node.
    pub fn argument(name: impl Into<String>, parameter: ParameterType) -> Self {
        Self {
            kind: NodeKind::Argument(parameter),
            name: name.into(),
            children: Vec::new(),
            executes: None,
        }
    }

    /// Builder: add a child, merging with an existing equivalent child.
    #[must_use]
    pub fn then(mut self, child: CommandNode) -> Self {
        self.add_child(child);
        self
    }

    /// Builder: set the executable.
    #[must_use]
    pub fn executes(mut self, executable: Executable) -> Self {
        self.executes = Some(executable);
        self
    }

    /// Whether input may end on this node.
    pub fn is_executable(&self) -> bool {
        self.executes.is_some()
    }

    /// Look up a direct child by kind and name.
    pub fn child(&self, kind: NodeKind, name: &str) -> Option<&CommandNode> {
        self.children
            .iter()
            .find(|c| c.kind == kind && c.name == name)
    }

    /// Look up a direct literal child.
    pub fn literal_child(&self, name: &str) -> Option<&CommandNode> {
        self.child(NodeKind::Literal, name)
    }

    /// Add a child. An existing child with the same kind and name absorbs it.
    pub fn add_child(&mut self, child: CommandNode) {
        if let Some(existing) = self
            .children
            .iter_mut()
            .find(|c| c.kind == child.kind && c.name == child.name)
        {
            existing.merge(child);
        } else {
            self.children.push(child);
        }
    }

    /// Merge `other` into `self`: children are merged recursively and a
    /// present executable on `other` replaces ours.
    pub fn merge(&mut self, other: CommandNode) {
        if other.executes.is_some() {
            self.executes = other.executes;
        }
        for child in other.children {
            self.add_child(child);
        }
    }
}
