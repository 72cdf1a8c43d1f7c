//! Declarative command specifications.
//!
//! ```json
//! { "name": "give",
//!   "arguments": [ { "name": "target", "type": "player" } ],
//!   "subcommands": [ { "name": "all", "arguments": [ ... ] } ] }
//! ```
//!
//! Unrecognized argument types are kept verbatim (so the persisted registry
//! round-trips) and compile to the fallback word parameter.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::SpecError;

/// Type tag of a declared argument.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    /// Quotable string.
    String,
    /// Signed 32-bit integer.
    Integer,
    /// Online player reference.
    Player,
    /// Item reference.
    Item,
    /// Single unquoted word.
    #[default]
    Word,
    /// Any other tag; behaves like [`ArgumentType::Word`].
    Other(String),
}

impl ArgumentType {
    /// Parse a wire tag.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "string" => Self::String,
            "integer" => Self::Integer,
            "player" => Self::Player,
            "item" => Self::Item,
            "word" => Self::Word,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Player => "player",
            Self::Item => "item",
            Self::Word => "word",
            Self::Other(tag) => tag,
        }
    }
}

impl Serialize for ArgumentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ArgumentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = Option::<String>::deserialize(deserializer)?;
        Ok(tag.map_or(Self::Word, |t| Self::parse(&t)))
    }
}

/// One declared argument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Argument name; key in the execution record.
    pub name: String,
    /// Argument type tag.
    #[serde(rename = "type", default)]
    pub kind: ArgumentType,
}

impl ArgumentSpec {
    /// Create an argument spec.
    pub fn new(name: impl Into<String>, kind: ArgumentType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A subcommand branch. Subcommands do not nest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcommandSpec {
    /// Literal following the parent command name.
    pub name: String,
    /// Ordered arguments after the subcommand literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<ArgumentSpec>>,
}

impl SubcommandSpec {
    /// Declared arguments (empty when absent).
    pub fn arguments(&self) -> &[ArgumentSpec] {
        self.arguments.as_deref().unwrap_or_default()
    }
}

/// A declaratively specified host command. `name` is the registry key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Top-level literal.
    pub name: String,
    /// Ordered arguments after the top-level literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<ArgumentSpec>>,
    /// Subcommand branches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommands: Option<Vec<SubcommandSpec>>,
}

impl CommandSpec {
    /// A spec with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: None,
            subcommands: None,
        }
    }

    /// Builder: set top-level arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<ArgumentSpec>) -> Self {
        self.arguments = Some(arguments);
        self
    }

    /// Builder: set subcommands.
    #[must_use]
    pub fn with_subcommands(mut self, subcommands: Vec<SubcommandSpec>) -> Self {
        self.subcommands = Some(subcommands);
        self
    }

    /// Declared top-level arguments (empty when absent).
    pub fn arguments(&self) -> &[ArgumentSpec] {
        self.arguments.as_deref().unwrap_or_default()
    }

    /// Declared subcommands (empty when absent).
    pub fn subcommands(&self) -> &[SubcommandSpec] {
        self.subcommands.as_deref().unwrap_or_default()
    }

    /// Whether the bare `name …` literal is installed.
    ///
    /// Only when there are no subcommands, or there are subcommands and a
    /// non-empty top-level argument list. Otherwise the bare name would be
    /// both a leaf and a subcommand prefix.
    pub fn installs_bare_literal(&self) -> bool {
        self.subcommands().is_empty() || !self.arguments().is_empty()
    }

    /// Check structural validity.
    pub fn validate(&self) -> Result<(), SpecError> {
        validate_name(&self.name)?;
        validate_arguments(&self.name, self.arguments())?;

        let mut seen = HashSet::new();
        for sub in self.subcommands() {
            validate_name(&sub.name)?;
            if !seen.insert(sub.name.as_str()) {
                return Err(SpecError::DuplicateSubcommand {
                    command: self.name.clone(),
                    subcommand: sub.name.clone(),
                });
            }
            validate_arguments(&format!("{} {}", self.name, sub.name), sub.arguments())?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), SpecError> {
    if name.is_empty() {
        return Err(SpecError::EmptyName);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(SpecError::InvalidName(name.to_owned()));
    }
    Ok(())
}

fn validate_arguments(command: &str, arguments: &[ArgumentSpec]) -> Result<(), SpecError> {
    let mut seen = HashSet::new();
    for arg in arguments {
        if arg.name.is_empty() {
            return Err(SpecError::EmptyArgumentName {
                command: command.to_owned(),
            });
        }
        if !seen.insert(arg.name.as_str()) {
            return Err(SpecError::DuplicateArgument {
                command: command.to_owned(),
                argument: arg.name.clone(),
            });
        }
    }
    Ok(())
}
