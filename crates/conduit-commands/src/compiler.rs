//! `CommandSpec` → [`CommandNode`] tree.
//!
//! Arguments are folded last to first: each argument node has the next as
//! its only child and the head of the chain hangs under a literal. The
//! literal and the final argument both carry the executable, so the command
//! also runs with zero arguments (undeclared values are left out of the
//! event).
//!
//! ```text
//! give <target:player> <amount:integer>
//!
//! literal "give"                     ⇒ Dispatch(give)
//! └── argument target (player)
//!     └── argument amount (integer)  ⇒ Dispatch(give)
//! ```

use std::sync::Arc;

use conduit_core::{ArgumentSpec, CommandSpec};

use crate::node::{CommandNode, Executable, Leaf, ParameterType};

/// Feedback of the placeholder installed for a changed command.
pub const PLACEHOLDER_FEEDBACK: &str = "Command registered. Please restart the server to use it.";

/// Compile a spec into its root literal.
///
/// The bare `name args…` chain is installed only when
/// [`CommandSpec::installs_bare_literal`] holds; every subcommand gets its own
/// `name sub args…` chain.
pub fn compile(spec: &CommandSpec) -> CommandNode {
    let mut root = CommandNode::literal(&spec.name);

    if spec.installs_bare_literal() {
        let leaf = Leaf {
            command: spec.name.clone(),
            subcommand: None,
            arguments: spec.arguments.clone(),
        };
        root = attach_chain(root, spec.arguments(), leaf);
    }

    for sub in spec.subcommands() {
        let leaf = Leaf {
            command: spec.name.clone(),
            subcommand: Some(sub.name.clone()),
            arguments: sub.arguments.clone(),
        };
        let branch = attach_chain(CommandNode::literal(&sub.name), sub.arguments(), leaf);
        root.add_child(branch);
    }

    root
}

/// A bare literal that only answers with [`PLACEHOLDER_FEEDBACK`].
///
/// Installed into a live interpreter when a new or changed spec arrives and
/// [`CommandSpec::installs_bare_literal`] holds;
/// the real tree is compiled on the next host start.
pub fn placeholder(spec: &CommandSpec) -> CommandNode {
    CommandNode::literal(&spec.name).executes(Executable::Feedback(PLACEHOLDER_FEEDBACK.to_string()))
}

fn attach_chain(parent: CommandNode, arguments: &[ArgumentSpec], leaf: Leaf) -> CommandNode {
    let executable = Executable::Dispatch(Arc::new(leaf));

    let chain = arguments.iter().rev().fold(None, |next: Option<CommandNode>, arg| {
        let node = CommandNode::argument(&arg.name, ParameterType::from(&arg.kind));
        Some(match next {
            None => node.executes(executable.clone()),
            Some(next) => node.then(next),
        })
    });

    let parent = parent.executes(executable);
    match chain {
        None => parent,
        Some(head) => parent.then(head),
    }
}
