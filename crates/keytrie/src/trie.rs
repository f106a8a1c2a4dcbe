//! # Command tries
//!
//! ## Overview
//!
//! A [CommandTrie] stores every node in a single arena, and hands out [NodeId] values as
//! positions. Each mapping mode gets its own root, so the same keys can mean different things in
//! different modes. A node can hold a leaf action, children, or both, and an interpreter decides
//! what to do at a node that has both.
//!
//! Tries are assembled with a [TrieBuilder], which rejects empty sequences and conflicting leaves,
//! and are read-only afterwards.
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::InputKey;

/// Errors that occur while building a [CommandTrie].
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TrieError {
    /// Two different actions were given the same key sequence.
    #[error("Key sequence {keys} is already bound to another action in {mode} mode")]
    Conflict {
        /// The mode the conflicting sequence was inserted into.
        mode: String,
        /// The conflicting key sequence.
        keys: String,
    },

    /// An action was given no keys at all.
    #[error("Cannot bind an empty key sequence in {mode} mode")]
    EmptySequence {
        /// The mode the empty sequence was inserted into.
        mode: String,
    },
}

/// Identifies a node within the [CommandTrie] that created it.
///
/// Identifiers are only meaningful for the trie they came from.
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

/// The result of looking up a full key sequence with [CommandTrie::lookup].
#[derive(Debug, Eq, PartialEq)]
pub enum Lookup<'a, D> {
    /// No binding starts with these keys.
    Unmatched,

    /// These keys are the beginning of one or more bindings.
    Prefix(NodeId),

    /// These keys are a complete binding, and nothing longer starts with them.
    Leaf(NodeId, &'a D),

    /// These keys are a complete binding, and also the beginning of longer ones.
    Ambiguous(NodeId, &'a D),
}

struct Node<K, D> {
    children: HashMap<K, NodeId>,
    leaf: Option<D>,
}

impl<K, D> Default for Node<K, D> {
    fn default() -> Self {
        Node { children: HashMap::new(), leaf: None }
    }
}

/// A prefix tree mapping sequences of keys onto actions, with a separate root for each mode.
///
/// See [TrieBuilder] for how to create one.
pub struct CommandTrie<M, K, D> {
    roots: HashMap<M, NodeId>,
    nodes: Vec<Node<K, D>>,
}

impl<M, K, D> CommandTrie<M, K, D>
where
    M: Copy + Debug + Hash + Eq,
    K: InputKey,
{
    /// Get the root node for a mode, if anything has been mapped in it.
    pub fn root(&self, mode: M) -> Option<NodeId> {
        self.roots.get(&mode).copied()
    }

    /// Check whether a node is the root of any mode.
    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots.values().any(|root| *root == id)
    }

    /// Follow the edge for `key` out of a node.
    pub fn child(&self, id: NodeId, key: &K) -> Option<NodeId> {
        self.nodes.get(id.0)?.children.get(key).copied()
    }

    /// Get the action bound at a node, if there is one.
    pub fn leaf(&self, id: NodeId) -> Option<&D> {
        self.nodes.get(id.0)?.leaf.as_ref()
    }

    /// Returns whether any longer bindings continue from this node.
    pub fn has_children(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).map(|n| !n.children.is_empty()).unwrap_or(false)
    }

    /// Iterate over the keys that continue from this node, and where they lead.
    ///
    /// The order of iteration is unspecified.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&K, NodeId)> + '_ {
        self.nodes
            .get(id.0)
            .into_iter()
            .flat_map(|n| n.children.iter().map(|(k, id)| (k, *id)))
    }

    /// Walk a full key sequence from the root of `mode`.
    pub fn lookup(&self, mode: M, keys: &[K]) -> Lookup<'_, D> {
        let Some(mut curr) = self.root(mode) else {
            return Lookup::Unmatched;
        };

        for key in keys {
            match self.child(curr, key) {
                Some(next) => curr = next,
                None => return Lookup::Unmatched,
            }
        }

        match (self.leaf(curr), self.has_children(curr)) {
            (Some(d), true) => Lookup::Ambiguous(curr, d),
            (Some(d), false) => Lookup::Leaf(curr, d),
            (None, _) => Lookup::Prefix(curr),
        }
    }

    /// The number of nodes in the trie, including each mode's root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Builds a [CommandTrie] from an action catalog.
///
/// Every action is inserted along with the complete key sequence that invokes it. Inserting two
/// different actions under the same sequence fails, so that a finished trie never has to guess
/// which one was meant.
pub struct TrieBuilder<M, K, D> {
    trie: CommandTrie<M, K, D>,
}

impl<M, K, D> TrieBuilder<M, K, D>
where
    M: Copy + Debug + Hash + Eq,
    K: InputKey,
    D: PartialEq,
{
    /// Create a builder for an empty trie.
    pub fn new() -> Self {
        TrieBuilder {
            trie: CommandTrie { roots: HashMap::new(), nodes: Vec::new() },
        }
    }

    fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.trie.nodes.len());

        self.trie.nodes.push(Node::default());

        return id;
    }

    /// Make sure a mode has a root, even if nothing gets mapped in it.
    pub fn add_mode(&mut self, mode: M) -> NodeId {
        if let Some(id) = self.trie.roots.get(&mode) {
            return *id;
        }

        let id = self.add_node();
        self.trie.roots.insert(mode, id);

        return id;
    }

    /// Map a sequence of keys to an action in the given mode.
    ///
    /// Mapping the same action to the same keys twice is allowed and does nothing the second
    /// time.
    pub fn insert(&mut self, mode: M, keys: &[K], action: D) -> Result<NodeId, TrieError> {
        if keys.is_empty() {
            return Err(TrieError::EmptySequence { mode: format!("{mode:?}") });
        }

        let mut curr = self.add_mode(mode);

        for key in keys {
            curr = match self.trie.child(curr, key) {
                Some(next) => next,
                None => {
                    let next = self.add_node();
                    self.trie.nodes[curr.0].children.insert(key.clone(), next);
                    next
                },
            };
        }

        let node = &mut self.trie.nodes[curr.0];

        match &node.leaf {
            Some(existing) if existing != &action => {
                let err = TrieError::Conflict {
                    mode: format!("{mode:?}"),
                    keys: K::notate(keys),
                };

                tracing::warn!(%err, "rejecting conflicting binding");

                return Err(err);
            },
            Some(_) => {
                tracing::trace!(mode = ?mode, keys = %K::notate(keys), "duplicate binding");
            },
            None => {
                node.leaf = Some(action);
            },
        }

        return Ok(curr);
    }

    /// Finish building, and return the immutable trie.
    pub fn build(self) -> CommandTrie<M, K, D> {
        self.trie
    }
}

impl<M, K, D> Default for TrieBuilder<M, K, D>
where
    M: Copy + Debug + Hash + Eq,
    K: InputKey,
    D: PartialEq,
{
    fn default() -> Self {
        TrieBuilder::new()
    }
}
