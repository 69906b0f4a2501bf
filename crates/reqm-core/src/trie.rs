//! A prefix tree from terms to values.
//!
//! Entries are never removed. Callers that retire a value either supersede
//! its key with [`Trie::insert`] or skip it at lookup through the liveness
//! predicate taken by [`Trie::find`].

use crate::symbol::Symbol;
use la_arena::{Arena, Idx};
use std::collections::HashMap;

#[derive(Debug)]
struct Node<V> {
    children: HashMap<Symbol, Idx<Node<V>>>,
    entry: Option<V>,
}

impl<V> Node<V> {
    fn new() -> Node<V> {
        Node {
            children: HashMap::new(),
            entry: None,
        }
    }
}

#[derive(Debug)]
pub struct Trie<V> {
    nodes: Arena<Node<V>>,
    root: Idx<Node<V>>,
}

impl<V: Copy + Ord> Default for Trie<V> {
    fn default() -> Self {
        Trie::new()
    }
}

impl<V: Copy + Ord> Trie<V> {
    pub fn new() -> Trie<V> {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new());
        Trie { nodes, root }
    }

    /// Insert `value` under `key`, returning the value it supersedes.
    pub fn insert(&mut self, key: &[Symbol], value: V) -> Option<V> {
        let mut node = self.root;
        for symbol in key {
            node = match self.nodes[node].children.get(symbol) {
                Some(child) => *child,
                None => {
                    let child = self.nodes.alloc(Node::new());
                    self.nodes[node].children.insert(symbol.clone(), child);
                    child
                }
            };
        }
        self.nodes[node].entry.replace(value)
    }

    fn node(&self, key: &[Symbol]) -> Option<Idx<Node<V>>> {
        let mut node = self.root;
        for symbol in key {
            node = *self.nodes[node].children.get(symbol)?;
        }
        Some(node)
    }

    /// The value stored under exactly `key`.
    pub fn get(&self, key: &[Symbol]) -> Option<V> {
        self.node(key).and_then(|node| self.nodes[node].entry)
    }

    /// The value of the shortest stored prefix of `key` accepted by `live`.
    pub fn find<F>(&self, key: &[Symbol], live: F) -> Option<V>
    where
        F: Fn(V) -> bool,
    {
        self.prefix_entries(key).find(|value| live(*value))
    }

    /// The values of every stored prefix of `key`, shortest first.
    pub fn matches(&self, key: &[Symbol]) -> Vec<V> {
        self.prefix_entries(key).collect()
    }

    /// The values of every stored key that is a prefix of `key` or has `key`
    /// as a prefix, sorted and without duplicates.
    pub fn find_all(&self, key: &[Symbol]) -> Vec<V> {
        let mut result = self.matches(key);
        if let Some(node) = self.node(key) {
            let mut worklist: Vec<Idx<Node<V>>> =
                self.nodes[node].children.values().copied().collect();
            while let Some(next) = worklist.pop() {
                let node = &self.nodes[next];
                result.extend(node.entry);
                worklist.extend(node.children.values().copied());
            }
        }
        result.sort();
        result.dedup();
        result
    }

    fn prefix_entries<'a>(&'a self, key: &'a [Symbol]) -> impl Iterator<Item = V> + 'a {
        let mut node = Some(self.root);
        let mut symbols = key.iter();
        std::iter::from_fn(move || loop {
            let current = node?;
            let entry = self.nodes[current].entry;
            node = symbols
                .next()
                .and_then(|symbol| self.nodes[current].children.get(symbol).copied());
            // The root holds the empty key, which is never a rule.
            if current != self.root {
                if let Some(value) = entry {
                    return Some(value);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(names: &str) -> Vec<Symbol> {
        names.split('.').map(Symbol::name).collect()
    }

    #[test]
    fn test_insert_and_get() {
        let mut trie = Trie::new();
        assert_eq!(trie.insert(&key("a.b"), 0), None);
        assert_eq!(trie.get(&key("a.b")), Some(0));
        assert_eq!(trie.get(&key("a")), None);
        assert_eq!(trie.insert(&key("a.b"), 1), Some(0));
        assert_eq!(trie.get(&key("a.b")), Some(1));
    }

    #[test]
    fn test_find_shortest_live() {
        let mut trie = Trie::new();
        trie.insert(&key("a"), 0);
        trie.insert(&key("a.b"), 1);
        assert_eq!(trie.find(&key("a.b.c"), |_| true), Some(0));
        assert_eq!(trie.find(&key("a.b.c"), |v| v != 0), Some(1));
        assert_eq!(trie.find(&key("a.b.c"), |_| false), None);
        assert_eq!(trie.find(&key("b"), |_| true), None);
    }

    #[test]
    fn test_matches() {
        let mut trie = Trie::new();
        trie.insert(&key("a.b.c"), 2);
        trie.insert(&key("a"), 7);
        trie.insert(&key("a.b"), 5);
        assert_eq!(trie.matches(&key("a.b.c.d")), vec![7, 5, 2]);
        assert_eq!(trie.matches(&key("a.b")), vec![7, 5]);
        assert!(trie.matches(&key("b.c")).is_empty());
    }

    #[test]
    fn test_find_all() {
        let mut trie = Trie::new();
        trie.insert(&key("a"), 3);
        trie.insert(&key("a.b.c"), 1);
        trie.insert(&key("a.b.d"), 2);
        trie.insert(&key("x"), 0);
        assert_eq!(trie.find_all(&key("a.b")), vec![1, 2, 3]);
        assert_eq!(trie.find_all(&key("a.b.c.e")), vec![1, 3]);
        assert_eq!(trie.find_all(&key("y")), Vec::<i32>::new());
    }
}
