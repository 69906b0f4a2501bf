//! The graph of protocols referenced by a set of requirements.
//!
//! The graph contributes the protocol component of the symbol order: a
//! protocol that inherits from another sorts before it, and unrelated
//! protocols of equal inheritance depth sort by name.

use crate::name::Identifier;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display, Formatter};

/// A protocol, identified by its name.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Protocol(Identifier);

impl Protocol {
    pub fn new<T: Into<Identifier>>(name: T) -> Protocol {
        Protocol(name.into())
    }

    pub fn name(&self) -> &Identifier {
        &self.0
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtocolInfo {
    /// Protocols named in the inheritance clause.
    pub inherited: Vec<Protocol>,
    /// Every protocol reachable through inheritance, not including this one.
    pub all_inherited: BTreeSet<Protocol>,
    /// One more than the largest depth of an inherited protocol.
    pub depth: usize,
    /// The position of this protocol in the linear order.
    pub index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtocolGraph {
    info: HashMap<Protocol, ProtocolInfo>,
    /// Every protocol, in the linear order.
    protocols: Vec<Protocol>,
}

impl ProtocolGraph {
    pub fn new() -> ProtocolGraph {
        ProtocolGraph::default()
    }

    /// Record a protocol and the protocols it directly inherits from. Inherited
    /// protocols that were not declared yet are added with no inheritance of
    /// their own. Declaring a protocol again extends its inheritance clause.
    pub fn add_protocol(&mut self, protocol: Protocol, inherited: Vec<Protocol>) {
        for parent in &inherited {
            if !self.info.contains_key(parent) {
                self.info.insert(parent.clone(), ProtocolInfo::default());
            }
        }
        let info = self.info.entry(protocol).or_default();
        for parent in inherited {
            if !info.inherited.contains(&parent) {
                info.inherited.push(parent);
            }
        }
        self.compute();
    }

    pub fn contains(&self, protocol: &Protocol) -> bool {
        self.info.contains_key(protocol)
    }

    pub fn info(&self, protocol: &Protocol) -> Option<&ProtocolInfo> {
        self.info.get(protocol)
    }

    /// All protocols, in the linear order.
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Whether `protocol` transitively inherits from `parent`.
    pub fn inherits_from(&self, protocol: &Protocol, parent: &Protocol) -> bool {
        self.info
            .get(protocol)
            .is_some_and(|info| info.all_inherited.contains(parent))
    }

    /// The linear order on protocols. Protocols missing from the graph sort
    /// after every known protocol, by name.
    pub fn compare_protocols(&self, lhs: &Protocol, rhs: &Protocol) -> Ordering {
        match (self.info.get(lhs), self.info.get(rhs)) {
            (Some(l), Some(r)) => l.index.cmp(&r.index),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => lhs.cmp(rhs),
        }
    }

    fn compute(&mut self) {
        self.compute_transitive_closure();
        self.compute_depths();
        self.compute_linear_order();
    }

    fn compute_transitive_closure(&mut self) {
        let closures: Vec<(Protocol, BTreeSet<Protocol>)> = self
            .info
            .keys()
            .map(|protocol| (protocol.clone(), self.reachable(protocol)))
            .collect();
        for (protocol, closure) in closures {
            if let Some(info) = self.info.get_mut(&protocol) {
                info.all_inherited = closure;
            }
        }
    }

    fn reachable(&self, protocol: &Protocol) -> BTreeSet<Protocol> {
        let mut seen = BTreeSet::new();
        let mut worklist: Vec<&Protocol> = self.info[protocol].inherited.iter().collect();
        while let Some(next) = worklist.pop() {
            if next == protocol || !seen.insert(next.clone()) {
                continue;
            }
            if let Some(info) = self.info.get(next) {
                worklist.extend(info.inherited.iter());
            }
        }
        seen
    }

    fn compute_depths(&mut self) {
        let mut depths: HashMap<Protocol, usize> = HashMap::new();
        let protocols: Vec<Protocol> = self.info.keys().cloned().collect();
        for protocol in &protocols {
            let mut visiting = BTreeSet::new();
            self.depth_of(protocol, &mut depths, &mut visiting);
        }
        for (protocol, depth) in depths {
            if let Some(info) = self.info.get_mut(&protocol) {
                info.depth = depth;
            }
        }
    }

    fn depth_of(
        &self,
        protocol: &Protocol,
        depths: &mut HashMap<Protocol, usize>,
        visiting: &mut BTreeSet<Protocol>,
    ) -> usize {
        if let Some(depth) = depths.get(protocol) {
            return *depth;
        }
        // Inheritance cycles are invalid input; cut them off here.
        if !visiting.insert(protocol.clone()) {
            return 0;
        }
        let mut depth = 1;
        if let Some(info) = self.info.get(protocol) {
            for parent in &info.inherited {
                depth = depth.max(self.depth_of(parent, depths, visiting) + 1);
            }
        }
        visiting.remove(protocol);
        depths.insert(protocol.clone(), depth);
        depth
    }

    fn compute_linear_order(&mut self) {
        let mut protocols: Vec<Protocol> = self.info.keys().cloned().collect();
        protocols.sort_by(|lhs, rhs| {
            let l = &self.info[lhs];
            let r = &self.info[rhs];
            r.depth.cmp(&l.depth).then_with(|| lhs.cmp(rhs))
        });
        for (index, protocol) in protocols.iter().enumerate() {
            if let Some(info) = self.info.get_mut(protocol) {
                info.index = index;
            }
        }
        self.protocols = protocols;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> Protocol {
        Protocol::new(name)
    }

    #[test]
    fn test_inherits_from_is_transitive() {
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(p("Collection"), vec![p("Sequence")]);
        graph.add_protocol(p("BidirectionalCollection"), vec![p("Collection")]);
        assert!(graph.inherits_from(&p("BidirectionalCollection"), &p("Sequence")));
        assert!(graph.inherits_from(&p("Collection"), &p("Sequence")));
        assert!(!graph.inherits_from(&p("Sequence"), &p("Collection")));
        assert!(!graph.inherits_from(&p("Sequence"), &p("Sequence")));
    }

    #[test]
    fn test_derived_protocols_sort_first() {
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(p("Base"), vec![]);
        graph.add_protocol(p("Derived"), vec![p("Base")]);
        assert_eq!(
            graph.compare_protocols(&p("Derived"), &p("Base")),
            Ordering::Less
        );
        assert_eq!(graph.info(&p("Derived")).unwrap().depth, 2);
        assert_eq!(graph.protocols(), &[p("Derived"), p("Base")]);
    }

    #[test]
    fn test_equal_depth_sorts_by_name() {
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(p("P2"), vec![]);
        graph.add_protocol(p("P1"), vec![]);
        assert_eq!(graph.compare_protocols(&p("P1"), &p("P2")), Ordering::Less);
        assert_eq!(graph.compare_protocols(&p("P2"), &p("P2")), Ordering::Equal);
    }

    #[test]
    fn test_unknown_protocols_sort_last() {
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(p("Z"), vec![]);
        assert_eq!(graph.compare_protocols(&p("Z"), &p("A")), Ordering::Less);
        assert_eq!(graph.compare_protocols(&p("B"), &p("A")), Ordering::Greater);
    }

    #[test]
    fn test_cycles_terminate() {
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(p("A"), vec![p("B")]);
        graph.add_protocol(p("B"), vec![p("A")]);
        assert!(graph.inherits_from(&p("A"), &p("B")));
        assert!(graph.inherits_from(&p("B"), &p("A")));
        assert_eq!(graph.len(), 2);
    }
}
