use crate::error::{Error, Result};
use crate::protocol_graph::{Protocol, ProtocolGraph};
use crate::symbol::Symbol;
use crate::term::Term;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Allocation context shared by rewrite systems. Equal terms built through
/// the same context share one allocation.
#[derive(Debug, Default)]
pub struct RewriteContext {
    terms: RefCell<HashSet<Term>>,
}

impl RewriteContext {
    pub fn new() -> RewriteContext {
        RewriteContext::default()
    }

    /// Get the canonical term for a sequence of symbols.
    pub fn term(&self, symbols: &[Symbol]) -> Term {
        let mut terms = self.terms.borrow_mut();
        if let Some(term) = terms.get(symbols) {
            return term.clone();
        }
        let term = Term::from_rc(Rc::from(symbols));
        terms.insert(term.clone());
        term
    }

    /// The number of distinct terms built so far.
    pub fn len(&self) -> usize {
        self.terms.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.borrow().is_empty()
    }

    /// Merge two associated type symbols with the same name.
    ///
    /// The merged symbol names the union of both protocol lists in the
    /// protocol order, keeping only protocols that no earlier protocol of
    /// the union inherits from.
    pub fn merge_associated_types(
        &self,
        lhs: &Symbol,
        rhs: &Symbol,
        graph: &ProtocolGraph,
    ) -> Result<Symbol> {
        let name = match (lhs, rhs) {
            (
                Symbol::AssociatedType { name: l, .. },
                Symbol::AssociatedType { name: r, .. },
            ) if l == r => l.clone(),
            _ => {
                return Err(Error::InvalidMerge {
                    lhs: lhs.to_string(),
                    rhs: rhs.to_string(),
                })
            }
        };

        let mut union: Vec<Protocol> = Vec::new();
        for protocol in lhs.protocols().iter().chain(rhs.protocols()) {
            if !union.contains(protocol) {
                union.push(protocol.clone());
            }
        }
        union.sort_by(|l, r| graph.compare_protocols(l, r));

        let mut minimal: Vec<Protocol> = Vec::new();
        for protocol in union {
            if !minimal.iter().any(|p| graph.inherits_from(p, &protocol)) {
                minimal.push(protocol);
            }
        }
        Ok(Symbol::associated_type(minimal, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assoc(protocols: &[&str], name: &str) -> Symbol {
        Symbol::associated_type(protocols.iter().map(|p| Protocol::new(*p)).collect(), name)
    }

    #[test]
    fn test_interning() {
        let ctx = RewriteContext::new();
        assert!(ctx.is_empty());
        let a = ctx.term(&[Symbol::name("a")]);
        let b = ctx.term(&[Symbol::name("a")]);
        assert!(a.ptr_eq(&b));
        ctx.term(&[Symbol::name("b")]);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_merge_unrelated() {
        let ctx = RewriteContext::new();
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(Protocol::new("P1"), vec![]);
        graph.add_protocol(Protocol::new("P2"), vec![]);
        let merged = ctx
            .merge_associated_types(&assoc(&["P2"], "T"), &assoc(&["P1"], "T"), &graph)
            .unwrap();
        assert_eq!(merged, assoc(&["P1", "P2"], "T"));
    }

    #[test]
    fn test_merge_drops_inherited() {
        let ctx = RewriteContext::new();
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(Protocol::new("Base"), vec![]);
        graph.add_protocol(Protocol::new("Derived"), vec![Protocol::new("Base")]);
        graph.add_protocol(Protocol::new("Other"), vec![]);
        let merged = ctx
            .merge_associated_types(
                &assoc(&["Base", "Other"], "T"),
                &assoc(&["Derived"], "T"),
                &graph,
            )
            .unwrap();
        assert_eq!(merged, assoc(&["Derived", "Other"], "T"));
    }

    #[test]
    fn test_merge_requires_same_name() {
        let ctx = RewriteContext::new();
        let graph = ProtocolGraph::new();
        let result = ctx.merge_associated_types(&assoc(&["P"], "T"), &assoc(&["Q"], "U"), &graph);
        assert!(matches!(result, Err(Error::InvalidMerge { .. })));
        let result = ctx.merge_associated_types(&Symbol::name("T"), &assoc(&["Q"], "T"), &graph);
        assert!(result.is_err());
    }
}
