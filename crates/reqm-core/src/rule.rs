use crate::common::RuleId;
use crate::error::{Error, Result};
use crate::protocol_graph::ProtocolGraph;
use crate::symbol::Symbol;
use crate::term::Term;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use tracing::error;

/// An oriented rewrite rule `lhs => rhs`, where `lhs` is greater than `rhs`
/// in the term order.
///
/// Rules are never removed from a rewrite system. A deleted rule keeps its
/// position in the rule table but no longer rewrites anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    lhs: Term,
    rhs: Term,
    deleted: bool,
}

impl Rule {
    pub fn new(lhs: Term, rhs: Term, graph: &ProtocolGraph) -> Result<Rule> {
        if lhs.compare(&rhs, graph) != Ordering::Greater {
            error!(%lhs, %rhs, "misoriented rule");
            return Err(Error::MisorientedRule {
                lhs: lhs.to_string(),
                rhs: rhs.to_string(),
            });
        }
        Ok(Rule {
            lhs,
            rhs,
            deleted: false,
        })
    }

    pub fn lhs(&self) -> &Term {
        &self.lhs
    }

    pub fn rhs(&self) -> &Term {
        &self.rhs
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether this rule states a property of its right hand side, that is,
    /// has the form `X.[p] => X`.
    pub fn property(&self) -> Option<&Symbol> {
        let (last, prefix) = self.lhs.split_last()?;
        if last.is_property() && prefix == self.rhs.symbols() {
            Some(last)
        } else {
            None
        }
    }

    /// The length of the left hand side.
    pub fn depth(&self) -> usize {
        self.lhs.len()
    }

    /// Retire the rule stored at `id`. Deleting a rule twice is a fault.
    pub(crate) fn mark_deleted(&mut self, id: RuleId) -> Result<()> {
        if self.deleted {
            error!(%id, rule = %self, "rule deleted twice");
            return Err(Error::RuleAlreadyDeleted(id));
        }
        self.deleted = true;
        Ok(())
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.lhs, self.rhs)?;
        if self.deleted {
            write!(f, " [deleted]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RewriteContext;

    fn term(ctx: &RewriteContext, names: &str) -> Term {
        let symbols: Vec<Symbol> = names.split('.').map(Symbol::name).collect();
        ctx.term(&symbols)
    }

    #[test]
    fn test_orientation() {
        let ctx = RewriteContext::new();
        let graph = ProtocolGraph::new();
        let rule = Rule::new(term(&ctx, "a.b"), term(&ctx, "c"), &graph).unwrap();
        assert_eq!(rule.depth(), 2);
        assert_eq!(rule.to_string(), "a.b => c");
        assert!(matches!(
            Rule::new(term(&ctx, "c"), term(&ctx, "a.b"), &graph),
            Err(Error::MisorientedRule { .. })
        ));
        assert!(Rule::new(term(&ctx, "a"), term(&ctx, "a"), &graph).is_err());
    }

    #[test]
    fn test_mark_deleted_twice() {
        let ctx = RewriteContext::new();
        let graph = ProtocolGraph::new();
        let mut rule = Rule::new(term(&ctx, "b"), term(&ctx, "a"), &graph).unwrap();
        assert!(!rule.is_deleted());
        let id = RuleId::new(4).unwrap();
        assert!(rule.mark_deleted(id).is_ok());
        assert!(rule.is_deleted());
        assert_eq!(rule.mark_deleted(id), Err(Error::RuleAlreadyDeleted(id)));
        assert_eq!(rule.to_string(), "b => a [deleted]");
    }

    #[test]
    fn test_property() {
        let ctx = RewriteContext::new();
        let graph = ProtocolGraph::new();
        let lhs = ctx.term(&[Symbol::generic_param(0, 0), Symbol::protocol("P")]);
        let rhs = ctx.term(&[Symbol::generic_param(0, 0)]);
        let rule = Rule::new(lhs, rhs, &graph).unwrap();
        assert_eq!(rule.property(), Some(&Symbol::protocol("P")));
        let rule = Rule::new(term(&ctx, "a.b"), term(&ctx, "a"), &graph).unwrap();
        assert_eq!(rule.property(), None);
    }
}
