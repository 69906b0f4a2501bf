//! Proof terms: rewrite steps, rewrite paths and homotopy generators.

use crate::common::{RuleId, StepOffset};
use crate::error::{Error, Result};
use crate::symbol::Symbol;
use crate::system::RewriteSystem;
use crate::term::{MutableTerm, Term};
use derive_new::new;
use std::fmt::Write;
use tracing::error;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StepKind {
    /// Apply a rewrite rule to the subterm at the step's offset.
    ApplyRewriteRule,
    /// Move the prefix of the term ending at the step's offset into every
    /// substitution of the term's final superclass or concrete type symbol.
    /// The inverse moves it back out.
    AdjustConcreteType,
}

/// One elementary edit of a term.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RewriteStep {
    pub kind: StepKind,
    pub offset: StepOffset,
    /// Meaningful only for [`StepKind::ApplyRewriteRule`].
    pub rule_id: RuleId,
    pub inverse: bool,
}

/// The context of a rewrite rule application: the term it was applied to
/// was `prefix.lhs.suffix`, and it became `prefix.rhs.suffix`. An inverse
/// step records the rule's sides swapped.
#[derive(new, Clone, PartialEq, Eq, Debug)]
pub struct AppliedRewriteStep {
    pub prefix: MutableTerm,
    pub lhs: Term,
    pub rhs: Term,
    pub suffix: MutableTerm,
}

impl RewriteStep {
    pub fn for_rewrite_rule(offset: usize, rule_id: RuleId, inverse: bool) -> Result<RewriteStep> {
        Ok(RewriteStep {
            kind: StepKind::ApplyRewriteRule,
            offset: StepOffset::new(offset)?,
            rule_id,
            inverse,
        })
    }

    pub fn for_adjustment(offset: usize, inverse: bool) -> Result<RewriteStep> {
        Ok(RewriteStep {
            kind: StepKind::AdjustConcreteType,
            offset: StepOffset::new(offset)?,
            rule_id: RuleId::default(),
            inverse,
        })
    }

    pub fn invert(&mut self) {
        self.inverse = !self.inverse;
    }

    pub fn inverted(mut self) -> RewriteStep {
        self.invert();
        self
    }

    /// Whether applying `self` then `other` is the identity.
    pub fn is_inverse_of(&self, other: &RewriteStep) -> bool {
        self.kind == other.kind
            && self.offset == other.offset
            && self.rule_id == other.rule_id
            && self.inverse != other.inverse
    }

    pub fn apply_rewrite_rule(
        &self,
        term: &mut MutableTerm,
        system: &RewriteSystem<'_>,
    ) -> Result<AppliedRewriteStep> {
        let rule = system.rule(self.rule_id)?;
        let (lhs, rhs) = if self.inverse {
            (rule.rhs().clone(), rule.lhs().clone())
        } else {
            (rule.lhs().clone(), rule.rhs().clone())
        };
        let offset = self.offset.index();
        let end = offset + lhs.len();
        if end > term.len() || term[offset..end] != lhs[..] {
            error!(%term, offset, expected = %lhs, "rewrite step does not apply");
            return Err(Error::StepMismatch {
                term: term.to_string(),
                offset,
                expected: lhs.to_string(),
            });
        }
        let prefix = MutableTerm::from(&term[..offset]);
        let suffix = MutableTerm::from(&term[end..]);
        term.rewrite_subterm(offset, lhs.len(), &rhs);
        Ok(AppliedRewriteStep::new(prefix, lhs, rhs, suffix))
    }

    /// Apply a concrete type adjustment, returning the prefix that was moved.
    pub fn apply_adjustment(
        &self,
        term: &mut MutableTerm,
        system: &RewriteSystem<'_>,
    ) -> Result<MutableTerm> {
        let ctx = system.context();
        let offset = self.offset.index();
        let symbol = match term.last() {
            Some(symbol) if symbol.is_superclass_or_concrete_type() && offset < term.len() => {
                symbol.clone()
            }
            _ => {
                error!(%term, offset, "concrete type adjustment does not apply");
                return Err(Error::MissingSubstitutions(term.to_string()));
            }
        };
        let prefix = MutableTerm::from(&term[..offset]);
        let adjusted = if self.inverse {
            symbol.transform_concrete_substitutions(|substitution| {
                if !substitution.starts_with(&prefix[..]) {
                    error!(%substitution, %prefix, "substitution lacks prefix");
                    return Err(Error::PrefixMismatch {
                        substitution: substitution.to_string(),
                        prefix: prefix.to_string(),
                    });
                }
                Ok(ctx.term(&substitution[offset..]))
            })?
        } else {
            symbol.prepend_prefix_to_concrete_substitutions(&prefix, ctx)
        };
        if let Some(last) = term.last_mut() {
            *last = adjusted;
        }
        Ok(prefix)
    }

    pub fn apply(&self, term: &mut MutableTerm, system: &RewriteSystem<'_>) -> Result<()> {
        match self.kind {
            StepKind::ApplyRewriteRule => self.apply_rewrite_rule(term, system).map(|_| ()),
            StepKind::AdjustConcreteType => self.apply_adjustment(term, system).map(|_| ()),
        }
    }

    /// Apply the step to `term`, describing what it did.
    pub fn dump(&self, term: &mut MutableTerm, system: &RewriteSystem<'_>) -> Result<String> {
        let mut out = String::new();
        match self.kind {
            StepKind::ApplyRewriteRule => {
                let step = self.apply_rewrite_rule(term, system)?;
                if !step.prefix.is_empty() {
                    let _ = write!(out, "{}.", step.prefix);
                }
                let _ = write!(out, "({} => {})", step.lhs, step.rhs);
                if !step.suffix.is_empty() {
                    let _ = write!(out, ".{}", step.suffix);
                }
            }
            StepKind::AdjustConcreteType => {
                let prefix = self.apply_adjustment(term, system)?;
                let sign = if self.inverse { '-' } else { '+' };
                let _ = write!(out, "(σ {sign} {prefix})");
            }
        }
        Ok(out)
    }
}

/// A sequence of rewrite steps, applied in order.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct RewritePath {
    steps: Vec<RewriteStep>,
}

impl RewritePath {
    pub fn new() -> RewritePath {
        RewritePath::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[RewriteStep] {
        &self.steps
    }

    pub fn add(&mut self, step: RewriteStep) {
        self.steps.push(step);
    }

    /// Concatenate `other` onto this path. Nothing is cancelled.
    pub fn append(&mut self, other: &RewritePath) {
        self.steps.extend_from_slice(&other.steps);
    }

    pub fn invert(&mut self) {
        self.steps.reverse();
        for step in &mut self.steps {
            step.invert();
        }
    }

    pub fn inverted(&self) -> RewritePath {
        let mut path = self.clone();
        path.invert();
        path
    }

    /// Remove every pair of adjacent steps that undo each other, repeating
    /// until none remain. Returns whether anything was removed.
    pub fn cancel_adjacent_inverses(&mut self) -> bool {
        let before = self.steps.len();
        let mut reduced: Vec<RewriteStep> = Vec::with_capacity(before);
        for step in self.steps.drain(..) {
            match reduced.last() {
                Some(last) if last.is_inverse_of(&step) => {
                    reduced.pop();
                }
                _ => reduced.push(step),
            }
        }
        self.steps = reduced;
        before != self.steps.len()
    }

    pub fn apply(&self, term: &mut MutableTerm, system: &RewriteSystem<'_>) -> Result<()> {
        for step in &self.steps {
            step.apply(term, system)?;
        }
        Ok(())
    }

    /// Replay the path starting from `term`, describing each step.
    pub fn dump(&self, term: &[Symbol], system: &RewriteSystem<'_>) -> Result<String> {
        let mut term = MutableTerm::from(term);
        let mut parts = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            parts.push(step.dump(&mut term, system)?);
        }
        Ok(parts.join(" ⊗ "))
    }
}

/// A rewrite path from a term back to itself.
#[derive(new, Clone, PartialEq, Eq, Debug)]
pub struct HomotopyGenerator {
    pub basepoint: Term,
    pub path: RewritePath,
}

impl HomotopyGenerator {
    pub fn dump(&self, system: &RewriteSystem<'_>) -> Result<String> {
        Ok(format!(
            "{}: {}",
            self.basepoint,
            self.path.dump(&self.basepoint, system)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_term;
    use crate::{ProtocolGraph, RewriteContext};

    fn t(ctx: &RewriteContext, text: &str) -> MutableTerm {
        MutableTerm::from(&parse_term(ctx, text).unwrap())
    }

    fn rule(id: usize) -> RuleId {
        RuleId::new(id).unwrap()
    }

    /// A system with the rules `a.b => c` and `c.d => e`.
    fn system(ctx: &RewriteContext) -> RewriteSystem<'_> {
        let mut system = RewriteSystem::new(ctx);
        let rules = vec![(t(ctx, "a.b"), t(ctx, "c")), (t(ctx, "c.d"), t(ctx, "e"))];
        system.initialize(rules, ProtocolGraph::new()).unwrap();
        system
    }

    #[test]
    fn test_apply_rewrite_rule() {
        let ctx = RewriteContext::new();
        let system = system(&ctx);
        let mut term = t(&ctx, "x.a.b.y");
        let step = RewriteStep::for_rewrite_rule(1, rule(0), false).unwrap();
        let applied = step.apply_rewrite_rule(&mut term, &system).unwrap();
        assert_eq!(term.to_string(), "x.c.y");
        assert_eq!(applied.prefix.to_string(), "x");
        assert_eq!(applied.lhs.to_string(), "a.b");
        assert_eq!(applied.rhs.to_string(), "c");
        assert_eq!(applied.suffix.to_string(), "y");

        step.inverted().apply(&mut term, &system).unwrap();
        assert_eq!(term.to_string(), "x.a.b.y");
    }

    #[test]
    fn test_step_mismatch() {
        let ctx = RewriteContext::new();
        let system = system(&ctx);
        let mut term = t(&ctx, "a.b");
        let step = RewriteStep::for_rewrite_rule(1, rule(0), false).unwrap();
        assert!(matches!(
            step.apply(&mut term, &system),
            Err(Error::StepMismatch { offset: 1, .. })
        ));
        assert_eq!(term.to_string(), "a.b");
    }

    #[test]
    fn test_path_inverse_returns_to_start() {
        let ctx = RewriteContext::new();
        let system = system(&ctx);
        let mut path = RewritePath::new();
        path.add(RewriteStep::for_rewrite_rule(0, rule(0), false).unwrap());
        path.add(RewriteStep::for_rewrite_rule(0, rule(1), false).unwrap());

        let mut term = t(&ctx, "a.b.d");
        path.apply(&mut term, &system).unwrap();
        assert_eq!(term.to_string(), "e");
        path.inverted().apply(&mut term, &system).unwrap();
        assert_eq!(term.to_string(), "a.b.d");

        let mut looped = path.clone();
        looped.append(&path.inverted());
        assert_eq!(looped.len(), 4);
        assert!(looped.cancel_adjacent_inverses());
        assert!(looped.is_empty());
        assert!(!looped.cancel_adjacent_inverses());
    }

    #[test]
    fn test_cancel_keeps_unrelated_steps() {
        let a = RewriteStep::for_rewrite_rule(0, rule(0), false).unwrap();
        let b = RewriteStep::for_rewrite_rule(1, rule(0), false).unwrap();
        let mut path = RewritePath::new();
        path.add(a);
        path.add(b);
        path.add(a.inverted());
        assert!(!path.cancel_adjacent_inverses());
        assert_eq!(path.steps(), &[a, b, a.inverted()]);
    }

    #[test]
    fn test_adjustment() {
        let ctx = RewriteContext::new();
        let system = system(&ctx);
        let mut term = t(&ctx, "x.y.[concrete: Array<τ_0_0> with <z>]");
        let step = RewriteStep::for_adjustment(2, false).unwrap();
        let prefix = step.apply_adjustment(&mut term, &system).unwrap();
        assert_eq!(prefix.to_string(), "x.y");
        assert_eq!(term.to_string(), "x.y.[concrete: Array<τ_0_0> with <x.y.z>]");

        step.inverted().apply(&mut term, &system).unwrap();
        assert_eq!(term.to_string(), "x.y.[concrete: Array<τ_0_0> with <z>]");

        assert!(matches!(
            step.inverted().apply(&mut term, &system),
            Err(Error::PrefixMismatch { .. })
        ));

        let mut plain = t(&ctx, "x.y");
        assert!(matches!(
            step.apply(&mut plain, &system),
            Err(Error::MissingSubstitutions(_))
        ));
    }

    #[test]
    fn test_dump() {
        let ctx = RewriteContext::new();
        let system = system(&ctx);
        let mut path = RewritePath::new();
        path.add(RewriteStep::for_rewrite_rule(1, rule(0), false).unwrap());
        path.add(RewriteStep::for_rewrite_rule(0, rule(0), true).unwrap());
        let start = t(&ctx, "c.a.b");
        assert_eq!(
            path.dump(&start, &system).unwrap(),
            "c.(a.b => c) ⊗ (c => a.b).c"
        );
    }
}
