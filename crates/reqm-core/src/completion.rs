//! Knuth-Bendix completion.
//!
//! Each round examines every pair of live rules whose left hand sides
//! overlap and which have not been examined before. Overlaps whose two
//! rewrites already reach the same normal form are recorded as homotopy
//! generators. The others become new rules. Completion stops when a round
//! adds nothing, or when it runs into the iteration or depth limit. Pairs
//! left over when a limit stops a run are kept for the next run.

use crate::common::RuleId;
use crate::error::{Error, Result};
use crate::rewrite_path::{RewritePath, RewriteStep};
use crate::rule::Rule;
use crate::system::RewriteSystem;
use crate::term::MutableTerm;
use derive_new::new;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, debug_span, error, trace};

/// How completion ended. Only `Success` means the rules are confluent; the
/// other results leave a usable system that may be missing rules.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CompletionResult {
    Success,
    MaxIterations,
    MaxDepth,
}

impl Display for CompletionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CompletionResult::Success => write!(f, "success"),
            CompletionResult::MaxIterations => write!(f, "maximum iterations reached"),
            CompletionResult::MaxDepth => write!(f, "maximum depth reached"),
        }
    }
}

/// Two terms that the same overlap rewrites to, and a path from `lhs` to
/// `rhs` through the overlapped term.
#[derive(new, Clone, Debug)]
pub(crate) struct CriticalPair {
    lhs: MutableTerm,
    rhs: MutableTerm,
    path: RewritePath,
}

impl RewriteSystem<'_> {
    /// Run completion for at most `max_iterations` rounds that add rules,
    /// stopping early once a rule's left hand side is longer than
    /// `max_depth`. Returns the result and the number of rounds used.
    pub fn compute_confluent_completion(
        &mut self,
        max_iterations: usize,
        max_depth: usize,
    ) -> Result<(CompletionResult, usize)> {
        if !self.is_initialized() {
            error!("completion of an uninitialized rewrite system");
            return Err(Error::NotInitialized);
        }

        let mut iterations = 0;
        loop {
            let span = debug_span!("completion", round = iterations);
            let _enter = span.enter();

            let mut pairs = std::mem::take(&mut self.pending_pairs);
            pairs.extend(self.compute_critical_pairs()?);
            debug!(pairs = pairs.len(), "resolving critical pairs");

            let mut progress = false;
            let mut pairs = pairs.into_iter();
            while let Some(pair) = pairs.next() {
                if !self.add_rule(pair.lhs, pair.rhs, Some(&pair.path))? {
                    continue;
                }
                if !progress {
                    if iterations == max_iterations {
                        debug!(iterations, "completion hit the iteration limit");
                        self.pending_pairs = pairs.collect();
                        return Ok((CompletionResult::MaxIterations, iterations));
                    }
                    progress = true;
                    iterations += 1;
                }
                if self.last_rule().map_or(0, Rule::depth) > max_depth {
                    debug!(iterations, max_depth, "completion hit the depth limit");
                    self.pending_pairs = pairs.collect();
                    return Ok((CompletionResult::MaxDepth, iterations));
                }
            }

            if self.process_merged_associated_types()? && !progress {
                if iterations == max_iterations {
                    debug!(iterations, "completion hit the iteration limit");
                    return Ok((CompletionResult::MaxIterations, iterations));
                }
                progress = true;
                iterations += 1;
            }

            if !progress {
                debug!(iterations, rules = self.len(), "completion succeeded");
                return Ok((CompletionResult::Success, iterations));
            }
        }
    }

    /// Find every overlap between pairs of live rules not checked before.
    fn compute_critical_pairs(&mut self) -> Result<Vec<CriticalPair>> {
        let mut pairs = Vec::new();
        for i in 0..self.len() {
            let lhs_id = RuleId::new(i)?;
            let lhs_rule = self.rule(lhs_id)?;
            if lhs_rule.is_deleted() {
                continue;
            }
            let lhs = lhs_rule.lhs().clone();

            // Every overlap offset of a newly checked pair is examined.
            let mut fresh = HashSet::new();
            for from in 0..lhs.len() {
                for rhs_id in self.trie_overlaps(&lhs[from..]) {
                    let rhs_rule = self.rule(rhs_id)?;
                    if rhs_rule.is_deleted() {
                        continue;
                    }
                    // At offset zero, a rule overlaps itself trivially, and
                    // a longer left hand side is found from the other side.
                    if from == 0 && (rhs_id == lhs_id || rhs_rule.depth() > lhs.len()) {
                        continue;
                    }
                    if !fresh.contains(&rhs_id) {
                        if !self.checked_overlaps.insert((lhs_id, rhs_id)) {
                            continue;
                        }
                        fresh.insert(rhs_id);
                    }
                    if let Some(pair) = self.compute_critical_pair(from, lhs_id, rhs_id)? {
                        pairs.push(pair);
                    }
                }
            }
        }
        Ok(pairs)
    }

    /// Compute the critical pair of the overlap where the left hand side of
    /// `rhs_id` begins at offset `from` in the left hand side of `lhs_id`.
    /// Returns `None` if both sides already have the same normal form, after
    /// recording the resolving loop as a homotopy generator.
    fn compute_critical_pair(
        &mut self,
        from: usize,
        lhs_id: RuleId,
        rhs_id: RuleId,
    ) -> Result<Option<CriticalPair>> {
        let lhs = self.rule(lhs_id)?.clone();
        let rhs = self.rule(rhs_id)?.clone();
        let mut path = RewritePath::new();

        let (x, t) = if from + rhs.depth() <= lhs.depth() {
            // lhs = T.U.V => X, rhs = U => Y. The overlap T.U.V rewrites to
            // both X and T.Y.V.
            let x = MutableTerm::from(lhs.rhs());
            let mut t = MutableTerm::from(lhs.lhs());
            t.rewrite_subterm(from, rhs.depth(), rhs.rhs());

            path.add(RewriteStep::for_rewrite_rule(0, lhs_id, true)?);
            path.add(RewriteStep::for_rewrite_rule(from, rhs_id, false)?);
            (x, t)
        } else {
            // lhs = T.U => X, rhs = U.V => Y. The overlap T.U.V rewrites to
            // both X.V and T.Y.
            let prefix = &lhs.lhs()[..from];
            let v = &rhs.lhs()[lhs.depth() - from..];
            let mut xv = MutableTerm::from(lhs.rhs());
            xv.extend_from_slice(v);
            let mut ty = MutableTerm::from(prefix);
            ty.extend_from_slice(rhs.rhs());

            path.add(RewriteStep::for_rewrite_rule(0, lhs_id, true)?);
            // Substitutions of a trailing superclass or concrete type symbol
            // in X.V are relative to T.
            let adjusted = match xv.last() {
                Some(last) if last.is_superclass_or_concrete_type() => {
                    Some(last.prepend_prefix_to_concrete_substitutions(prefix, self.context()))
                }
                _ => None,
            };
            if let Some(adjusted) = adjusted {
                path.add(RewriteStep::for_adjustment(from, true)?);
                if let Some(last) = xv.last_mut() {
                    *last = adjusted;
                }
            }
            path.add(RewriteStep::for_rewrite_rule(from, rhs_id, false)?);
            (xv, ty)
        };

        let mut x_simplified = x.clone();
        let mut x_path = RewritePath::new();
        self.simplify(&mut x_simplified, Some(&mut x_path))?;
        let mut t_simplified = t.clone();
        let mut t_path = RewritePath::new();
        self.simplify(&mut t_simplified, Some(&mut t_path))?;

        if x_simplified == t_simplified {
            trace!(%lhs, %rhs, from, "critical pair resolved");
            // x -> t -> normal form -> x
            let mut loop_path = path;
            loop_path.append(&t_path);
            loop_path.append(&x_path.inverted());
            let basepoint = self.context().term(&x);
            self.record_homotopy_generator(basepoint, loop_path);
            return Ok(None);
        }

        trace!(%lhs, %rhs, from, %x, %t, "critical pair");
        Ok(Some(CriticalPair::new(x, t, path)))
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

    fn system<'a>(ctx: &'a RewriteContext, rules: &[(&str, &str)]) -> RewriteSystem<'a> {
        let mut system = RewriteSystem::new(ctx);
        let rules = rules.iter().map(|(l, r)| (t(ctx, l), t(ctx, r))).collect();
        system.initialize(rules, ProtocolGraph::new()).unwrap();
        system
    }

    fn normal_form(system: &RewriteSystem<'_>, ctx: &RewriteContext, text: &str) -> String {
        let mut term = t(ctx, text);
        system.simplify(&mut term, None).unwrap();
        term.to_string()
    }

    #[test]
    fn test_uninitialized() {
        let ctx = RewriteContext::new();
        let mut system = RewriteSystem::new(&ctx);
        assert_eq!(
            system.compute_confluent_completion(10, 10),
            Err(Error::NotInitialized)
        );
    }

    #[test]
    fn test_no_overlaps() {
        let ctx = RewriteContext::new();
        let mut system = system(&ctx, &[("a.b", "c"), ("c.d", "e")]);
        let result = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result, (CompletionResult::Success, 0));
        assert_eq!(normal_form(&system, &ctx, "a.b.d"), "e");
    }

    #[test]
    fn test_overlap_adds_rule() {
        let ctx = RewriteContext::new();
        // a.b.d rewrites to both c.d and a.e.
        let mut system = system(&ctx, &[("a.b", "c"), ("b.d", "e")]);
        let result = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result, (CompletionResult::Success, 1));
        assert!(system
            .rules()
            .any(|(_, rule)| rule.to_string() == "c.d => a.e"));
        assert_eq!(normal_form(&system, &ctx, "a.b.d"), "a.e");
        assert_eq!(normal_form(&system, &ctx, "c.d"), "a.e");
        system.verify_rewrite_rules().unwrap();
        system.verify_homotopy_generators().unwrap();
    }

    #[test]
    fn test_resolved_overlap_records_generator() {
        let ctx = RewriteContext::new();
        // Both ways of rewriting a.b.c end at a.e.
        let mut system = system(&ctx, &[("a.b", "d"), ("b.c", "e"), ("a.e", "d.c")]);
        let generators = system.homotopy_generators().len();
        let result = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result, (CompletionResult::Success, 0));
        assert!(system.homotopy_generators().len() > generators);
        system.verify_homotopy_generators().unwrap();
    }

    #[test]
    fn test_contained_overlap() {
        let ctx = RewriteContext::new();
        // b is contained in a.b.c.
        let mut system = RewriteSystem::new(&ctx);
        system.initialize(vec![], ProtocolGraph::new()).unwrap();
        let abc = parse_term(&ctx, "a.b.c").unwrap();
        let d = parse_term(&ctx, "d").unwrap();
        system.push_rule(abc, d).unwrap();
        system.add_rule(t(&ctx, "b"), t(&ctx, "a"), None).unwrap();
        let result = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result.0, CompletionResult::Success);
        assert_eq!(normal_form(&system, &ctx, "a.b.c"), "d");
        assert_eq!(normal_form(&system, &ctx, "a.a.c"), "d");
        system.verify_homotopy_generators().unwrap();
    }

    #[test]
    fn test_braid_relation_is_bounded() {
        let ctx = RewriteContext::new();
        // The monoid <a, b | aba = bab> has no finite complete system under
        // this order.
        let mut system = system(&ctx, &[("b.a.b", "a.b.a")]);
        let (result, iterations) = system.compute_confluent_completion(20, 8).unwrap();
        assert_ne!(result, CompletionResult::Success);
        assert!(iterations <= 20);
        system.verify_rewrite_rules().unwrap();
    }

    #[test]
    fn test_iteration_limit() {
        let ctx = RewriteContext::new();
        let mut system = system(&ctx, &[("b.a.b", "a.b.a")]);
        let (result, iterations) = system.compute_confluent_completion(1, 100).unwrap();
        assert_eq!(result, CompletionResult::MaxIterations);
        assert_eq!(iterations, 1);
    }

    #[test]
    fn test_depth_limit() {
        let ctx = RewriteContext::new();
        let mut system = system(&ctx, &[("b.a.b", "a.b.a")]);
        let (result, _) = system.compute_confluent_completion(1000, 3).unwrap();
        assert_eq!(result, CompletionResult::MaxDepth);
        assert!(system.last_rule().unwrap().depth() > 3);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let ctx = RewriteContext::new();
        let mut system = system(&ctx, &[("a.b", "c"), ("b.d", "e")]);
        system.compute_confluent_completion(100, 10).unwrap();
        let rules = system.len();
        let result = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result, (CompletionResult::Success, 0));
        assert_eq!(system.len(), rules);
    }

    #[test]
    fn test_resume_after_iteration_limit() {
        let ctx = RewriteContext::new();
        // a.b.d and f.g.i are two independent overlaps found in one round.
        let mut system = system(&ctx, &[("a.b", "c"), ("b.d", "e"), ("f.g", "h"), ("g.i", "j")]);
        let (result, _) = system.compute_confluent_completion(0, 10).unwrap();
        assert_eq!(result, CompletionResult::MaxIterations);

        let result = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result, (CompletionResult::Success, 1));
        assert_eq!(normal_form(&system, &ctx, "h.i"), normal_form(&system, &ctx, "f.j"));
        assert_eq!(normal_form(&system, &ctx, "c.d"), normal_form(&system, &ctx, "a.e"));
        system.verify_rewrite_rules().unwrap();
        system.verify_homotopy_generators().unwrap();
    }

    #[test]
    fn test_resume_after_depth_limit() {
        let ctx = RewriteContext::new();
        let mut system = system(&ctx, &[("a.b", "c"), ("b.d", "e"), ("f.g", "h"), ("g.i", "j")]);
        // Both derived rules have a left hand side of length two.
        let (result, _) = system.compute_confluent_completion(100, 1).unwrap();
        assert_eq!(result, CompletionResult::MaxDepth);

        let (result, _) = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result, CompletionResult::Success);
        assert_eq!(normal_form(&system, &ctx, "h.i"), normal_form(&system, &ctx, "f.j"));
        system.verify_homotopy_generators().unwrap();
    }

    #[test]
    fn test_overlap_under_concrete_type() {
        let ctx = RewriteContext::new();
        // x.a.[concrete: Array<τ_0_0> with <b>] rewrites to both
        // x.[concrete: Array<τ_0_0> with <b>] and x.a, and the substitution
        // gains the prefix x.
        let mut system = system(
            &ctx,
            &[("x.a", "x"), ("a.[concrete: Array<τ_0_0> with <b>]", "a")],
        );
        let result = system.compute_confluent_completion(100, 10).unwrap();
        assert_eq!(result, (CompletionResult::Success, 1));
        assert!(system
            .rules()
            .any(|(_, rule)| rule.to_string() == "x.[concrete: Array<τ_0_0> with <x.b>] => x"));
        system.verify_rewrite_rules().unwrap();
        system.verify_homotopy_generators().unwrap();
    }
}
