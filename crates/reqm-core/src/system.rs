//! The rewrite system: the rule table, the lookup trie, simplification and
//! rule management. Completion lives in [`crate::completion`], associated
//! type merging in [`crate::merge`], and verification in [`crate::verify`].

use crate::common::RuleId;
use crate::completion::CriticalPair;
use crate::context::RewriteContext;
use crate::error::{Error, Result};
use crate::merge::MergedAssociatedType;
use crate::protocol_graph::ProtocolGraph;
use crate::rewrite_path::{HomotopyGenerator, RewritePath, RewriteStep};
use crate::rule::Rule;
use crate::symbol::Symbol;
use crate::term::{MutableTerm, Term};
use crate::trie::Trie;
use elegance::{Printer, Render};
use la_arena::Arena;
use reqm_support::{dump_to_str, print_block, State, PP};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, error, trace};

pub struct RewriteSystem<'ctx> {
    context: &'ctx RewriteContext,
    protocols: ProtocolGraph,
    /// Append-only. Deleted rules stay in place so that rule ids are stable.
    rules: Arena<Rule>,
    /// Maps the left hand side of each rule to its id. Entries of deleted
    /// rules stay until superseded and are skipped at lookup.
    trie: Trie<RuleId>,
    pub(crate) merged_associated_types: Vec<MergedAssociatedType>,
    /// Pairs of rules whose overlaps completion has already examined.
    pub(crate) checked_overlaps: HashSet<(RuleId, RuleId)>,
    /// Critical pairs of checked overlaps that a stopped completion run did
    /// not get to. The next run resolves them first.
    pub(crate) pending_pairs: Vec<CriticalPair>,
    homotopy_generators: Vec<HomotopyGenerator>,
    initialized: bool,
}

impl<'ctx> RewriteSystem<'ctx> {
    pub fn new(context: &'ctx RewriteContext) -> RewriteSystem<'ctx> {
        RewriteSystem {
            context,
            protocols: ProtocolGraph::new(),
            rules: Arena::new(),
            trie: Trie::new(),
            merged_associated_types: Vec::new(),
            checked_overlaps: HashSet::new(),
            pending_pairs: Vec::new(),
            homotopy_generators: Vec::new(),
            initialized: false,
        }
    }

    pub fn context(&self) -> &'ctx RewriteContext {
        self.context
    }

    pub fn protocols(&self) -> &ProtocolGraph {
        &self.protocols
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Install the protocol graph and the initial rules. Each pair is
    /// oriented before it is added. A system is initialized exactly once.
    pub fn initialize(
        &mut self,
        rules: Vec<(MutableTerm, MutableTerm)>,
        protocols: ProtocolGraph,
    ) -> Result<()> {
        if self.initialized {
            error!("rewrite system initialized twice");
            return Err(Error::AlreadyInitialized);
        }
        self.initialized = true;
        self.protocols = protocols;
        debug!(rules = rules.len(), protocols = self.protocols.len(), "initializing");
        for (lhs, rhs) in rules {
            self.add_rule(lhs, rhs, None)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.len() == 0
    }

    pub fn rule(&self, id: RuleId) -> Result<&Rule> {
        if id.index() >= self.rules.len() {
            error!(%id, "unknown rule");
            return Err(Error::UnknownRule(id));
        }
        Ok(&self.rules[id.to_idx()])
    }

    /// Every rule, deleted or not, with its id.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> + '_ {
        self.rules
            .iter()
            .filter_map(|(idx, rule)| RuleId::from_idx(idx).ok().map(|id| (id, rule)))
    }

    pub fn homotopy_generators(&self) -> &[HomotopyGenerator] {
        &self.homotopy_generators
    }

    pub(crate) fn last_rule(&self) -> Option<&Rule> {
        let last = self.rules.len().checked_sub(1)?;
        RuleId::new(last).ok().map(|id| &self.rules[id.to_idx()])
    }

    pub(crate) fn record_homotopy_generator(&mut self, basepoint: Term, path: RewritePath) {
        trace!(%basepoint, steps = path.len(), "homotopy generator");
        self.homotopy_generators
            .push(HomotopyGenerator::new(basepoint, path));
    }

    pub fn mark_deleted(&mut self, id: RuleId) -> Result<()> {
        self.rule(id)?;
        self.rules[id.to_idx()].mark_deleted(id)?;
        debug!(%id, rule = %self.rules[id.to_idx()], "deleted rule");
        Ok(())
    }

    /// Add the equation `lhs == rhs`, proven by `path` if given. Both sides
    /// are simplified first; the greater one becomes the left hand side.
    /// Returns false if both sides have the same normal form.
    pub fn add_rule(
        &mut self,
        mut lhs: MutableTerm,
        mut rhs: MutableTerm,
        path: Option<&RewritePath>,
    ) -> Result<bool> {
        if lhs.is_empty() || rhs.is_empty() {
            error!(%lhs, %rhs, "rule with an empty side");
            return Err(Error::EmptyTerm);
        }

        let mut lhs_path = RewritePath::new();
        self.simplify(&mut lhs, Some(&mut lhs_path))?;
        let mut rhs_path = RewritePath::new();
        self.simplify(&mut rhs, Some(&mut rhs_path))?;

        // A path from the simplified lhs to the simplified rhs.
        let mut loop_path = RewritePath::new();
        if let Some(path) = path {
            loop_path = lhs_path.inverted();
            loop_path.append(path);
            loop_path.append(&rhs_path);
        }

        match lhs.compare(&rhs, &self.protocols) {
            Ordering::Equal => {
                if path.is_some() {
                    let basepoint = self.context.term(&lhs);
                    self.record_homotopy_generator(basepoint, loop_path);
                }
                return Ok(false);
            }
            Ordering::Less => {
                std::mem::swap(&mut lhs, &mut rhs);
                loop_path.invert();
            }
            Ordering::Greater => {}
        }

        let lhs = self.context.term(&lhs);
        let rhs = self.context.term(&rhs);
        let id = self.push_rule(lhs.clone(), rhs.clone())?;

        if path.is_some() {
            loop_path.add(RewriteStep::for_rewrite_rule(0, id, true)?);
            self.record_homotopy_generator(lhs.clone(), loop_path);
        }

        self.check_merged_associated_type(&lhs, &rhs)?;
        Ok(true)
    }

    /// Append an oriented rule whose sides are already in normal form.
    pub(crate) fn push_rule(&mut self, lhs: Term, rhs: Term) -> Result<RuleId> {
        let rule = Rule::new(lhs.clone(), rhs, &self.protocols)?;
        let id = RuleId::new(self.rules.len())?;
        if let Some(existing) = self.trie.get(&lhs) {
            if !self.rules[existing.to_idx()].is_deleted() {
                error!(%existing, %lhs, "duplicate rule");
                return Err(Error::DuplicateRule(lhs.to_string()));
            }
        }
        self.rules.alloc(rule);
        if let Some(old) = self.trie.insert(&lhs, id) {
            trace!(%old, %id, "superseded trie entry");
        }
        debug!(%id, rule = %self.rules[id.to_idx()], "added rule");
        Ok(id)
    }

    /// Rules whose left hand side is a prefix of `key` or extends `key`.
    pub(crate) fn trie_overlaps(&self, key: &[Symbol]) -> Vec<RuleId> {
        self.trie.find_all(key)
    }

    /// The rule indexed under exactly `key`, live or not.
    pub(crate) fn trie_lookup(&self, key: &[Symbol]) -> Option<RuleId> {
        self.trie.get(key)
    }

    fn is_live(&self, id: RuleId) -> bool {
        !self.rules[id.to_idx()].is_deleted()
    }

    /// Rewrite `term` to its normal form, appending each step to `path`.
    ///
    /// Each step applies the live rule with the lowest id among those whose
    /// left hand side occurs at the leftmost possible offset. Returns whether
    /// the term changed.
    pub fn simplify(
        &self,
        term: &mut MutableTerm,
        mut path: Option<&mut RewritePath>,
    ) -> Result<bool> {
        let mut changed = false;
        'rewrite: loop {
            for offset in 0..term.len() {
                let candidate = self
                    .trie
                    .matches(&term[offset..])
                    .into_iter()
                    .filter(|id| self.is_live(*id))
                    .min();
                if let Some(id) = candidate {
                    let step = RewriteStep::for_rewrite_rule(offset, id, false)?;
                    step.apply_rewrite_rule(term, self)?;
                    trace!(%id, offset, %term, "simplified");
                    if let Some(path) = path.as_deref_mut() {
                        path.add(step);
                    }
                    changed = true;
                    continue 'rewrite;
                }
            }
            return Ok(changed);
        }
    }

    /// Simplify every substitution of a superclass or concrete type symbol.
    pub fn simplify_substitutions(&self, symbol: &Symbol) -> Result<Symbol> {
        symbol.transform_concrete_substitutions(|substitution| {
            let mut term = MutableTerm::from(substitution);
            if self.simplify(&mut term, None)? {
                Ok(self.context.term(&term))
            } else {
                Ok(substitution.clone())
            }
        })
    }

    /// Whether two terms have the same normal form.
    pub fn are_equivalent(&self, lhs: &[Symbol], rhs: &[Symbol]) -> Result<bool> {
        let mut lhs = MutableTerm::from(lhs);
        let mut rhs = MutableTerm::from(rhs);
        self.simplify(&mut lhs, None)?;
        self.simplify(&mut rhs, None)?;
        Ok(lhs == rhs)
    }

    /// Whether some live rule other than `id` rewrites a subterm of `lhs`.
    fn can_reduce_lhs(&self, id: RuleId, lhs: &Term) -> bool {
        (0..lhs.len()).any(|offset| {
            self.trie
                .find(&lhs[offset..], |other| other != id && self.is_live(other))
                .is_some()
        })
    }

    /// Remove redundancy from a completed system. Rules whose left hand side
    /// can be reduced by another rule are deleted. Rules whose right hand
    /// side can be reduced are replaced by a rule with the reduced right hand
    /// side.
    pub fn simplify_rewrite_system(&mut self) -> Result<()> {
        for i in 0..self.rules.len() {
            let id = RuleId::new(i)?;
            let rule = self.rule(id)?.clone();
            if rule.is_deleted() {
                continue;
            }

            if self.can_reduce_lhs(id, rule.lhs()) {
                self.mark_deleted(id)?;
                continue;
            }

            let mut rhs = MutableTerm::from(rule.rhs());
            let mut rhs_path = RewritePath::new();
            if !self.simplify(&mut rhs, Some(&mut rhs_path))? {
                continue;
            }

            self.mark_deleted(id)?;
            let rhs = self.context.term(&rhs);
            let new_id = self.push_rule(rule.lhs().clone(), rhs)?;

            let mut loop_path = RewritePath::new();
            loop_path.add(RewriteStep::for_rewrite_rule(0, id, false)?);
            loop_path.append(&rhs_path);
            loop_path.add(RewriteStep::for_rewrite_rule(0, new_id, true)?);
            self.record_homotopy_generator(rule.lhs().clone(), loop_path);
        }
        Ok(())
    }

    pub fn dump(&self) {
        reqm_support::dump(self);
    }
}

impl PP for RewriteSystem<'_> {
    fn print<R: Render>(
        &self,
        _st: State,
        p: &mut Printer<R>,
    ) -> std::result::Result<(), R::Error> {
        print_block(p, "Rewrite system", self.rules().map(|(_, rule)| rule.to_string()))?;
        p.hard_break()?;
        let generators = self.homotopy_generators.iter().map(|generator| {
            generator
                .dump(self)
                .unwrap_or_else(|err| format!("{}: <{err}>", generator.basepoint))
        });
        print_block(p, "Homotopy generators", generators)
    }
}

impl Display for RewriteSystem<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&dump_to_str(self))
    }
}
