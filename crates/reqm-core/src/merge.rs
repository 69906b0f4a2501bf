//! Merging of associated types.
//!
//! Two protocols can declare associated types of the same name that are
//! later proven equal. A rule `X.[P2:T] => X.[P1:T]` records that proof.
//! Both spellings are then rewritten to the merged symbol `[P1&P2:T]`, and
//! every conformance of either spelling is copied over to it.

use crate::error::Result;
use crate::symbol::{Symbol, SymbolKind};
use crate::system::RewriteSystem;
use crate::term::{MutableTerm, Term};
use derive_new::new;
use tracing::debug;

/// A pending merge, queued when a rule of the form
/// `X.[P2:T] => X.[P1:T]` is added.
#[derive(new, Clone, PartialEq, Eq, Debug)]
pub struct MergedAssociatedType {
    /// The right hand side `X.[P1:T]` of the rule.
    pub rhs: Term,
    /// The final symbol `[P2:T]` of the left hand side.
    pub lhs_symbol: Symbol,
    /// The merged symbol `[P1&P2:T]`.
    pub merged_symbol: Symbol,
}

impl RewriteSystem<'_> {
    /// Queue a merge if `lhs => rhs` equates two associated types with the
    /// same name under a common prefix.
    pub(crate) fn check_merged_associated_type(&mut self, lhs: &Term, rhs: &Term) -> Result<()> {
        let (Some((lhs_last, lhs_prefix)), Some((rhs_last, rhs_prefix))) =
            (lhs.split_last(), rhs.split_last())
        else {
            return Ok(());
        };
        if lhs_prefix != rhs_prefix
            || lhs_last.kind() != SymbolKind::AssociatedType
            || rhs_last.kind() != SymbolKind::AssociatedType
            || lhs_last.associated_type_name() != rhs_last.associated_type_name()
        {
            return Ok(());
        }
        let merged_symbol =
            self.context()
                .merge_associated_types(lhs_last, rhs_last, self.protocols())?;
        debug!(%lhs, %rhs, merged = %merged_symbol, "queued associated type merge");
        self.merged_associated_types.push(MergedAssociatedType::new(
            rhs.clone(),
            lhs_last.clone(),
            merged_symbol,
        ));
        Ok(())
    }

    /// Add the rules introduced by every queued merge. Merging can queue
    /// further merges, which are processed in the same pass. Returns whether
    /// any rule was added.
    pub(crate) fn process_merged_associated_types(&mut self) -> Result<bool> {
        let mut progress = false;
        let mut i = 0;
        while i < self.merged_associated_types.len() {
            let merge = self.merged_associated_types[i].clone();
            i += 1;

            // X.[P1:T] => X.[P1&P2:T]
            let mut merged_term = MutableTerm::from(&merge.rhs);
            let rhs_symbol = merged_term.pop();
            merged_term.push(merge.merged_symbol.clone());
            progress |= self.add_rule(MutableTerm::from(&merge.rhs), merged_term, None)?;

            // [P1:T].[Q] => [P1:T] and [P2:T].[Q] => [P2:T] give rise to
            // [P1&P2:T].[Q] => [P1&P2:T].
            let mut conformances = Vec::new();
            for (_, rule) in self.rules() {
                if rule.is_deleted() {
                    continue;
                }
                let lhs = rule.lhs();
                if lhs.len() == 2
                    && lhs[1].kind() == SymbolKind::Protocol
                    && (lhs[0] == merge.lhs_symbol || Some(&lhs[0]) == rhs_symbol.as_ref())
                {
                    conformances.push(lhs[1].clone());
                }
            }
            for protocol in conformances {
                let lhs = MutableTerm::from(vec![merge.merged_symbol.clone(), protocol]);
                let rhs = MutableTerm::from(vec![merge.merged_symbol.clone()]);
                progress |= self.add_rule(lhs, rhs, None)?;
            }
        }
        self.merged_associated_types.clear();
        Ok(progress)
    }

    /// The number of merges queued since the last merge pass.
    pub fn pending_merges(&self) -> usize {
        self.merged_associated_types.len()
    }
}
