use crate::error::{Error, Result};
use crate::rule::Rule;
use crate::symbol::{Symbol, SymbolKind};
use crate::system::RewriteSystem;
use crate::term::MutableTerm;
use std::cmp::Ordering;
use tracing::{debug, error};

fn invalid(rule: &Rule, reason: &'static str) -> Error {
    error!(%rule, reason, "invalid rewrite rule");
    Error::InvalidRule {
        rule: rule.to_string(),
        reason,
    }
}

fn is_constraint(symbol: &Symbol) -> bool {
    matches!(
        symbol.kind(),
        SymbolKind::Layout | SymbolKind::Superclass | SymbolKind::ConcreteType
    )
}

impl RewriteSystem<'_> {
    /// Check that every live rule is oriented, has the shape of a
    /// requirement, and is the trie entry for its left hand side.
    pub fn verify_rewrite_rules(&self) -> Result<()> {
        for (id, rule) in self.rules() {
            if rule.is_deleted() {
                continue;
            }

            if rule.lhs().compare(rule.rhs(), self.protocols()) != Ordering::Greater {
                error!(%id, %rule, "misoriented rule");
                return Err(Error::MisorientedRule {
                    lhs: rule.lhs().to_string(),
                    rhs: rule.rhs().to_string(),
                });
            }

            let lhs = rule.lhs();
            let last = lhs.len() - 1;
            for (index, symbol) in lhs.iter().enumerate() {
                if index != last && is_constraint(symbol) {
                    return Err(invalid(rule, "constraint symbol before the end of the lhs"));
                }
                if index != 0 && symbol.kind() == SymbolKind::GenericParam {
                    return Err(invalid(rule, "generic parameter after the start of the lhs"));
                }
                if index != 0 && index != last && symbol.kind() == SymbolKind::Protocol {
                    return Err(invalid(rule, "protocol symbol in the middle of the lhs"));
                }
            }

            for (index, symbol) in rule.rhs().iter().enumerate() {
                if is_constraint(symbol) {
                    return Err(invalid(rule, "constraint symbol in the rhs"));
                }
                if index != 0 && symbol.kind() == SymbolKind::GenericParam {
                    return Err(invalid(rule, "generic parameter after the start of the rhs"));
                }
                if index != 0 && symbol.kind() == SymbolKind::Protocol {
                    return Err(invalid(rule, "protocol symbol after the start of the rhs"));
                }
            }

            if self.trie_lookup(lhs) != Some(id) {
                return Err(invalid(rule, "lhs is not indexed"));
            }
        }
        debug!(rules = self.len(), "verified rewrite rules");
        Ok(())
    }

    /// Replay every homotopy generator from its basepoint and check that it
    /// comes back to the basepoint.
    pub fn verify_homotopy_generators(&self) -> Result<()> {
        for generator in self.homotopy_generators() {
            let mut term = MutableTerm::from(&generator.basepoint);
            generator.path.apply(&mut term, self)?;
            if term[..] != generator.basepoint[..] {
                error!(basepoint = %generator.basepoint, end = %term, "homotopy generator is not a loop");
                return Err(Error::HomotopyGeneratorMismatch {
                    basepoint: generator.basepoint.to_string(),
                    end: term.to_string(),
                });
            }
        }
        debug!(
            generators = self.homotopy_generators().len(),
            "verified homotopy generators"
        );
        Ok(())
    }
}
