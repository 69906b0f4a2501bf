use crate::error::{Error, Result};
use crate::rule::Rule;
use la_arena::{Idx, RawIdx};
use std::fmt::{self, Display, Formatter};

/// Rule identifiers and step offsets each fit in 15 bits.
pub const INDEX_BITS: u32 = 15;

/// The largest value a [`RuleId`] or [`StepOffset`] can hold.
pub const MAX_INDEX: usize = (1 << INDEX_BITS) - 1;

fn checked_index(what: &'static str, value: usize) -> Result<u16> {
    match u16::try_from(value) {
        Ok(raw) if value <= MAX_INDEX => Ok(raw),
        _ => Err(Error::IndexOverflow {
            what,
            value,
            max: MAX_INDEX,
        }),
    }
}

/// The position of a rule in the rule table. Rules are never removed from the
/// table, so an id stays valid for the lifetime of its rewrite system.
#[derive(Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct RuleId(u16);

impl RuleId {
    pub fn new(x: usize) -> Result<RuleId> {
        checked_index("rule id", x).map(RuleId)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub(crate) fn to_idx(self) -> Idx<Rule> {
        Idx::from_raw(RawIdx::from(u32::from(self.0)))
    }

    pub(crate) fn from_idx(idx: Idx<Rule>) -> Result<RuleId> {
        let raw: u32 = idx.into_raw().into();
        RuleId::new(raw as usize)
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<RuleId> for usize {
    fn from(id: RuleId) -> usize {
        id.index()
    }
}

/// The position within a term where a rewrite step applies.
#[derive(Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct StepOffset(u16);

impl StepOffset {
    pub fn new(x: usize) -> Result<StepOffset> {
        checked_index("step offset", x).map(StepOffset)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl Display for StepOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<StepOffset> for usize {
    fn from(offset: StepOffset) -> usize {
        offset.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_id_bounds() {
        assert_eq!(RuleId::new(0).unwrap().index(), 0);
        assert_eq!(RuleId::new(MAX_INDEX).unwrap().index(), MAX_INDEX);
        assert_eq!(
            RuleId::new(MAX_INDEX + 1),
            Err(Error::IndexOverflow {
                what: "rule id",
                value: MAX_INDEX + 1,
                max: MAX_INDEX,
            })
        );
        assert!(RuleId::new(usize::MAX).is_err());
    }

    #[test]
    fn test_step_offset_bounds() {
        assert_eq!(StepOffset::new(17).unwrap().index(), 17);
        assert!(StepOffset::new(1 << 15).is_err());
    }

    #[test]
    fn test_rule_id_idx_roundtrip() {
        let id = RuleId::new(42).unwrap();
        assert_eq!(RuleId::from_idx(id.to_idx()).unwrap(), id);
    }

    #[test]
    fn test_display() {
        assert_eq!(RuleId::new(3).unwrap().to_string(), "#3");
        assert_eq!(StepOffset::new(3).unwrap().to_string(), "3");
    }
}
