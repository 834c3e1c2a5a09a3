//! Predicate identifiers and the (pass, phase) decision table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which allocation pass a predicate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// Initial allocation.
    First,
    /// Re-optimization under per-block width ceilings.
    Second,
}

/// Loop phase whose composite condition is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Balancing,
    Expansion,
}

/// The kind of test a predicate performs, independent of pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PredicateKind {
    /// One more facing fits within the run, net of sibling reservations.
    SpaceAvailable,
    /// The run can hold the widest sibling sub-group plus dividers.
    OverallSpace,
    /// Growth does not push this run past the block's widest run.
    BalanceFeasible,
    /// Lowest score among same-run candidates.
    BestInLocalGroup,
    /// Every run holding the block has a placement with space.
    AllShelvesCovered,
    /// Lowest score among same-run candidates on covered blocks.
    BestExpansionItem,
    /// Lowest aggregate block score among sibling blocks.
    BestBlockToExpand,
}

/// A named predicate: a kind evaluated under one pass's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    pub kind: PredicateKind,
    pub pass: Pass,
}

impl Predicate {
    pub const A: Self = Self::new(PredicateKind::SpaceAvailable, Pass::First);
    pub const B: Self = Self::new(PredicateKind::BalanceFeasible, Pass::First);
    pub const C: Self = Self::new(PredicateKind::BestInLocalGroup, Pass::First);
    pub const D: Self = Self::new(PredicateKind::AllShelvesCovered, Pass::First);
    pub const E: Self = Self::new(PredicateKind::BestExpansionItem, Pass::First);
    pub const F: Self = Self::new(PredicateKind::BestBlockToExpand, Pass::First);
    pub const G: Self = Self::new(PredicateKind::OverallSpace, Pass::First);

    pub const I: Self = Self::new(PredicateKind::SpaceAvailable, Pass::Second);
    pub const J: Self = Self::new(PredicateKind::BalanceFeasible, Pass::Second);
    pub const K: Self = Self::new(PredicateKind::BestInLocalGroup, Pass::Second);
    pub const L: Self = Self::new(PredicateKind::AllShelvesCovered, Pass::Second);
    pub const M: Self = Self::new(PredicateKind::BestBlockToExpand, Pass::Second);
    pub const N: Self = Self::new(PredicateKind::BestExpansionItem, Pass::Second);

    /// Every named predicate, in letter order.
    pub const ALL: [Self; 13] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::I,
        Self::J,
        Self::K,
        Self::L,
        Self::M,
        Self::N,
    ];

    pub const fn new(kind: PredicateKind, pass: Pass) -> Self {
        Self { kind, pass }
    }

    /// Space predicate for this predicate's pass.
    pub fn space(pass: Pass) -> Self {
        Self::new(PredicateKind::SpaceAvailable, pass)
    }

    /// Predicates a same-run competitor must satisfy to be compared
    /// against in the minimum-score tests.
    ///
    /// Only meaningful for the ranking kinds; other kinds return an
    /// empty filter.
    pub fn candidate_filter(self) -> &'static [Predicate] {
        use PredicateKind::*;
        match (self.kind, self.pass) {
            (BestInLocalGroup, Pass::First) => &[Self::A, Self::B],
            (BestInLocalGroup, Pass::Second) => &[Self::I],
            (BestExpansionItem | BestBlockToExpand, Pass::First) => &[Self::A, Self::D],
            (BestExpansionItem | BestBlockToExpand, Pass::Second) => &[Self::I, Self::L],
            _ => &[],
        }
    }

    /// Single-letter name used by diagnostic tooling.
    pub fn letter(self) -> char {
        use PredicateKind::*;
        match (self.kind, self.pass) {
            (OverallSpace, _) => 'G',
            (SpaceAvailable, Pass::First) => 'A',
            (BalanceFeasible, Pass::First) => 'B',
            (BestInLocalGroup, Pass::First) => 'C',
            (AllShelvesCovered, Pass::First) => 'D',
            (BestExpansionItem, Pass::First) => 'E',
            (BestBlockToExpand, Pass::First) => 'F',
            (SpaceAvailable, Pass::Second) => 'I',
            (BalanceFeasible, Pass::Second) => 'J',
            (BestInLocalGroup, Pass::Second) => 'K',
            (AllShelvesCovered, Pass::Second) => 'L',
            (BestBlockToExpand, Pass::Second) => 'M',
            (BestExpansionItem, Pass::Second) => 'N',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.letter() == letter.to_ascii_uppercase())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Composite condition for one (pass, phase) cell of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    pub pass: Pass,
    pub phase: Phase,
}

impl Condition {
    pub const fn new(pass: Pass, phase: Phase) -> Self {
        Self { pass, phase }
    }

    /// Predicates that must all hold.
    pub fn predicates(self) -> &'static [Predicate] {
        match (self.pass, self.phase) {
            (Pass::First, Phase::Balancing) => &[Predicate::A, Predicate::B, Predicate::C],
            (Pass::First, Phase::Expansion) => {
                &[Predicate::A, Predicate::D, Predicate::E, Predicate::F]
            }
            (Pass::Second, Phase::Balancing) => &[Predicate::I, Predicate::J, Predicate::N],
            (Pass::Second, Phase::Expansion) => {
                &[Predicate::I, Predicate::L, Predicate::K, Predicate::M]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_round_trip() {
        for p in Predicate::ALL {
            assert_eq!(Predicate::from_letter(p.letter()), Some(p));
        }
        assert_eq!(Predicate::from_letter('h'), None);
        assert_eq!(Predicate::from_letter('n'), Some(Predicate::N));
    }

    #[test]
    fn test_decision_table_passes_do_not_mix() {
        for pass in [Pass::First, Pass::Second] {
            for phase in [Phase::Balancing, Phase::Expansion] {
                let preds = Condition::new(pass, phase).predicates();
                assert!(preds.iter().all(|p| p.pass == pass));
                assert_eq!(preds[0], Predicate::space(pass));
            }
        }
    }

    #[test]
    fn test_candidate_filters() {
        assert_eq!(Predicate::C.candidate_filter(), &[Predicate::A, Predicate::B]);
        assert_eq!(Predicate::K.candidate_filter(), &[Predicate::I]);
        assert_eq!(Predicate::E.candidate_filter(), Predicate::F.candidate_filter());
        assert_eq!(Predicate::N.candidate_filter(), &[Predicate::I, Predicate::L]);
        assert!(Predicate::A.candidate_filter().is_empty());
    }
}
