//! Eligibility queries for external tooling.
//!
//! Answers "why is this placement (not) growing" without running the
//! loop: a predicate letter (`A`–`G`, `I`–`N`), a composite condition
//! (`Balancing`, `Expansion`) or the placement's `Score`.

use std::fmt;
use std::str::FromStr;

use crate::config::ShelfConfig;
use crate::constraints::{ConstraintEvaluator, ConstraintSettings, Pass, Phase, Predicate};
use crate::error::{Result, ShelfError};
use crate::layout::{Layout, PlacementId};
use crate::reoptimize::CeilingTable;
use crate::scoring::{PlacementScorer, UrgencyScorer};

/// A parsed query identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateQuery {
    Predicate(Predicate),
    Condition(Phase),
    Score,
}

impl FromStr for PredicateQuery {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "balancing" => return Ok(Self::Condition(Phase::Balancing)),
            "expansion" => return Ok(Self::Condition(Phase::Expansion)),
            "score" => return Ok(Self::Score),
            _ => {}
        }
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Predicate::from_letter(c)
                .map(Self::Predicate)
                .ok_or_else(|| ShelfError::UnknownPredicate(s.to_string())),
            _ => Err(ShelfError::UnknownPredicate(s.to_string())),
        }
    }
}

/// Value of a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticValue {
    Bool(bool),
    Score(f64),
}

impl DiagnosticValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            Self::Score(_) => None,
        }
    }

    pub fn as_score(self) -> Option<f64> {
        match self {
            Self::Score(s) => Some(s),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for DiagnosticValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Score(s) => write!(f, "{s:.6}"),
        }
    }
}

/// Query session over one layout state.
///
/// Results are memoized for the lifetime of the session, which borrows
/// the layout and so cannot observe a facing change.
///
/// # Usage
///
/// ```ignore
/// let mut diag = Diagnostics::new(&layout, &config, None);
/// let eligible = diag.query(PlacementId(3), "Expansion", Pass::First)?;
/// ```
pub struct Diagnostics<'a> {
    evaluator: ConstraintEvaluator<'a>,
}

impl<'a> Diagnostics<'a> {
    /// Uses the default [`UrgencyScorer`].
    pub fn new(
        layout: &'a Layout,
        config: &ShelfConfig,
        ceilings: Option<&'a CeilingTable>,
    ) -> Self {
        Self::with_scorer(layout, &UrgencyScorer, config, ceilings)
    }

    pub fn with_scorer(
        layout: &'a Layout,
        scorer: &'a dyn PlacementScorer,
        config: &ShelfConfig,
        ceilings: Option<&'a CeilingTable>,
    ) -> Self {
        Self {
            evaluator: ConstraintEvaluator::new(
                layout,
                scorer,
                ConstraintSettings::from(config),
                ceilings,
                0,
            ),
        }
    }

    /// Evaluates `query` for one placement.
    ///
    /// `pass` selects the predicate set for `Balancing`/`Expansion`;
    /// letters already carry their pass and ignore it.
    pub fn query(&mut self, id: PlacementId, query: &str, pass: Pass) -> Result<DiagnosticValue> {
        let parsed: PredicateQuery = query.parse()?;
        self.evaluate(id, parsed, pass)
    }

    pub fn evaluate(
        &mut self,
        id: PlacementId,
        query: PredicateQuery,
        pass: Pass,
    ) -> Result<DiagnosticValue> {
        if self.evaluator.index().layout().placement(id).is_none() {
            return Err(ShelfError::UnknownPlacement(id));
        }
        let value = match query {
            PredicateQuery::Predicate(p) => DiagnosticValue::Bool(self.evaluator.check(id, p)),
            PredicateQuery::Condition(phase) => {
                DiagnosticValue::Bool(self.evaluator.condition(id, pass, phase))
            }
            PredicateQuery::Score => DiagnosticValue::Score(self.evaluator.score(id)),
        };
        log::trace!("{id} {query:?} ({pass:?}) = {value}");
        Ok(value)
    }

    /// Every predicate letter of `pass` for one placement, in table order.
    pub fn explain(&mut self, id: PlacementId, pass: Pass) -> Result<Vec<(char, bool)>> {
        let mut out = Vec::new();
        for p in Predicate::ALL.into_iter().filter(|p| p.pass == pass) {
            let value = self.evaluate(id, PredicateQuery::Predicate(p), pass)?;
            out.push((p.letter(), value.as_bool().unwrap_or(false)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Classification, Fixture, FixtureId, Placement, Product};

    fn layout() -> Layout {
        let mut l = Layout::new("t");
        l.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 0.5));
        for i in 0..3u32 {
            let id = format!("{}", i + 1);
            l.add_product(
                Product::new(id.as_str(), 0.1)
                    .with_movement(10.0)
                    .with_classification(Classification::new("soda", "cola")),
            );
            l.add_placement(Placement::new(PlacementId(i), FixtureId(0), id).at(i as f64 * 0.1));
        }
        l
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("A".parse::<PredicateQuery>().unwrap(), PredicateQuery::Predicate(Predicate::A));
        assert_eq!("n".parse::<PredicateQuery>().unwrap(), PredicateQuery::Predicate(Predicate::N));
        assert_eq!(
            "Balancing".parse::<PredicateQuery>().unwrap(),
            PredicateQuery::Condition(Phase::Balancing)
        );
        assert_eq!("Score".parse::<PredicateQuery>().unwrap(), PredicateQuery::Score);
    }

    #[test]
    fn test_unknown_identifiers() {
        for bad in ["H", "O", "AB", "", "Scores"] {
            let err = bad.parse::<PredicateQuery>().unwrap_err();
            assert!(matches!(err, ShelfError::UnknownPredicate(_)), "{bad}");
        }
    }

    #[test]
    fn test_query_values() {
        let l = layout();
        let config = ShelfConfig::default();
        let mut diag = Diagnostics::new(&l, &config, None);

        assert_eq!(diag.query(PlacementId(0), "A", Pass::First).unwrap(), DiagnosticValue::Bool(true));
        assert_eq!(diag.query(PlacementId(0), "G", Pass::First).unwrap(), DiagnosticValue::Bool(true));
        // Single run: nothing lags, so balancing is never eligible.
        assert_eq!(diag.query(PlacementId(0), "B", Pass::First).unwrap(), DiagnosticValue::Bool(false));
        assert_eq!(
            diag.query(PlacementId(0), "Expansion", Pass::First).unwrap(),
            DiagnosticValue::Bool(true)
        );
        assert_eq!(
            diag.query(PlacementId(1), "Expansion", Pass::First).unwrap(),
            DiagnosticValue::Bool(false)
        );
        // No ceilings: the second pass is closed.
        assert_eq!(diag.query(PlacementId(0), "I", Pass::First).unwrap(), DiagnosticValue::Bool(false));

        let s0 = diag.query(PlacementId(0), "Score", Pass::First).unwrap().as_score().unwrap();
        let s1 = diag.query(PlacementId(1), "score", Pass::First).unwrap().as_score().unwrap();
        assert!(s0 < s1);
    }

    #[test]
    fn test_query_does_not_mutate() {
        let l = layout();
        let before = l.clone();
        let config = ShelfConfig::default();
        let mut diag = Diagnostics::new(&l, &config, None);
        diag.explain(PlacementId(2), Pass::First).unwrap();
        drop(diag);
        assert_eq!(l, before);
    }

    #[test]
    fn test_explain_lists_pass_letters() {
        let l = layout();
        let config = ShelfConfig::default();
        let mut diag = Diagnostics::new(&l, &config, None);
        let first: Vec<char> = diag
            .explain(PlacementId(0), Pass::First)
            .unwrap()
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(first, vec!['A', 'B', 'C', 'D', 'E', 'F', 'G']);
        let second = diag.explain(PlacementId(0), Pass::Second).unwrap();
        assert_eq!(second.len(), 6);
    }

    #[test]
    fn test_unknown_placement() {
        let l = layout();
        let config = ShelfConfig::default();
        let mut diag = Diagnostics::new(&l, &config, None);
        let err = diag.query(PlacementId(42), "A", Pass::First).unwrap_err();
        assert!(matches!(err, ShelfError::UnknownPlacement(PlacementId(42))));
    }
}
