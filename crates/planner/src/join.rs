//! Join descriptions handed to the planner by the optimizer.

use floe_expr::Expr;
use serde::Serialize;
use std::fmt;

/// Join type of a lookup join. The lookup table is always the right side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinType {
    Inner,
    LeftOuter,
    Semi,
    Anti,
}

impl JoinType {
    /// Whether unmatched driving rows are emitted with a NULL-filled lookup side.
    pub fn generates_nulls_on_lookup_side(self) -> bool {
        matches!(self, JoinType::LeftOuter)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "InnerJoin"),
            JoinType::LeftOuter => write!(f, "LeftOuterJoin"),
            JoinType::Semi => write!(f, "SemiJoin"),
            JoinType::Anti => write!(f, "AntiJoin"),
        }
    }
}

/// An equi-join column pair: `driving[source] = lookup_side[target]`.
///
/// `target` indexes the lookup side as the join sees it, i.e. the calc output
/// when a calc sits on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKeyPair {
    pub source: usize,
    pub target: usize,
}

impl JoinKeyPair {
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }
}

/// Equi-join pairs plus the remaining non-equi conditions of a join.
///
/// Non-equi conditions are expressed over the joined row (driving fields
/// followed by lookup-side fields).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinInfo {
    pairs: Vec<JoinKeyPair>,
    non_equi_conditions: Vec<Expr>,
}

impl JoinInfo {
    pub fn new(pairs: Vec<JoinKeyPair>, non_equi_conditions: Vec<Expr>) -> Self {
        Self { pairs, non_equi_conditions }
    }

    pub fn of_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self::new(pairs.into_iter().map(|(s, t)| JoinKeyPair::new(s, t)).collect(), Vec::new())
    }

    pub fn pairs(&self) -> &[JoinKeyPair] {
        &self.pairs
    }

    pub fn non_equi_conditions(&self) -> &[Expr] {
        &self.non_equi_conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_display() {
        assert_eq!(JoinType::Inner.to_string(), "InnerJoin");
        assert_eq!(JoinType::LeftOuter.to_string(), "LeftOuterJoin");
        assert_eq!(JoinType::Anti.to_string(), "AntiJoin");
    }

    #[test]
    fn test_only_left_outer_nulls_the_lookup_side() {
        assert!(JoinType::LeftOuter.generates_nulls_on_lookup_side());
        assert!(!JoinType::Inner.generates_nulls_on_lookup_side());
        assert!(!JoinType::Semi.generates_nulls_on_lookup_side());
        assert!(!JoinType::Anti.generates_nulls_on_lookup_side());
    }

    #[test]
    fn test_of_pairs() {
        let info = JoinInfo::of_pairs([(0, 2), (1, 0)]);
        assert_eq!(info.pairs(), &[JoinKeyPair::new(0, 2), JoinKeyPair::new(1, 0)]);
        assert!(info.non_equi_conditions().is_empty());
    }
}
