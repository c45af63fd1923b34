//! Lookup key derivation.
//!
//! A lookup key says how one column of the lookup table is fixed for a lookup:
//! either from a field of the driving row (an equi-join pair) or from a
//! constant (a `column = literal` conjunct of the calc filter).
//!
//! With a calc on the table, join pairs point at calc output columns. They are
//! traced back to the raw table column they read, looking through identity
//! calls and interoperable casts. Pairs that do not trace back to a plain
//! column are dropped here and stay in the residual join condition.

use crate::join::{JoinInfo, JoinKeyPair};
use arrow::datatypes::DataType;
use floe_expr::{conjunctions, is_interoperable, CalcProgram, Expr, Operator, ScalarValue};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub enum LookupKey {
    /// The column must equal this literal.
    Constant { data_type: DataType, value: ScalarValue },
    /// The column must equal field `source` of the driving row.
    FieldRef { source: usize },
}

impl LookupKey {
    pub fn source(&self) -> Option<usize> {
        match self {
            LookupKey::FieldRef { source } => Some(*source),
            LookupKey::Constant { .. } => None,
        }
    }
}

/// Lookup keys by lookup-table field index, in table field order.
pub type LookupKeys = BTreeMap<usize, LookupKey>;

/// Derives every lookup key a join can push into the lookup.
///
/// Constant keys from the calc filter are collected first; field-reference
/// keys from the join pairs then replace any constant key on the same column.
pub fn analyze(join_info: &JoinInfo, calc: Option<&CalcProgram>) -> LookupKeys {
    let mut keys = constant_lookup_keys(calc.and_then(CalcProgram::filter));
    let field_refs = field_ref_lookup_keys(join_info, calc);
    for (index, key) in field_refs {
        if let Some(replaced) = keys.insert(index, key) {
            trace!(index, ?replaced, "join pair key replaces filter constant");
        }
    }
    keys
}

/// Keys from join pairs, after tracing each pair through `calc`.
///
/// When several pairs land on the same column the last one wins.
pub fn field_ref_lookup_keys(join_info: &JoinInfo, calc: Option<&CalcProgram>) -> LookupKeys {
    remap_join_pairs(join_info.pairs(), calc)
        .into_iter()
        .map(|pair| (pair.target, LookupKey::FieldRef { source: pair.source }))
        .collect()
}

/// Rewrites pair targets from calc output ordinals to raw table indices.
/// Pairs whose target does not trace back to a raw column are dropped.
pub fn remap_join_pairs(pairs: &[JoinKeyPair], calc: Option<&CalcProgram>) -> Vec<JoinKeyPair> {
    let Some(calc) = calc else {
        return pairs.to_vec();
    };
    pairs
        .iter()
        .filter_map(|pair| match trace_source_field(calc, pair.target) {
            Some(raw) => Some(JoinKeyPair::new(pair.source, raw)),
            None => {
                trace!(source = pair.source, target = pair.target, "join pair is not traceable");
                None
            }
        })
        .collect()
}

/// The raw table field that calc output `ordinal` forwards, if any.
pub fn trace_source_field(calc: &CalcProgram, ordinal: usize) -> Option<usize> {
    calc.projection(ordinal).and_then(identical_source_field)
}

/// Follows identity calls and interoperable casts down to an input reference.
/// Anything else (literals, other calls, lossy casts) is not traceable.
pub fn identical_source_field(expr: &Expr) -> Option<usize> {
    let mut current = expr;
    loop {
        match current {
            Expr::InputRef { index, .. } => return Some(*index),
            Expr::Call { op: Operator::PassThrough, operands, .. } => {
                current = operands.first()?;
            }
            Expr::Call { op: Operator::Cast, operands, data_type } => {
                let operand = operands.first()?;
                if !is_interoperable(operand.data_type(), data_type) {
                    return None;
                }
                current = operand;
            }
            _ => return None,
        }
    }
}

/// Keys from `column = literal` and `literal = column` conjuncts of `filter`.
pub fn constant_lookup_keys(filter: Option<&Expr>) -> LookupKeys {
    let mut keys = LookupKeys::new();
    let Some(filter) = filter else {
        return keys;
    };
    for conjunct in conjunctions(filter) {
        match constant_equality(conjunct) {
            Some((index, key)) => {
                keys.insert(index, key);
            }
            None => trace!(%conjunct, "filter conjunct is not a constant key"),
        }
    }
    keys
}

fn constant_equality(conjunct: &Expr) -> Option<(usize, LookupKey)> {
    let Expr::Call { op: Operator::Eq, operands, .. } = conjunct else {
        return None;
    };
    match &operands[..] {
        [Expr::Literal { value, .. }, Expr::InputRef { index, data_type }]
        | [Expr::InputRef { index, data_type }, Expr::Literal { value, .. }] => Some((
            *index,
            LookupKey::Constant { data_type: data_type.clone(), value: value.clone() },
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema, SchemaRef};
    use std::sync::Arc;

    fn users_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("age", DataType::Int32, true),
        ]))
    }

    fn col(index: usize, schema: &Schema) -> Expr {
        Expr::input_ref(index, schema).unwrap()
    }

    fn calc(projections: Vec<Expr>, filter: Option<Expr>) -> CalcProgram {
        let schema = users_schema();
        let named = projections.into_iter().enumerate().map(|(i, e)| (e, format!("c{i}"))).collect();
        CalcProgram::try_new(schema, named, filter).unwrap()
    }

    #[test]
    fn test_pairs_pass_through_without_calc() {
        let info = JoinInfo::of_pairs([(0, 0), (1, 2)]);
        let keys = analyze(&info, None);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[&0], LookupKey::FieldRef { source: 0 });
        assert_eq!(keys[&2], LookupKey::FieldRef { source: 1 });
    }

    #[test]
    fn test_trace_through_identity_and_widening_casts() {
        let schema = users_schema();
        let mut wrapped = col(0, &schema);
        for depth in 0..6 {
            wrapped = if depth % 2 == 0 {
                Expr::pass_through(wrapped)
            } else {
                Expr::cast(wrapped, DataType::Int64).unwrap()
            };
        }
        let program = calc(vec![col(2, &schema), wrapped], None);

        assert_eq!(trace_source_field(&program, 0), Some(2));
        assert_eq!(trace_source_field(&program, 1), Some(0));
        assert_eq!(trace_source_field(&program, 2), None);
    }

    #[test]
    fn test_narrowing_cast_is_not_traceable() {
        let schema = users_schema();
        let narrowed = Expr::cast(col(0, &schema), DataType::Int16).unwrap();
        let stringified = Expr::cast(col(2, &schema), DataType::Utf8).unwrap();
        let program = calc(vec![narrowed, stringified, Expr::literal(1i32)], None);

        let info = JoinInfo::of_pairs([(0, 0), (1, 1), (2, 2)]);
        assert!(remap_join_pairs(info.pairs(), Some(&program)).is_empty());
        assert!(analyze(&info, Some(&program)).is_empty());
    }

    #[test]
    fn test_function_call_is_not_traceable() {
        let schema = users_schema();
        let upper = Expr::function("UPPER", vec![col(1, &schema)], DataType::Utf8);
        assert_eq!(identical_source_field(&upper), None);
        assert_eq!(identical_source_field(&Expr::pass_through(upper)), None);
    }

    #[test]
    fn test_remapped_pairs_use_raw_indices() {
        let schema = users_schema();
        // output: (age, id)
        let program = calc(vec![col(2, &schema), col(0, &schema)], None);
        let info = JoinInfo::of_pairs([(3, 1), (4, 0)]);

        let remapped = remap_join_pairs(info.pairs(), Some(&program));
        assert_eq!(remapped, vec![JoinKeyPair::new(3, 0), JoinKeyPair::new(4, 2)]);
    }

    #[test]
    fn test_constant_keys_in_either_operand_order() {
        let schema = users_schema();
        let filter = Expr::call(
            Operator::And,
            vec![
                Expr::eq(col(2, &schema), Expr::literal(11i32)).unwrap(),
                Expr::eq(Expr::literal("Jack"), col(1, &schema)).unwrap(),
            ],
        )
        .unwrap();

        let keys = constant_lookup_keys(Some(&filter));
        assert_eq!(
            keys[&2],
            LookupKey::Constant { data_type: DataType::Int32, value: ScalarValue::Int32(Some(11)) }
        );
        assert_eq!(
            keys[&1],
            LookupKey::Constant {
                data_type: DataType::Utf8,
                value: ScalarValue::Utf8(Some("Jack".to_string()))
            }
        );
    }

    #[test]
    fn test_other_conjunct_shapes_are_ignored() {
        let schema = users_schema();
        let like = Expr::like(col(1, &schema), Expr::literal("Jack%")).unwrap();
        let gt = Expr::call(Operator::Gt, vec![col(2, &schema), Expr::literal(18i32)]).unwrap();
        let col_eq_col = Expr::eq(col(0, &schema), col(2, &schema)).unwrap();
        let cast_eq = Expr::eq(
            Expr::cast(col(0, &schema), DataType::Int64).unwrap(),
            Expr::literal(5i64),
        )
        .unwrap();
        let or = Expr::call(
            Operator::Or,
            vec![
                Expr::eq(col(0, &schema), Expr::literal(1i32)).unwrap(),
                Expr::eq(col(0, &schema), Expr::literal(2i32)).unwrap(),
            ],
        )
        .unwrap();
        let filter = Expr::call(Operator::And, vec![like, gt, col_eq_col, cast_eq, or]).unwrap();

        assert!(constant_lookup_keys(Some(&filter)).is_empty());
        assert!(constant_lookup_keys(None).is_empty());
    }

    #[test]
    fn test_field_ref_wins_over_constant_on_same_column() {
        let schema = users_schema();
        let filter = Expr::eq(col(0, &schema), Expr::literal(7i32)).unwrap();
        let program = CalcProgram::identity(schema.clone(), Some(filter)).unwrap();
        let info = JoinInfo::of_pairs([(1, 0)]);

        let keys = analyze(&info, Some(&program));
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[&0], LookupKey::FieldRef { source: 1 });
    }

    #[test]
    fn test_last_pair_wins_for_duplicate_target() {
        let info = JoinInfo::of_pairs([(0, 1), (2, 1)]);
        let keys = field_ref_lookup_keys(&info, None);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[&1].source(), Some(2));
    }
}
