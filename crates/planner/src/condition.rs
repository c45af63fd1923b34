//! Residual join condition and joined row type.
//!
//! The joined row is the driving row followed by the lookup side (the calc
//! output when a calc is present). Residual expressions index that row.

use crate::join::{JoinInfo, JoinType};
use crate::lookup_key::LookupKeys;
use arrow::datatypes::{Field, FieldRef, Schema, SchemaRef};
use floe_common::Result;
use floe_expr::{conjunction, Expr};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Builds the residual condition and the joined row type in one pass.
pub fn compose(
    join_info: &JoinInfo,
    keys: &LookupKeys,
    driving: &Schema,
    lookup_side: &Schema,
    join_type: JoinType,
) -> Result<(Option<Expr>, SchemaRef)> {
    let joined = join_row_type(driving, lookup_side, join_type);
    let residual = remaining_condition(join_info, keys, driving.fields().len(), &joined)?;
    Ok((residual, joined))
}

/// Driving fields followed by lookup-side fields. Lookup-side fields become
/// nullable for a left outer join; names are kept even when they collide.
pub fn join_row_type(driving: &Schema, lookup_side: &Schema, join_type: JoinType) -> SchemaRef {
    let nullable_lookup = join_type.generates_nulls_on_lookup_side();
    let fields: Vec<FieldRef> = driving
        .fields()
        .iter()
        .cloned()
        .chain(lookup_side.fields().iter().map(|field| {
            if nullable_lookup && !field.is_nullable() {
                Arc::new(Field::clone(field).with_nullable(true))
            } else {
                Arc::clone(field)
            }
        }))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Equi pairs not consumed as lookup keys, ANDed with every non-equi
/// condition. `None` when nothing remains.
///
/// A pair counts as consumed when its driving field feeds some field
/// reference key.
pub fn remaining_condition(
    join_info: &JoinInfo,
    keys: &LookupKeys,
    driving_len: usize,
    joined: &Schema,
) -> Result<Option<Expr>> {
    let consumed: BTreeSet<usize> = keys.values().filter_map(|key| key.source()).collect();

    let mut predicates = Vec::new();
    for pair in join_info.pairs().iter().filter(|p| !consumed.contains(&p.source)) {
        let left = Expr::input_ref(pair.source, joined)?;
        let right = Expr::input_ref(driving_len + pair.target, joined)?;
        predicates.push(Expr::eq(left, right)?);
    }
    predicates.extend(join_info.non_equi_conditions().iter().cloned());

    conjunction(predicates)
}
