//! Primary-key coverage of lookup keys.
//!
//! A lookup whose keys cover the table's primary key returns at most one row
//! per lookup, which lets the streaming optimizer skip upsert materialization.

use crate::lookup_key::LookupKeys;
use arrow::datatypes::Schema;
use floe_common::{Error, Result};
use floe_expr::CalcProgram;

/// Raw field indices of the primary-key columns, in declaration order.
pub fn primary_key_raw_indices(table: &str, columns: &[String], raw_schema: &Schema) -> Result<Vec<usize>> {
    columns
        .iter()
        .map(|column| {
            raw_schema.index_of(column).map_err(|_| Error::UnknownColumn {
                table: table.to_string(),
                column: column.clone(),
            })
        })
        .collect()
}

/// Primary-key columns in the coordinates of the lookup side.
///
/// `None` when no key is declared, or when a calc does not expose every key
/// column through a plain input reference. Casts and identity calls do not
/// count here even though lookup keys see through them.
pub fn remapped_pk_output_indices(
    table: &str,
    primary_key: Option<&[String]>,
    raw_schema: &Schema,
    calc: Option<&CalcProgram>,
) -> Result<Option<Vec<usize>>> {
    let Some(columns) = primary_key else {
        return Ok(None);
    };
    let raw = primary_key_raw_indices(table, columns, raw_schema)?;
    let Some(calc) = calc else {
        return Ok(Some(raw));
    };

    let remapped = raw
        .iter()
        .map(|pk| calc.projections().iter().position(|expr| expr.as_input_ref() == Some(*pk)))
        .collect::<Option<Vec<_>>>();
    Ok(remapped)
}

/// True when every remapped primary-key index is a lookup key.
pub fn covers_primary_key(keys: &LookupKeys, remapped_pk: Option<&[usize]>) -> bool {
    match remapped_pk {
        Some(pk) => !pk.is_empty() && pk.iter().all(|index| keys.contains_key(index)),
        None => false,
    }
}

/// Whether the join output must be materialized as upserts on the lookup key.
pub fn upsert_materialize_required(input_insert_only: bool, covers_primary_key: bool) -> bool {
    !input_insert_only && !covers_primary_key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup_key::LookupKey;
    use arrow::datatypes::{DataType, Field, SchemaRef};
    use floe_expr::Expr;
    use std::sync::Arc;

    fn users() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("age", DataType::Int32, true),
        ]))
    }

    fn pk(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_no_primary_key() {
        let remapped = remapped_pk_output_indices("users", None, &users(), None).unwrap();
        assert_eq!(remapped, None);
        assert!(!covers_primary_key(&LookupKeys::new(), remapped.as_deref()));
    }

    #[test]
    fn test_unknown_pk_column_is_an_error() {
        let err = remapped_pk_output_indices("users", Some(pk(&["uid"]).as_slice()), &users(), None).unwrap_err();
        assert!(matches!(err, Error::UnknownColumn { ref column, .. } if column == "uid"));
    }

    #[test]
    fn test_pk_without_calc_uses_raw_indices() {
        let remapped = remapped_pk_output_indices("users", Some(pk(&["age", "id"]).as_slice()), &users(), None).unwrap();
        assert_eq!(remapped, Some(vec![2, 0]));
    }

    #[test]
    fn test_pk_through_reordering_projection() {
        let schema = users();
        let calc = CalcProgram::try_new(
            schema.clone(),
            vec![
                (Expr::input_ref(2, &schema).unwrap(), "age".to_string()),
                (Expr::input_ref(0, &schema).unwrap(), "id".to_string()),
            ],
            None,
        )
        .unwrap();
        let remapped = remapped_pk_output_indices("users", Some(pk(&["id"]).as_slice()), &schema, Some(&calc)).unwrap();
        assert_eq!(remapped, Some(vec![1]));

        // Keys are indexed by raw column while the remapped key is a calc
        // output ordinal, so a key on raw `id` does not count as coverage here.
        let keys = LookupKeys::from([(0, LookupKey::FieldRef { source: 0 })]);
        assert!(!covers_primary_key(&keys, remapped.as_deref()));
    }

    #[test]
    fn test_pk_behind_cast_is_not_exposed() {
        let schema = users();
        let calc = CalcProgram::try_new(
            schema.clone(),
            vec![(
                Expr::cast(Expr::input_ref(0, &schema).unwrap(), DataType::Int64).unwrap(),
                "id".to_string(),
            )],
            None,
        )
        .unwrap();
        let remapped = remapped_pk_output_indices("users", Some(pk(&["id"]).as_slice()), &schema, Some(&calc)).unwrap();
        assert_eq!(remapped, None);
    }

    #[test]
    fn test_coverage_needs_every_pk_column() {
        let mut keys = LookupKeys::new();
        keys.insert(0, LookupKey::FieldRef { source: 0 });
        assert!(covers_primary_key(&keys, Some(&[0][..])));
        assert!(!covers_primary_key(&keys, Some(&[0, 2][..])));

        keys.insert(2, LookupKey::Constant { data_type: DataType::Int32, value: 11i32.into() });
        assert!(covers_primary_key(&keys, Some(&[0, 2][..])));
    }

    #[test]
    fn test_upsert_materialize() {
        assert!(upsert_materialize_required(false, false));
        assert!(!upsert_materialize_required(false, true));
        assert!(!upsert_materialize_required(true, false));
    }
}
