//! The lookup join plan node.
//!
//! `LookupJoinPlan::try_new` validates its input, derives the lookup keys and
//! the residual condition, and freezes the result. Plans are never mutated;
//! `with_new_input` builds a new node.

use crate::condition::compose;
use crate::config::Settings;
use crate::hint::{AsyncLookupOptions, LookupJoinHint};
use crate::join::{JoinInfo, JoinType};
use crate::logical_plan::LogicalPlan;
use crate::lookup_key::{analyze, LookupKeys};
use crate::primary_key::{covers_primary_key, remapped_pk_output_indices};
use arrow::datatypes::{DataType, SchemaRef};
use floe_common::{Error, LookupCapability, LookupCatalog, LookupTableEntry, Result};
use floe_expr::{CalcProgram, Expr};
use tracing::debug;

/// A table that can be looked up by key, as seen by the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalTable {
    pub name: String,
    pub schema: SchemaRef,
    pub primary_key: Option<Vec<String>>,
    pub capability: LookupCapability,
}

impl TemporalTable {
    pub fn new(name: impl Into<String>, schema: SchemaRef) -> Self {
        Self { name: name.into(), schema, primary_key: None, capability: LookupCapability::default() }
    }

    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_capability(mut self, capability: LookupCapability) -> Self {
        self.capability = capability;
        self
    }

    pub fn from_entry(entry: &LookupTableEntry) -> Self {
        Self {
            name: entry.name.clone(),
            schema: entry.schema(),
            primary_key: entry.primary_key.clone(),
            capability: entry.capability,
        }
    }
}

/// Everything a lookup join node is built from.
#[derive(Debug, Clone)]
pub struct LookupJoinInput {
    pub driving_schema: SchemaRef,
    pub table: TemporalTable,
    pub calc: Option<CalcProgram>,
    pub join_type: JoinType,
    pub join_info: JoinInfo,
    pub hint: Option<LookupJoinHint>,
    pub settings: Settings,
    /// Whether the driving input only ever inserts rows.
    pub input_insert_only: bool,
}

impl LookupJoinInput {
    pub fn new(driving_schema: SchemaRef, table: TemporalTable, join_type: JoinType, join_info: JoinInfo) -> Self {
        Self {
            driving_schema,
            table,
            calc: None,
            join_type,
            join_info,
            hint: None,
            settings: Settings::default(),
            input_insert_only: true,
        }
    }

    /// Builds an input from the optimizer's view of the lookup side.
    ///
    /// Accepted shapes are `TableScan`, `Snapshot* -> TableScan` and
    /// `Calc -> Snapshot* -> TableScan`.
    pub fn from_logical(
        driving_schema: SchemaRef,
        lookup_side: &LogicalPlan,
        join_type: JoinType,
        join_info: JoinInfo,
        catalog: &LookupCatalog,
    ) -> Result<Self> {
        let (calc, table_name) = lookup_side.as_lookup_source().ok_or_else(|| {
            Error::UnsupportedPlanShape(format!(
                "lookup side must be a table scan, optionally under snapshots and one calc, found {}",
                lookup_side.name()
            ))
        })?;
        let table = TemporalTable::from_entry(catalog.resolve(table_name)?);
        let mut input = Self::new(driving_schema, table, join_type, join_info);
        input.calc = calc.cloned();
        Ok(input)
    }

    pub fn with_calc(mut self, calc: CalcProgram) -> Self {
        self.calc = Some(calc);
        self
    }

    pub fn with_hint(mut self, hint: LookupJoinHint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_input_insert_only(mut self, input_insert_only: bool) -> Self {
        self.input_insert_only = input_insert_only;
        self
    }

    /// The row the join sees from the lookup side: the calc output if present.
    pub fn lookup_side_schema(&self) -> &SchemaRef {
        match &self.calc {
            Some(calc) => calc.output_schema(),
            None => &self.table.schema,
        }
    }

    fn validate(&self) -> Result<()> {
        let table = &self.table;
        if !table.capability.supports_lookup() {
            return Err(Error::LookupNotSupported(table.name.clone()));
        }

        if let Some(calc) = &self.calc {
            let expected = table.schema.fields().len();
            let actual = calc.input_schema().fields().len();
            if expected != actual {
                return Err(Error::FieldCountMismatch { expected, actual });
            }
            if calc.input_schema().fields() != table.schema.fields() {
                return Err(Error::plan(format!(
                    "calc input does not match the schema of table '{}'",
                    table.name
                )));
            }
        }

        if let Some(hinted) = self.hint.as_ref().and_then(|h| h.table.as_deref()) {
            if hinted != table.name {
                return Err(Error::InvalidHint(format!(
                    "hint targets table '{hinted}' but the join looks up '{}'",
                    table.name
                )));
            }
        }

        let driving_len = self.driving_schema.fields().len();
        let lookup_len = self.lookup_side_schema().fields().len();
        for pair in self.join_info.pairs() {
            if pair.source >= driving_len {
                return Err(Error::IndexOutOfRange {
                    what: "join key source",
                    index: pair.source,
                    len: driving_len,
                });
            }
            if pair.target >= lookup_len {
                return Err(Error::IndexOutOfRange {
                    what: "join key target",
                    index: pair.target,
                    len: lookup_len,
                });
            }
        }
        Ok(())
    }
}

/// A validated lookup join with its derived lookup keys, residual condition
/// and output row type.
#[derive(Debug, Clone)]
pub struct LookupJoinPlan {
    input: LookupJoinInput,
    all_lookup_keys: LookupKeys,
    remaining_condition: Option<Expr>,
    output_row_type: SchemaRef,
    async_options: AsyncLookupOptions,
}

impl LookupJoinPlan {
    pub fn try_new(input: LookupJoinInput) -> Result<Self> {
        input.validate()?;

        let all_lookup_keys = analyze(&input.join_info, input.calc.as_ref());
        let (remaining_condition, output_row_type) = compose(
            &input.join_info,
            &all_lookup_keys,
            &input.driving_schema,
            input.lookup_side_schema(),
            input.join_type,
        )?;

        for condition in input.join_info.non_equi_conditions() {
            condition.validate_against(&output_row_type)?;
            if condition.data_type() != &DataType::Boolean {
                return Err(Error::malformed(format!(
                    "join condition must be boolean, found {}",
                    condition.data_type()
                )));
            }
        }

        let async_options = AsyncLookupOptions::resolve(
            input.hint.as_ref(),
            &input.settings.async_lookup,
            input.table.capability.supports_sync,
            input.table.capability.supports_async,
            input.input_insert_only,
        );

        debug!(
            table = %input.table.name,
            join_type = %input.join_type,
            lookup_keys = all_lookup_keys.len(),
            has_residual = remaining_condition.is_some(),
            async_lookup = async_options.enabled,
            "derived lookup join"
        );

        Ok(Self { input, all_lookup_keys, remaining_condition, output_row_type, async_options })
    }

    /// Resolves the lookup side against `catalog` and builds the plan.
    pub fn from_logical(
        driving_schema: SchemaRef,
        lookup_side: &LogicalPlan,
        join_type: JoinType,
        join_info: JoinInfo,
        hint: Option<LookupJoinHint>,
        catalog: &LookupCatalog,
    ) -> Result<Self> {
        let mut input = LookupJoinInput::from_logical(driving_schema, lookup_side, join_type, join_info, catalog)?;
        input.hint = hint;
        Self::try_new(input)
    }

    /// A new plan over a different driving input; everything is re-derived.
    pub fn with_new_input(&self, driving_schema: SchemaRef) -> Result<Self> {
        let mut input = self.input.clone();
        input.driving_schema = driving_schema;
        Self::try_new(input)
    }

    pub fn input(&self) -> &LookupJoinInput {
        &self.input
    }

    pub fn table(&self) -> &TemporalTable {
        &self.input.table
    }

    pub fn calc(&self) -> Option<&CalcProgram> {
        self.input.calc.as_ref()
    }

    pub fn join_type(&self) -> JoinType {
        self.input.join_type
    }

    pub fn driving_schema(&self) -> &SchemaRef {
        &self.input.driving_schema
    }

    pub fn hint(&self) -> Option<&LookupJoinHint> {
        self.input.hint.as_ref()
    }

    /// Lookup keys by raw table field index.
    pub fn all_lookup_keys(&self) -> &LookupKeys {
        &self.all_lookup_keys
    }

    pub fn remaining_condition(&self) -> Option<&Expr> {
        self.remaining_condition.as_ref()
    }

    pub fn output_row_type(&self) -> &SchemaRef {
        &self.output_row_type
    }

    pub fn async_options(&self) -> &AsyncLookupOptions {
        &self.async_options
    }

    pub fn remapped_pk_output_indices(&self) -> Result<Option<Vec<usize>>> {
        let table = &self.input.table;
        remapped_pk_output_indices(&table.name, table.primary_key.as_deref(), &table.schema, self.calc())
    }

    /// True when the lookup keys pin down every primary-key column.
    pub fn lookup_key_contains_primary_key(&self) -> Result<bool> {
        let remapped = self.remapped_pk_output_indices()?;
        Ok(covers_primary_key(&self.all_lookup_keys, remapped.as_deref()))
    }
}
