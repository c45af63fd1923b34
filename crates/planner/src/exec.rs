//! Finalized description of a lookup join for the execution layer.

use crate::hint::{AsyncLookupOptions, RetryStrategy};
use crate::join::JoinType;
use crate::lookup_key::{LookupKey, LookupKeys};
use crate::plan::LookupJoinPlan;
use crate::primary_key::upsert_materialize_required;
use arrow::datatypes::SchemaRef;
use floe_common::{Error, Result};
use floe_expr::{is_interoperable, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Batch,
    Streaming,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupJoinExecSpec {
    pub table_name: String,
    pub join_type: JoinType,
    pub lookup_keys: LookupKeys,
    pub projection: Option<Vec<Expr>>,
    pub filter: Option<Expr>,
    pub remaining_condition: Option<Expr>,
    pub output_row_type: SchemaRef,
    pub async_options: AsyncLookupOptions,
    pub retry: Option<RetryStrategy>,
    pub lookup_key_contains_primary_key: bool,
    pub upsert_materialize: bool,
}

impl LookupJoinPlan {
    /// Checks the lookup keys and freezes the plan for execution.
    ///
    /// Batch joins ignore the hint and never report primary-key coverage.
    pub fn to_exec_spec(&self, mode: ExecutionMode) -> Result<LookupJoinExecSpec> {
        self.validate_lookup_keys()?;

        let (async_options, retry, contains_pk, upsert_materialize) = match mode {
            ExecutionMode::Batch => {
                let table = self.table();
                let options = AsyncLookupOptions::resolve(
                    None,
                    &self.input().settings.async_lookup,
                    table.capability.supports_sync,
                    table.capability.supports_async,
                    true,
                );
                (options, None, false, false)
            }
            ExecutionMode::Streaming => {
                let contains_pk = self.lookup_key_contains_primary_key()?;
                let upsert = upsert_materialize_required(self.input().input_insert_only, contains_pk);
                (*self.async_options(), self.hint().and_then(|h| h.retry), contains_pk, upsert)
            }
        };

        Ok(LookupJoinExecSpec {
            table_name: self.table().name.clone(),
            join_type: self.join_type(),
            lookup_keys: self.all_lookup_keys().clone(),
            projection: self.calc().map(|c| c.projections().to_vec()),
            filter: self.calc().and_then(|c| c.filter().cloned()),
            remaining_condition: self.remaining_condition().cloned(),
            output_row_type: self.output_row_type().clone(),
            async_options,
            retry,
            lookup_key_contains_primary_key: contains_pk,
            upsert_materialize,
        })
    }

    fn validate_lookup_keys(&self) -> Result<()> {
        let table = self.table();
        if self.all_lookup_keys().is_empty() {
            return Err(Error::plan(format!(
                "Temporal table join requires an equality condition on fields of table [{}].",
                table.name
            )));
        }

        let driving = self.driving_schema();
        for (index, key) in self.all_lookup_keys() {
            let LookupKey::FieldRef { source } = key else {
                continue;
            };
            let lookup_field = table.schema.field(*index);
            let driving_field = driving.field(*source);
            let (from, to) = (driving_field.data_type(), lookup_field.data_type());
            if !is_interoperable(from, to) && !is_interoperable(to, from) {
                return Err(Error::plan(format!(
                    "lookup key '{}' of table '{}' is {to} but is joined with '{}' of type {from}",
                    lookup_field.name(),
                    table.name,
                    driving_field.name()
                )));
            }
        }
        Ok(())
    }
}
