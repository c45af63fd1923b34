use crate::hint::{AsyncLookupOptions, RetryStrategy};
use crate::lookup_key::LookupKey;
use crate::plan::LookupJoinPlan;
use floe_common::Result;
use floe_expr::format_scalar;
use serde::Serialize;
use std::fmt;

/// Structured explain output of a lookup join.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupJoinExplain {
    pub table: String,
    pub join_type: String,
    pub lookup: Vec<String>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Vec<String>>,
    pub join_condition: Option<String>,
    pub select: Vec<String>,
    #[serde(rename = "async")]
    pub async_: AsyncLookupOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryStrategy>,
}

impl LookupJoinPlan {
    pub fn explain(&self) -> LookupJoinExplain {
        let table = self.table();
        let driving = self.driving_schema();

        let lookup = self
            .all_lookup_keys()
            .iter()
            .map(|(index, key)| {
                let column = table.schema.fields().get(*index).map_or_else(|| format!("${index}"), |f| f.name().clone());
                let value = match key {
                    LookupKey::Constant { value, .. } => format_scalar(value),
                    LookupKey::FieldRef { source } => {
                        driving.fields().get(*source).map_or_else(|| format!("${source}"), |f| f.name().clone())
                    }
                };
                format!("{column}={value}")
            })
            .collect();

        let (where_, projection) = match self.calc() {
            Some(calc) => {
                let raw = calc.input_schema();
                let where_ = calc.filter().map(|f| f.display(raw).to_string());
                let projection = calc
                    .projections()
                    .iter()
                    .zip(calc.output_schema().fields().iter())
                    .map(|(expr, field)| {
                        let rendered = expr.display(raw).to_string();
                        if &rendered == field.name() {
                            rendered
                        } else {
                            format!("{rendered} AS {}", field.name())
                        }
                    })
                    .collect();
                (where_, Some(projection))
            }
            None => (None, None),
        };

        let output = self.output_row_type();
        LookupJoinExplain {
            table: table.name.clone(),
            join_type: self.join_type().to_string(),
            lookup,
            where_,
            projection,
            join_condition: self.remaining_condition().map(|c| c.display(output).to_string()),
            select: output.fields().iter().map(|f| f.name().clone()).collect(),
            async_: *self.async_options(),
            retry: self.hint().and_then(|h| h.retry),
        }
    }

    /// Ordered `(name, value)` explain terms.
    pub fn explain_terms(&self) -> Vec<(&'static str, String)> {
        let explain = self.explain();
        let mut terms = vec![
            ("table", explain.table),
            ("joinType", explain.join_type),
            ("lookup", explain.lookup.join(", ")),
        ];
        if let Some(where_) = explain.where_ {
            terms.push(("where", where_));
        }
        if let Some(projection) = explain.projection {
            terms.push(("projection", projection.join(", ")));
        }
        terms.push(("joinCondition", explain.join_condition.unwrap_or_else(|| "N/A".to_string())));
        terms.push(("select", explain.select.join(", ")));
        terms.push(("async", explain.async_.to_string()));
        if let Some(retry) = explain.retry {
            terms.push(("retry", retry.to_string()));
        }
        terms
    }

    pub fn explain_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self.explain()).map_err(|e| floe_common::Error::plan(format!("explain: {e}")))
    }
}

impl fmt::Display for LookupJoinPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LookupJoin(")?;
        for (i, (name, value)) in self.explain_terms().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}=[{value}]")?;
        }
        write!(f, ")")
    }
}
