use arrow::datatypes::SchemaRef;
use floe_expr::CalcProgram;
use std::sync::Arc;

/// The right-hand side of a candidate lookup join, as the optimizer hands it over.
#[derive(Debug, PartialEq, Clone)]
pub enum LogicalPlan {
    TableScan {
        table_name: String,
    },
    /// A point-in-time view of its input (`FOR SYSTEM_TIME AS OF`).
    Snapshot {
        input: Arc<LogicalPlan>,
    },
    Calc {
        program: CalcProgram,
        input: Arc<LogicalPlan>,
    },
    Values {
        schema: SchemaRef,
    },
}

impl LogicalPlan {
    pub fn scan(table_name: impl Into<String>) -> Self {
        LogicalPlan::TableScan { table_name: table_name.into() }
    }

    pub fn snapshot(input: LogicalPlan) -> Self {
        LogicalPlan::Snapshot { input: Arc::new(input) }
    }

    pub fn calc(program: CalcProgram, input: LogicalPlan) -> Self {
        LogicalPlan::Calc { program, input: Arc::new(input) }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalPlan::TableScan { .. } => "TableScan",
            LogicalPlan::Snapshot { .. } => "Snapshot",
            LogicalPlan::Calc { .. } => "Calc",
            LogicalPlan::Values { .. } => "Values",
        }
    }

    /// Splits `Calc? -> Snapshot* -> TableScan` into the optional calc and the
    /// table name. Any other shape yields `None`.
    pub fn as_lookup_source(&self) -> Option<(Option<&CalcProgram>, &str)> {
        let (calc, mut node) = match self {
            LogicalPlan::Calc { program, input } => (Some(program), input.as_ref()),
            other => (None, other),
        };
        loop {
            match node {
                LogicalPlan::Snapshot { input } => node = input.as_ref(),
                LogicalPlan::TableScan { table_name } => return Some((calc, table_name.as_str())),
                _ => return None,
            }
        }
    }
}
