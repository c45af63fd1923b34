use crate::types::{is_comparable, is_string};
use arrow::compute::can_cast_types;
use arrow::datatypes::{DataType, Schema};
use datafusion::scalar::ScalarValue;
use floe_common::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Operators a `Call` may apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    Like,
    Cast,
    /// Identity marker inserted by rewrites; evaluates to its single operand.
    PassThrough,
    /// An opaque scalar function, identified by name.
    Function(String),
}

impl Operator {
    pub fn symbol(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Like => "LIKE",
            Operator::Cast => "CAST",
            Operator::PassThrough => "IDENTITY",
            Operator::Function(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A typed scalar expression.
///
/// Expressions are immutable. Operands are held in an `Arc<[Expr]>` so that
/// rewrites share untouched subtrees. Every constructor validates arity and
/// operand types, so code that walks an `Expr` may assume it is well formed.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to field `index` of the row the owning node consumes.
    InputRef { index: usize, data_type: DataType },
    Literal { value: ScalarValue, data_type: DataType },
    Call { op: Operator, operands: Arc<[Expr]>, data_type: DataType },
}

impl Expr {
    /// A reference to field `index` of `schema`, typed from the schema.
    pub fn input_ref(index: usize, schema: &Schema) -> Result<Self> {
        let len = schema.fields().len();
        if index >= len {
            return Err(Error::IndexOutOfRange { what: "input reference", index, len });
        }
        Ok(Expr::InputRef { index, data_type: schema.field(index).data_type().clone() })
    }

    pub fn literal(value: impl Into<ScalarValue>) -> Self {
        let value = value.into();
        let data_type = value.data_type();
        Expr::Literal { value, data_type }
    }

    /// Builds a call, inferring its result type.
    ///
    /// `Cast` and `Function` need an explicit result type and are built with
    /// [`Expr::cast`] and [`Expr::function`] instead.
    pub fn call(op: Operator, operands: Vec<Expr>) -> Result<Self> {
        let data_type = match &op {
            Operator::Eq
            | Operator::NotEq
            | Operator::Lt
            | Operator::LtEq
            | Operator::Gt
            | Operator::GtEq => {
                expect_arity(&op, &operands, 2)?;
                let (left, right) = (operands[0].data_type(), operands[1].data_type());
                if !is_comparable(left, right) {
                    return Err(Error::malformed(format!(
                        "cannot compare {left} with {right} using '{op}'"
                    )));
                }
                DataType::Boolean
            }
            Operator::And | Operator::Or => {
                if operands.len() < 2 {
                    return Err(Error::malformed(format!(
                        "'{op}' needs at least two operands, got {}",
                        operands.len()
                    )));
                }
                expect_boolean_operands(&op, &operands)?;
                DataType::Boolean
            }
            Operator::Not => {
                expect_arity(&op, &operands, 1)?;
                expect_boolean_operands(&op, &operands)?;
                DataType::Boolean
            }
            Operator::Like => {
                expect_arity(&op, &operands, 2)?;
                if !operands.iter().all(|o| is_string(o.data_type()) || o.data_type().is_null()) {
                    return Err(Error::malformed("LIKE operands must be strings"));
                }
                DataType::Boolean
            }
            Operator::PassThrough => {
                expect_arity(&op, &operands, 1)?;
                operands[0].data_type().clone()
            }
            Operator::Cast | Operator::Function(_) => {
                return Err(Error::malformed(format!("'{op}' requires an explicit result type")));
            }
        };
        Ok(Expr::Call { op, operands: operands.into(), data_type })
    }

    pub fn cast(expr: Expr, to: DataType) -> Result<Self> {
        if !can_cast_types(expr.data_type(), &to) {
            return Err(Error::malformed(format!(
                "cannot cast {} to {to}",
                expr.data_type()
            )));
        }
        Ok(Expr::Call { op: Operator::Cast, operands: vec![expr].into(), data_type: to })
    }

    pub fn pass_through(expr: Expr) -> Self {
        let data_type = expr.data_type().clone();
        Expr::Call { op: Operator::PassThrough, operands: vec![expr].into(), data_type }
    }

    pub fn function(name: impl Into<String>, operands: Vec<Expr>, return_type: DataType) -> Self {
        Expr::Call {
            op: Operator::Function(name.into()),
            operands: operands.into(),
            data_type: return_type,
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Result<Self> {
        Expr::call(Operator::Eq, vec![left, right])
    }

    pub fn like(expr: Expr, pattern: Expr) -> Result<Self> {
        Expr::call(Operator::Like, vec![expr, pattern])
    }

    pub fn data_type(&self) -> &DataType {
        match self {
            Expr::InputRef { data_type, .. }
            | Expr::Literal { data_type, .. }
            | Expr::Call { data_type, .. } => data_type,
        }
    }

    pub fn as_input_ref(&self) -> Option<usize> {
        match self {
            Expr::InputRef { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<&Operator> {
        match self {
            Expr::Call { op, .. } => Some(op),
            _ => None,
        }
    }

    pub fn operands(&self) -> &[Expr] {
        match self {
            Expr::Call { operands, .. } => &operands[..],
            _ => &[],
        }
    }

    /// Whether the expression may evaluate to NULL over rows of `schema`.
    pub fn nullable(&self, schema: &Schema) -> bool {
        match self {
            Expr::InputRef { index, .. } => {
                schema.fields().get(*index).map_or(true, |f| f.is_nullable())
            }
            Expr::Literal { value, .. } => value.is_null(),
            Expr::Call { op: Operator::Function(_), .. } => true,
            Expr::Call { operands, .. } => operands.iter().any(|o| o.nullable(schema)),
        }
    }

    /// Checks that every input reference is in range of `schema` and carries
    /// the type of the field it points at.
    pub fn validate_against(&self, schema: &Schema) -> Result<()> {
        match self {
            Expr::InputRef { index, data_type } => {
                let len = schema.fields().len();
                let field = schema
                    .fields()
                    .get(*index)
                    .ok_or(Error::IndexOutOfRange { what: "input reference", index: *index, len })?;
                if field.data_type() != data_type {
                    return Err(Error::malformed(format!(
                        "reference ${index} is typed {data_type} but field '{}' is {}",
                        field.name(),
                        field.data_type()
                    )));
                }
                Ok(())
            }
            Expr::Literal { .. } => Ok(()),
            Expr::Call { operands, .. } => {
                operands.iter().try_for_each(|operand| operand.validate_against(schema))
            }
        }
    }

    /// Renders the expression with field names taken from `schema`.
    pub fn display<'a>(&'a self, schema: &'a Schema) -> ExprDisplay<'a> {
        ExprDisplay { expr: self, schema: Some(schema) }
    }
}

/// Flattens nested top-level `AND`s into a list of conjuncts.
///
/// `OR` is never distributed; a disjunction is returned as a single conjunct.
pub fn conjunctions(expr: &Expr) -> Vec<&Expr> {
    let mut out = Vec::new();
    collect_conjunctions(expr, &mut out);
    out
}

fn collect_conjunctions<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::Call { op: Operator::And, operands, .. } => {
            for operand in operands.iter() {
                collect_conjunctions(operand, out);
            }
        }
        other => out.push(other),
    }
}

/// ANDs the given predicates together. Returns `None` for an empty list and
/// the predicate itself for a single one.
pub fn conjunction(mut predicates: Vec<Expr>) -> Result<Option<Expr>> {
    match predicates.len() {
        0 => Ok(None),
        1 => Ok(predicates.pop()),
        _ => Expr::call(Operator::And, predicates).map(Some),
    }
}

fn expect_arity(op: &Operator, operands: &[Expr], arity: usize) -> Result<()> {
    if operands.len() != arity {
        return Err(Error::malformed(format!(
            "'{op}' expects {arity} operand(s), got {}",
            operands.len()
        )));
    }
    Ok(())
}

fn expect_boolean_operands(op: &Operator, operands: &[Expr]) -> Result<()> {
    for operand in operands {
        let data_type = operand.data_type();
        if !matches!(data_type, DataType::Boolean | DataType::Null) {
            return Err(Error::malformed(format!(
                "'{op}' operands must be boolean, found {data_type}"
            )));
        }
    }
    Ok(())
}

/// Renders a literal the way it would be written in SQL.
pub fn format_scalar(value: &ScalarValue) -> String {
    if value.is_null() {
        return "null".to_string();
    }
    match value {
        ScalarValue::Utf8(Some(s)) | ScalarValue::LargeUtf8(Some(s)) | ScalarValue::Utf8View(Some(s)) => {
            format!("'{}'", s.replace('\'', "''"))
        }
        other => other.to_string(),
    }
}

pub struct ExprDisplay<'a> {
    expr: &'a Expr,
    schema: Option<&'a Schema>,
}

impl ExprDisplay<'_> {
    fn child<'b>(&'b self, expr: &'b Expr) -> ExprDisplay<'b> {
        ExprDisplay { expr, schema: self.schema }
    }
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::InputRef { index, .. } => match self.schema.and_then(|s| s.fields().get(*index)) {
                Some(field) => f.write_str(field.name()),
                None => write!(f, "${index}"),
            },
            Expr::Literal { value, .. } => f.write_str(&format_scalar(value)),
            Expr::Call { op, operands, data_type } => match op {
                Operator::Cast if operands.len() == 1 => {
                    write!(f, "CAST({} AS {data_type})", self.child(&operands[0]))
                }
                Operator::Not if operands.len() == 1 => write!(f, "NOT({})", self.child(&operands[0])),
                // Hand-built calls with an unexpected arity render as plain calls.
                Operator::PassThrough | Operator::Function(_) | Operator::Cast | Operator::Not => {
                    write!(f, "{op}(")?;
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", self.child(operand))?;
                    }
                    f.write_str(")")
                }
                _ => {
                    f.write_str("(")?;
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            write!(f, " {op} ")?;
                        }
                        write!(f, "{}", self.child(operand))?;
                    }
                    f.write_str(")")
                }
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ExprDisplay { expr: self, schema: None }.fmt(f)
    }
}
