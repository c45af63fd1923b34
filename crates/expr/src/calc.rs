use crate::expr::Expr;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use floe_common::{Error, Result};
use std::sync::Arc;

/// A projection plus optional filter applied to a table row before it is
/// joined. Every expression is evaluated over the raw table row.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcProgram {
    input_schema: SchemaRef,
    projections: Vec<Expr>,
    filter: Option<Expr>,
    output_schema: SchemaRef,
}

impl CalcProgram {
    /// Builds a program from named projections and an optional filter.
    ///
    /// Every reference is checked against `input_schema` and the filter must
    /// be boolean.
    pub fn try_new(
        input_schema: SchemaRef,
        projections: Vec<(Expr, String)>,
        filter: Option<Expr>,
    ) -> Result<Self> {
        let mut fields = Vec::with_capacity(projections.len());
        let mut exprs = Vec::with_capacity(projections.len());
        for (expr, name) in projections {
            expr.validate_against(&input_schema)?;
            fields.push(Field::new(name, expr.data_type().clone(), expr.nullable(&input_schema)));
            exprs.push(expr);
        }

        if let Some(predicate) = &filter {
            predicate.validate_against(&input_schema)?;
            if !matches!(predicate.data_type(), DataType::Boolean) {
                return Err(Error::malformed(format!(
                    "calc filter must be boolean, found {}",
                    predicate.data_type()
                )));
            }
        }

        Ok(Self {
            input_schema,
            projections: exprs,
            filter,
            output_schema: Arc::new(Schema::new(fields)),
        })
    }

    /// A program that forwards every input field unchanged.
    pub fn identity(input_schema: SchemaRef, filter: Option<Expr>) -> Result<Self> {
        let projections = input_schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| Ok((Expr::input_ref(i, &input_schema)?, field.name().clone())))
            .collect::<Result<Vec<_>>>()?;
        Self::try_new(input_schema, projections, filter)
    }

    pub fn input_schema(&self) -> &SchemaRef {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &SchemaRef {
        &self.output_schema
    }

    pub fn projections(&self) -> &[Expr] {
        &self.projections
    }

    pub fn projection(&self, ordinal: usize) -> Option<&Expr> {
        self.projections.get(ordinal)
    }

    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Operator;

    fn users_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("age", DataType::Int32, true),
        ]))
    }

    #[test]
    fn test_output_schema_follows_projections() {
        let schema = users_schema();
        let calc = CalcProgram::try_new(
            schema.clone(),
            vec![
                (Expr::input_ref(1, &schema).unwrap(), "name".to_string()),
                (Expr::cast(Expr::input_ref(0, &schema).unwrap(), DataType::Int64).unwrap(), "id64".to_string()),
            ],
            None,
        )
        .unwrap();

        let output = calc.output_schema();
        assert_eq!(output.fields().len(), 2);
        assert_eq!(output.field(0).name(), "name");
        assert!(output.field(0).is_nullable());
        assert_eq!(output.field(1).data_type(), &DataType::Int64);
        assert!(!output.field(1).is_nullable());
    }

    #[test]
    fn test_identity_program() {
        let schema = users_schema();
        let calc = CalcProgram::identity(schema.clone(), None).unwrap();
        let forwarded: Vec<_> = calc.projections().iter().map(Expr::as_input_ref).collect();
        assert_eq!(forwarded, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(calc.output_schema().as_ref(), schema.as_ref());
        assert!(calc.filter().is_none());
    }

    #[test]
    fn test_filter_must_be_boolean() {
        let schema = users_schema();
        let not_boolean = Expr::input_ref(0, &schema).unwrap();
        let err = CalcProgram::identity(schema.clone(), Some(not_boolean)).unwrap_err();
        assert!(matches!(err, Error::MalformedExpression(_)));

        let age_gt = Expr::call(
            Operator::Gt,
            vec![Expr::input_ref(2, &schema).unwrap(), Expr::literal(18i32)],
        )
        .unwrap();
        assert!(CalcProgram::identity(schema, Some(age_gt)).is_ok());
    }

    #[test]
    fn test_references_must_fit_input_schema() {
        let schema = users_schema();
        let wide = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Int32, false),
            Field::new("c", DataType::Int32, false),
            Field::new("d", DataType::Int32, false),
        ]));
        let beyond = Expr::input_ref(3, &wide).unwrap();
        let err = CalcProgram::try_new(schema, vec![(beyond, "d".to_string())], None).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 3, .. }));
    }
}
