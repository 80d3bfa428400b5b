//! Scalar expressions evaluated column-wise over record batches.

use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::compute::kernels::cast;
use arrow::compute::kernels::numeric::mul;
use arrow::compute::kernels::temporal::{DatePart, date_part};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};
use crate::schema::adapt::{common_numeric_type, is_string, is_temporal};
use crate::session::resolve_column;

/// A scalar expression over the columns of one input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// An input column, resolved case-insensitively
    Column(String),
    /// Month number (1-12) of a date
    Month(Box<Expr>),
    /// The `index`-th (1-based) piece of a string split on `delimiter`;
    /// null when there are fewer pieces
    SplitPart {
        expr: Box<Expr>,
        delimiter: String,
        index: usize,
    },
    /// Product of two numeric expressions
    Mul(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Reference an input column
    pub fn col(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Month of this date expression
    #[must_use]
    pub fn month(self) -> Self {
        Self::Month(Box::new(self))
    }

    /// Piece `index` (1-based) of this string split on `delimiter`
    #[must_use]
    pub fn split_part(self, delimiter: impl Into<String>, index: usize) -> Self {
        Self::SplitPart {
            expr: Box::new(self),
            delimiter: delimiter.into(),
            index,
        }
    }

    /// Product of this expression and `other`
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self::Mul(Box::new(self), Box::new(other))
    }

    /// Column references in this expression
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Column(name) => vec![name.as_str()],
            Self::Month(expr) | Self::SplitPart { expr, .. } => expr.columns(),
            Self::Mul(lhs, rhs) => {
                let mut columns = lhs.columns();
                columns.extend(rhs.columns());
                columns
            }
        }
    }

    /// Type of the values this expression produces over `schema`
    ///
    /// # Errors
    /// Returns an error if a column is missing or an operand has the wrong
    /// type.
    pub fn data_type(&self, schema: &Schema) -> Result<DataType> {
        match self {
            Self::Column(name) => {
                let index = resolve_column(schema, name)?;
                Ok(schema.field(index).data_type().clone())
            }
            Self::Month(expr) => {
                let input = expr.data_type(schema)?;
                if !is_temporal(&input) {
                    return Err(PipelineError::InvalidExpression(format!(
                        "month() expects a date, got {input} in {self}"
                    )));
                }
                Ok(DataType::Int64)
            }
            Self::SplitPart {
                expr,
                delimiter,
                index,
            } => {
                let input = expr.data_type(schema)?;
                if !is_string(&input) {
                    return Err(PipelineError::InvalidExpression(format!(
                        "split_part() expects a string, got {input} in {self}"
                    )));
                }
                if delimiter.is_empty() || *index == 0 {
                    return Err(PipelineError::InvalidExpression(format!(
                        "split_part() needs a non-empty delimiter and a 1-based index in {self}"
                    )));
                }
                Ok(DataType::Utf8)
            }
            Self::Mul(lhs, rhs) => {
                let (left, right) = Self::coerce(&lhs.data_type(schema)?, &rhs.data_type(schema)?, self)?;
                Ok(match (left, right) {
                    // Operands are widened to full precision, so only the scale grows
                    (DataType::Decimal128(precision, s1), DataType::Decimal128(_, s2)) => {
                        DataType::Decimal128(precision, s1 + s2)
                    }
                    (left, _) => left,
                })
            }
        }
    }

    fn coerce(left: &DataType, right: &DataType, expr: &Self) -> Result<(DataType, DataType)> {
        common_numeric_type(left, right).ok_or_else(|| {
            PipelineError::InvalidExpression(format!(
                "cannot multiply {left} by {right} in {expr}"
            ))
        })
    }

    /// Evaluate the expression for every row of `batch`
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<ArrayRef> {
        match self {
            Self::Column(name) => {
                let index = resolve_column(&batch.schema(), name)?;
                Ok(Arc::clone(batch.column(index)))
            }
            Self::Month(expr) => {
                let input = expr.evaluate(batch)?;
                let months = date_part(input.as_ref(), DatePart::Month)?;
                Ok(cast::cast(&months, &DataType::Int64)?)
            }
            Self::SplitPart {
                expr,
                delimiter,
                index,
            } => {
                let input = expr.evaluate(batch)?;
                let input = if input.data_type() == &DataType::Utf8 {
                    input
                } else {
                    cast::cast(&input, &DataType::Utf8)?
                };
                let parts: StringArray = input
                    .as_string::<i32>()
                    .iter()
                    .map(|value| value.and_then(|s| split_part(s, delimiter, *index)))
                    .collect();
                Ok(Arc::new(parts))
            }
            Self::Mul(lhs, rhs) => {
                let left = lhs.evaluate(batch)?;
                let right = rhs.evaluate(batch)?;
                let (left_type, right_type) = Self::coerce(left.data_type(), right.data_type(), self)?;
                let left = cast::cast(&left, &left_type)?;
                let right = cast::cast(&right, &right_type)?;
                Ok(mul(&left, &right)?)
            }
        }
    }
}

/// The `index`-th (1-based) piece of `value` split on `delimiter`
fn split_part<'a>(value: &'a str, delimiter: &str, index: usize) -> Option<&'a str> {
    if delimiter.is_empty() || index == 0 {
        return None;
    }
    value.split(delimiter).nth(index - 1)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "{name}"),
            Self::Month(expr) => write!(f, "month({expr})"),
            Self::SplitPart {
                expr,
                delimiter,
                index,
            } => write!(f, "split({expr}, '{delimiter}')[{index}]"),
            Self::Mul(lhs, rhs) => write!(f, "({lhs} * {rhs})"),
        }
    }
}
