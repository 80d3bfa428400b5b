//! Grouped aggregate queries over session tables.
//!
//! A [`GroupedQuery`] is a select list over one source relation. Every
//! non-aggregate item is part of the grouping key, so the key set is never
//! listed separately from the columns it produces.

pub mod expr;
mod group;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;

pub use expr::Expr;

use crate::error::{PipelineError, Result};
use crate::schema::adapt::{is_integer, is_numeric};
use crate::session::{Session, Table, ViewDefinition};
use group::{Accumulator, GroupTable};

/// An aggregate function of a select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateFn {
    /// `count(1)`: number of rows in the group
    CountRows,
    /// `count(expr)`: number of non-null values in the group
    Count(Expr),
    /// `sum(expr)`: sum of non-null values, null if there are none
    Sum(Expr),
}

impl AggregateFn {
    /// Argument of the function, if any
    #[must_use]
    pub const fn argument(&self) -> Option<&Expr> {
        match self {
            Self::CountRows => None,
            Self::Count(expr) | Self::Sum(expr) => Some(expr),
        }
    }

    /// Type of the aggregated column over `schema`
    pub fn data_type(&self, schema: &Schema) -> Result<DataType> {
        Ok(self.accumulator(schema)?.output_type())
    }

    fn accumulator(&self, schema: &Schema) -> Result<Accumulator> {
        match self {
            Self::CountRows => Ok(Accumulator::Count {
                counts: Vec::new(),
                skip_nulls: false,
            }),
            Self::Count(expr) => {
                expr.data_type(schema)?;
                Ok(Accumulator::Count {
                    counts: Vec::new(),
                    skip_nulls: true,
                })
            }
            Self::Sum(expr) => match expr.data_type(schema)? {
                DataType::Decimal128(_, scale) | DataType::Decimal256(_, scale) => {
                    Ok(Accumulator::SumDecimal {
                        sums: Vec::new(),
                        scale,
                    })
                }
                ref input if is_integer(input) => Ok(Accumulator::SumInt { sums: Vec::new() }),
                ref input if is_numeric(input) => Ok(Accumulator::SumFloat { sums: Vec::new() }),
                input => Err(PipelineError::InvalidExpression(format!(
                    "sum() expects a number, got {input} in {self}"
                ))),
            },
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountRows => write!(f, "count(1)"),
            Self::Count(expr) => write!(f, "count({expr})"),
            Self::Sum(expr) => write!(f, "sum({expr})"),
        }
    }
}

/// One entry of a select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    /// A per-row expression; also part of the grouping key
    Expr { expr: Expr, alias: Option<String> },
    /// An aggregate over each group
    Aggregate { func: AggregateFn, alias: Option<String> },
}

impl SelectItem {
    /// A grouping expression, named after its column or rendering
    #[must_use]
    pub const fn expr(expr: Expr) -> Self {
        Self::Expr { expr, alias: None }
    }

    /// An aggregate item
    #[must_use]
    pub const fn aggregate(func: AggregateFn) -> Self {
        Self::Aggregate { func, alias: None }
    }

    /// Name the output column
    #[must_use]
    pub fn alias(self, name: impl Into<String>) -> Self {
        let alias = Some(name.into());
        match self {
            Self::Expr { expr, .. } => Self::Expr { expr, alias },
            Self::Aggregate { func, .. } => Self::Aggregate { func, alias },
        }
    }

    /// Whether this item aggregates
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate { .. })
    }

    /// Name of the produced column
    ///
    /// Bare columns keep their name as written; anything else without an
    /// alias is named after its rendering, e.g. `month(order_date)`.
    #[must_use]
    pub fn output_name(&self) -> String {
        match self {
            Self::Expr {
                alias: Some(alias), ..
            }
            | Self::Aggregate {
                alias: Some(alias), ..
            } => alias.clone(),
            Self::Expr {
                expr: Expr::Column(name),
                alias: None,
            } => name.clone(),
            Self::Expr { expr, alias: None } => expr.to_string(),
            Self::Aggregate { func, alias: None } => func.to_string(),
        }
    }
}

/// A grouped select over one source relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedQuery {
    source: String,
    items: Vec<SelectItem>,
}

impl GroupedQuery {
    /// Name of the view the sales pipeline registers
    pub const SALES_VIEW: &'static str = "aggregate_view";

    /// A query over `source`
    pub fn new(source: impl Into<String>, items: Vec<SelectItem>) -> Self {
        Self {
            source: source.into(),
            items,
        }
    }

    /// Orders, month, city and revenue per product over the `sales` table
    ///
    /// The city is the second comma-separated piece of the address, leading
    /// space included.
    #[must_use]
    pub fn sales_aggregate() -> Self {
        Self::new(
            "sales",
            vec![
                SelectItem::expr(Expr::col("order_id")),
                SelectItem::aggregate(AggregateFn::CountRows).alias("nbr_orders"),
                SelectItem::expr(Expr::col("order_date").month()).alias("month"),
                SelectItem::expr(Expr::col("purchase_address").split_part(",", 2)).alias("city"),
                SelectItem::expr(Expr::col("product")).alias("product"),
                SelectItem::aggregate(AggregateFn::Sum(
                    Expr::col("quantity").mul(Expr::col("price")),
                ))
                .alias("revenue"),
            ],
        )
    }

    /// Name of the relation this query reads
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The select list
    #[must_use]
    pub fn items(&self) -> &[SelectItem] {
        &self.items
    }

    /// The grouping key: every non-aggregate item, in select-list order
    pub fn group_keys(&self) -> impl Iterator<Item = &Expr> {
        self.items.iter().filter_map(|item| match item {
            SelectItem::Expr { expr, .. } => Some(expr),
            SelectItem::Aggregate { .. } => None,
        })
    }

    /// Output schema of the query over input `schema`
    pub fn output_schema_for(&self, schema: &Schema) -> Result<SchemaRef> {
        let fields: Vec<Field> = self
            .items
            .iter()
            .map(|item| -> Result<Field> {
                let data_type = match item {
                    SelectItem::Expr { expr, .. } => expr.data_type(schema)?,
                    SelectItem::Aggregate { func, .. } => func.data_type(schema)?,
                };
                // Counts are never null; everything else may be
                let nullable = !matches!(
                    item,
                    SelectItem::Aggregate {
                        func: AggregateFn::CountRows | AggregateFn::Count(_),
                        ..
                    }
                );
                Ok(Field::new(item.output_name(), data_type, nullable))
            })
            .try_collect()?;

        let names = fields.iter().map(Field::name).duplicates().collect_vec();
        if !names.is_empty() {
            return Err(PipelineError::InvalidExpression(format!(
                "duplicate output columns: {}",
                names.iter().join(", ")
            )));
        }

        Ok(Arc::new(Schema::new(fields)))
    }

    /// Run the query over `table`
    ///
    /// Groups appear in the order their first row is seen.
    pub fn execute(&self, table: &Table) -> Result<Table> {
        let start = Instant::now();
        let input_schema = table.schema();
        let output_schema = self.output_schema_for(&input_schema)?;

        let keys: Vec<&Expr> = self.group_keys().collect();
        let key_types: Vec<DataType> = keys
            .iter()
            .map(|expr| expr.data_type(&input_schema))
            .try_collect()?;
        let mut groups = GroupTable::try_new(key_types)?;

        let mut accumulators: Vec<(Option<&Expr>, Accumulator)> = self
            .items
            .iter()
            .filter_map(|item| match item {
                SelectItem::Aggregate { func, .. } => Some(func),
                SelectItem::Expr { .. } => None,
            })
            .map(|func| -> Result<_> { Ok((func.argument(), func.accumulator(&input_schema)?)) })
            .collect::<Result<_>>()?;

        for batch in table.batches() {
            let key_columns: Vec<ArrayRef> = keys
                .iter()
                .map(|expr| expr.evaluate(batch))
                .try_collect()?;
            let group_indices = groups.intern(&key_columns, batch.num_rows())?;

            for (argument, accumulator) in &mut accumulators {
                accumulator.resize(groups.num_groups());
                let values = argument.map(|expr| expr.evaluate(batch)).transpose()?;
                accumulator.update(&group_indices, values.as_ref())?;
            }
        }

        let num_groups = groups.num_groups();
        let mut key_columns = groups.finish()?.into_iter();
        let mut aggregate_columns = accumulators
            .into_iter()
            .map(|(_, mut accumulator)| {
                accumulator.resize(num_groups);
                accumulator.finish()
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter();

        // Reassemble in select-list order
        let columns: Vec<ArrayRef> = self
            .items
            .iter()
            .map(|item| {
                let column = if item.is_aggregate() {
                    aggregate_columns.next()
                } else {
                    key_columns.next()
                };
                column.ok_or_else(|| {
                    PipelineError::InvalidExpression(format!(
                        "no column produced for {}",
                        item.output_name()
                    ))
                })
            })
            .try_collect()?;

        let batch = RecordBatch::try_new(Arc::clone(&output_schema), columns)?;
        log::info!(
            "Aggregated {} into {} groups in {:?}",
            self.source,
            batch.num_rows(),
            start.elapsed()
        );
        Table::try_from_batches(output_schema, std::iter::once(Ok(batch)))
    }
}

impl ViewDefinition for GroupedQuery {
    fn evaluate(&self, session: &Session) -> Result<Table> {
        let input = session.scan(&self.source)?;
        self.execute(&input)
    }

    fn output_schema(&self, session: &Session) -> Result<SchemaRef> {
        let input = session.schema(&self.source)?;
        self.output_schema_for(&input)
    }

    fn sources(&self) -> Vec<String> {
        vec![self.source.clone()]
    }
}
