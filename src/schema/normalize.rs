//! Casting raw text columns into a typed table.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use crate::error::Result;
use crate::schema::adapt::{CastMode, DateFormatConfig, cast_column};
use crate::schema::sales::{
    ORDER_DATE, ORDER_ID, PRICE, PRICE_TYPE, PRODUCT, PURCHASE_ADDRESS, QUANTITY_ORDERED,
};
use crate::session::{Session, Table, resolve_column};

/// One output column of a normalization plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCast {
    /// Column read from the input
    pub source: String,
    /// Name of the output column
    pub target: String,
    /// Output type; ignored for passthrough columns
    pub data_type: DataType,
    /// Reaction to values that cannot be converted
    pub mode: CastMode,
}

impl ColumnCast {
    /// A cast that fails the step on the first bad value
    pub fn strict(source: impl Into<String>, target: impl Into<String>, data_type: DataType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            data_type,
            mode: CastMode::Strict,
        }
    }

    /// A cast that turns bad values into nulls
    pub fn tolerant(
        source: impl Into<String>,
        target: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            data_type,
            mode: CastMode::Tolerant,
        }
    }

    /// A renamed column whose values are kept as they are
    pub fn passthrough(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            data_type: DataType::Utf8,
            mode: CastMode::Passthrough,
        }
    }
}

/// An ordered list of column casts producing a new table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationPlan {
    casts: Vec<ColumnCast>,
}

impl NormalizationPlan {
    /// Creates a plan from explicit casts
    #[must_use]
    pub fn new(casts: Vec<ColumnCast>) -> Self {
        Self { casts }
    }

    /// The fixed plan for sales files
    ///
    /// `quantity` is cast strictly while `order_id`, `price` and
    /// `order_date` are tolerant.
    #[must_use]
    pub fn sales() -> Self {
        Self::new(vec![
            ColumnCast::tolerant(ORDER_ID, "order_id", DataType::Int32),
            ColumnCast::passthrough(PRODUCT, "product"),
            ColumnCast::strict(QUANTITY_ORDERED, "quantity", DataType::Int32),
            ColumnCast::tolerant(PRICE, "price", PRICE_TYPE),
            ColumnCast::tolerant(ORDER_DATE, "order_date", DataType::Date32),
            ColumnCast::passthrough(PURCHASE_ADDRESS, "purchase_address"),
        ])
    }

    /// The casts of this plan, in output order
    #[must_use]
    pub fn casts(&self) -> &[ColumnCast] {
        &self.casts
    }

    /// Schema produced when the plan is applied to `input`
    ///
    /// # Errors
    /// Returns `PipelineError::ColumnNotFound` if a source column is missing.
    pub fn output_schema(&self, input: &Schema) -> Result<SchemaRef> {
        let fields: Vec<Field> = self
            .casts
            .iter()
            .map(|cast| -> Result<Field> {
                let index = resolve_column(input, &cast.source)?;
                let data_type = match cast.mode {
                    CastMode::Passthrough => input.field(index).data_type().clone(),
                    CastMode::Strict | CastMode::Tolerant => cast.data_type.clone(),
                };
                Ok(Field::new(&cast.target, data_type, true))
            })
            .try_collect()?;

        Ok(Arc::new(Schema::new(fields)))
    }

    /// Applies the plan to one batch
    pub fn apply(
        &self,
        batch: &RecordBatch,
        schema: &SchemaRef,
        date_config: &DateFormatConfig,
    ) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = self
            .casts
            .iter()
            .map(|cast| {
                let index = resolve_column(&batch.schema(), &cast.source)?;
                cast_column(
                    batch.column(index),
                    &cast.source,
                    &cast.data_type,
                    cast.mode,
                    date_config,
                )
            })
            .try_collect()?;

        Ok(RecordBatch::try_new(schema.clone(), columns)?)
    }

    /// Applies the plan to every batch of a table
    ///
    /// Row count and order are preserved. A strict cast failure in any batch
    /// aborts the whole table.
    pub fn normalize_table(&self, table: &Table, date_config: &DateFormatConfig) -> Result<Table> {
        let schema = self.output_schema(&table.schema())?;
        let batches: Vec<RecordBatch> = table
            .batches()
            .iter()
            .map(|batch| self.apply(batch, &schema, date_config))
            .try_collect()?;

        Ok(Table::new(schema, batches))
    }
}

/// Normalizes relation `source` into table `target` within a session
///
/// The target is created or replaced, so re-running overwrites rather than
/// appends.
///
/// # Returns
/// The number of rows in the new table
pub fn normalize_into(
    session: &mut Session,
    source: &str,
    target: &str,
    plan: &NormalizationPlan,
    date_config: &DateFormatConfig,
) -> Result<usize> {
    let start = Instant::now();
    log::info!("Normalizing {source} into {target}");

    let input = session.scan(source)?;
    let output = plan.normalize_table(&input, date_config)?;
    let rows = output.num_rows();
    session.create_or_replace_table(target, output)?;

    log::info!("Normalized {rows} rows into {target} in {:?}", start.elapsed());
    Ok(rows)
}
