//! Hash grouping and aggregate accumulators.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Decimal128Array, Float64Array, Int64Array};
use arrow::compute::kernels::cast;
use arrow::datatypes::{DataType, Decimal128Type, Float64Type, Int64Type};
use arrow::row::{OwnedRow, RowConverter, SortField};
use arrow_schema::DECIMAL128_MAX_PRECISION;
use rustc_hash::FxHashMap;

use crate::error::{PipelineError, Result};

/// Assigns a dense group index to every distinct key, in first-seen order
pub(crate) struct GroupTable {
    converter: Option<RowConverter>,
    groups: FxHashMap<OwnedRow, usize>,
    keys: Vec<OwnedRow>,
    key_types: Vec<DataType>,
}

impl GroupTable {
    /// A table for keys of the given column types
    ///
    /// With no key columns every row falls into a single group.
    pub(crate) fn try_new(key_types: Vec<DataType>) -> Result<Self> {
        let converter = if key_types.is_empty() {
            None
        } else {
            Some(RowConverter::new(
                key_types.iter().cloned().map(SortField::new).collect(),
            )?)
        };

        Ok(Self {
            converter,
            groups: FxHashMap::default(),
            keys: Vec::new(),
            key_types,
        })
    }

    /// Group index of every row of `key_columns`
    pub(crate) fn intern(&mut self, key_columns: &[ArrayRef], num_rows: usize) -> Result<Vec<usize>> {
        let Some(converter) = &self.converter else {
            return Ok(vec![0; num_rows]);
        };

        let rows = converter.convert_columns(key_columns)?;
        let mut indices = Vec::with_capacity(rows.num_rows());
        for row in &rows {
            let owned = row.owned();
            let group = if let Some(&group) = self.groups.get(&owned) {
                group
            } else {
                let group = self.keys.len();
                self.keys.push(owned.clone());
                self.groups.insert(owned, group);
                group
            };
            indices.push(group);
        }
        Ok(indices)
    }

    /// Number of groups seen so far
    pub(crate) fn num_groups(&self) -> usize {
        if self.converter.is_none() {
            // A global aggregate always yields exactly one row
            return 1;
        }
        self.keys.len()
    }

    /// Key columns with one row per group
    pub(crate) fn finish(self) -> Result<Vec<ArrayRef>> {
        match self.converter {
            None => Ok(Vec::new()),
            Some(converter) => {
                if self.keys.is_empty() {
                    return Ok(self
                        .key_types
                        .iter()
                        .map(arrow::array::new_empty_array)
                        .collect());
                }
                Ok(converter.convert_rows(self.keys.iter().map(OwnedRow::row))?)
            }
        }
    }
}

/// Running state of one aggregate over all groups
#[derive(Debug)]
pub(crate) enum Accumulator {
    /// Counts every row, or only rows with a non-null input
    Count { counts: Vec<i64>, skip_nulls: bool },
    /// Sum of integer input
    SumInt { sums: Vec<Option<i64>> },
    /// Sum of decimal input at a fixed scale
    SumDecimal { sums: Vec<Option<i128>>, scale: i8 },
    /// Sum of floating point input
    SumFloat { sums: Vec<Option<f64>> },
}

impl Accumulator {
    /// Type of the finished column
    pub(crate) const fn output_type(&self) -> DataType {
        match self {
            Self::Count { .. } | Self::SumInt { .. } => DataType::Int64,
            Self::SumDecimal { scale, .. } => DataType::Decimal128(DECIMAL128_MAX_PRECISION, *scale),
            Self::SumFloat { .. } => DataType::Float64,
        }
    }

    /// Grow the state to `groups` entries
    pub(crate) fn resize(&mut self, groups: usize) {
        match self {
            Self::Count { counts, .. } => counts.resize(groups, 0),
            Self::SumInt { sums } => sums.resize(groups, None),
            Self::SumDecimal { sums, .. } => sums.resize(groups, None),
            Self::SumFloat { sums } => sums.resize(groups, None),
        }
    }

    /// Fold one batch into the state
    ///
    /// `group_indices[row]` is the group of input row `row`; `values` is the
    /// evaluated input, absent for `count(*)`.
    pub(crate) fn update(&mut self, group_indices: &[usize], values: Option<&ArrayRef>) -> Result<()> {
        match self {
            Self::Count { counts, skip_nulls } => {
                for (row, &group) in group_indices.iter().enumerate() {
                    let counted = match values {
                        Some(values) if *skip_nulls => values.is_valid(row),
                        _ => true,
                    };
                    if counted {
                        counts[group] += 1;
                    }
                }
            }
            Self::SumInt { sums } => {
                let values = cast::cast(required(values)?, &DataType::Int64)?;
                let values = values.as_primitive::<Int64Type>();
                for (row, &group) in group_indices.iter().enumerate() {
                    if values.is_valid(row) {
                        let sum = sums[group].unwrap_or(0).checked_add(values.value(row));
                        sums[group] = Some(sum.ok_or_else(overflow)?);
                    }
                }
            }
            Self::SumDecimal { sums, scale } => {
                let target = DataType::Decimal128(DECIMAL128_MAX_PRECISION, *scale);
                let values = cast::cast(required(values)?, &target)?;
                let values = values.as_primitive::<Decimal128Type>();
                for (row, &group) in group_indices.iter().enumerate() {
                    if values.is_valid(row) {
                        let sum = sums[group].unwrap_or(0).checked_add(values.value(row));
                        sums[group] = Some(sum.ok_or_else(overflow)?);
                    }
                }
            }
            Self::SumFloat { sums } => {
                let values = cast::cast(required(values)?, &DataType::Float64)?;
                let values = values.as_primitive::<Float64Type>();
                for (row, &group) in group_indices.iter().enumerate() {
                    if values.is_valid(row) {
                        sums[group] = Some(sums[group].unwrap_or(0.0) + values.value(row));
                    }
                }
            }
        }
        Ok(())
    }

    /// The aggregate column, one row per group
    pub(crate) fn finish(self) -> Result<ArrayRef> {
        Ok(match self {
            Self::Count { counts, .. } => Arc::new(Int64Array::from(counts)),
            Self::SumInt { sums } => Arc::new(Int64Array::from(sums)),
            Self::SumDecimal { sums, scale } => Arc::new(
                Decimal128Array::from(sums)
                    .with_precision_and_scale(DECIMAL128_MAX_PRECISION, scale)?,
            ),
            Self::SumFloat { sums } => Arc::new(Float64Array::from(sums)),
        })
    }
}

fn required(values: Option<&ArrayRef>) -> Result<&ArrayRef> {
    values.ok_or_else(|| PipelineError::InvalidExpression("sum() requires an argument".to_string()))
}

fn overflow() -> PipelineError {
    PipelineError::InvalidExpression("sum() overflowed".to_string())
}
