//! Raw sales rows as serde records.

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::raw_sales_schema;

/// One row of a sales CSV file, every field kept as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSalesRecord {
    #[serde(rename = "Order ID")]
    pub order_id: Option<String>,
    #[serde(rename = "Product")]
    pub product: Option<String>,
    #[serde(rename = "Quantity Ordered")]
    pub quantity_ordered: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Order Date")]
    pub order_date: Option<String>,
    #[serde(rename = "Time")]
    pub time: Option<String>,
    #[serde(rename = "Purchase Address")]
    pub purchase_address: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Product Type")]
    pub product_type: Option<String>,
}

impl RawSalesRecord {
    /// A record with the columns the pipeline casts; the rest are derived
    /// from the address the way the source files lay them out
    #[must_use]
    pub fn new(
        order_id: &str,
        product: &str,
        quantity: &str,
        price: &str,
        order_date: &str,
        purchase_address: &str,
    ) -> Self {
        let city = purchase_address
            .split(',')
            .nth(1)
            .map(|city| city.trim().to_string());
        Self {
            order_id: Some(order_id.to_string()),
            product: Some(product.to_string()),
            quantity_ordered: Some(quantity.to_string()),
            price: Some(price.to_string()),
            order_date: Some(order_date.to_string()),
            time: None,
            purchase_address: Some(purchase_address.to_string()),
            city,
            product_type: None,
        }
    }

    /// Sets the product type
    #[must_use]
    pub fn with_product_type(mut self, product_type: &str) -> Self {
        self.product_type = Some(product_type.to_string());
        self
    }
}

/// Record batch with the raw sales schema holding `records`
pub fn raw_sales_batch(records: &[RawSalesRecord]) -> Result<RecordBatch> {
    let schema = raw_sales_schema();
    Ok(serde_arrow::to_record_batch(schema.fields(), &records)?)
}

/// Records held in a batch with the raw sales schema
pub fn raw_sales_records(batch: &RecordBatch) -> Result<Vec<RawSalesRecord>> {
    Ok(serde_arrow::from_record_batch(batch)?)
}
