//! Column layout of the sales dataset.

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};

/// Header of the order id column in the source files
pub const ORDER_ID: &str = "Order ID";
/// Header of the product column in the source files
pub const PRODUCT: &str = "Product";
/// Header of the quantity column in the source files
pub const QUANTITY_ORDERED: &str = "Quantity Ordered";
/// Header of the unit price column in the source files
pub const PRICE: &str = "Price";
/// Header of the order date column in the source files
pub const ORDER_DATE: &str = "Order Date";
/// Header of the order time column in the source files
pub const TIME: &str = "Time";
/// Header of the purchase address column in the source files
pub const PURCHASE_ADDRESS: &str = "Purchase Address";
/// Header of the city column in the source files
pub const CITY: &str = "City";
/// Header of the product type column in the source files
pub const PRODUCT_TYPE: &str = "Product Type";

/// Source headers in file order
pub const RAW_SALES_COLUMNS: [&str; 9] = [
    ORDER_ID,
    PRODUCT,
    QUANTITY_ORDERED,
    PRICE,
    ORDER_DATE,
    TIME,
    PURCHASE_ADDRESS,
    CITY,
    PRODUCT_TYPE,
];

/// Decimal type used for prices: 18 digits, 3 after the point
pub const PRICE_TYPE: DataType = DataType::Decimal128(18, 3);

/// Schema of the raw sales files: every column is nullable text
#[must_use]
pub fn raw_sales_schema() -> SchemaRef {
    Arc::new(Schema::new(
        RAW_SALES_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

/// Schema of the normalized `sales` table
#[must_use]
pub fn normalized_sales_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int32, true),
        Field::new("product", DataType::Utf8, true),
        Field::new("quantity", DataType::Int32, true),
        Field::new("price", PRICE_TYPE, true),
        Field::new("order_date", DataType::Date32, true),
        Field::new("purchase_address", DataType::Utf8, true),
    ]))
}
