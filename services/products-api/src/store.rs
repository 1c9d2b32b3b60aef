use crate::config::{AwsConfig, TableConfig};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoClient;
use commerce_core::{CreateProductRequest, Product};
use serde::{Deserialize, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, from_items, to_item};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Errors surfaced by the product store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested product does not exist. Recoverable; maps to 404.
    #[error("product not found")]
    NotFound,

    /// A conditional write failed because the product or stock record
    /// already exists.
    #[error("product or stock record already exists")]
    Conflict,

    /// Any other failure of the underlying store.
    #[error("store operation failed: {0}")]
    Backend(String),
}

/// Product record as stored in the products table.
///
/// Stock counts are not stored here; they live in the stocks table and are
/// merged in at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProductItem {
    id: Uuid,
    title: String,
    description: String,
    price: f64,
}

/// Stock record as stored in the stocks table, keyed by `product_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StockItem {
    product_id: Uuid,
    count: i32,
}

/// Read/write adapter for the product and stock tables.
///
/// Constructed once at startup and shared across handlers; the underlying
/// client is reused for the life of the process.
pub struct ProductStore {
    client: DynamoClient,
    tables: TableConfig,
}

impl ProductStore {
    /// Create a new store adapter.
    pub async fn new(aws: &AwsConfig, tables: TableConfig) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(aws.region.clone()));

        // Custom endpoint for LocalStack / DynamoDB Local
        if let Some(ref endpoint_url) = aws.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;
        let client = DynamoClient::new(&sdk_config);

        info!(
            products_table = %tables.products,
            stocks_table = %tables.stocks,
            region = %aws.region,
            "Product store initialized"
        );

        Ok(Self { client, tables })
    }

    /// Fetch a single product by ID, merging in its stock count.
    ///
    /// Absence of the product is a [`StoreError::NotFound`], not a backend
    /// failure. Absence of the stock record yields `count = 0`.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<Product, StoreError> {
        let response = self
            .client
            .get_item()
            .table_name(&self.tables.products)
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, table = %self.tables.products, "Failed to get product");
                StoreError::Backend("could not fetch product".to_string())
            })?;

        let item = response.item.ok_or(StoreError::NotFound)?;
        let product: ProductItem = from_item(item).map_err(|e| {
            error!(error = %e, table = %self.tables.products, "Failed to deserialize product item");
            StoreError::Backend("could not fetch product".to_string())
        })?;

        let count = self.get_stock_count(id).await?;

        Ok(assemble_product(product, count))
    }

    /// Fetch the product list with stock counts merged in.
    ///
    /// Both tables are read with a bounded scan; no pagination continuation is
    /// followed. Stock records with no matching product are dropped.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let products: Vec<ProductItem> = self.scan_table(&self.tables.products).await?;
        let stocks: Vec<StockItem> = self.scan_table(&self.tables.stocks).await?;

        Ok(merge_stock_counts(products, stocks))
    }

    /// Create a product and its stock record atomically.
    ///
    /// A fresh identifier is generated per call. Both puts are conditional on
    /// their key not existing; a condition failure on either surfaces as
    /// [`StoreError::Conflict`] and neither record becomes visible.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<Product, StoreError> {
        let id = Uuid::new_v4();

        let product_item = ProductItem {
            id,
            title: request.title,
            description: request.description,
            price: request.price,
        };
        let stock_item = StockItem {
            product_id: id,
            count: request.count,
        };

        let product_attrs = to_item(&product_item)
            .map_err(|e| StoreError::Backend(format!("could not serialize product: {e}")))?;
        let stock_attrs = to_item(&stock_item)
            .map_err(|e| StoreError::Backend(format!("could not serialize stock: {e}")))?;

        let put_product = Put::builder()
            .table_name(&self.tables.products)
            .set_item(Some(product_attrs))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| StoreError::Backend(format!("invalid product put: {e}")))?;

        let put_stock = Put::builder()
            .table_name(&self.tables.stocks)
            .set_item(Some(stock_attrs))
            .condition_expression("attribute_not_exists(product_id)")
            .build()
            .map_err(|e| StoreError::Backend(format!("invalid stock put: {e}")))?;

        self.client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(put_product).build())
            .transact_items(TransactWriteItem::builder().put(put_stock).build())
            .send()
            .await
            .map_err(|e| {
                if is_condition_failure(&e) {
                    error!(product_id = %id, "Conditional check failed creating product");
                    StoreError::Conflict
                } else {
                    error!(
                        error = %e,
                        products_table = %self.tables.products,
                        stocks_table = %self.tables.stocks,
                        "Transactional write failed"
                    );
                    StoreError::Backend("could not create product".to_string())
                }
            })?;

        info!(product_id = %id, "Product created");

        Ok(assemble_product(product_item, stock_item.count))
    }

    /// Look up the stock count for one product; absent record means zero.
    async fn get_stock_count(&self, product_id: Uuid) -> Result<i32, StoreError> {
        let response = self
            .client
            .get_item()
            .table_name(&self.tables.stocks)
            .key("product_id", AttributeValue::S(product_id.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, table = %self.tables.stocks, "Failed to get stock record");
                StoreError::Backend("could not fetch stock".to_string())
            })?;

        match response.item {
            Some(item) => {
                let stock: StockItem = from_item(item).map_err(|e| {
                    error!(error = %e, table = %self.tables.stocks, "Failed to deserialize stock item");
                    StoreError::Backend("could not fetch stock".to_string())
                })?;
                Ok(stock.count)
            }
            None => Ok(0),
        }
    }

    /// Bounded scan of one table into typed records.
    async fn scan_table<T>(&self, table: &str) -> Result<Vec<T>, StoreError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .scan()
            .table_name(table)
            .limit(self.tables.scan_limit)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, table = %table, "Scan failed");
                StoreError::Backend(format!("could not scan table {table}"))
            })?;

        let items = response.items.unwrap_or_default();
        from_items(items).map_err(|e| {
            error!(error = %e, table = %table, "Failed to deserialize scanned items");
            StoreError::Backend(format!("could not read items from {table}"))
        })
    }
}

/// Merge scanned stock counts into products by `id == product_id`.
///
/// Products with no stock record default to a count of zero; stock records
/// with no matching product are never surfaced.
fn merge_stock_counts(products: Vec<ProductItem>, stocks: Vec<StockItem>) -> Vec<Product> {
    let counts: HashMap<Uuid, i32> = stocks.into_iter().map(|s| (s.product_id, s.count)).collect();

    products
        .into_iter()
        .map(|item| {
            let count = counts.get(&item.id).copied().unwrap_or(0);
            assemble_product(item, count)
        })
        .collect()
}

fn assemble_product(item: ProductItem, count: i32) -> Product {
    Product {
        id: item.id,
        title: item.title,
        description: item.description,
        price: item.price,
        count,
    }
}

/// True when a transactional write was canceled by a conditional check, i.e.
/// one of the records already exists.
fn is_condition_failure(err: &SdkError<TransactWriteItemsError>) -> bool {
    match err.as_service_error() {
        Some(TransactWriteItemsError::TransactionCanceledException(canceled)) => canceled
            .cancellation_reasons()
            .iter()
            .any(|reason| reason.code() == Some("ConditionalCheckFailed")),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_item(id: Uuid, title: &str) -> ProductItem {
        ProductItem {
            id,
            title: title.to_string(),
            description: String::new(),
            price: 10.0,
        }
    }

    #[test]
    fn merge_fills_missing_stock_with_zero() {
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let products = vec![product_item(id_a, "a"), product_item(id_b, "b")];
        let stocks = vec![StockItem {
            product_id: id_a,
            count: 5,
        }];

        let merged = merge_stock_counts(products, stocks);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].count, 5);
        assert_eq!(merged[1].count, 0);
    }

    #[test]
    fn merge_never_surfaces_phantom_products() {
        let stocks = vec![StockItem {
            product_id: Uuid::new_v4(),
            count: 3,
        }];

        let merged = merge_stock_counts(vec![], stocks);
        assert!(merged.is_empty());
    }

    #[test]
    fn stored_product_item_round_trips_through_dynamo_attributes() {
        let item = product_item(Uuid::new_v4(), "Widget");

        let attrs: std::collections::HashMap<String, AttributeValue> =
            to_item(&item).unwrap();
        assert!(attrs.contains_key("id"));
        assert!(!attrs.contains_key("count"));

        let back: ProductItem = from_item(attrs).unwrap();
        assert_eq!(back.id, item.id);
        assert_eq!(back.title, "Widget");
    }

    #[test]
    fn stock_item_uses_snake_case_foreign_key() {
        let stock = StockItem {
            product_id: Uuid::new_v4(),
            count: 2,
        };

        let attrs: std::collections::HashMap<String, AttributeValue> =
            to_item(&stock).unwrap();
        assert!(attrs.contains_key("product_id"));
    }
}
