//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Paginated listing with category/search filters and sort
//! - Quick search by name, description or exact barcode
//! - CRUD with soft delete
//! - Guarded stock adjustments
//!
//! ## Stock Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Read-then-write (two requests can both see stock = 3)           │
//! │     SELECT stock ...; UPDATE products SET stock = 0 ...             │
//! │                                                                     │
//! │  ✅ Guarded delta (SQLite serializes writers)                       │
//! │     UPDATE products SET stock = stock - ?2                          │
//! │     WHERE id = ?1 AND stock >= ?2                                   │
//! │     rows_affected == 0  →  missing product or not enough stock      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{contains_pattern, new_id, search_key};
use shopkeep_core::validation::{
    non_blank, stock_out_of_range, validate_movement_quantity, validate_non_negative,
    validate_product_name, validate_search_query, validate_stock,
};
use shopkeep_core::{
    CoreError, Page, PageRequest, Product, DEFAULT_CATEGORY, DEFAULT_LOW_STOCK_THRESHOLD,
    DEFAULT_UNIT, MAX_STOCK,
};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, description, price, cost, stock, barcode, \
     category, unit, expiry_date, supplier, batch_number, images, low_stock_threshold, \
     parent_id, is_active, created_at, updated_at";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: String,
    name: String,
    description: Option<String>,
    price: i64,
    cost: i64,
    stock: i64,
    barcode: Option<String>,
    category: String,
    unit: String,
    expiry_date: Option<DateTime<Utc>>,
    supplier: Option<String>,
    batch_number: Option<String>,
    images: String,
    low_stock_threshold: i64,
    parent_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            cost: row.cost,
            stock: row.stock,
            barcode: row.barcode,
            category: row.category,
            unit: row.unit,
            expiry_date: row.expiry_date,
            supplier: row.supplier,
            batch_number: row.batch_number,
            images: serde_json::from_str(&row.images).unwrap_or_default(),
            low_stock_threshold: row.low_stock_threshold,
            parent_id: row.parent_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn images_json(images: &[String]) -> DbResult<String> {
    serde_json::to_string(images).map_err(|e| DbError::Internal(e.to_string()))
}

// =============================================================================
// Inputs
// =============================================================================

/// Fields for a new product. Optional fields fall back to the catalog
/// defaults (category "Khác", unit "cái", threshold 10).
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub cost: i64,
    pub stock: i64,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    pub images: Vec<String>,
    pub low_stock_threshold: Option<i64>,
    pub parent_id: Option<String>,
}

/// Partial product update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub cost: Option<i64>,
    pub stock: Option<i64>,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    pub images: Option<Vec<String>>,
    pub low_stock_threshold: Option<i64>,
    pub is_active: Option<bool>,
}

/// Sort order for the catalog list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    /// Parses the `sort` query value; anything unknown means newest first.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("price_asc") => ProductSort::PriceAsc,
            Some("price_desc") => ProductSort::PriceDesc,
            Some("name_asc") => ProductSort::NameAsc,
            Some("name_desc") => ProductSort::NameDesc,
            _ => ProductSort::Newest,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            ProductSort::Newest => "created_at DESC, rowid DESC",
            ProductSort::PriceAsc => "price ASC, name ASC",
            ProductSort::PriceDesc => "price DESC, name ASC",
            ProductSort::NameAsc => "name ASC",
            ProductSort::NameDesc => "name DESC",
        }
    }
}

/// Catalog list filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Substring of name/description, or an exact barcode.
    pub search: Option<String>,
    pub sort: ProductSort,
}

/// Direction of a manual stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    Increment,
    Decrement,
}

// =============================================================================
// Connection-Level Helpers (usable inside a transaction)
// =============================================================================

/// Loads a product by id on the given connection.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Product::from))
}

/// Returns the id of the product that owns `barcode`, if any.
pub(crate) async fn barcode_owner(
    conn: &mut SqliteConnection,
    barcode: &str,
) -> DbResult<Option<String>> {
    let id: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE barcode = ?1")
        .bind(barcode)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

fn product_search_key(product: &Product) -> String {
    search_key(&[&product.name, product.description.as_deref().unwrap_or("")])
}

/// Inserts a product row without catalog-level duplicate checks.
pub(crate) async fn insert_product(
    conn: &mut SqliteConnection,
    new: &NewProduct,
    now: DateTime<Utc>,
) -> DbResult<Product> {
    let product = Product {
        id: new_id(),
        name: new.name.trim().to_string(),
        description: non_blank(new.description.clone()),
        price: new.price,
        cost: new.cost,
        stock: new.stock.max(0),
        barcode: non_blank(new.barcode.clone()),
        category: non_blank(new.category.clone()).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        unit: non_blank(new.unit.clone()).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        expiry_date: new.expiry_date,
        supplier: non_blank(new.supplier.clone()),
        batch_number: non_blank(new.batch_number.clone()),
        images: new.images.clone(),
        low_stock_threshold: new
            .low_stock_threshold
            .filter(|t| *t >= 0)
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        parent_id: new.parent_id.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    debug!(id = %product.id, name = %product.name, "Inserting product");

    let result = sqlx::query(
        r#"
        INSERT INTO products (
            id, name, description, price, cost, stock, barcode,
            category, unit, expiry_date, supplier, batch_number, images,
            low_stock_threshold, parent_id, is_active, created_at, updated_at, search_key
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 1, ?16, ?17, ?18)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.cost)
    .bind(product.stock)
    .bind(&product.barcode)
    .bind(&product.category)
    .bind(&product.unit)
    .bind(product.expiry_date)
    .bind(&product.supplier)
    .bind(&product.batch_number)
    .bind(images_json(&product.images)?)
    .bind(product.low_stock_threshold)
    .bind(&product.parent_id)
    .bind(product.created_at)
    .bind(product.updated_at)
    .bind(product_search_key(&product))
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(product),
        Err(e) => match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field == "products.barcode" => Err(
                DbError::duplicate("barcode", product.barcode.clone().unwrap_or_default()),
            ),
            other => Err(other),
        },
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
/// let results = repo.search("sữa", 10).await?;
/// let product = repo.get("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products, one page at a time.
    pub async fn list(&self, filter: &ProductFilter, page: PageRequest) -> DbResult<Page<Product>> {
        let category = non_blank(filter.category.clone());
        let search = non_blank(filter.search.clone());
        let pattern = search.as_deref().map(contains_pattern);

        debug!(?category, ?search, page = page.page, "Listing products");

        let filter_sql = r#"
            WHERE is_active = 1
              AND (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR search_key LIKE ?2 ESCAPE '\' OR barcode = ?3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {}", filter_sql))
            .bind(&category)
            .bind(&pattern)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM products {} ORDER BY {} LIMIT ?4 OFFSET ?5",
            PRODUCT_COLUMNS,
            filter_sql,
            filter.sort.order_by()
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&category)
            .bind(&pattern)
            .bind(&search)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.into_iter().map(Product::from).collect(),
            total,
            request: page,
        })
    }

    /// Quick search for the sale screen: name/description substring or
    /// exact barcode, active products only.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        let sql = format!(
            r#"
            SELECT {} FROM products
            WHERE is_active = 1
              AND (search_key LIKE ?1 ESCAPE '\' OR barcode = ?2)
            ORDER BY name
            LIMIT ?3
            "#,
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(contains_pattern(&query))
            .bind(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by its ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Finds a product by exact barcode.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE barcode = ?1", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// Adds a product to the catalog.
    ///
    /// ## Errors
    /// - `Rule(Validation)` for a blank name or negative price/cost
    /// - `UniqueViolation(barcode)` if the barcode is taken
    /// - `UniqueViolation(batchNumber)` if the same name already has this batch
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name)?;
        validate_non_negative("price", new.price)?;
        validate_non_negative("cost", new.cost)?;
        validate_stock(new.stock)?;

        let mut conn = self.pool.acquire().await?;

        if let Some(barcode) = non_blank(new.barcode.clone()) {
            if barcode_owner(&mut conn, &barcode).await?.is_some() {
                return Err(DbError::duplicate("barcode", barcode));
            }
        }

        if let Some(batch) = non_blank(new.batch_number.clone()) {
            let taken: Option<String> = sqlx::query_scalar(
                "SELECT id FROM products WHERE name = ?1 AND batch_number = ?2 AND is_active = 1",
            )
            .bind(new.name.trim())
            .bind(&batch)
            .fetch_optional(&mut *conn)
            .await?;
            if taken.is_some() {
                return Err(DbError::duplicate("batchNumber", batch));
            }
        }

        insert_product(&mut conn, new, Utc::now()).await
    }

    /// Applies a partial update and returns the updated product.
    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let mut product = self.get(id).await?;

        if let Some(name) = &update.name {
            product.name = validate_product_name(name)?;
        }
        if let Some(description) = &update.description {
            product.description = non_blank(Some(description.clone()));
        }
        if let Some(price) = update.price {
            validate_non_negative("price", price)?;
            product.price = price;
        }
        if let Some(cost) = update.cost {
            validate_non_negative("cost", cost)?;
            product.cost = cost;
        }
        if let Some(stock) = update.stock {
            validate_stock(stock)?;
            product.stock = stock.max(0);
        }
        if let Some(barcode) = &update.barcode {
            product.barcode = non_blank(Some(barcode.clone()));
        }
        if let Some(category) = non_blank(update.category.clone()) {
            product.category = category;
        }
        if let Some(unit) = non_blank(update.unit.clone()) {
            product.unit = unit;
        }
        if update.expiry_date.is_some() {
            product.expiry_date = update.expiry_date;
        }
        if let Some(supplier) = &update.supplier {
            product.supplier = non_blank(Some(supplier.clone()));
        }
        if let Some(batch) = &update.batch_number {
            product.batch_number = non_blank(Some(batch.clone()));
        }
        if let Some(images) = &update.images {
            product.images = images.clone();
        }
        if let Some(threshold) = update.low_stock_threshold {
            validate_non_negative("lowStockThreshold", threshold)?;
            product.low_stock_threshold = threshold;
        }
        if let Some(active) = update.is_active {
            product.is_active = active;
        }
        product.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2, description = ?3, price = ?4, cost = ?5, stock = ?6,
                barcode = ?7, category = ?8, unit = ?9, expiry_date = ?10,
                supplier = ?11, batch_number = ?12, images = ?13,
                low_stock_threshold = ?14, is_active = ?15, updated_at = ?16,
                search_key = ?17
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.cost)
        .bind(product.stock)
        .bind(&product.barcode)
        .bind(&product.category)
        .bind(&product.unit)
        .bind(product.expiry_date)
        .bind(&product.supplier)
        .bind(&product.batch_number)
        .bind(images_json(&product.images)?)
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(product_search_key(&product))
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field == "products.barcode" => {
                DbError::duplicate("barcode", product.barcode.clone().unwrap_or_default())
            }
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Increments or decrements stock by `quantity`.
    ///
    /// ## Errors
    /// - `NotFound` if the product doesn't exist
    /// - `Rule(InsufficientStock)` if a decrement would go below zero
    /// - `Rule(Validation)` if an increment would pass `MAX_STOCK`
    pub async fn adjust_stock(
        &self,
        id: &str,
        quantity: i64,
        direction: StockAdjustment,
    ) -> DbResult<Product> {
        validate_movement_quantity(quantity)?;
        debug!(id = %id, quantity, ?direction, "Adjusting stock");

        let now = Utc::now();
        let result = match direction {
            StockAdjustment::Increment => {
                sqlx::query(
                    "UPDATE products SET stock = stock + ?2, updated_at = ?3 \
                     WHERE id = ?1 AND stock <= ?4 - ?2",
                )
                .bind(id)
                .bind(quantity)
                .bind(now)
                .bind(MAX_STOCK)
                .execute(&self.pool)
                .await?
            }
            StockAdjustment::Decrement => {
                sqlx::query(
                    "UPDATE products SET stock = stock - ?2, updated_at = ?3 \
                     WHERE id = ?1 AND stock >= ?2",
                )
                .bind(id)
                .bind(quantity)
                .bind(now)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            let product = self.get(id).await?;
            if direction == StockAdjustment::Increment {
                return Err(stock_out_of_range().into());
            }
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: quantity,
            }
            .into());
        }

        self.get(id).await
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical orders and movements keep referencing the row.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Active, in-stock products that carry an expiry date, soonest first.
    pub async fn expiring(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products \
             WHERE is_active = 1 AND expiry_date IS NOT NULL AND stock > 0 \
             ORDER BY expiry_date ASC",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
