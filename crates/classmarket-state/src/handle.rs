//! SurrealDB handle - connection and collection operations
//!
//! Manages the store connection and provides typed accessors for the five
//! entity collections: count, list, resolved list, find, insert,
//! repoint-by-filter and delete-by-filter.
//!
//! One connection per invocation; the handle owns no in-memory cache and
//! every side effect lands in the underlying store.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::sql::Thing;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::schema::{
    ClassRecord, ClassRef, ProductRecord, PurchaseRecord, StudentRecord, TeacherRecord,
};
use crate::Result;

/// Connection configuration for the classmarket store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Endpoint URL (e.g. "ws://localhost:8000" or "surrealkv://store.db")
    pub url: String,
    /// Namespace (default: "classmarket")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Optional root username
    pub username: Option<String>,
    /// Optional root password
    pub password: Option<String>,
}

impl StoreConfig {
    /// Create a configuration for an unauthenticated endpoint
    pub fn new(url: impl Into<String>) -> Self {
        StoreConfig {
            url: url.into(),
            namespace: "classmarket".to_string(),
            database: "main".to_string(),
            username: None,
            password: None,
        }
    }

    /// Set root credentials
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - CLASSMARKET_DB_URL (required)
    /// - CLASSMARKET_DB_NAMESPACE (optional, default: "classmarket")
    /// - CLASSMARKET_DB_DATABASE (optional, default: "main")
    /// - CLASSMARKET_DB_USERNAME / CLASSMARKET_DB_PASSWORD (optional pair)
    ///
    /// A missing URL is a configuration error; callers must surface it
    /// before attempting any connection.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("CLASSMARKET_DB_URL")
            .map_err(|_| StoreError::Config("CLASSMARKET_DB_URL not set".to_string()))?;
        let namespace = std::env::var("CLASSMARKET_DB_NAMESPACE")
            .unwrap_or_else(|_| "classmarket".to_string());
        let database =
            std::env::var("CLASSMARKET_DB_DATABASE").unwrap_or_else(|_| "main".to_string());
        let username = std::env::var("CLASSMARKET_DB_USERNAME").ok();
        let password = std::env::var("CLASSMARKET_DB_PASSWORD").ok();

        Ok(StoreConfig {
            url,
            namespace,
            database,
            username,
            password,
        })
    }
}

/// Explicit match predicate for bulk operations
///
/// Bulk writes never take an implicit filter: the caller states the
/// predicate even when the intent is to match everything, and the handle
/// logs the candidate count before the write so an accidental no-op
/// filter shows up in the logs.
#[derive(Debug, Clone)]
pub enum Match {
    /// Match every document in the collection
    All,
    /// Match documents whose `name` field equals the given value exactly
    NameEquals(String),
}

impl Match {
    fn where_clause(&self) -> &'static str {
        match self {
            Match::All => "",
            Match::NameEquals(_) => " WHERE name = $name",
        }
    }
}

/// The four collections that carry a `class_id` reference, in the fixed
/// order the reassignment procedure visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependent {
    Students,
    Teachers,
    Products,
    Purchases,
}

impl Dependent {
    /// Fixed reassignment order
    pub const ALL: [Dependent; 4] = [
        Dependent::Students,
        Dependent::Teachers,
        Dependent::Products,
        Dependent::Purchases,
    ];

    /// Table name in the store
    pub fn table(&self) -> &'static str {
        match self {
            Dependent::Students => "students",
            Dependent::Teachers => "teachers",
            Dependent::Products => "products",
            Dependent::Purchases => "purchases",
        }
    }

    /// Human-readable label for output lines
    pub fn label(&self) -> &'static str {
        match self {
            Dependent::Students => "Students",
            Dependent::Teachers => "Teachers",
            Dependent::Products => "Products",
            Dependent::Purchases => "Purchases",
        }
    }
}

impl std::fmt::Display for Dependent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A student joined against its class reference
#[derive(Debug, Clone)]
pub struct ResolvedStudent {
    pub record: StudentRecord,
    pub class: ClassRef,
}

/// A teacher joined against its class reference
#[derive(Debug, Clone)]
pub struct ResolvedTeacher {
    pub record: TeacherRecord,
    pub class: ClassRef,
}

/// A product joined against its class reference
#[derive(Debug, Clone)]
pub struct ResolvedProduct {
    pub record: ProductRecord,
    pub class: ClassRef,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

/// SurrealDB connection handle for the classmarket store
#[derive(Clone)]
pub struct StoreHandle {
    db: Surreal<Any>,
}

impl StoreHandle {
    /// Connect to the configured endpoint and set up the schema
    #[instrument(skip(config), fields(url = %config.url, namespace = %config.namespace, database = %config.database))]
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        info!("Connecting to classmarket store");

        let db = surrealdb::engine::any::connect(&config.url)
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root { username, password })
                .await
                .map_err(|e| StoreError::Connection(format!("Authentication failed: {}", e)))?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        let handle = StoreHandle { db };
        handle.init_schema().await?;

        info!("Store connected and schema initialized");
        Ok(handle)
    }

    /// Connect to an in-memory store (tests)
    #[instrument(skip_all)]
    pub async fn connect_memory() -> Result<Self> {
        let db = surrealdb::engine::any::connect("mem://")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        db.use_ns("classmarket")
            .use_db("main")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let handle = StoreHandle { db };
        handle.init_schema().await?;
        Ok(handle)
    }

    /// Initialize the store schema
    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing classmarket schema");

        // Record links are not enforced relations; a class_id may dangle
        // after its class is deleted, and the read path tolerates that.
        let schema = r#"
            -- Classes table
            DEFINE TABLE classes SCHEMAFULL;
            DEFINE FIELD name ON classes TYPE string;
            DEFINE FIELD description ON classes TYPE string;
            DEFINE FIELD created_at ON classes TYPE datetime;
            DEFINE INDEX idx_class_name ON classes FIELDS name;

            -- Students table
            DEFINE TABLE students SCHEMAFULL;
            DEFINE FIELD name ON students TYPE string;
            DEFINE FIELD password ON students TYPE option<string>;
            DEFINE FIELD balance ON students TYPE number;
            DEFINE FIELD class_id ON students TYPE option<record<classes>>;

            -- Teachers table
            DEFINE TABLE teachers SCHEMAFULL;
            DEFINE FIELD name ON teachers TYPE option<string>;
            DEFINE FIELD password ON teachers TYPE option<string>;
            DEFINE FIELD class_id ON teachers TYPE option<record<classes>>;
            DEFINE FIELD created_at ON teachers TYPE datetime;

            -- Products table
            DEFINE TABLE products SCHEMAFULL;
            DEFINE FIELD name ON products TYPE string;
            DEFINE FIELD price ON products TYPE number;
            DEFINE FIELD description ON products TYPE string;
            DEFINE FIELD image ON products TYPE string;
            DEFINE FIELD class_id ON products TYPE option<record<classes>>;
            DEFINE FIELD created_at ON products TYPE datetime;

            -- Purchases table (denormalized snapshots)
            DEFINE TABLE purchases SCHEMAFULL;
            DEFINE FIELD student_id ON purchases TYPE option<record<students>>;
            DEFINE FIELD student_name ON purchases TYPE string;
            DEFINE FIELD product_id ON purchases TYPE option<record<products>>;
            DEFINE FIELD product_name ON purchases TYPE string;
            DEFINE FIELD price ON purchases TYPE number;
            DEFINE FIELD class_id ON purchases TYPE option<record<classes>>;
            DEFINE FIELD status ON purchases TYPE string;
            DEFINE FIELD created_at ON purchases TYPE datetime;
            DEFINE FIELD approved_at ON purchases TYPE option<datetime>;
            DEFINE INDEX idx_purchase_created ON purchases FIELDS created_at;
        "#;

        self.db
            .query(schema)
            .await
            .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

        debug!("Schema initialized successfully");
        Ok(())
    }

    // ========== Shared helpers ==========

    async fn count_table(&self, table: &str, filter: &Match) -> Result<u64> {
        let sql = format!("SELECT count() FROM {}{} GROUP ALL", table, filter.where_clause());
        let mut result = self.run_filtered(sql, filter).await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }

    async fn list_table<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let mut result = self.db.query(format!("SELECT * FROM {}", table)).await?;
        Ok(result.take(0)?)
    }

    async fn create_in<T>(&self, table: &'static str, record: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let created: Option<T> = self.db.create(table).content(record).await?;
        created.ok_or_else(|| StoreError::NotPersisted(table.to_string()))
    }

    async fn run_filtered(&self, sql: String, filter: &Match) -> Result<surrealdb::Response> {
        let query = self.db.query(sql);
        let query = match filter {
            Match::NameEquals(name) => query.bind(("name", name.clone())),
            Match::All => query,
        };
        Ok(query.await?)
    }

    fn class_lookup(classes: Vec<ClassRecord>) -> HashMap<Thing, ClassRecord> {
        classes
            .into_iter()
            .filter_map(|c| c.id.clone().map(|id| (id, c)))
            .collect()
    }

    // ========== Count Operations ==========

    pub async fn count_classes(&self) -> Result<u64> {
        self.count_table("classes", &Match::All).await
    }

    pub async fn count_students(&self) -> Result<u64> {
        self.count_table("students", &Match::All).await
    }

    pub async fn count_teachers(&self) -> Result<u64> {
        self.count_table("teachers", &Match::All).await
    }

    pub async fn count_products(&self) -> Result<u64> {
        self.count_table("products", &Match::All).await
    }

    pub async fn count_purchases(&self) -> Result<u64> {
        self.count_table("purchases", &Match::All).await
    }

    // ========== List Operations ==========

    /// List all classes (store-returned order)
    #[instrument(skip(self))]
    pub async fn list_classes(&self) -> Result<Vec<ClassRecord>> {
        self.list_table("classes").await
    }

    /// List all students
    #[instrument(skip(self))]
    pub async fn list_students(&self) -> Result<Vec<StudentRecord>> {
        self.list_table("students").await
    }

    /// List all teachers
    #[instrument(skip(self))]
    pub async fn list_teachers(&self) -> Result<Vec<TeacherRecord>> {
        self.list_table("teachers").await
    }

    /// List all products
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductRecord>> {
        self.list_table("products").await
    }

    /// List all purchases
    #[instrument(skip(self))]
    pub async fn list_purchases(&self) -> Result<Vec<PurchaseRecord>> {
        self.list_table("purchases").await
    }

    /// The most recently created purchases, newest first
    #[instrument(skip(self))]
    pub async fn recent_purchases(&self, limit: usize) -> Result<Vec<PurchaseRecord>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT * FROM purchases ORDER BY created_at DESC LIMIT {}",
                limit
            ))
            .await?;

        let purchases: Vec<PurchaseRecord> = result.take(0)?;
        Ok(purchases)
    }

    // ========== Resolved Listings ==========

    /// List students with their class reference resolved
    ///
    /// Null or dangling references resolve to an explicit marker,
    /// never an error.
    #[instrument(skip(self))]
    pub async fn list_students_resolved(&self) -> Result<Vec<ResolvedStudent>> {
        let lookup = Self::class_lookup(self.list_classes().await?);
        let students = self.list_students().await?;

        Ok(students
            .into_iter()
            .map(|record| {
                let class = ClassRef::resolve(&record.class_id, |id| lookup.get(id));
                ResolvedStudent { record, class }
            })
            .collect())
    }

    /// List teachers with their class reference resolved
    #[instrument(skip(self))]
    pub async fn list_teachers_resolved(&self) -> Result<Vec<ResolvedTeacher>> {
        let lookup = Self::class_lookup(self.list_classes().await?);
        let teachers = self.list_teachers().await?;

        Ok(teachers
            .into_iter()
            .map(|record| {
                let class = ClassRef::resolve(&record.class_id, |id| lookup.get(id));
                ResolvedTeacher { record, class }
            })
            .collect())
    }

    /// List products with their class reference resolved
    #[instrument(skip(self))]
    pub async fn list_products_resolved(&self) -> Result<Vec<ResolvedProduct>> {
        let lookup = Self::class_lookup(self.list_classes().await?);
        let products = self.list_products().await?;

        Ok(products
            .into_iter()
            .map(|record| {
                let class = ClassRef::resolve(&record.class_id, |id| lookup.get(id));
                ResolvedProduct { record, class }
            })
            .collect())
    }

    // ========== Find Operations ==========

    /// Find classes matching a predicate
    #[instrument(skip(self))]
    pub async fn find_classes(&self, filter: &Match) -> Result<Vec<ClassRecord>> {
        let sql = format!("SELECT * FROM classes{}", filter.where_clause());
        let mut result = self.run_filtered(sql, filter).await?;
        Ok(result.take(0)?)
    }

    // ========== Insert Operations ==========

    /// Insert a class and return the persisted record with its assigned id
    #[instrument(skip(self, record), fields(name = %record.name))]
    pub async fn insert_class(&self, record: ClassRecord) -> Result<ClassRecord> {
        self.create_in("classes", record).await
    }

    /// Insert a student
    #[instrument(skip(self, record), fields(name = %record.name))]
    pub async fn insert_student(&self, record: StudentRecord) -> Result<StudentRecord> {
        self.create_in("students", record).await
    }

    /// Insert a teacher
    #[instrument(skip(self, record))]
    pub async fn insert_teacher(&self, record: TeacherRecord) -> Result<TeacherRecord> {
        self.create_in("teachers", record).await
    }

    /// Insert a product
    #[instrument(skip(self, record), fields(name = %record.name))]
    pub async fn insert_product(&self, record: ProductRecord) -> Result<ProductRecord> {
        self.create_in("products", record).await
    }

    /// Insert a purchase
    #[instrument(skip(self, record))]
    pub async fn insert_purchase(&self, record: PurchaseRecord) -> Result<PurchaseRecord> {
        self.create_in("purchases", record).await
    }

    // ========== Bulk Write Operations ==========

    /// Re-point the `class_id` of every matching document in a dependent
    /// collection; returns the modified count only
    ///
    /// The candidate count is logged before the write and the modified
    /// count after it, so an accidental no-op predicate is visible.
    #[instrument(skip(self, target), fields(collection = %dependent, target = %target))]
    pub async fn repoint_class_refs(
        &self,
        dependent: Dependent,
        filter: &Match,
        target: &Thing,
    ) -> Result<u64> {
        let candidates = self.count_table(dependent.table(), filter).await?;
        debug!(candidates, "repoint candidates matched");

        // RETURN VALUE id keeps the response to bare record ids; taking
        // whole rows here trips on untyped response values.
        let sql = format!(
            "UPDATE {}{} SET class_id = $target RETURN VALUE id",
            dependent.table(),
            filter.where_clause()
        );
        let query = self.db.query(sql).bind(("target", target.clone()));
        let mut result = match filter {
            Match::NameEquals(name) => query.bind(("name", name.clone())).await?,
            Match::All => query.await?,
        };

        let updated: Vec<Thing> = result.take(0)?;
        let modified = updated.len() as u64;

        info!(modified, "class references repointed");
        Ok(modified)
    }

    /// Delete every class matching a predicate; returns the removed count
    #[instrument(skip(self))]
    pub async fn delete_classes(&self, filter: &Match) -> Result<u64> {
        let sql = format!("DELETE classes{} RETURN BEFORE", filter.where_clause());
        let mut result = self.run_filtered(sql, filter).await?;

        let deleted: Vec<ClassRecord> = result.take(0)?;
        let removed = deleted.len() as u64;

        info!(removed, "classes deleted");
        Ok(removed)
    }
}
