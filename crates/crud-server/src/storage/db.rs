//! SQLite database layer (embedded, no external dependencies)
//!
//! Implements the address and customer repositories. Every write runs in its
//! own transaction so that the row check of an update and the write itself
//! are one unit.

use anyhow::{Context, Result};
use async_trait::async_trait;
use crud_core::{Address, AddressRepository, CrudError, Customer, CustomerRepository, EntityId};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Name of the foreign key from `customer.address_id` to `address.address_id`
pub const CUSTOMER_ADDRESS_FK: &str = "fk_customer_address";

const CUSTOMER_SELECT: &str = r#"
    SELECT c.customer_id, c.name, c.telephone_number,
           a.address_id, a.city, a.country, a.street_name,
           a.street_number, a.street_type, a.suburb
    FROM customer c
    LEFT JOIN address a ON a.address_id = c.address_id
"#;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_path: &str, max_connections: u32) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        // Create parent directory if needed
        if let Some(parent) = std::path::Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database. The pool is pinned to one connection that
    /// never expires, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        tracing::info!("SQLite connection established, creating tables...");

        Self::create_tables(&pool)
            .await
            .context("Failed to create database tables")?;

        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS address (
                address_id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT,
                country TEXT,
                street_name TEXT,
                street_number TEXT,
                street_type TEXT,
                suburb TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS customer (
                customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                telephone_number TEXT,
                address_id INTEGER,
                CONSTRAINT {CUSTOMER_ADDRESS_FK} FOREIGN KEY (address_id)
                    REFERENCES address (address_id)
            )
            "#
        ))
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Insert the sample rows used for demos. Does nothing once any address
    /// exists.
    pub async fn seed_sample_data(&self) -> Result<()> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM address")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            tracing::info!("Database already holds {} addresses, skipping seed", count);
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let addresses = [
            ("Lake", "33a", "Road", "Takapuna", "Auckland", "New Zealand"),
            ("Queen", "120", "Street", "Central", "Auckland", "New Zealand"),
            ("Cuba", "7", "Street", "Te Aro", "Wellington", "New Zealand"),
            ("Colombo", "211", "Street", "Sydenham", "Christchurch", "New Zealand"),
        ];
        let mut address_ids = Vec::with_capacity(addresses.len());
        for (street_name, street_number, street_type, suburb, city, country) in addresses {
            let id = sqlx::query(
                r#"
                INSERT INTO address (street_name, street_number, street_type, suburb, city, country)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(street_name)
            .bind(street_number)
            .bind(street_type)
            .bind(suburb)
            .bind(city)
            .bind(country)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
            address_ids.push(id);
        }

        // Link by the ids just assigned; AUTOINCREMENT need not start at 1
        let customers = [
            ("Aroha Ngata", "09 555 0101", Some(0_usize)),
            ("Liam Walker", "09 555 0102", Some(1)),
            ("Mele Tupou", "04 555 0103", Some(2)),
            ("Hana Kim", "03 555 0104", None),
        ];
        for (name, telephone_number, address_index) in customers {
            let address_id = address_index.and_then(|i| address_ids.get(i).copied());
            sqlx::query(
                r#"
                INSERT INTO customer (name, telephone_number, address_id)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(name)
            .bind(telephone_number)
            .bind(address_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Seeded sample addresses and customers");

        Ok(())
    }
}

/// Map a sqlx failure onto the domain error, recognizing foreign key
/// violations.
fn storage_error(err: sqlx::Error, operation: &str) -> CrudError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.kind(), ErrorKind::ForeignKeyViolation)
            || db_err.message().contains("FOREIGN KEY constraint failed")
        {
            return CrudError::integrity(CUSTOMER_ADDRESS_FK, operation, db_err.message());
        }
    }
    tracing::error!("Storage failure during {}: {}", operation, err);
    CrudError::Database(format!("{operation}: {err}"))
}

#[async_trait]
impl AddressRepository for Database {
    async fn find_by_id(&self, id: EntityId) -> crud_core::Result<Option<Address>> {
        let row: Option<AddressRow> = sqlx::query_as(
            r#"
            SELECT address_id, city, country, street_name, street_number, street_type, suburb
            FROM address WHERE address_id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(e, "find address"))?;

        Ok(row.map(Into::into))
    }

    async fn find_all(&self) -> crud_core::Result<Vec<Address>> {
        let rows: Vec<AddressRow> = sqlx::query_as(
            r#"
            SELECT address_id, city, country, street_name, street_number, street_type, suburb
            FROM address ORDER BY address_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(e, "list addresses"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save(&self, address: &Address) -> crud_core::Result<Option<Address>> {
        let operation = match address.address_id {
            Some(id) => format!("update address {id}"),
            None => "insert address".to_string(),
        };
        let fail = |e| storage_error(e, &operation);

        let mut tx = self.pool.begin().await.map_err(fail)?;

        let saved = match address.address_id {
            None => {
                let id = sqlx::query(
                    r#"
                    INSERT INTO address (city, country, street_name, street_number, street_type, suburb)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                )
                .bind(&address.city)
                .bind(&address.country)
                .bind(&address.street_name)
                .bind(&address.street_number)
                .bind(&address.street_type)
                .bind(&address.suburb)
                .execute(&mut *tx)
                .await
                .map_err(fail)?
                .last_insert_rowid();

                Some(address.clone().with_id(id))
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE address
                    SET city = ?1, country = ?2, street_name = ?3,
                        street_number = ?4, street_type = ?5, suburb = ?6
                    WHERE address_id = ?7
                    "#,
                )
                .bind(&address.city)
                .bind(&address.country)
                .bind(&address.street_name)
                .bind(&address.street_number)
                .bind(&address.street_type)
                .bind(&address.suburb)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(fail)?;

                (result.rows_affected() > 0).then(|| address.clone())
            }
        };

        tx.commit().await.map_err(fail)?;
        Ok(saved)
    }

    async fn delete(&self, id: EntityId) -> crud_core::Result<bool> {
        let operation = format!("delete address {id}");
        let fail = |e| storage_error(e, &operation);

        let mut tx = self.pool.begin().await.map_err(fail)?;
        let result = sqlx::query("DELETE FROM address WHERE address_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CustomerRepository for Database {
    async fn find_by_id(&self, id: EntityId) -> crud_core::Result<Option<Customer>> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("{CUSTOMER_SELECT} WHERE c.customer_id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error(e, "find customer"))?;

        Ok(row.map(Into::into))
    }

    async fn find_all(&self) -> crud_core::Result<Vec<Customer>> {
        let rows: Vec<CustomerRow> =
            sqlx::query_as(&format!("{CUSTOMER_SELECT} ORDER BY c.customer_id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| storage_error(e, "list customers"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save(&self, customer: &Customer) -> crud_core::Result<Option<Customer>> {
        let operation = match customer.customer_id {
            Some(id) => format!("update customer {id}"),
            None => "insert customer".to_string(),
        };
        let fail = |e| storage_error(e, &operation);

        let mut tx = self.pool.begin().await.map_err(fail)?;

        let id = match customer.customer_id {
            None => Some(
                sqlx::query(
                    r#"
                    INSERT INTO customer (name, telephone_number, address_id)
                    VALUES (?1, ?2, ?3)
                    "#,
                )
                .bind(&customer.name)
                .bind(&customer.telephone_number)
                .bind(customer.address_id())
                .execute(&mut *tx)
                .await
                .map_err(fail)?
                .last_insert_rowid(),
            ),
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE customer
                    SET name = ?1, telephone_number = ?2, address_id = ?3
                    WHERE customer_id = ?4
                    "#,
                )
                .bind(&customer.name)
                .bind(&customer.telephone_number)
                .bind(customer.address_id())
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(fail)?;

                (result.rows_affected() > 0).then_some(id)
            }
        };

        // Read back inside the transaction so the address is resolved from
        // the committed state of this write
        let saved = match id {
            Some(id) => {
                let row: Option<CustomerRow> =
                    sqlx::query_as(&format!("{CUSTOMER_SELECT} WHERE c.customer_id = ?1"))
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(fail)?;
                row.map(Customer::from)
            }
            None => None,
        };

        tx.commit().await.map_err(fail)?;
        Ok(saved)
    }

    async fn delete(&self, id: EntityId) -> crud_core::Result<bool> {
        let operation = format!("delete customer {id}");
        let fail = |e| storage_error(e, &operation);

        let mut tx = self.pool.begin().await.map_err(fail)?;
        let result = sqlx::query("DELETE FROM customer WHERE customer_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)?;

        Ok(result.rows_affected() > 0)
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct AddressRow {
    address_id: i64,
    city: Option<String>,
    country: Option<String>,
    street_name: Option<String>,
    street_number: Option<String>,
    street_type: Option<String>,
    suburb: Option<String>,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Address {
            address_id: Some(r.address_id),
            city: r.city,
            country: r.country,
            street_name: r.street_name,
            street_number: r.street_number,
            street_type: r.street_type,
            suburb: r.suburb,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    customer_id: i64,
    name: Option<String>,
    telephone_number: Option<String>,
    // Columns from the LEFT JOIN; all NULL when no address matched
    address_id: Option<i64>,
    city: Option<String>,
    country: Option<String>,
    street_name: Option<String>,
    street_number: Option<String>,
    street_type: Option<String>,
    suburb: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        let address = r.address_id.map(|address_id| Address {
            address_id: Some(address_id),
            city: r.city,
            country: r.country,
            street_name: r.street_name,
            street_number: r.street_number,
            street_type: r.street_type,
            suburb: r.suburb,
        });

        Customer {
            customer_id: Some(r.customer_id),
            name: r.name,
            telephone_number: r.telephone_number,
            address,
        }
    }
}
