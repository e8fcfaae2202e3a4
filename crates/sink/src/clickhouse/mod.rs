//! ClickHouse implementation of [`TableOperations`]
//!
//! Talks to the HTTP interface with reqwest. DDL goes in the POST body;
//! inserts put the statement in the `query` parameter and stream rows as
//! JSONEachRow. A truncating copy builds a scratch table, fills it from
//! the source, and atomically exchanges it with the destination.

mod encode;
mod error;
mod sql;

use std::time::Duration;

use async_trait::async_trait;
use tablesink_config::WarehouseConfig;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::credentials::WarehouseCredentials;
use crate::record::BoxedRecord;
use crate::schema::Schema;
use crate::table::{TableError, TableOperations, TableRef};

use error::{EXCEPTION_CODE_HEADER, classify, is_retryable};

/// Table operations against a ClickHouse server
#[derive(Clone)]
pub struct ClickHouseTableOperations {
    client: reqwest::Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    retry_attempts: u32,
}

impl std::fmt::Debug for ClickHouseTableOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseTableOperations")
            .field("url", &self.url)
            .field("username", &self.username)
            .finish()
    }
}

impl ClickHouseTableOperations {
    /// Build the HTTP client for the configured endpoint
    pub fn new(config: &WarehouseConfig) -> Result<Self, TableError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            retry_attempts: config.retry_attempts.max(1),
        })
    }

    /// Authenticate with materialised credentials
    ///
    /// Explicitly configured credentials take precedence.
    pub fn with_credentials(mut self, credentials: WarehouseCredentials) -> Self {
        if self.username.is_none() {
            self.username = Some(credentials.username);
            self.password = credentials.password;
        }
        self
    }

    fn request(&self) -> reqwest::RequestBuilder {
        let mut request = self.client.post(&self.url);
        if let Some(ref username) = self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }
        request
    }

    /// Run one statement whose errors are reported against `table`
    async fn execute(&self, statement: String, table: &TableRef) -> Result<(), TableError> {
        debug!(table = %table, statement = %statement, "executing statement");
        let response = self.request().body(statement).send().await?;
        check(response, table).await
    }

    async fn insert(&self, table: &TableRef, records: &[BoxedRecord]) -> Result<(), TableError> {
        let encoded = encode::encode_rows(records)?;
        let statement = sql::insert(table)?;

        let mut params = vec![
            ("query", statement),
            ("date_time_input_format", "best_effort".to_string()),
        ];
        if let Some(token) = encoded.dedup_token {
            params.push(("insert_deduplication_token", token));
        }

        let mut last_error = None;
        for attempt in 0..self.retry_attempts {
            let result = match self
                .request()
                .query(&params)
                .header("Content-Type", "application/x-ndjson")
                .body(encoded.body.clone())
                .send()
                .await
            {
                Ok(response) => check(response, table).await,
                Err(e) => Err(TableError::from(e)),
            };

            match result {
                Ok(()) => {
                    debug!(table = %table, rows = encoded.rows, "inserted rows");
                    return Ok(());
                }
                Err(e) if is_retryable(&e) && attempt + 1 < self.retry_attempts => {
                    warn!(
                        table = %table,
                        attempt = attempt,
                        error = %e,
                        "insert failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(100 * (1 << attempt.min(6)))).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| TableError::Http {
            status: 0,
            message: "no insert attempt was made".into(),
        }))
    }

    async fn drop_quietly(&self, table: &TableRef) {
        let result = match sql::drop_table(table) {
            Ok(statement) => self.execute(statement, table).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(table = %table, error = %e, "failed to drop scratch table");
        }
    }
}

async fn check(response: reqwest::Response, table: &TableRef) -> Result<(), TableError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let code = response
        .headers()
        .get(EXCEPTION_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let body = response.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), code, body.trim(), table))
}

#[async_trait]
impl TableOperations for ClickHouseTableOperations {
    async fn write(&self, table: &TableRef, rows: &[BoxedRecord]) -> Result<(), TableError> {
        if rows.is_empty() {
            debug!(table = %table, "empty batch, nothing to insert");
            return Ok(());
        }
        self.insert(table, rows).await
    }

    async fn create_table(&self, dataset: &str, schema: &Schema) -> Result<TableRef, TableError> {
        let table = self.table_ref(dataset, schema);
        let statement = sql::create_table(&table, schema)?;
        match self.execute(statement, &table).await {
            Ok(()) => debug!(table = %table, "created table"),
            Err(e) if e.is_already_exists() => debug!(table = %table, "table already exists"),
            Err(e) => return Err(e),
        }
        Ok(table)
    }

    async fn copy_table(&self, source: &TableRef, dest: &TableRef) -> Result<(), TableError> {
        let scratch = TableRef::new(
            dest.dataset.clone(),
            format!("{}_swap_{}", dest.table, Uuid::new_v4().simple()),
        );

        self.execute(sql::create_table_as(&scratch, dest)?, dest).await?;

        if let Err(e) = self
            .execute(sql::insert_select(&scratch, source)?, source)
            .await
        {
            self.drop_quietly(&scratch).await;
            return Err(e);
        }

        if let Err(e) = self.execute(sql::exchange(&scratch, dest)?, dest).await {
            self.drop_quietly(&scratch).await;
            return Err(e);
        }

        // scratch now holds the previous content of dest
        self.drop_quietly(&scratch).await;
        debug!(source = %source, dest = %dest, "replaced table content");
        Ok(())
    }

    async fn delete_table(&self, table: &TableRef) -> Result<(), TableError> {
        self.execute(sql::drop_table(table)?, table).await?;
        debug!(table = %table, "dropped table");
        Ok(())
    }
}
