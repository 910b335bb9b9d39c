//! The MySQL adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::debug;

use polystore_core::{
    adapter::DataAdapter,
    connection::{ConnectionDescriptor, ConnectionType},
    document::Document,
    error::{DataError, DataResult},
    query::QueryOptions,
};

use crate::statement;
use crate::types::row_to_document;

/// Connection settings for a relational backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

/// Adapter for MySQL-compatible relational databases.
///
/// Opens one short-lived connection per operation rather than holding a
/// pool; the adapter itself stays connectionless and cheap to share.
#[derive(Debug, Clone)]
pub struct SqlAdapter {
    config: SqlConfig,
}

impl SqlAdapter {
    pub fn new(config: SqlConfig) -> Self {
        Self { config }
    }

    /// Builds an adapter from a registered connection descriptor.
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> DataResult<Self> {
        descriptor.expect_type(ConnectionType::Relational)?;
        let config: SqlConfig =
            serde_json::from_value(Value::Object(descriptor.key.clone())).map_err(|e| {
                DataError::Configuration(format!(
                    "invalid credentials for relational connection '{}': {e}",
                    descriptor.name
                ))
            })?;
        Ok(Self::new(config))
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
    }

    async fn connect(&self) -> DataResult<MySqlConnection> {
        self.connect_options()
            .connect()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))
    }

    async fn execute(&self, stmt: &statement::Statement) -> DataResult<sqlx::mysql::MySqlQueryResult> {
        debug!(sql = %stmt.sql, "executing statement");
        let mut conn = self.connect().await?;
        let mut query = sqlx::query(&stmt.sql);
        for value in &stmt.binds {
            query = bind_value(query, value);
        }
        let result = query
            .execute(&mut conn)
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        conn.close()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        Ok(result)
    }
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
    value: &Value,
) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => query.bind(s.clone()),
        // Arrays and objects travel as their JSON text.
        other => query.bind(other.to_string()),
    }
}

#[async_trait]
impl DataAdapter for SqlAdapter {
    async fn get_documents(&self, options: &QueryOptions) -> DataResult<Vec<Document>> {
        let stmt = statement::build_select(options);
        debug!(sql = %stmt.sql, "running select");

        let mut conn = self.connect().await?;
        let mut query = sqlx::query(&stmt.sql);
        for value in &stmt.binds {
            query = bind_value(query, value);
        }
        let rows = query
            .fetch_all(&mut conn)
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        conn.close()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn add_document(&self, collection: &str, data: Document) -> DataResult<String> {
        let stmt = statement::build_insert(collection, &data);
        let result = self.execute(&stmt).await?;
        Ok(result.last_insert_id().to_string())
    }

    async fn update_document(&self, collection: &str, id: &str, data: Document) -> DataResult<()> {
        let Some(stmt) = statement::build_update(collection, id, &data) else {
            return Ok(());
        };
        self.execute(&stmt).await?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> DataResult<()> {
        let stmt = statement::build_delete(collection, id);
        self.execute(&stmt).await?;
        Ok(())
    }

    /// Conditional update in a single statement instead of the simulated
    /// read-then-mutate loop.
    async fn update_by_filter(
        &self,
        options: &QueryOptions,
        data: Document,
        limit_to_one: bool,
    ) -> DataResult<()> {
        let Some(stmt) = statement::build_update_by_filter(options, &data, limit_to_one) else {
            return Ok(());
        };
        self.execute(&stmt).await?;
        Ok(())
    }

    async fn delete_by_filter(&self, options: &QueryOptions, limit_to_one: bool) -> DataResult<()> {
        let stmt = statement::build_delete_by_filter(options, limit_to_one);
        self.execute(&stmt).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::connection::CredentialMap;
    use serde_json::json;

    fn credentials(value: serde_json::Value) -> CredentialMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn descriptor_credentials_parse_with_defaults() {
        let descriptor = ConnectionDescriptor::new(
            "db",
            ConnectionType::Relational,
            credentials(json!({"user": "app", "database": "prod"})),
        );

        let adapter = SqlAdapter::from_descriptor(&descriptor).unwrap();
        assert_eq!(adapter.config.host, "localhost");
        assert_eq!(adapter.config.port, 3306);
        assert_eq!(adapter.config.password, "");
        assert_eq!(adapter.config.database, "prod");
    }

    #[test]
    fn descriptor_of_wrong_type_is_rejected() {
        let descriptor = ConnectionDescriptor::new(
            "db",
            ConnectionType::MongoDb,
            credentials(json!({"user": "app", "database": "prod"})),
        );

        let err = SqlAdapter::from_descriptor(&descriptor).unwrap_err();
        assert!(matches!(err, DataError::Configuration(_)));
    }

    #[test]
    fn missing_required_credentials_fail() {
        let descriptor = ConnectionDescriptor::new(
            "db",
            ConnectionType::Relational,
            credentials(json!({"host": "db.internal"})),
        );

        let err = SqlAdapter::from_descriptor(&descriptor).unwrap_err();
        assert!(matches!(err, DataError::Configuration(_)));
    }
}
