//! MongoDB-backed historical store.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, IndexModel};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::ReadingStore;
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{StoreDiagnostics, StoredReading};

const APP_NAME: &str = "sensor-gateway";

/// Query adapter over the readings collection.
///
/// # Connection Handling
///
/// The driver pools connections internally, so one [`Client`] serves every
/// request. When the client is missing (startup failed) or the last query
/// failed with a connection-class error, the next query attempts exactly one
/// reconnect before giving up with `ServiceUnavailable`. Concurrent requests
/// share that attempt through [`ConnectionState`].
///
/// On every successful connect the adapter ensures the `sensor_id` ascending
/// and `timestamp` descending indexes exist.
pub struct MongoStore {
    uri: String,
    database: String,
    collection: String,
    operation_timeout: Duration,
    client: RwLock<Option<Client>>,
    state: ConnectionState,
}

impl MongoStore {
    /// Build the adapter and try to connect once.
    ///
    /// A store that is down at startup is logged and retried per request.
    #[instrument(skip(config), fields(database = %config.mongodb_database, collection = %config.mongodb_collection))]
    pub async fn connect(config: &Config) -> Self {
        let store = Self {
            uri: config.mongodb_uri.clone(),
            database: config.mongodb_database.clone(),
            collection: config.mongodb_collection.clone(),
            operation_timeout: config.operation_timeout,
            client: RwLock::new(None),
            state: ConnectionState::new(),
        };

        if let Err(e) = store.reconnect().await {
            warn!(error = %e, "MongoDB unavailable at startup, will retry on demand");
        }

        store
    }

    /// Create a client, verify it with a ping, and bootstrap indexes.
    async fn establish(&self) -> Result<Client, mongodb::error::Error> {
        let mut options = ClientOptions::parse(&self.uri).await?;
        options.server_selection_timeout = Some(self.operation_timeout);
        options.connect_timeout = Some(self.operation_timeout);
        options.app_name = Some(APP_NAME.to_string());

        let client = Client::with_options(options)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        let collection: Collection<Document> =
            client.database(&self.database).collection(&self.collection);
        if let Err(e) = ensure_indexes(&collection).await {
            warn!(error = %e, "Failed to ensure readings indexes");
        }

        Ok(client)
    }

    /// Replace the client, or wait for a reconnect already in flight.
    async fn reconnect(&self) -> AppResult<Client> {
        if !self.state.start_reconnecting() {
            self.state.wait_for_reconnection().await;
            return match self.client.read().await.clone() {
                Some(client) if self.state.is_connected() => Ok(client),
                _ => Err(AppError::ServiceUnavailable(
                    "MongoDB reconnect by another request failed".to_string(),
                )),
            };
        }

        let result = match timeout(self.operation_timeout * 2, self.establish()).await {
            Ok(Ok(client)) => {
                *self.client.write().await = Some(client.clone());
                self.state.set_connected(true);
                metrics::set_store_connected(true);
                info!("Connected to MongoDB");
                Ok(client)
            }
            Ok(Err(e)) => {
                self.mark_failed();
                Err(AppError::ServiceUnavailable(format!(
                    "MongoDB connection failed: {e}"
                )))
            }
            Err(_) => {
                self.mark_failed();
                Err(AppError::ServiceUnavailable(
                    "MongoDB connection timed out".to_string(),
                ))
            }
        };

        self.state.stop_reconnecting();
        result
    }

    async fn ready_client(&self) -> AppResult<Client> {
        if self.state.is_connected() {
            if let Some(client) = self.client.read().await.clone() {
                return Ok(client);
            }
        }
        self.reconnect().await
    }

    fn mark_failed(&self) {
        let failures = self.state.record_failure();
        metrics::set_store_connected(false);
        warn!(failures, "MongoDB marked disconnected");
    }

    fn classify(&self, e: mongodb::error::Error) -> AppError {
        if is_connection_error(&e) {
            self.mark_failed();
            AppError::ServiceUnavailable(format!("MongoDB connection error: {e}"))
        } else {
            AppError::StoreError(e.to_string())
        }
    }

    async fn find(&self, filter: Document, limit: i64) -> AppResult<Vec<StoredReading>> {
        let client = self.ready_client().await?;
        let collection: Collection<Document> =
            client.database(&self.database).collection(&self.collection);

        let query = async {
            let mut cursor = collection
                .find(filter)
                .sort(doc! { "timestamp": -1 })
                .limit(limit)
                .await?;

            let mut readings = Vec::new();
            while cursor.advance().await? {
                let document = cursor.deserialize_current()?;
                match document_to_reading(document) {
                    Some(reading) => readings.push(reading),
                    None => warn!("Skipping stored document that does not decode as a reading"),
                }
            }
            Ok::<_, mongodb::error::Error>(readings)
        };

        match timeout(self.operation_timeout, query).await {
            Ok(Ok(readings)) => {
                debug!(count = readings.len(), "Readings fetched");
                Ok(readings)
            }
            Ok(Err(e)) => Err(self.classify(e)),
            Err(_) => {
                self.mark_failed();
                Err(AppError::ServiceUnavailable(format!(
                    "MongoDB query timed out after {:?}",
                    self.operation_timeout
                )))
            }
        }
    }

    async fn collect_diagnostics(
        &self,
        client: &Client,
    ) -> Result<StoreDiagnostics, mongodb::error::Error> {
        let database = client.database(&self.database);
        let collections = database.list_collection_names().await?;
        let count = database
            .collection::<Document>(&self.collection)
            .count_documents(doc! {})
            .await?;

        Ok(StoreDiagnostics {
            connected: true,
            collections,
            sensor_data_count: count,
        })
    }
}

#[async_trait]
impl ReadingStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<StoredReading>> {
        self.find(readings_filter(None), limit).await
    }

    #[instrument(skip(self))]
    async fn list_by_sensor(&self, sensor_id: &str, limit: i64) -> AppResult<Vec<StoredReading>> {
        self.find(readings_filter(Some(sensor_id)), limit).await
    }

    async fn diagnostics(&self) -> StoreDiagnostics {
        let client = self.client.read().await.clone();
        let Some(client) = client.filter(|_| self.state.is_connected()) else {
            return StoreDiagnostics::default();
        };

        match timeout(self.operation_timeout, self.collect_diagnostics(&client)).await {
            Ok(Ok(diagnostics)) => diagnostics,
            Ok(Err(e)) => {
                warn!(error = %e, "MongoDB diagnostics failed");
                StoreDiagnostics::default()
            }
            Err(_) => {
                warn!("MongoDB diagnostics timed out");
                StoreDiagnostics::default()
            }
        }
    }

    async fn close(&self) {
        let client = self.client.write().await.take();
        self.state.set_connected(false);
        metrics::set_store_connected(false);
        if let Some(client) = client {
            client.shutdown().await;
            info!("MongoDB client shut down");
        }
    }
}

async fn ensure_indexes(collection: &Collection<Document>) -> Result<(), mongodb::error::Error> {
    let indexes = vec![
        IndexModel::builder().keys(doc! { "sensor_id": 1 }).build(),
        IndexModel::builder().keys(doc! { "timestamp": -1 }).build(),
    ];
    collection.create_indexes(indexes).await?;
    debug!("Readings indexes ensured");
    Ok(())
}

fn is_connection_error(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. }
    )
}

/// Query filter matching reading documents only.
///
/// The collection also holds whatever else the worker writes, so the filter
/// requires every reading field and a numeric `value`. The server-side limit
/// then counts readings, and a sensor with stored readings never comes back
/// empty because of unrelated documents.
fn readings_filter(sensor_id: Option<&str>) -> Document {
    let mut filter = doc! {
        "sensor_id": { "$exists": true },
        "sensor_type": { "$exists": true },
        "location": { "$exists": true },
        "value": { "$type": "number" },
        "timestamp": { "$exists": true },
    };
    if let Some(id) = sensor_id {
        filter.insert("sensor_id", id);
    }
    filter
}

/// Convert a raw document into a reading.
///
/// `ObjectId` values become hex strings and BSON dates become RFC 3339
/// strings at any depth, so the JSON returned to clients stays plain.
/// Documents missing a required reading field yield `None`.
fn document_to_reading(document: Document) -> Option<StoredReading> {
    let json = plain_bson(Bson::Document(document)).into_relaxed_extjson();
    serde_json::from_value(json).ok()
}

fn plain_bson(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(text) => Bson::String(text),
            Err(_) => Bson::DateTime(dt),
        },
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .map(|(key, value)| (key, plain_bson(value)))
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.into_iter().map(plain_bson).collect()),
        other => other,
    }
}
