//! S3-compatible blob storage client
//!
//! Objects live in a single container and are addressed by the URL returned
//! from [`BlobStorage::upload`]. URLs outside that container are rejected.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BlobConnectionString, BlobMetadata, BlobStorage, StorageError};

const META_PREFIX: &str = "x-amz-meta-";
const META_ORIGINAL_FILENAME: &str = "original-filename";
const META_UPLOADED_AT: &str = "uploaded-at";

pub struct ObjectStorageClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    connection: BlobConnectionString,
}

impl ObjectStorageClient {
    /// Connect to the container, creating it when it does not exist yet
    pub async fn new(
        connection: BlobConnectionString,
        container: &str,
    ) -> Result<Self, StorageError> {
        let credentials = match (&connection.account_name, &connection.account_key) {
            (Some(name), Some(key)) => {
                Credentials::new(Some(name.as_str()), Some(key.as_str()), None, None, None)
            }
            _ => Credentials::anonymous(),
        }
        .map_err(|e| StorageError::Backend(format!("Failed to create credentials: {}", e)))?;

        let region = Region::Custom {
            region: connection.region.clone(),
            endpoint: connection.endpoint.clone(),
        };

        let mut bucket = Bucket::new(container, region.clone(), credentials.clone())
            .map_err(|e| StorageError::Backend(format!("Failed to open container: {}", e)))?;
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            connection,
        };
        client.ensure_container_exists().await;

        info!(
            "Blob storage initialized for endpoint: {}, container: {}",
            client.connection.endpoint,
            client.bucket.name()
        );

        Ok(client)
    }

    async fn ensure_container_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(response) if response.success() => {
                info!("Container '{}' created", self.bucket.name());
            }
            Ok(response) if response.response_code == 409 => {
                debug!("Container '{}' already exists", self.bucket.name());
            }
            Ok(response) => warn!(
                "Could not create container '{}': HTTP {}. Assuming it exists.",
                self.bucket.name(),
                response.response_code
            ),
            Err(e) => warn!(
                "Could not create container '{}': {}. Assuming it exists.",
                self.bucket.name(),
                e
            ),
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.connection.endpoint,
            self.bucket.name(),
            name
        )
    }

    /// Object name of a URL inside this container, ignoring any query string
    fn object_name(&self, url: &str) -> Result<String, StorageError> {
        let path = url.split(['?', '#']).next().unwrap_or_default();

        path.strip_prefix(&self.object_url(""))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(str::to_string)
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))
    }
}

#[async_trait]
impl BlobStorage for ObjectStorageClient {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let name = generate_object_name(filename);

        let mut bucket = self.bucket.clone();
        bucket.add_header(
            &format!("{}{}", META_PREFIX, META_ORIGINAL_FILENAME),
            &urlencoding::encode(filename),
        );
        bucket.add_header(
            &format!("{}{}", META_PREFIX, META_UPLOADED_AT),
            &Utc::now().to_rfc3339(),
        );

        let response = bucket
            .put_object_with_content_type(&name, &data, content_type)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to upload '{}': {}", name, e)))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::Backend(format!(
                "Failed to upload '{}': HTTP {}",
                name,
                response.status_code()
            )));
        }

        debug!("Uploaded '{}' ({} bytes)", name, data.len());
        Ok(self.object_url(&name))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let name = self.object_name(url)?;

        let response = self
            .bucket
            .delete_object(&name)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to delete '{}': {}", name, e)))?;

        match response.status_code() {
            200..=299 => {
                debug!("Deleted '{}'", name);
                Ok(())
            }
            404 => Err(StorageError::NotFound(name)),
            code => Err(StorageError::Backend(format!(
                "Failed to delete '{}': HTTP {}",
                name, code
            ))),
        }
    }

    async fn generate_download_url(
        &self,
        url: &str,
        expiry_hours: u32,
    ) -> Result<String, StorageError> {
        let name = self.object_name(url)?;
        self.connection.account_key()?;

        self.bucket
            .presign_get(&name, expiry_hours * 3600, None)
            .await
            .map_err(|e| {
                StorageError::Backend(format!(
                    "Failed to generate download URL for '{}': {}",
                    name, e
                ))
            })
    }

    async fn get_metadata(&self, url: &str) -> Result<BlobMetadata, StorageError> {
        let name = self.object_name(url)?;

        let (head, code) = match self.bucket.head_object(&name).await {
            Ok(result) => result,
            Err(e) if e.to_string().contains("404") => return Err(StorageError::NotFound(name)),
            Err(e) => {
                return Err(StorageError::Backend(format!(
                    "Failed to read properties of '{}': {}",
                    name, e
                )))
            }
        };

        if code == 404 {
            return Err(StorageError::NotFound(name));
        }

        let metadata = user_metadata(head.metadata.unwrap_or_default());
        let created_on = metadata
            .get(META_UPLOADED_AT)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|d| d.with_timezone(&Utc));
        let last_modified = head
            .last_modified
            .as_deref()
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|d| d.with_timezone(&Utc));

        Ok(BlobMetadata {
            size: head.content_length.unwrap_or(0),
            content_type: head.content_type,
            created_on,
            last_modified,
            metadata,
        })
    }
}

/// `<uuid>.<ext>`, keeping the extension of the uploaded filename or `bin`
fn generate_object_name(filename: &str) -> String {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");

    format!("{}.{}", Uuid::new_v4(), extension.to_ascii_lowercase())
}

/// Strip the header prefix from metadata keys and decode escaped values
fn user_metadata(raw: HashMap<String, String>) -> HashMap<String, String> {
    raw.into_iter()
        .map(|(key, value)| {
            let key = key
                .to_ascii_lowercase()
                .trim_start_matches(META_PREFIX)
                .to_string();
            let value = urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value);
            (key, value)
        })
        .collect()
}
