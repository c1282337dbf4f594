use std::str::FromStr;

use super::StorageError;

const DEFAULT_REGION: &str = "us-east-1";

/// Parsed `Key=Value;Key=Value` blob storage connection string.
///
/// Accepts an explicit `Endpoint` (S3-compatible services) or the
/// `DefaultEndpointsProtocol`/`AccountName`/`EndpointSuffix` triple.
#[derive(Clone, PartialEq, Eq)]
pub struct BlobConnectionString {
    pub endpoint: String,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub region: String,
}

impl BlobConnectionString {
    pub fn account_key(&self) -> Result<&str, StorageError> {
        self.account_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(StorageError::MissingAccountKey)
    }
}

impl FromStr for BlobConnectionString {
    type Err = StorageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut protocol = None;
        let mut suffix = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut region = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Account keys are base64 and may end in '='
            let (key, value) = part.split_once('=').ok_or_else(|| {
                StorageError::InvalidConnectionString(format!("segment '{}' has no '='", part))
            })?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" | "blobendpoint" => endpoint = Some(value),
                "defaultendpointsprotocol" => protocol = Some(value),
                "endpointsuffix" => suffix = Some(value),
                "accountname" => account_name = Some(value),
                "accountkey" => account_key = Some(value),
                "region" => region = Some(value),
                _ => {}
            }
        }

        let endpoint = match (endpoint, &account_name, suffix) {
            (Some(endpoint), _, _) => endpoint,
            (None, Some(account), Some(suffix)) => format!(
                "{}://{}.blob.{}",
                protocol.as_deref().unwrap_or("https"),
                account,
                suffix
            ),
            _ => {
                return Err(StorageError::InvalidConnectionString(
                    "no Endpoint or AccountName/EndpointSuffix pair".to_string(),
                ))
            }
        };

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            account_name,
            account_key,
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

impl std::fmt::Debug for BlobConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobConnectionString")
            .field("endpoint", &self.endpoint)
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .finish()
    }
}
