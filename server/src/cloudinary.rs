use anyhow::{Context, Result};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::{env, path::Path};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Media host client. The relay only needs "store blob, return durable
/// URL" and a connectivity probe, both over Cloudinary's HTTP API.
#[derive(Clone)]
pub struct CloudinaryClient {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
    http: reqwest::Client,
}

pub struct UploadParams<'a> {
    pub folder: &'a str,
    pub resource_type: &'a str,
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadedMedia {
    pub secure_url: String,
    pub public_id: String,
}

impl CloudinaryClient {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: api_base.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let cloud_name =
            env::var("CLOUDINARY_CLOUD_NAME").context("CLOUDINARY_CLOUD_NAME is not set")?;
        let api_key = env::var("CLOUDINARY_API_KEY").context("CLOUDINARY_API_KEY is not set")?;
        let api_secret =
            env::var("CLOUDINARY_API_SECRET").context("CLOUDINARY_API_SECRET is not set")?;
        let api_base =
            env::var("CLOUDINARY_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Ok(Self::new(cloud_name, api_key, api_secret, api_base))
    }

    pub async fn upload(&self, path: &Path, params: UploadParams<'_>) -> Result<UploadedMedia> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        // Signed params must stay in alphabetical order
        let signature = self.sign(&[
            ("folder", params.folder),
            ("public_id", &params.public_id),
            ("timestamp", &timestamp),
        ]);

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("folder", params.folder.to_string())
            .text("public_id", params.public_id)
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let url = format!(
            "{}/v1_1/{}/{}/upload",
            self.api_base, self.cloud_name, params.resource_type
        );
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Media host unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Media host rejected upload ({}): {}", status, body);
        }

        response
            .json::<UploadedMedia>()
            .await
            .context("Failed to parse media host response")
    }

    pub async fn ping(&self) -> Result<serde_json::Value> {
        let url = format!("{}/v1_1/{}/ping", self.api_base, self.cloud_name);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
            .context("Media host unreachable")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Media host ping failed ({})", status);
        }

        response
            .json::<serde_json::Value>()
            .await
            .context("Failed to parse media host response")
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        let joined = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        let digest = Sha1::digest(format!("{}{}", joined, self.api_secret).as_bytes());
        digest.iter().map(|byte| format!("{:02x}", byte)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_digest() {
        let client = CloudinaryClient::new("demo", "key", "s3cret", DEFAULT_API_BASE);
        let signature = client.sign(&[
            ("folder", "book_covers"),
            ("public_id", "book_42"),
            ("timestamp", "1700000000"),
        ]);
        assert_eq!(signature, "40cce451ed011204a97ad8ace18698b8daa85e0c");
    }
}
