use crate::config::S3Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Object operations the import pipeline performs against a bucket.
///
/// The bucket comes from the event record, not from configuration: a
/// notification names the bucket its object lives in, and every operation on
/// that object must target the same bucket.
#[async_trait]
pub trait ObjectOps: Send + Sync {
    /// Fetch an object's full content as text.
    async fn get_object_text(&self, bucket: &str, key: &str) -> Result<String>;

    /// Relocate an object: copy to the target key, then delete the original.
    async fn relocate(&self, bucket: &str, from_key: &str, to_key: &str) -> Result<()>;
}

/// S3 adapter for the import service.
///
/// Created once at startup; the client is reused for the life of the process.
/// The configured bucket is where presigned uploads land; pipeline operations
/// take their bucket from the event record instead.
pub struct ImportStore {
    client: S3Client,
    bucket: String,
}

impl ImportStore {
    /// Create a new store for the configured import bucket.
    pub async fn new(config: &S3Config) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "Import store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }

    /// Copy an object within one bucket.
    async fn copy_object(&self, bucket: &str, from_key: &str, to_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(format!("{bucket}/{from_key}"))
            .key(to_key)
            .send()
            .await
            .with_context(|| format!("Failed to copy {from_key} to {to_key}"))?;

        debug!(bucket = %bucket, from = %from_key, to = %to_key, "Object copied");
        Ok(())
    }

    /// Delete an object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete object {key}"))?;

        debug!(bucket = %bucket, key = %key, "Object deleted");
        Ok(())
    }

    /// Generate a time-limited, write-scoped presigned URL for one key in the
    /// configured upload bucket.
    ///
    /// The URL grants a single PUT with the given content type; no object
    /// exists until the client performs the upload.
    pub async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .context("Failed to create presigning config")?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning_config)
            .await
            .context("Failed to generate presigned URL")?;

        Ok(presigned.uri().to_string())
    }

    /// Get the configured upload bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectOps for ImportStore {
    /// Fetch an object's full content as text.
    ///
    /// The body is materialized in memory before parsing; import files are
    /// small CSV uploads, not streamed datasets.
    #[instrument(skip(self), fields(bucket = %bucket, key = %key))]
    async fn get_object_text(&self, bucket: &str, key: &str) -> Result<String> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to get object {key}"))?;

        let bytes = response
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read body of object {key}"))?
            .into_bytes();

        String::from_utf8(bytes.to_vec())
            .with_context(|| format!("Object {key} is not valid UTF-8"))
    }

    /// Relocate an object: copy to the target key, then delete the original.
    ///
    /// Pipeline state is encoded entirely in key prefixes, so this move is the
    /// state transition.
    #[instrument(skip(self))]
    async fn relocate(&self, bucket: &str, from_key: &str, to_key: &str) -> Result<()> {
        self.copy_object(bucket, from_key, to_key).await?;
        self.delete_object(bucket, from_key).await?;
        Ok(())
    }
}

/// Compute the destination key for a relocation by swapping the leading
/// prefix. A key without the expected prefix is returned unchanged.
pub fn relocation_target(key: &str, from_prefix: &str, to_prefix: &str) -> String {
    key.replacen(from_prefix, to_prefix, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocation_target_swaps_uploaded_for_processed() {
        assert_eq!(
            relocation_target("uploaded/a.csv", "uploaded/", "processed/"),
            "processed/a.csv"
        );
    }

    #[test]
    fn relocation_target_swaps_uploaded_for_error() {
        assert_eq!(
            relocation_target("uploaded/b.csv", "uploaded/", "error/"),
            "error/b.csv"
        );
    }

    #[test]
    fn relocation_target_only_touches_the_first_occurrence() {
        assert_eq!(
            relocation_target("uploaded/uploaded.csv", "uploaded/", "processed/"),
            "processed/uploaded.csv"
        );
    }

    #[test]
    fn unprefixed_key_is_unchanged() {
        assert_eq!(
            relocation_target("other/a.csv", "uploaded/", "processed/"),
            "other/a.csv"
        );
    }
}
