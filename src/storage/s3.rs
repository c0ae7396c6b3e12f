//! S3-compatible storage implementation.
//!
//! Works against AWS S3 and DigitalOcean Spaces alike; objects are written
//! `public-read` so mirrored artwork and the feed can be served directly.

use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use async_trait::async_trait;

use crate::models::StorageConfig;
use crate::storage::{ObjectStore, PutObject, StoreError, StoreResult};

/// Error codes S3-compatible services use to ask clients to back off.
const RATE_LIMIT_CODES: &[&str] = &[
    "SlowDown",
    "TooManyRequests",
    "RequestLimitExceeded",
    "Throttling",
    "ThrottlingException",
];

/// S3-based object storage.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Create S3 storage from the storage section of the configuration.
    ///
    /// Static keys are used when configured; otherwise the default AWS
    /// credential chain applies.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if !config.endpoint.trim().is_empty() {
            loader = loader.endpoint_url(config.endpoint.trim());
        }
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "anifeed-config",
            ));
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), config.bucket.clone())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = matches!(&err, SdkError::ServiceError(e) if e.err().is_not_found())
                    || err.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if not_found {
                    Ok(false)
                } else {
                    Err(classify(err))
                }
            }
        }
    }

    async fn put(&self, object: PutObject<'_>) -> StoreResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object.key)
            .body(ByteStream::from(object.body.to_vec()))
            .content_type(object.content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(classify)?;

        log::debug!(
            "Wrote {} bytes to s3://{}/{}",
            object.body.len(),
            self.bucket,
            object.key
        );
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// Map an SDK failure onto the retryable/non-retryable split.
fn classify<E>(err: SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let rate_limited = is_rate_limit(err.code(), status);
    let message = DisplayErrorContext(&err).to_string();

    if rate_limited {
        StoreError::RateLimited(message)
    } else {
        StoreError::Backend(message)
    }
}

fn is_rate_limit(code: Option<&str>, status: Option<u16>) -> bool {
    code.is_some_and(|c| RATE_LIMIT_CODES.contains(&c)) || matches!(status, Some(429 | 503))
}
