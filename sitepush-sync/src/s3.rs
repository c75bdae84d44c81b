//! S3 backend for [`ObjectStore`].

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;

use sitepush_core::{CredentialSource, ObjectKey, PushConfig};

use crate::store::{AccessPolicy, ListPage, ObjectStore, PutObject, RemoteObject, StoreError};

/// Per-attempt timeout applied to every S3 call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CREDENTIALS_PROVIDER_NAME: &str = "sitepush-credentials-file";

/// An S3 (or S3-compatible) bucket.
pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    /// Build a client for `config.bucket`.
    ///
    /// SDK-level retries are disabled: the driver owns the retry policy, and
    /// by default attempts every file exactly once.
    pub async fn connect(config: &PushConfig, timeout: Duration) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(timeout)
                    .build(),
            );

        if let CredentialSource::Static(creds) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        tracing::debug!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            "configured S3 client"
        );

        Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix((!prefix.is_empty()).then(|| prefix.to_owned()))
            .set_continuation_token(continuation.map(str::to_owned))
            .send()
            .await
            .map_err(|e| StoreError::new(DisplayErrorContext(&e).to_string()))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                Some(RemoteObject {
                    key: ObjectKey::from(key),
                    fingerprint: object.e_tag().unwrap_or_default().to_owned(),
                })
            })
            .collect();

        Ok(ListPage {
            objects,
            truncated: output.is_truncated().unwrap_or(false),
            next: output.next_continuation_token().map(str::to_owned),
        })
    }

    async fn put_object(&self, request: &PutObject) -> Result<(), StoreError> {
        let acl = match request.access {
            AccessPolicy::PublicRead => ObjectCannedAcl::PublicRead,
            AccessPolicy::Private => ObjectCannedAcl::Private,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(request.key.as_str())
            .body(ByteStream::from(request.body.clone()))
            .content_length(request.content_length() as i64)
            .set_content_type(request.content_type.clone())
            .acl(acl)
            .send()
            .await
            .map_err(|e| StoreError::new(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
