use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

use crate::errors::{ZarrError, ZarrResult};
use crate::store::{Listing, Store, join_key};

/// Connection settings for S3-compatible object stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Options {
    pub region: Option<String>,
    /// Custom endpoint, e.g. a MinIO server; enables path-style addressing.
    pub endpoint: Option<String>,
    /// Send unsigned requests for public buckets.
    pub anonymous: bool,
}

/// A Zarr store backed by an S3 bucket, rooted at a key prefix.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    pub async fn connect(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        options: &S3Options,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if options.anonymous {
            loader = loader.no_credentials();
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if options.endpoint.is_some() {
            builder = builder.force_path_style(true);
        }
        Self::with_client(Client::from_conf(builder.build()), bucket, prefix)
    }

    pub fn with_client(
        client: Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_key(&self, key: &str) -> String {
        join_key(&self.prefix, key)
    }
}

#[async_trait]
impl Store for S3Store {
    fn url(&self) -> String {
        join_key(&format!("s3://{}", self.bucket), &self.prefix)
    }

    async fn get(&self, key: &str) -> ZarrResult<Option<Vec<u8>>> {
        let object_key = self.object_key(key);
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_no_such_key())
                {
                    return Ok(None);
                }
                return Err(ZarrError::Remote(format!(
                    "get s3://{}/{object_key}: {}",
                    self.bucket,
                    DisplayErrorContext(&err)
                )));
            }
        };

        let body = output.body.collect().await.map_err(|err| {
            ZarrError::Remote(format!("read s3://{}/{object_key}: {err}", self.bucket))
        })?;
        Ok(Some(body.into_bytes().to_vec()))
    }

    async fn list_dir(&self, prefix: &str) -> ZarrResult<Listing> {
        let mut dir = self.object_key(prefix);
        if !dir.is_empty() {
            dir.push('/');
        }

        let mut listing = Listing::default();
        let mut continuation_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&dir)
                .delimiter("/");
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|err| {
                ZarrError::Remote(format!(
                    "list s3://{}/{dir}: {}",
                    self.bucket,
                    DisplayErrorContext(&err)
                ))
            })?;

            for object in output.contents() {
                if let Some(name) = object.key().and_then(|key| key.strip_prefix(dir.as_str())) {
                    if !name.is_empty() {
                        listing.objects.push(name.to_string());
                    }
                }
            }
            for common in output.common_prefixes() {
                if let Some(name) = common
                    .prefix()
                    .and_then(|key| key.strip_prefix(dir.as_str()))
                {
                    listing.prefixes.push(name.trim_end_matches('/').to_string());
                }
            }

            continuation_token = output.next_continuation_token().map(str::to_string);
            if continuation_token.is_none() || !output.is_truncated().unwrap_or(false) {
                break;
            }
        }

        debug!(
            event = "s3_list",
            bucket = %self.bucket,
            prefix = %dir,
            objects = listing.objects.len(),
            prefixes = listing.prefixes.len()
        );
        Ok(listing)
    }
}
