//! S3-backed object store

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use newscast_core::{Error, ObjectStore, Result};

/// Connection settings for S3 or any S3-compatible store.
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible stores (MinIO, R2).
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Base URL for public object links. Defaults to the endpoint (or the
    /// virtual-hosted AWS URL) plus the bucket.
    pub public_base_url: Option<String>,
}

/// Object store backed by an S3 bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    /// Build a store from config, resolving credentials from the
    /// environment when not given explicitly.
    pub async fn new(config: S3Config) -> Result<Self> {
        if config.bucket.trim().is_empty() {
            return Err(Error::Storage("S3 bucket must be set".into()));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        if let (Some(access), Some(secret)) = (&config.access_key, &config.secret_key) {
            let creds = aws_sdk_s3::config::Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "newscast-env",
            );
            loader = loader.credentials_provider(creds);
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if config.endpoint.is_some() {
            // Path-style keeps compatible stores happy.
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        let public_base = config.public_base_url.clone().unwrap_or_else(|| {
            match (&config.endpoint, &config.region) {
                (Some(endpoint), _) => {
                    format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket)
                }
                (None, Some(region)) => {
                    format!("https://{}.s3.{}.amazonaws.com", config.bucket, region)
                }
                (None, None) => format!("https://{}.s3.amazonaws.com", config.bucket),
            }
        });

        Ok(Self {
            client,
            bucket: config.bucket,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| Error::Storage(format!("get {key}: {err}")))?;
        let data = out
            .body
            .collect()
            .await
            .map_err(|err| Error::Storage(format!("read {key}: {err}")))?;
        Ok(data.into_bytes())
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| Error::Storage(format!("put {key}: {err}")))?;
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| Error::Storage(format!("delete {key}: {err}")))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(Error::Storage(format!("head {key}: {service_err}")))
                }
            }
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = &continuation {
                req = req.continuation_token(token.clone());
            }
            let out = req
                .send()
                .await
                .map_err(|err| Error::Storage(format!("list {prefix}: {err}")))?;
            for object in out.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
            match out.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }
        Ok(keys)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
