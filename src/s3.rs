use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use log::info;

use crate::config::EtlConfig;
use crate::error::EtlError;

/// Uploads the csv artifact.  Credentials come from the run configuration,
/// not the ambient AWS provider chain, and SDK retries are off so a failed
/// call fails the run on the first attempt.
pub struct S3Publisher {
    client: Client,
    bucket: String,
}

impl S3Publisher {
    pub fn new(cfg: &EtlConfig) -> S3Publisher {
        let credentials = Credentials::new(&cfg.access_key, &cfg.secret_key, None, None, "firds");
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &cfg.endpoint {
            // MinIO and friends want path style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        S3Publisher {
            client: Client::from_conf(builder.build()),
            bucket: cfg.bucket.clone(),
        }
    }

    /// One PutObject.  Returns the ETag when the store provides one.
    pub async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<Option<String>, EtlError> {
        let resp = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("text/csv")
            .send()
            .await
            .map_err(|e| classify(e, &self.bucket, key))?;
        let e_tag = resp.e_tag().map(|s| s.to_string());
        match &e_tag {
            Some(tag) => info!("uploaded csv to s3://{}/{} (etag {})", self.bucket, key, tag),
            None => info!("uploaded csv to s3://{}/{}", self.bucket, key),
        }
        Ok(e_tag)
    }
}

fn classify(err: SdkError<PutObjectError>, bucket: &str, key: &str) -> EtlError {
    match err.code() {
        Some(code) => {
            let detail = match err.message() {
                Some(m) => format!("{}: {}", code, m),
                None => code.to_string(),
            };
            classify_code(code, detail, bucket, key)
        }
        // no service error code, e.g. the endpoint was unreachable
        None => EtlError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: err.to_string(),
        },
    }
}

/// Map the S3 error code to the narrow failure classes the pipeline reports:
/// bad credentials, missing bucket, everything else.
fn classify_code(code: &str, detail: String, bucket: &str, key: &str) -> EtlError {
    match code {
        "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AccessDenied" | "ExpiredToken"
        | "InvalidToken" => EtlError::Auth(detail),
        "NoSuchBucket" => EtlError::BucketNotFound(bucket.to_string()),
        _ => EtlError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: detail,
        },
    }
}
