use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_config::{timeout::TimeoutConfig, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{
        Region, RequestChecksumCalculation, ResponseChecksumValidation,
        StalledStreamProtectionConfig,
    },
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};

use mie_core::{
    config::StorageConfig,
    errors::Error,
    media::{ProgressReporter, Uploader},
    Result,
};

use crate::{
    key::object_key,
    sniff::{sniff_content_type, SNIFF_LEN},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Uploads into one bucket of an S3-compatible store (Backblaze B2, MinIO, ...).
#[derive(Clone, Debug)]
pub struct S3Uploader {
    client: Client,
    bucket: String,
    path_prefix: String,
    /// Files above this size go through multipart upload, one part per chunk.
    part_size: u64,
}

impl S3Uploader {
    /// Build the client once; no request is made until the first upload.
    pub async fn connect(cfg: &StorageConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg).await?,
            bucket: cfg.bucket_name.clone(),
            path_prefix: cfg.path_prefix.clone(),
            part_size: cfg.part_size,
        })
    }

    async fn ensure_bucket(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    bucket = %self.bucket,
                    error = %DisplayErrorContext(&e),
                    "bucket lookup failed"
                );
                Error::Storage(format!(
                    "bucket {} not reachable: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn put_single(
        &self,
        file: File,
        key: &str,
        content_type: &str,
        size: u64,
        progress: &ProgressReporter,
    ) -> Result<()> {
        let body = ByteStream::read_from()
            .file(file)
            .build()
            .await
            .map_err(|e| Error::Storage(format!("failed to stream {key}: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    error = %DisplayErrorContext(&e),
                    "S3 upload failed"
                );
                Error::Storage(format!("upload of {key} failed: {}", DisplayErrorContext(&e)))
            })?;

        progress.report(size, size);
        Ok(())
    }

    /// Create, send parts, complete. Any failure after creation aborts the
    /// upload so the store drops the parts already sent.
    async fn put_multipart(
        &self,
        file: &mut File,
        key: &str,
        content_type: &str,
        size: u64,
        progress: &ProgressReporter,
    ) -> Result<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                Error::Storage(format!(
                    "multipart upload of {key} could not start: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| Error::Storage(format!("no upload id returned for {key}")))?
            .to_string();
        tracing::debug!(key = %key, upload_id = %upload_id, "multipart upload initiated");

        let result = match self.send_parts(file, key, &upload_id, size, progress).await {
            Ok(parts) => self.complete(key, &upload_id, parts).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!(
                key = %key,
                upload_id = %upload_id,
                error = %e,
                "multipart upload failed; aborting"
            );
            if let Err(abort_err) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::error!(
                    key = %key,
                    upload_id = %upload_id,
                    error = %DisplayErrorContext(&abort_err),
                    "multipart abort failed"
                );
            }
        }
        result
    }

    async fn send_parts(
        &self,
        file: &mut File,
        key: &str,
        upload_id: &str,
        size: u64,
        progress: &ProgressReporter,
    ) -> Result<Vec<CompletedPart>> {
        let chunk = usize::try_from(self.part_size)
            .map_err(|_| Error::Config(format!("part size {} too large", self.part_size)))?;
        let mut buf = vec![0u8; chunk];
        let mut parts = Vec::new();
        let mut sent = 0u64;
        let mut part_number = 1i32;

        loop {
            let n = read_chunk(file, &mut buf).await?;
            if n == 0 {
                break;
            }

            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(buf[..n].to_vec()))
                .send()
                .await
                .map_err(|e| {
                    Error::Storage(format!(
                        "part {part_number} of {key} failed: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;
            let e_tag = output
                .e_tag()
                .ok_or_else(|| Error::Storage(format!("no ETag returned for part {part_number}")))?;
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(e_tag)
                    .build(),
            );

            sent += n as u64;
            progress.report(sent, size);
            part_number += 1;

            if n < chunk {
                break;
            }
        }
        Ok(parts)
    }

    async fn complete(&self, key: &str, upload_id: &str, parts: Vec<CompletedPart>) -> Result<()> {
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                Error::Storage(format!(
                    "multipart upload of {key} could not complete: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

async fn build_client(cfg: &StorageConfig) -> Result<Client> {
    let endpoint = cfg.endpoint.trim_end_matches('/');
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(Error::Config(format!(
            "storage endpoint must be an http(s) URL, got {:?}",
            cfg.endpoint
        )));
    }

    let credentials = Credentials::new(
        cfg.key_id.clone(),
        cfg.application_key.clone(),
        None,
        None,
        "s3-compatible",
    );
    let region = Region::new(cfg.region.clone());

    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .credentials_provider(credentials)
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .read_timeout(READ_TIMEOUT)
                .build(),
        )
        .load()
        .await;

    // Non-AWS stores reject aws-chunked bodies with trailing checksums.
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .endpoint_url(endpoint)
        .force_path_style(true)
        .region(region)
        .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
        .build();

    Ok(Client::from_conf(s3_config))
}

/// Fill `buf` from the current position of `file`, stopping early at EOF.
async fn read_chunk(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(
        &self,
        mut file: File,
        file_name: &str,
        progress: &ProgressReporter,
    ) -> Result<String> {
        let key = object_key(&self.path_prefix, file_name);

        self.ensure_bucket().await?;

        let mut head = [0u8; SNIFF_LEN];
        let n = read_chunk(&mut file, &mut head).await?;
        let content_type = sniff_content_type(&head[..n], file_name);
        file.rewind().await?;

        let size = file.metadata().await?.len();
        progress.report(0, size);

        let start = Instant::now();
        let multipart = size > self.part_size;
        if multipart {
            self.put_multipart(&mut file, &key, &content_type, size, progress)
                .await?;
        } else {
            self.put_single(file, &key, &content_type, size, progress)
                .await?;
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            multipart,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(key)
    }
}
