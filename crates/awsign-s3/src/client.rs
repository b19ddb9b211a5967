//! Object-store client: signs requests, sends them, interprets responses.

use awsign_auth::CredentialProvider;
use awsign_core::{HttpResponse, HttpTransport};
use chrono::{DateTime, Utc};
use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::list::{ObjectListing, parse_list_objects};
use crate::presign::{PresignedPost, presigned_get, presigned_post};
use crate::rest::{ObjectRequest, sign_rest_request};

/// Object metadata returned by a `HEAD` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// `Content-Length`.
    pub content_length: Option<u64>,
    /// `Content-Type`.
    pub content_type: Option<String>,
    /// `ETag`, including its surrounding quotes.
    pub etag: Option<String>,
    /// `Last-Modified`.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectMetadata {
    fn from_response(response: &HttpResponse) -> Self {
        Self {
            content_length: response
                .header(CONTENT_LENGTH.as_str())
                .and_then(|v| v.parse().ok()),
            content_type: response.header(CONTENT_TYPE.as_str()).map(str::to_owned),
            etag: response.header(ETAG.as_str()).map(str::to_owned),
            last_modified: response
                .header(LAST_MODIFIED.as_str())
                .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Signs and sends object-store calls for one bucket.
///
/// Credentials are resolved once per call. Configuration is checked before
/// credentials are resolved, so a missing bucket or region never triggers
/// credential I/O.
#[derive(Debug)]
pub struct ObjectStoreClient<T, P> {
    config: StorageConfig,
    transport: T,
    credentials: P,
}

impl<T: HttpTransport, P: CredentialProvider> ObjectStoreClient<T, P> {
    /// Create a client for the bucket described by `config`.
    #[must_use]
    pub fn new(config: StorageConfig, transport: T, credentials: P) -> Self {
        Self {
            config,
            transport,
            credentials,
        }
    }

    /// The storage configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Delete `key`. Deleting a missing object succeeds.
    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .execute(&ObjectRequest::Delete {
                key: key.to_owned(),
            })
            .await?;

        if response.status.is_success() || response.status == StatusCode::NOT_FOUND {
            debug!(key, status = response.status.as_u16(), "deleted object");
            return Ok(());
        }
        Err(unexpected_status(&response))
    }

    /// Fetch the metadata of `key`.
    pub async fn head_object(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let response = self
            .execute(&ObjectRequest::Head {
                key: key.to_owned(),
            })
            .await?;

        if response.status.is_success() {
            Ok(ObjectMetadata::from_response(&response))
        } else if response.status == StatusCode::NOT_FOUND {
            Err(StorageError::NotFound)
        } else {
            Err(unexpected_status(&response))
        }
    }

    /// List up to `max_keys` objects under `prefix`, continuing from
    /// `continuation_token` when given.
    pub async fn list_objects(
        &self,
        prefix: &str,
        max_keys: u32,
        continuation_token: Option<&str>,
    ) -> Result<ObjectListing, StorageError> {
        let response = self
            .execute(&ObjectRequest::List {
                prefix: prefix.to_owned(),
                max_keys,
                continuation_token: continuation_token.map(str::to_owned),
            })
            .await?;

        if !response.status.is_success() {
            return Err(unexpected_status(&response));
        }
        let listing = parse_list_objects(&response.body)?;
        debug!(
            prefix,
            count = listing.objects.len(),
            truncated = listing.is_truncated,
            "listed objects"
        );
        Ok(listing)
    }

    /// Build a presigned POST for `key` signed now.
    pub async fn presigned_post(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<PresignedPost, StorageError> {
        self.config.bucket_endpoint()?;
        let credentials = self.credentials.resolve().await?;
        presigned_post(&self.config, &credentials, key, content_type, Utc::now())
    }

    /// Build a presigned GET URL for `key` signed now.
    pub async fn presigned_get(&self, key: &str) -> Result<String, StorageError> {
        self.config.bucket_endpoint()?;
        let credentials = self.credentials.resolve().await?;
        presigned_get(&self.config, &credentials, key, Utc::now())
    }

    async fn execute(&self, request: &ObjectRequest) -> Result<HttpResponse, StorageError> {
        self.config.bucket_endpoint()?;
        let credentials = self.credentials.resolve().await?;
        let signed = sign_rest_request(&self.config, &credentials, request, Utc::now())?;
        Ok(self.transport.send(signed.into()).await?)
    }
}

fn unexpected_status(response: &HttpResponse) -> StorageError {
    let body = response.body_text();
    warn!(
        status = response.status.as_u16(),
        body,
        "object store returned an error"
    );
    StorageError::Http {
        status: response.status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use awsign_auth::{
        CredentialEnv, CredentialError, Credentials, EnvCredentialProvider,
        StaticCredentialProvider,
    };
    use awsign_core::{MockTransport, TransportError};
    use chrono::TimeZone;
    use http::{HeaderMap, HeaderValue, Method};

    use super::*;

    fn test_config() -> StorageConfig {
        StorageConfig::builder()
            .region("us-east-1".into())
            .bucket("my-bucket".into())
            .build()
    }

    fn client(
        transport: Arc<MockTransport>,
    ) -> ObjectStoreClient<Arc<MockTransport>, StaticCredentialProvider> {
        ObjectStoreClient::new(
            test_config(),
            transport,
            StaticCredentialProvider::new(Credentials::new("AKID", "secret")),
        )
    }

    #[tokio::test]
    async fn test_should_delete_object() {
        let transport = Arc::new(MockTransport::new().respond(204, ""));
        client(Arc::clone(&transport))
            .delete_object("uploads/a.png")
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::DELETE);
        assert_eq!(
            requests[0].url,
            "https://my-bucket.s3.us-east-1.amazonaws.com/uploads/a.png"
        );
        assert!(
            requests[0]
                .header("authorization")
                .is_some_and(|v| v.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"))
        );
    }

    #[tokio::test]
    async fn test_should_treat_missing_object_delete_as_success() {
        let transport = Arc::new(MockTransport::new().respond(404, "<Error/>"));
        assert!(client(transport).delete_object("gone").await.is_ok());
    }

    #[tokio::test]
    async fn test_should_wrap_server_error_on_delete() {
        let transport = Arc::new(MockTransport::new().respond(500, "boom"));
        let err = client(transport).delete_object("k").await.unwrap_err();
        match err {
            StorageError::Http { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_read_head_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1024"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        headers.insert(ETAG, HeaderValue::from_static("\"abc\""));
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Mon, 12 Oct 2009 17:50:00 GMT"),
        );
        let mut response = HttpResponse::new(StatusCode::OK, "");
        response.headers = headers;
        let transport = Arc::new(MockTransport::new().respond_with(response));

        let metadata = client(Arc::clone(&transport))
            .head_object("uploads/a.png")
            .await
            .unwrap();

        assert_eq!(transport.requests()[0].method, Method::HEAD);
        assert_eq!(metadata.content_length, Some(1024));
        assert_eq!(metadata.content_type.as_deref(), Some("image/png"));
        assert_eq!(metadata.etag.as_deref(), Some("\"abc\""));
        assert_eq!(
            metadata.last_modified,
            Some(Utc.with_ymd_and_hms(2009, 10, 12, 17, 50, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_should_ignore_malformed_last_modified() {
        let mut response = HttpResponse::new(StatusCode::OK, "");
        response.headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Wed, 12 Oct 2009 17:50:00 GMT"),
        );
        let transport = Arc::new(MockTransport::new().respond_with(response));

        let metadata = client(transport).head_object("a.png").await.unwrap();

        assert_eq!(metadata.last_modified, None);
    }

    #[tokio::test]
    async fn test_should_report_missing_object_on_head() {
        let transport = Arc::new(MockTransport::new().respond(404, ""));
        let err = client(transport).head_object("gone").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn test_should_wrap_forbidden_on_head() {
        let transport = Arc::new(MockTransport::new().respond(403, ""));
        let err = client(transport).head_object("k").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Http { status, .. } if status == StatusCode::FORBIDDEN
        ));
    }

    #[tokio::test]
    async fn test_should_list_objects() {
        let body = r#"<ListBucketResult>
            <IsTruncated>true</IsTruncated>
            <NextContinuationToken>next</NextContinuationToken>
            <Contents><Key>a</Key><Size>3</Size></Contents>
        </ListBucketResult>"#;
        let transport = Arc::new(MockTransport::new().respond(200, body));

        let listing = client(Arc::clone(&transport))
            .list_objects("", 10, Some("prev"))
            .await
            .unwrap();

        assert_eq!(listing.objects.len(), 1);
        assert_eq!(listing.objects[0].key, "a");
        assert_eq!(listing.next_continuation_token.as_deref(), Some("next"));
        let url = &transport.requests()[0].url;
        let expected = "?continuation-token=prev&list-type=2&max-keys=10&prefix=";
        assert!(url.contains(expected));
    }

    #[tokio::test]
    async fn test_should_surface_malformed_listing() {
        let transport = Arc::new(MockTransport::new().respond(200, "not xml"));
        let err = client(transport)
            .list_objects("", 10, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Xml(_)));
    }

    #[tokio::test]
    async fn test_should_propagate_transport_failure() {
        let transport = Arc::new(
            MockTransport::new().fail(TransportError::Request("connection reset".into())),
        );
        let err = client(transport).delete_object("k").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Transport(TransportError::Request(_))
        ));
    }

    #[tokio::test]
    async fn test_should_check_configuration_before_resolving_credentials() {
        let transport = Arc::new(MockTransport::new());
        let client = ObjectStoreClient::new(
            StorageConfig::default(),
            Arc::clone(&transport),
            EnvCredentialProvider::with_env(CredentialEnv::default(), Arc::clone(&transport)),
        );

        let err = client.head_object("k").await.unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured("bucket")));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_should_propagate_credential_failure() {
        let transport = Arc::new(MockTransport::new());
        let client = ObjectStoreClient::new(
            test_config(),
            Arc::clone(&transport),
            EnvCredentialProvider::with_env(CredentialEnv::default(), Arc::clone(&transport)),
        );

        let err = client.presigned_get("k").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Credentials(CredentialError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn test_should_presign_with_resolved_credentials() {
        let client = client(Arc::new(MockTransport::new()));

        let url = client.presigned_get("a.txt").await.unwrap();
        assert!(url.starts_with("https://my-bucket.s3.us-east-1.amazonaws.com/a.txt?"));

        let post = client.presigned_post("a.txt", "text/plain").await.unwrap();
        assert_eq!(post.key, "a.txt");
        assert!(post.fields["x-amz-credential"].starts_with("AKID/"));
    }
}
