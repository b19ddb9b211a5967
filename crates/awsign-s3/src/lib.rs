//! S3 object-storage signing for awsign.
//!
//! Produces the three kinds of signed artifacts a web backend hands out or
//! uses against a bucket:
//!
//! - presigned POST policies for browser uploads ([`presigned_post`]),
//! - presigned GET URLs for downloads ([`presigned_get`]),
//! - header-signed `DELETE` / `HEAD` / `ListObjectsV2` requests
//!   ([`sign_rest_request`]), sent and interpreted by [`ObjectStoreClient`].
//!
//! All signing functions take explicit credentials, configuration and time.
//! Only [`StorageConfig::from_env`] reads the environment.
//!
//! # Modules
//!
//! - [`client`] - Object-store client and response mapping
//! - [`config`] - Storage configuration
//! - [`error`] - Storage and XML errors
//! - [`list`] - `ListObjectsV2` response parsing
//! - [`presign`] - Presigned POST and GET
//! - [`rest`] - Header-signed REST requests

pub mod client;
pub mod config;
pub mod error;
pub mod list;
pub mod presign;
pub mod rest;

pub use client::{ObjectMetadata, ObjectStoreClient};
pub use config::{BucketEndpoint, StorageConfig};
pub use error::{StorageError, XmlError};
pub use list::{ObjectListing, ObjectSummary, parse_list_objects};
pub use presign::{PresignedPost, presigned_get, presigned_post};
pub use rest::{ObjectRequest, SignedRequest, sign_rest_request};
