//! cloudfile - files in cloud object storage
//!
//! Stores, fetches, deletes and signs expiring URLs for files on AWS S3.
//! Every stored file is addressed by a location identifier of the form
//! `s3://{region}/{bucket}/{key}`:
//! - [`storage::CloudStorage`] is the provider-agnostic contract
//! - [`storage::S3CloudStorage`] implements it over the AWS SDK
//! - [`storage::MemoryObjectClient`] replaces the SDK client in tests

pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;

pub use error::{Error, Result};
pub use storage::{CloudFile, CloudStorage, Location, S3CloudStorage, StoreOptions};
