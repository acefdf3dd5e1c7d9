use std::io::Write;

use cloudfile::config::{AppConfig, CredentialsSection, LogFormat, StorageSection};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn valid_section() -> StorageSection {
    StorageSection {
        region: "us-east-1".into(),
        bucket: "bucket".into(),
        credentials: Some(CredentialsSection {
            access_key_id: "AKIDPRIMARY".into(),
            secret_access_key: "secret".into(),
            session_token: None,
        }),
        ..Default::default()
    }
}

#[test]
fn loads_storage_and_logging_sections() {
    let file = write_config(
        r#"
[storage]
region = "ap-south-1"
bucket = "media"
endpoint = "  "

[storage.credentials]
access_key_id = "AKIDPRIMARY"
secret_access_key = "secret"

[storage.signing_credentials]
access_key_id = "AKIDSIGNER"
secret_access_key = "signer-secret"

[logging]
format = "text"
"#,
    );

    let config = AppConfig::load_from(file.path()).expect("config should load");

    assert_eq!(config.storage.region, "ap-south-1");
    assert_eq!(config.storage.bucket, "media");
    assert_eq!(config.storage.endpoint, None);
    assert_eq!(
        config.storage.signing_credentials.as_ref().unwrap().access_key_id,
        "AKIDSIGNER"
    );
    assert_eq!(config.logging.format, LogFormat::Text);
    assert_eq!(config.logging.level, "info");
    config.storage.validate().expect("loaded section should be valid");
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(config.storage.validate().is_err());
}

#[test]
fn region_and_bucket_are_required() {
    let mut section = valid_section();
    section.region = " ".into();
    assert!(section.validate().is_err());

    let mut section = valid_section();
    section.bucket = String::new();
    assert!(section.validate().is_err());
}

#[test]
fn half_specified_credentials_are_rejected() {
    let mut section = valid_section();
    section.signing_credentials = Some(CredentialsSection {
        access_key_id: "AKIDSIGNER".into(),
        ..Default::default()
    });

    let err = section.validate().unwrap_err();
    assert!(err.to_string().contains("storage.signing_credentials"));
}

#[test]
fn credentials_debug_redacts_secret() {
    let section = valid_section();
    let rendered = format!("{:?}", section);
    assert!(rendered.contains("AKIDPRIMARY"));
    assert!(!rendered.contains("\"secret\""));
}

#[tokio::test]
async fn builds_storage_from_static_credentials() {
    let storage = valid_section()
        .build_storage()
        .await
        .expect("storage should build without network access");

    assert_eq!(storage.region(), "us-east-1");
}
