use super::*;

#[test]
fn empty_file_gives_defaults() {
    let config = GalleriaConfig::from_toml("").unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.server.shutdown_timeout_seconds, 30);
    assert_eq!(config.upload.field_name, "image");
    assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
    assert_eq!(config.blob.backend, "filesystem");
    assert_eq!(config.blob.dir, "uploads");
    assert_eq!(config.metadata.backend, "postgres");
    assert_eq!(
        config.metadata.url.as_deref(),
        Some("postgres://postgres@localhost:5432/postgres")
    );
    assert!(!config.has_volatile_metadata());
    assert!(config.ensure_reconcile_safe().is_ok());
    assert_eq!(config.notify.session_buffer, 16);
    assert!(config.gallery.remove_blob_on_delete);
    assert!(config.reconcile.interval_seconds.is_none());
    assert!(!config.telemetry.enabled);
}

#[test]
fn full_config_parses() {
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 8081

        [upload]
        field_name = "photo"
        max_bytes = 1024

        [blob]
        backend = "memory"

        [metadata]
        backend = "postgres"
        url = "postgres://localhost/galleria"
        pool_size = 2
        table_prefix = ""

        [notify]
        session_buffer = 4

        [gallery]
        remove_blob_on_delete = false

        [reconcile]
        interval_seconds = 600
    "#;

    let config = GalleriaConfig::from_toml(toml).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.shutdown_timeout_seconds, 30);
    assert_eq!(config.upload.field_name, "photo");
    assert_eq!(config.upload.max_bytes, 1024);
    assert_eq!(config.blob.backend, "memory");
    assert_eq!(config.metadata.backend, "postgres");
    assert_eq!(config.metadata.url.as_deref(), Some("postgres://localhost/galleria"));
    assert_eq!(config.metadata.pool_size, 2);
    assert_eq!(config.metadata.schema, "public");
    assert_eq!(config.metadata.table_prefix, "");
    assert_eq!(config.notify.session_buffer, 4);
    assert!(!config.gallery.remove_blob_on_delete);
    assert_eq!(config.reconcile.interval_seconds, Some(600));
}

#[test]
fn memory_metadata_with_filesystem_blobs_is_volatile() {
    let config = GalleriaConfig::from_toml("[metadata]\nbackend = \"memory\"\n").unwrap();
    assert!(config.has_volatile_metadata());
    let err = config.ensure_reconcile_safe().unwrap_err();
    assert!(matches!(err, crate::error::ServerError::Config(msg) if msg.contains("uploads")));
}

#[test]
fn memory_pairs_are_not_volatile() {
    let config = GalleriaConfig::from_toml(
        "[metadata]\nbackend = \"memory\"\n[blob]\nbackend = \"memory\"\n",
    )
    .unwrap();
    assert!(!config.has_volatile_metadata());
    assert!(config.ensure_reconcile_safe().is_ok());
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = GalleriaConfig::from_toml("[server]\nport = \"eighty\"").unwrap_err();
    assert!(matches!(err, crate::error::ServerError::Config(_)));
}

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = GalleriaConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.server.port, 5000);
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("galleria.toml");
    std::fs::write(&path, "[server]\nport = 6000\n").unwrap();
    assert_eq!(GalleriaConfig::load(&path).unwrap().server.port, 6000);
}

#[test]
fn telemetry_defaults() {
    let config: TelemetryConfig = toml::from_str("").unwrap();
    assert!(!config.enabled);
    assert_eq!(config.endpoint, "http://localhost:4317");
    assert_eq!(config.service_name, "galleria");
    assert!((config.sample_ratio - 1.0).abs() < f64::EPSILON);
    assert_eq!(config.protocol, OtlpProtocol::Grpc);
    assert_eq!(config.timeout_seconds, 10);
    assert!(config.resource_attributes.is_empty());
}

#[test]
fn telemetry_custom_config() {
    let toml = r#"
        enabled = true
        endpoint = "http://collector:4318"
        service_name = "gallery-staging"
        sample_ratio = 0.25
        protocol = "http"
        timeout_seconds = 3

        [resource_attributes]
        "deployment.environment" = "staging"
    "#;

    let config: TelemetryConfig = toml::from_str(toml).unwrap();
    assert!(config.enabled);
    assert_eq!(config.protocol, OtlpProtocol::Http);
    assert_eq!(config.timeout(), std::time::Duration::from_secs(3));
    assert!((config.clamped_sample_ratio() - 0.25).abs() < f64::EPSILON);
    assert_eq!(
        config.resource_attributes.get("deployment.environment").map(String::as_str),
        Some("staging")
    );
}

#[test]
fn telemetry_unknown_protocol_is_rejected() {
    assert!(toml::from_str::<TelemetryConfig>("protocol = \"carrier-pigeon\"").is_err());
}

#[test]
fn sample_ratio_is_clamped() {
    let high: TelemetryConfig = toml::from_str("sample_ratio = 4.0").unwrap();
    assert!((high.clamped_sample_ratio() - 1.0).abs() < f64::EPSILON);

    let low: TelemetryConfig = toml::from_str("sample_ratio = -1.0").unwrap();
    assert!(low.clamped_sample_ratio().abs() < f64::EPSILON);
}
