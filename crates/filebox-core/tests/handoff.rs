//! Handing handles across a boundary: JSON records and the blob registry.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::http_server;
use filebox_core::stream;
use filebox_core::{
    BlobRegistry, FileBox, FileBoxConfig, FileBoxError, FileBoxKind, Headers, Metadata,
    RegistryOptions,
};
use serde_json::json;

async fn registry(dir: &std::path::Path, ttl: Option<Duration>) -> Arc<BlobRegistry> {
    Arc::new(
        BlobRegistry::init(RegistryOptions {
            store_dir: Some(dir.join("blobs")),
            ttl,
        })
        .await
        .unwrap(),
    )
}

#[tokio::test]
async fn stream_handle_survives_json_via_registry() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path(), None).await;

    let fb = FileBox::from_stream(
        stream::from_bytes(Bytes::from_static(b"streamed once")),
        "log.txt",
    );
    assert!(matches!(
        fb.to_json(),
        Err(FileBoxError::NotSerializable("Stream"))
    ));

    let uuid = fb.to_uuid(&reg).await.unwrap();
    let by_ref = FileBox::from_uuid(uuid, fb.name(), Arc::clone(&reg));
    let mut md = Metadata::new();
    md.insert("source".into(), json!("pipeline"));
    by_ref.set_metadata(md).unwrap();

    let json = by_ref.to_json().unwrap();
    let restored = FileBox::from_json(&json, Some(Arc::clone(&reg))).unwrap();
    assert_eq!(restored.kind(), FileBoxKind::RegisteredBlob);
    assert_eq!(restored.name(), "log.txt");
    assert_eq!(restored.metadata()["source"], json!("pipeline"));
    // Registered blobs are re-readable.
    for _ in 0..2 {
        assert_eq!(&restored.to_buffer().await.unwrap()[..], b"streamed once");
    }
    // Already registered here: same reference back.
    assert_eq!(restored.to_uuid(&reg).await.unwrap(), uuid);

    reg.close().await.unwrap();
    assert!(!reg.store_dir().exists());
}

#[tokio::test]
async fn uuid_record_without_registry_is_rejected() {
    let json = r#"{"name":"a.bin","type":"uuid","uuid":"67e55044-10b1-426f-9247-bb680e5fe0c8"}"#;
    assert!(matches!(
        FileBox::from_json(json, None),
        Err(FileBoxError::Configuration(_))
    ));
}

#[tokio::test]
async fn expired_blob_fails_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path(), Some(Duration::from_millis(50))).await;
    let fb = FileBox::from_buffer(Bytes::from_static(b"short-lived"), "t.bin");
    let uuid = fb.to_uuid(&reg).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let by_ref = FileBox::from_uuid(uuid, "t.bin", reg);
    assert!(matches!(
        by_ref.to_buffer().await,
        Err(FileBoxError::UnknownBlob(u)) if u == uuid
    ));
}

#[tokio::test]
async fn remote_handle_round_trips_as_url_record() {
    let body = common::body(3_000);
    let server = http_server::start(body.clone());
    let mut headers = Headers::new();
    headers.insert("X-Token".into(), "abc".into());
    let fb = FileBox::from_url(&server.url("/file.bin"), headers).unwrap();

    let v: serde_json::Value = serde_json::from_str(&fb.to_json().unwrap()).unwrap();
    assert_eq!(v["type"], json!("url"));
    assert_eq!(v["headers"]["X-Token"], json!("abc"));

    let restored = FileBox::from_json(&v.to_string(), None)
        .unwrap()
        .with_config(Arc::new(FileBoxConfig {
            chunk_size: 1024,
            ..FileBoxConfig::default()
        }));
    assert_eq!(&restored.to_buffer().await.unwrap()[..], &body[..]);
}

#[tokio::test]
async fn remote_handle_can_be_registered() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path(), None).await;
    let body = common::body(2_500);
    let server = http_server::start(body.clone());

    let fb = FileBox::from_url(&server.url("/file.bin"), Headers::new()).unwrap();
    let uuid = fb.to_uuid(&reg).await.unwrap();
    let got = stream::collect(reg.load(&uuid).await.unwrap()).await.unwrap();
    assert_eq!(&got[..], &body[..]);
}

#[tokio::test]
async fn remote_download_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let body = common::body(9_000);
    let server = http_server::start(body.clone());
    let fb = FileBox::from_url(&server.url("/file.bin"), Headers::new())
        .unwrap()
        .with_config(Arc::new(FileBoxConfig {
            chunk_size: 2048,
            ..FileBoxConfig::default()
        }));

    let dest = dir.path().join("out.bin");
    let written = fb.to_file(Some(dest.as_path()), false).await.unwrap();
    assert_eq!(written, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), body);

    assert!(matches!(
        fb.to_file(Some(dest.as_path()), false).await,
        Err(FileBoxError::FileExists(_))
    ));
    fb.to_file(Some(dest.as_path()), true).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn failed_download_leaves_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let server = http_server::start(common::body(10));
    let fb = FileBox::from_url(&server.url("/missing"), Headers::new()).unwrap();
    let dest = dir.path().join("never.bin");
    assert!(fb.to_file(Some(dest.as_path()), false).await.is_err());
    assert!(!dest.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
