use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{self, Request, StatusCode};
use futures::StreamExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use galleria_blob::BlobStore;
use galleria_blob_fs::FsBlobStore;
use galleria_blob_memory::MemoryBlobStore;
use galleria_gallery::{Gallery, GalleryBuilder};
use galleria_metadata_memory::MemoryMetadataStore;
use galleria_server::api::{self, AppState};

const BOUNDARY: &str = "galleria-test-boundary";

// -- Helpers --------------------------------------------------------------

fn build_state(blobs: Arc<dyn BlobStore>, uploads_dir: Option<PathBuf>) -> AppState {
    let gallery = GalleryBuilder::new()
        .blob_store(Arc::clone(&blobs))
        .metadata_store(Arc::new(MemoryMetadataStore::new()))
        .build()
        .expect("gallery should build");

    AppState {
        gallery: Arc::new(gallery),
        blobs,
        uploads_dir,
        upload_field: Arc::from("image"),
        max_upload_bytes: 1024 * 1024,
    }
}

fn memory_state() -> AppState {
    build_state(Arc::new(MemoryBlobStore::with_field("image")), None)
}

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri("/upload")
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, content_type, data)))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn put_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(http::Method::PUT)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(http::Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn upload_png(app: &Router, name: &str) -> Value {
    let (status, body) = send_json(app, upload_request("image", name, "image/png", &[7u8; 10])).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    body["image"].clone()
}

// -- Upload ---------------------------------------------------------------

#[tokio::test]
async fn upload_returns_record() {
    let state = memory_state();
    let app = api::router(state.clone());

    let (status, body) =
        send_json(&app, upload_request("image", "a.png", "image/png", &[1u8; 10])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["image"]["id"], 1);
    assert_eq!(body["image"]["originalname"], "a.png");
    assert_eq!(body["image"]["mimetype"], "image/png");
    assert_eq!(body["image"]["size"], 10);
    let filename = body["image"]["filename"].as_str().unwrap();
    assert!(filename.starts_with("image-"));
    assert!(filename.ends_with(".png"));
    assert_eq!(state.blobs.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let state = memory_state();
    let app = api::router(state.clone());

    let (status, body) =
        send_json(&app, upload_request("avatar", "a.png", "image/png", &[1u8; 10])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file uploaded");
    assert!(state.blobs.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_of_non_image_is_rejected_without_storing() {
    let state = memory_state();
    let app = api::router(state.clone());

    let (status, body) =
        send_json(&app, upload_request("image", "notes.txt", "text/plain", b"hello")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Upload failed");
    assert_eq!(body["kind"], "invalid_file_type");
    assert_eq!(body["retryable"], false);
    assert!(state.blobs.list().await.unwrap().is_empty());
    assert_eq!(state.gallery.metrics().snapshot().uploads_rejected, 1);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let mut state = memory_state();
    state.max_upload_bytes = 64;
    let app = api::router(state.clone());

    let (status, _) = send(&app, upload_request("image", "big.png", "image/png", &[0u8; 512])).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(state.blobs.list().await.unwrap().is_empty());
}

// -- Images ---------------------------------------------------------------

#[tokio::test]
async fn list_is_empty_then_ordered() {
    let app = api::router(memory_state());

    let (status, body) = send_json(&app, get("/images")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    upload_png(&app, "first.png").await;
    upload_png(&app, "second.png").await;

    let (_, body) = send_json(&app, get("/images")).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["originalname"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["first.png", "second.png"]);
}

#[tokio::test]
async fn get_single_image() {
    let app = api::router(memory_state());
    let image = upload_png(&app, "a.png").await;

    let (status, body) = send_json(&app, get("/images/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, image);

    let (status, body) = send_json(&app, get("/images/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Image not found");
}

#[tokio::test]
async fn rename_reports_whether_a_record_matched() {
    let app = api::router(memory_state());
    upload_png(&app, "a.png").await;

    let (status, body) =
        send_json(&app, put_json("/images/1", &json!({ "newOriginalName": "b.png" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Image record updated successfully");
    assert_eq!(body["updated"], true);

    let (_, body) = send_json(&app, get("/images/1")).await;
    assert_eq!(body["originalname"], "b.png");

    let (status, body) =
        send_json(&app, put_json("/images/42", &json!({ "newOriginalName": "c.png" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], false);
}

#[tokio::test]
async fn rename_without_name_is_client_error() {
    let app = api::router(memory_state());
    upload_png(&app, "a.png").await;

    let (status, _) = send(&app, put_json("/images/1", &json!({ "name": "b.png" }))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn delete_removes_record_and_blob() {
    let state = memory_state();
    let app = api::router(state.clone());
    upload_png(&app, "a.png").await;

    let (status, body) = send_json(&app, delete("/images/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Image record deleted successfully");
    assert_eq!(body["deleted"], true);
    assert_eq!(body["blobRemoved"], true);
    assert!(state.blobs.list().await.unwrap().is_empty());

    let (status, body) = send_json(&app, delete("/images/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], false);
    assert_eq!(body["blobRemoved"], false);

    let (_, body) = send_json(&app, get("/images")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let app = api::router(memory_state());

    for request in [
        get("/images/abc"),
        put_json("/images/abc", &json!({ "newOriginalName": "x.png" })),
        delete("/images/abc"),
    ] {
        let (status, body) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid image id: abc");
    }
}

// -- Uploaded files -------------------------------------------------------

#[tokio::test]
async fn uploads_are_served_from_memory_store() {
    let app = api::router(memory_state());
    let image = upload_png(&app, "a.png").await;
    let filename = image["filename"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/uploads/{filename}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[http::header::CONTENT_TYPE], "image/png");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], &[7u8; 10]);

    let (status, _) = send(&app, get("/uploads/image-missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/uploads/..%2Fsecret")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_served_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::open(dir.path().join("uploads"), "image")
        .await
        .unwrap();
    let root = store.root().to_path_buf();
    let app = api::router(build_state(Arc::new(store), Some(root.clone())));

    let image = upload_png(&app, "a.png").await;
    let filename = image["filename"].as_str().unwrap();
    assert!(root.join(filename).is_file());

    let (status, body) = send(&app, get(&format!("/uploads/{filename}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, vec![7u8; 10]);
}

// -- Health ---------------------------------------------------------------

#[tokio::test]
async fn health_reports_counts() {
    let app = api::router(memory_state());
    upload_png(&app, "a.png").await;

    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["pending_uploads"], 0);
    assert_eq!(body["known_orphans"], 0);
    assert_eq!(body["metrics"]["uploads_accepted"], 1);
}

// -- Live server ----------------------------------------------------------

async fn spawn_server(state: AppState) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn wait_for_open_sessions(gallery: &Gallery, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while gallery.hub().open_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("viewer sessions did not open in time");
}

#[tokio::test]
async fn viewer_is_notified_once_per_upload() {
    let state = memory_state();
    let gallery = Arc::clone(&state.gallery);
    let addr = spawn_server(state).await;

    let (mut viewer, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    wait_for_open_sessions(&gallery, 1).await;

    let part = reqwest::multipart::Part::bytes(vec![0u8; 10])
        .file_name("a.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("image", part);
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["image"]["size"], 10);
    assert_eq!(body["image"]["originalname"], "a.png");

    let frame = tokio::time::timeout(Duration::from_secs(5), viewer.next())
        .await
        .expect("no notification received")
        .unwrap()
        .unwrap();
    assert_eq!(frame.to_text().unwrap(), "image_uploaded");

    let extra = tokio::time::timeout(Duration::from_millis(200), viewer.next()).await;
    assert!(extra.is_err(), "unexpected second frame: {extra:?}");
}

#[tokio::test]
async fn root_path_accepts_viewers_and_closed_viewers_unregister() {
    let state = memory_state();
    let gallery = Arc::clone(&state.gallery);
    let addr = spawn_server(state).await;

    let (mut first, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();
    let (second, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    wait_for_open_sessions(&gallery, 2).await;

    drop(second);
    tokio::time::timeout(Duration::from_secs(5), async {
        while gallery.hub().session_count() != 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("closed viewer was not unregistered");

    let part = reqwest::multipart::Part::bytes(vec![1u8; 4])
        .file_name("b.gif")
        .mime_str("image/gif")
        .unwrap();
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/upload"))
        .multipart(reqwest::multipart::Form::new().part("image", part))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let frame = tokio::time::timeout(Duration::from_secs(5), first.next())
        .await
        .expect("no notification received")
        .unwrap()
        .unwrap();
    assert_eq!(frame.to_text().unwrap(), "image_uploaded");
    assert_eq!(gallery.metrics().snapshot().deliveries, 1);
}
