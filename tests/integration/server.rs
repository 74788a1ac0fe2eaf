use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use perplan_updater::server::{PackageStore, ServerState, router};
use perplan_updater::test_utils::{build_zip, package_with_updater};
use perplan_updater::update::{ChecksumVerifier, RemoteVersionInfo};
use serde_json::Value;
use tempfile::TempDir;

const PUBLIC_URL: &str = "http://updates.test:1234";

fn server(initial_version: &str) -> (TempDir, TestServer) {
    let temp = TempDir::new().unwrap();
    let store = PackageStore::open(temp.path().join("data"), initial_version).unwrap();
    let app = router(ServerState::new(store, PUBLIC_URL), 1024 * 1024);
    (temp, TestServer::new(app).unwrap())
}

fn zip_part(file_name: &str, bytes: Vec<u8>) -> Part {
    Part::bytes(bytes).file_name(file_name).mime_type("application/zip")
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let (_temp, server) = server("1");

    let response = server.get("/").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["version"], "1");
    assert_eq!(body["endpoints"]["check_update"], "/api/update");
    assert_eq!(body["endpoints"]["upload"], "/api/upload");
    assert!(body["files_available"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_descriptor_before_first_upload() {
    let (_temp, server) = server("2");

    let version: Value = server.get("/api/version").await.json();
    assert_eq!(version, serde_json::json!({ "version": "2" }));

    let descriptor: RemoteVersionInfo = server.get("/api/update").await.json();
    assert_eq!(descriptor.version, "2");
    assert_eq!(descriptor.changelog, None);
    assert_eq!(descriptor.download_url, format!("{PUBLIC_URL}/api/download"));
    assert_eq!(descriptor.sha256, None);
}

#[tokio::test]
async fn test_download_synthesizes_placeholder() {
    let (_temp, server) = server("2");

    let response = server.get("/api/download").await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/zip");
    assert!(
        response
            .header("content-disposition")
            .to_str()
            .unwrap()
            .contains("update_v2.zip")
    );

    let bytes = response.as_bytes().to_vec();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.clone())).unwrap();
    assert!(archive.by_name("README.txt").is_ok());

    // The placeholder gets a checksum like any published package
    let descriptor: RemoteVersionInfo = server.get("/api/update").await.json();
    assert_eq!(descriptor.sha256, Some(ChecksumVerifier::compute_sha256(&bytes)));
}

#[tokio::test]
async fn test_upload_publishes_new_version() {
    let (temp, server) = server("3");
    let package = package_with_updater(&[("perplan", b"v4")]);

    let form = MultipartForm::new()
        .add_text("changelog", "Faster seeking")
        .add_part("file", zip_part("update_v4.zip", package.clone()));
    let response = server.post("/api/upload").multipart(form).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["version"], "4");
    assert_eq!(body["changelog"], "Faster seeking");
    assert_eq!(body["filename"], "update_v4.zip");

    let descriptor: RemoteVersionInfo = server.get("/api/update").await.json();
    assert_eq!(descriptor.version, "4");
    assert_eq!(descriptor.changelog.as_deref(), Some("Faster seeking"));
    assert_eq!(descriptor.sha256, Some(ChecksumVerifier::compute_sha256(&package)));

    let download = server.get("/api/download").await;
    assert_eq!(download.as_bytes().as_ref(), package.as_slice());

    let record: Value = serde_json::from_str(
        &std::fs::read_to_string(temp.path().join("data/server_version.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(record["version"], "4");
}

#[tokio::test]
async fn test_upload_replaces_previous_package() {
    let (temp, server) = server("3");

    for (name, content) in [("update_v4.zip", &b"four"[..]), ("update_v5.zip", &b"five"[..])] {
        let form = MultipartForm::new().add_part("file", zip_part(name, build_zip(&[("perplan", content)])));
        server.post("/api/upload").multipart(form).await.assert_status_ok();
    }

    let index: Value = server.get("/").await.json();
    assert_eq!(index["version"], "5");
    assert_eq!(index["files_available"], serde_json::json!(["update_v5.zip"]));
    assert!(!temp.path().join("data/updates/update_v4.zip").exists());
}

#[tokio::test]
async fn test_upload_version_with_prefix_and_fraction() {
    let (_temp, server) = server("3");

    let form = MultipartForm::new().add_part("file", zip_part("PPL-v4.5.zip", build_zip(&[])));
    let response = server.post("/api/upload").multipart(form).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["version"], "4.5");
    assert_eq!(body["filename"], "update_v4.5.zip");
    assert_eq!(body["changelog"], Value::Null);
}

#[tokio::test]
async fn test_upload_rejections() {
    let (_temp, server) = server("3");

    let missing = server
        .post("/api/upload")
        .multipart(MultipartForm::new().add_text("changelog", "x"))
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>()["error"], "No file provided");

    let wrong_type = server
        .post("/api/upload")
        .multipart(MultipartForm::new().add_part(
            "file",
            Part::bytes(b"MZ".to_vec()).file_name("update_v4.exe"),
        ))
        .await;
    wrong_type.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(wrong_type.json::<Value>()["error"], "Invalid file type");

    let no_version = server
        .post("/api/upload")
        .multipart(MultipartForm::new().add_part("file", zip_part("latest.zip", build_zip(&[]))))
        .await;
    no_version.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(no_version.json::<Value>()["error"], "Could not determine version from filename");

    let not_zip = server
        .post("/api/upload")
        .multipart(
            MultipartForm::new().add_part("file", zip_part("update_v4.zip", b"not a zip".to_vec())),
        )
        .await;
    not_zip.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(not_zip.json::<Value>()["error"], "File is not a valid zip archive");

    // Nothing was published
    let version: Value = server.get("/api/version").await.json();
    assert_eq!(version["version"], "3");
}
