//! Full-cycle tests: directory tree, clone, control write, body read,
//! against a live mock HTTP server.

use std::sync::Arc;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apifs_api::ReqwestClient;
use apifs_filesystem::ApiFs;
use apifs_node::{CancelToken, DirNode, FileHandle, FsError, NodeRef};

fn api_fs() -> ApiFs {
    ApiFs::new(Arc::new(ReqwestClient::with_default_timeout().unwrap()))
}

/// The directory name encoding a mock server's host:port.
fn host_name(server: &MockServer) -> String {
    server
        .uri()
        .strip_prefix("http://")
        .expect("mock server uri is http")
        .to_string()
}

fn open_file(fs: &ApiFs, path: &str) -> Box<dyn FileHandle> {
    match fs.resolve(path).unwrap() {
        NodeRef::File(file) => file.open().unwrap().handle,
        NodeRef::Dir(_) => panic!("{} is a directory", path),
    }
}

fn read_to_string(handle: &dyn FileHandle) -> Result<String, FsError> {
    let bytes = handle.read_all(&CancelToken::never())?;
    Ok(String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn clone_write_release_read() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("X-T", "foo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("it worked"))
        .mount(&server)
        .await;

    let host = host_name(&server);

    let body = tokio::task::spawn_blocking(move || {
        let fs = api_fs();
        fs.root().mkdir(&host).unwrap();

        let clone = open_file(&fs, &format!("{}/clone", host));
        assert_eq!(read_to_string(clone.as_ref()).unwrap(), "0\n");

        let ctl = open_file(&fs, &format!("{}/0.ctl", host));
        ctl.write(b"header X-T foo\n", 0).unwrap();
        ctl.release().unwrap();

        let body = open_file(&fs, &format!("{}/0.body", host));
        read_to_string(body.as_ref()).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(body, "it worked");
}

#[tokio::test]
async fn nested_path_method_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(query_param("sort", "name"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_string("posted"))
        .mount(&server)
        .await;

    let host = host_name(&server);

    let body = tokio::task::spawn_blocking(move || {
        let fs = api_fs();
        let host_dir = fs.root().mkdir(&host).unwrap();
        host_dir.mkdir("users").unwrap();

        let clone = open_file(&fs, &format!("{}/users/clone", host));
        assert_eq!(read_to_string(clone.as_ref()).unwrap(), "0\n");

        let ctl = open_file(&fs, &format!("{}/users/0.ctl", host));
        ctl.write(b"method POST\nquery sort name\nquery limit 10\n", 0)
            .unwrap();
        ctl.release().unwrap();

        let body = open_file(&fs, &format!("{}/users/0.body", host));
        read_to_string(body.as_ref()).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(body, "posted");
}

#[tokio::test]
async fn malformed_spec_fails_the_body_read() {
    let server = MockServer::start().await;
    let host = host_name(&server);

    let result = tokio::task::spawn_blocking(move || {
        let fs = api_fs();
        fs.root().mkdir(&host).unwrap();

        let clone = open_file(&fs, &format!("{}/clone", host));
        assert_eq!(read_to_string(clone.as_ref()).unwrap(), "0\n");

        let ctl = open_file(&fs, &format!("{}/0.ctl", host));
        ctl.write(b"garbage\n", 0).unwrap();
        assert!(ctl.release().is_err());

        let body = open_file(&fs, &format!("{}/0.body", host));
        read_to_string(body.as_ref())
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(FsError::Io { .. })));
}

#[tokio::test]
async fn cancelled_read_then_successful_read() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("eventually"))
        .mount(&server)
        .await;

    let host = host_name(&server);

    let body = tokio::task::spawn_blocking(move || {
        let fs = api_fs();
        fs.root().mkdir(&host).unwrap();

        let clone = open_file(&fs, &format!("{}/clone", host));
        assert_eq!(read_to_string(clone.as_ref()).unwrap(), "0\n");

        // Nothing written yet: a cancelled read comes back interrupted.
        let body = open_file(&fs, &format!("{}/0.body", host));
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(body.read_all(&token).unwrap_err(), FsError::Interrupted);

        let ctl = open_file(&fs, &format!("{}/0.ctl", host));
        ctl.write(b"method GET\n", 0).unwrap();
        ctl.release().unwrap();

        read_to_string(body.as_ref()).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(body, "eventually");
}

#[tokio::test]
async fn two_connections_are_independent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("X-N", "one"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("X-N", "two"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second"))
        .mount(&server)
        .await;

    let host = host_name(&server);

    let (first, second) = tokio::task::spawn_blocking(move || {
        let fs = api_fs();
        fs.root().mkdir(&host).unwrap();

        let clone = open_file(&fs, &format!("{}/clone", host));
        assert_eq!(read_to_string(clone.as_ref()).unwrap(), "0\n");
        let clone = open_file(&fs, &format!("{}/clone", host));
        assert_eq!(read_to_string(clone.as_ref()).unwrap(), "1\n");

        // Drive the second connection before the first.
        let ctl = open_file(&fs, &format!("{}/1.ctl", host));
        ctl.write(b"header X-N two\n", 0).unwrap();
        ctl.release().unwrap();

        let ctl = open_file(&fs, &format!("{}/0.ctl", host));
        ctl.write(b"header X-N one\n", 0).unwrap();
        ctl.release().unwrap();

        let second = open_file(&fs, &format!("{}/1.body", host));
        let first = open_file(&fs, &format!("{}/0.body", host));
        (
            read_to_string(first.as_ref()).unwrap(),
            read_to_string(second.as_ref()).unwrap(),
        )
    })
    .await
    .unwrap();

    assert_eq!(first, "first");
    assert_eq!(second, "second");
}

#[tokio::test]
async fn connection_failure_surfaces_on_the_body() {
    // A host nothing listens on.
    let result = tokio::task::spawn_blocking(move || {
        let fs = api_fs();
        fs.root().mkdir("127.0.0.1:1").unwrap();

        let clone = open_file(&fs, "127.0.0.1:1/clone");
        assert_eq!(read_to_string(clone.as_ref()).unwrap(), "0\n");

        let ctl = open_file(&fs, "127.0.0.1:1/0.ctl");
        ctl.write(b"method GET\n", 0).unwrap();
        ctl.release().unwrap();

        let body = open_file(&fs, "127.0.0.1:1/0.body");
        read_to_string(body.as_ref())
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(FsError::Io { .. })));
}
