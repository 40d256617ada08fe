//! Wire-level tests for the local endpoint over real TCP connections

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::net::SocketAddr;
use stowage_core::auth::{CanonicalRequest, Credentials};
use stowage_core::{http_date, Acl, BucketName, ContentHash, ETag};
use stowage_server::{spawn_local, StoredObject};

type HttpClient = Client<hyper_util::client::legacy::connect::HttpConnector, Full<Bytes>>;

fn credentials() -> Credentials {
    Credentials::new("AKIDEXAMPLE", "endpoint-test-secret")
}

fn client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build_http()
}

fn signed(addr: SocketAddr, method: Method, path: &str, body: &[u8]) -> Request<Full<Bytes>> {
    let date = http_date(chrono::Utc::now());
    let md5 = ContentHash::new(body).to_base64();

    let mut canonical = CanonicalRequest::new(method.as_str(), path);
    canonical.add_header("date", &date);
    canonical.add_header("content-md5", &md5);

    Request::builder()
        .method(method)
        .uri(format!("http://{}{}", addr, path))
        .header("date", date)
        .header("content-md5", md5)
        .header("authorization", canonical.sign(&credentials()).unwrap())
        .body(Full::new(Bytes::copy_from_slice(body)))
        .unwrap()
}

fn anonymous(addr: SocketAddr, method: Method, path: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(format!("http://{}{}", addr, path))
        .body(Full::new(Bytes::new()))
        .unwrap()
}

#[tokio::test]
async fn put_then_get_over_tcp() {
    let (addr, _store, _handle) = spawn_local(credentials()).await.unwrap();
    let client = client();

    let resp = client.request(signed(addr, Method::PUT, "/test-bucket", b"")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .request(signed(addr, Method::PUT, "/test-bucket/dir/key.txt", b"testdata"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("etag").unwrap().to_str().unwrap(),
        ETag::compute(b"testdata").quoted()
    );

    let resp = client
        .request(signed(addr, Method::GET, "/test-bucket/dir/key.txt", b""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"testdata"));
}

#[tokio::test]
async fn head_reports_length_without_body() {
    let (addr, store, _handle) = spawn_local(credentials()).await.unwrap();
    store.create_bucket(&BucketName::new("test-bucket").unwrap()).unwrap();
    store
        .put_object(
            "test-bucket",
            "photo.jpg",
            StoredObject::new(Bytes::from_static(b"not really a jpeg"), "image/jpeg", Acl::Private),
        )
        .unwrap();

    let resp = client()
        .request(signed(addr, Method::HEAD, "/test-bucket/photo.jpg", b""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-length").unwrap(), "17");
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/jpeg");
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

#[tokio::test]
async fn errors_are_xml_documents() {
    let (addr, _store, _handle) = spawn_local(credentials()).await.unwrap();

    let resp = client()
        .request(signed(addr, Method::GET, "/missing-bucket/key", b""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/xml");
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("<Code>NoSuchBucket</Code>"));
    assert!(text.contains("<Resource>/missing-bucket/key</Resource>"));
}

#[tokio::test]
async fn invalid_bucket_name_is_rejected() {
    let (addr, _store, _handle) = spawn_local(credentials()).await.unwrap();

    let resp = client()
        .request(signed(addr, Method::PUT, "/Bad_Bucket", b""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("InvalidBucketName"));
}

#[tokio::test]
async fn content_md5_mismatch_is_bad_digest() {
    let (addr, store, _handle) = spawn_local(credentials()).await.unwrap();
    store.create_bucket(&BucketName::new("test-bucket").unwrap()).unwrap();

    let mut request = signed(addr, Method::PUT, "/test-bucket/key", b"testdata");
    *request.body_mut() = Full::new(Bytes::from_static(b"tampered"));

    let resp = client().request(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.get_object("test-bucket", "key").is_err());
}

#[tokio::test]
async fn anonymous_reads_need_a_public_acl() {
    let (addr, store, _handle) = spawn_local(credentials()).await.unwrap();
    store.create_bucket(&BucketName::new("test-bucket").unwrap()).unwrap();
    store
        .put_object(
            "test-bucket",
            "public.html",
            StoredObject::new(Bytes::from_static(b"<p>hi</p>"), "text/html", Acl::PublicRead),
        )
        .unwrap();
    store
        .put_object(
            "test-bucket",
            "private.html",
            StoredObject::new(Bytes::from_static(b"<p>no</p>"), "text/html", Acl::AuthenticatedRead),
        )
        .unwrap();
    let client = client();

    let resp = client
        .request(anonymous(addr, Method::GET, "/test-bucket/public.html"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    for path in ["/test-bucket/private.html", "/test-bucket/missing.html", "/test-bucket"] {
        let resp = client.request(anonymous(addr, Method::GET, path)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", path);
    }

    let resp = client
        .request(anonymous(addr, Method::DELETE, "/test-bucket/public.html"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(store.get_object("test-bucket", "public.html").is_ok());
}
