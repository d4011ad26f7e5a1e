//! This file contains utility functions used by all tests.
#![allow(dead_code)]

use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

/// Utility macro for turning `json!` into string.
#[macro_export]
macro_rules! json_string {
    ($value:tt) => {
        serde_json::to_string(&serde_json::json!($value)).expect("cannot json stringify")
    };
}

pub const BOUNDARY: &str = "microblogtestboundary";

/// A client over its own database and media directory.
pub struct TestApp {
    pub client: Client,
    pub media_dir: PathBuf,
    // Dropped last, after the client has released the database.
    _dir: TempDir,
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("temporary directory");
    let database = dir.path().join("microblog.sqlite");
    let media_dir = dir.path().join("images");

    let figment = microblog::config::figment(database.to_str().expect("utf-8 path"), &media_dir)
        .merge(("log_level", "off"));
    let client = Client::tracked(microblog::build(figment)).expect("valid rocket instance");

    TestApp {
        client,
        media_dir,
        _dir: dir,
    }
}

pub fn api_key(key: &str) -> Header<'static> {
    Header::new("api-key", key.to_string())
}

pub fn response_json_value(response: LocalResponse<'_>) -> Value {
    let body = response.into_string().expect("response body");
    serde_json::from_str(&body).expect("can't parse value")
}

/// Creates a user and returns its id and api key.
pub fn create_user(client: &Client, name: &str) -> (i64, String) {
    let response = client.post(format!("/api/users/{}", name)).dispatch();
    assert_eq!(response.status(), Status::Ok);

    let value = response_json_value(response);
    let user = &value["user"];
    let id = user["id"].as_i64().expect("user id");
    let key = user["api_key"].as_str().expect("api key").to_string();
    (id, key)
}

pub fn post_tweet(client: &Client, key: &str, content: &str) -> i64 {
    let response = client
        .post("/api/tweets")
        .header(ContentType::JSON)
        .header(api_key(key))
        .body(json_string!({ "tweet_data": content }))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    response_json_value(response)["tweet_id"]
        .as_i64()
        .expect("tweet id")
}

/// Multipart body carrying one file under the `file` field.
pub fn multipart(filename: &str, bytes: &[u8]) -> (ContentType, Vec<u8>) {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let content_type = ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY));
    (content_type, body)
}

pub fn upload<'c>(client: &'c Client, key: &str, filename: &str, bytes: &[u8]) -> LocalResponse<'c> {
    let (content_type, body) = multipart(filename, bytes);
    client
        .post("/api/medias")
        .header(content_type)
        .header(api_key(key))
        .body(body)
        .dispatch()
}

pub fn assert_error(response: LocalResponse<'_>, status: Status, error_type: &str) -> Value {
    assert_eq!(response.status(), status);
    let value = response_json_value(response);
    assert_eq!(value["result"], false);
    assert_eq!(value["error_type"], error_type);
    assert!(value["error_message"].is_string());
    value
}
