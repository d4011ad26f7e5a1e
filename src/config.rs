use crate::database::DATABASE_NAME;
use crate::models::media::MEDIA_URL_PREFIX;
use crate::storage::{BlobStore, FsBlobStore};
use rocket::config::Config;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::fs::FileServer;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATABASE_URL: &str = "microblog.sqlite";
pub const DEFAULT_MEDIA_DIR: &str = "static/images";
pub const DEFAULT_API_KEY_LENGTH: usize = 7;

pub const MEDIA_DIR_KEY: &str = "media_dir";
pub const API_KEY_LENGTH_KEY: &str = "api_key_length";
pub const SEED_USERS_KEY: &str = "seed_users";

/// Application settings carried in the Rocket figment next to Rocket's own.
#[derive(Debug, Deserialize)]
struct Settings {
    media_dir: PathBuf,
    api_key_length: usize,
}

pub struct AppState {
    pub api_key_length: usize,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    /// Opens the blob store, serves it under the media URL prefix and
    /// manages the resulting state.
    pub fn manage() -> AdHoc {
        AdHoc::try_on_ignite("Manage config", |rocket| async move {
            let settings = match rocket.figment().extract::<Settings>() {
                Ok(settings) => settings,
                Err(err) => {
                    error!("invalid application config: {}", err);
                    return Err(rocket);
                }
            };
            if settings.api_key_length == 0 {
                error!("{} must be at least 1", API_KEY_LENGTH_KEY);
                return Err(rocket);
            }

            let blobs = match FsBlobStore::open(&settings.media_dir) {
                Ok(blobs) => blobs,
                Err(err) => {
                    error!(dir = %settings.media_dir.display(), "cannot open media directory: {}", err);
                    return Err(rocket);
                }
            };
            info!(dir = %blobs.root().display(), "serving media");

            let files = FileServer::from(blobs.root());
            Ok(rocket
                .mount(MEDIA_URL_PREFIX.trim_end_matches('/'), files)
                .manage(AppState {
                    api_key_length: settings.api_key_length,
                    blobs: Arc::new(blobs),
                }))
        })
    }
}

/// Request limits large enough that oversized media reach the upload
/// validation instead of failing at the transport.
fn limits() -> Limits {
    Limits::default()
        .limit("file", 16.mebibytes())
        .limit("data-form", 16.mebibytes())
}

/// Base config: the given database and media directory, default settings,
/// no seeding.
pub fn figment(database_url: &str, media_dir: &Path) -> Figment {
    let mut database_config = HashMap::new();
    let mut databases = HashMap::new();
    database_config.insert("url", database_url.to_string());
    databases.insert(DATABASE_NAME, database_config);

    Config::figment()
        .merge(("databases", databases))
        .merge(("limits", limits()))
        .merge((MEDIA_DIR_KEY, media_dir.display().to_string()))
        .merge((API_KEY_LENGTH_KEY, DEFAULT_API_KEY_LENGTH))
        .merge((SEED_USERS_KEY, false))
}

/// Create rocket config from environment variables
pub fn from_env() -> Figment {
    let port = env::var("PORT")
        .map(|port| {
            port.parse::<u16>()
                .expect("PORT environment variable should parse to an integer")
        })
        .unwrap_or(DEFAULT_PORT);

    let api_key_length = env::var("API_KEY_LENGTH")
        .map(|length| {
            length
                .parse::<usize>()
                .expect("API_KEY_LENGTH environment variable should parse to an integer")
        })
        .unwrap_or(DEFAULT_API_KEY_LENGTH);

    let seed_users = env::var("SEED_USERS")
        .map(|seed| {
            seed.parse::<bool>()
                .expect("SEED_USERS environment variable should be true or false")
        })
        .unwrap_or(true);

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let media_dir = env::var("MEDIA_DIR").unwrap_or_else(|_| DEFAULT_MEDIA_DIR.to_string());

    figment(&database_url, Path::new(&media_dir))
        .merge(("port", port))
        .merge((API_KEY_LENGTH_KEY, api_key_length))
        .merge((SEED_USERS_KEY, seed_users))
}
