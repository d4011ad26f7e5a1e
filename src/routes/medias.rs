use crate::auth::ApiKey;
use crate::config::AppState;
use crate::database::{self, Db};
use crate::errors::ApiError;
use rocket::form::{self, Form};
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::{json, Value};
use rocket::tokio::io::AsyncReadExt;
use rocket::State;
use std::io;
use tracing::{info, warn};

#[derive(FromForm)]
pub struct Upload<'r> {
    file: TempFile<'r>,
}

fn invalid_form(errors: form::Errors<'_>) -> ApiError {
    if errors.status() == Status::PayloadTooLarge {
        return ApiError::FileSize;
    }
    let message = errors
        .iter()
        .next()
        .map(|err| match &err.name {
            Some(name) => format!("{}: {}", name, err),
            None => err.to_string(),
        })
        .unwrap_or_else(|| "invalid form".to_string());
    ApiError::Validation(message)
}

/// Name the client gave the file. Only its extension is ever used.
fn original_filename(file: &TempFile<'_>) -> String {
    file.raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_default()
}

async fn read_file(file: &TempFile<'_>) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(file.len() as usize);
    let reader = file.open().await?;
    rocket::tokio::pin!(reader);
    reader.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

#[post("/medias", data = "<upload>")]
pub async fn post_media(
    upload: Result<Form<Upload<'_>>, form::Errors<'_>>,
    key: ApiKey,
    db: Db,
    state: &State<AppState>,
) -> Result<Value, ApiError> {
    let user = db.run(move |conn| key.resolve(conn)).await?;

    let upload = upload.map_err(invalid_form)?;
    let filename = original_filename(&upload.file);
    if upload.file.len() > database::medias::MAX_UPLOAD_BYTES as u64 {
        warn!(size = upload.file.len(), "rejected oversized upload");
        return Err(ApiError::FileSize);
    }
    let bytes = read_file(&upload.file).await?;
    database::medias::validate_upload(&filename, &bytes)?;

    let blobs = state.blobs.clone();
    let media = db
        .run(move |conn| database::medias::store_upload(conn, blobs.as_ref(), &bytes, &filename))
        .await?;

    info!(media_id = media.id, user_id = user.id, "media uploaded");
    Ok(json!({ "result": true, "media_id": media.id }))
}
