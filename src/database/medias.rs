use crate::errors::ApiError;
use crate::models::media::Media;
use crate::schema::medias;
use crate::storage::BlobStore;
use diesel::prelude::*;
use tracing::{debug, warn};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Compared case-sensitively against the text after the last dot.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tiff", "heic"];

#[derive(Insertable)]
#[diesel(table_name = medias)]
struct NewMedia<'a> {
    name: &'a str,
}

/// Text after the last dot, or the whole name when there is none.
fn extension(filename: &str) -> &str {
    filename.rsplit('.').next().unwrap_or(filename)
}

/// Always clean: no scanner is wired in.
fn contains_malware(_bytes: &[u8]) -> bool {
    false
}

/// Size, then extension, then malware; the first failing check wins.
pub fn validate_upload(filename: &str, bytes: &[u8]) -> Result<(), ApiError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        warn!(size = bytes.len(), "rejected oversized upload");
        return Err(ApiError::FileSize);
    }
    if !ALLOWED_EXTENSIONS.contains(&extension(filename)) {
        warn!(filename, "rejected upload with disallowed extension");
        return Err(ApiError::FileType);
    }
    if contains_malware(bytes) {
        warn!(filename, "rejected upload flagged as malware");
        return Err(ApiError::FileMalware);
    }
    Ok(())
}

/// Records the upload and writes its bytes as `{id}.{ext}`.
///
/// The row is inserted, renamed once its id is known and the blob written,
/// all inside one transaction: a failure at any step leaves no row behind.
pub fn store_upload(
    conn: &mut SqliteConnection,
    blobs: &dyn BlobStore,
    bytes: &[u8],
    original_filename: &str,
) -> Result<Media, ApiError> {
    conn.transaction(|conn| {
        let placeholder: Media = diesel::insert_into(medias::table)
            .values(&NewMedia {
                name: original_filename,
            })
            .get_result(conn)?;

        let name = format!("{}.{}", placeholder.id, extension(original_filename));
        let media: Media = diesel::update(medias::table.find(placeholder.id))
            .set(medias::name.eq(name.as_str()))
            .get_result(conn)?;

        blobs.put(&media.name, bytes)?;
        debug!(media_id = media.id, name = %media.name, size = bytes.len(), "media stored");
        Ok(media)
    })
}

/// Links unattached media to `tweet_id`; returns how many were linked.
///
/// Ids that don't exist, or that already belong to a tweet, are skipped.
pub fn attach_to_tweet(conn: &mut SqliteConnection, media_ids: &[i32], tweet_id: i32) -> Result<usize, ApiError> {
    let linked = diesel::update(
        medias::table
            .filter(medias::id.eq_any(media_ids))
            .filter(medias::tweet_id.is_null()),
    )
    .set(medias::tweet_id.eq(tweet_id))
    .execute(conn)?;

    if linked < media_ids.len() {
        warn!(
            tweet_id,
            requested = media_ids.len(),
            linked,
            "some media ids were unknown or already attached"
        );
    }
    Ok(linked)
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> Result<Option<Media>, ApiError> {
    let media = medias::table.find(id).first::<Media>(conn).optional()?;
    Ok(media)
}

/// Media attached to any of `tweet_ids`, in id order.
pub fn attached_to(conn: &mut SqliteConnection, tweet_ids: &[i32]) -> Result<Vec<Media>, ApiError> {
    if tweet_ids.is_empty() {
        return Ok(Vec::new());
    }
    let media = medias::table
        .filter(medias::tweet_id.eq_any(tweet_ids))
        .order(medias::id)
        .load::<Media>(conn)?;
    Ok(media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{test_connection, tweets, users};
    use crate::storage::FsBlobStore;
    use std::io;

    struct BrokenStore;

    impl BlobStore for BrokenStore {
        fn put(&self, _name: &str, _bytes: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn remove(&self, _name: &str) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn size_is_checked_first() {
        let big = vec![0u8; 6 * 1024 * 1024];
        assert!(matches!(validate_upload("big.txt", &big), Err(ApiError::FileSize)));

        let exact = vec![0u8; MAX_UPLOAD_BYTES];
        assert!(validate_upload("exact.png", &exact).is_ok());
    }

    #[test]
    fn extension_rules() {
        for ok in ["a.png", "a.jpg", "a.jpeg", "a.tiff", "a.heic", "archive.tar.jpeg"] {
            assert!(validate_upload(ok, b"x").is_ok(), "{} should pass", ok);
        }
        for bad in ["a.txt", "a.PNG", "a.jpeg.exe", "noextension", ""] {
            assert!(
                matches!(validate_upload(bad, b"x"), Err(ApiError::FileType)),
                "{} should fail",
                bad
            );
        }
    }

    #[test]
    fn stored_name_is_id_and_extension() {
        let conn = &mut test_connection();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::open(dir.path()).unwrap();

        let media = store_upload(conn, &blobs, b"jpeg bytes", "holiday.jpeg").unwrap();
        assert_eq!(media.name, format!("{}.jpeg", media.id));
        assert_eq!(media.tweet_id, None);
        assert_eq!(find(conn, media.id).unwrap(), Some(media.clone()));
        assert_eq!(
            std::fs::read(dir.path().join(&media.name)).unwrap(),
            b"jpeg bytes"
        );
    }

    #[test]
    fn failed_blob_write_leaves_no_row() {
        let conn = &mut test_connection();

        let result = store_upload(conn, &BrokenStore, b"x", "a.png");
        assert!(matches!(result, Err(ApiError::Storage(_))));

        let count: i64 = medias::table.count().get_result(conn).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn attach_links_only_unattached_media() {
        let conn = &mut test_connection();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::open(dir.path()).unwrap();
        let user = users::create(conn, "alice", 7).unwrap();
        let first = tweets::create(conn, "first", user.id).unwrap();
        let second = tweets::create(conn, "second", user.id).unwrap();
        let media = store_upload(conn, &blobs, b"x", "a.png").unwrap();

        assert_eq!(attach_to_tweet(conn, &[media.id, 999], first.id).unwrap(), 1);
        assert_eq!(find(conn, media.id).unwrap().unwrap().tweet_id, Some(first.id));

        assert_eq!(attach_to_tweet(conn, &[media.id], second.id).unwrap(), 0);
        assert_eq!(find(conn, media.id).unwrap().unwrap().tweet_id, Some(first.id));
        assert_eq!(attached_to(conn, &[first.id]).unwrap().len(), 1);
        assert!(attached_to(conn, &[second.id]).unwrap().is_empty());
    }
}
