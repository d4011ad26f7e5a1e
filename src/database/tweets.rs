use crate::database::{likes, medias};
use crate::errors::ApiError;
use crate::models::media::Media;
use crate::models::tweet::{Tweet, TweetView};
use crate::models::user::{Author, User};
use crate::schema::{followers, likes as likes_table, medias as medias_table, tweets, users};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Insertable)]
#[diesel(table_name = tweets)]
struct NewTweet<'a> {
    content: &'a str,
    user_id: i32,
    timestamp: NaiveDateTime,
}

pub fn create(conn: &mut SqliteConnection, content: &str, author_id: i32) -> Result<Tweet, ApiError> {
    let tweet: Tweet = diesel::insert_into(tweets::table)
        .values(&NewTweet {
            content,
            user_id: author_id,
            timestamp: Utc::now().naive_utc(),
        })
        .get_result(conn)?;
    debug!(tweet_id = tweet.id, author_id, "tweet created");
    Ok(tweet)
}

/// Creates the tweet and links the referenced media to it in one
/// transaction. Unknown or already attached media ids are skipped.
pub fn publish(
    conn: &mut SqliteConnection,
    content: &str,
    author_id: i32,
    media_ids: &[i32],
) -> Result<Tweet, ApiError> {
    conn.transaction(|conn| {
        let tweet = create(conn, content, author_id)?;
        if !media_ids.is_empty() {
            medias::attach_to_tweet(conn, media_ids, tweet.id)?;
        }
        Ok(tweet)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> Result<Option<Tweet>, ApiError> {
    let tweet = tweets::table.find(id).first::<Tweet>(conn).optional()?;
    Ok(tweet)
}

/// Every tweet, newest first.
pub fn list(conn: &mut SqliteConnection) -> Result<Vec<TweetView>, ApiError> {
    let rows = tweets::table
        .inner_join(users::table)
        .select((Tweet::as_select(), User::as_select()))
        .order((tweets::timestamp.desc(), tweets::id.desc()))
        .load::<(Tweet, User)>(conn)?;
    to_views(conn, rows)
}

/// Tweets of the users `user_id` follows, newest first.
pub fn feed(conn: &mut SqliteConnection, user_id: i32) -> Result<Vec<TweetView>, ApiError> {
    let followed = followers::table
        .filter(followers::follower_id.eq(user_id))
        .select(followers::followed_id);

    let rows = tweets::table
        .inner_join(users::table)
        .filter(tweets::user_id.eq_any(followed))
        .select((Tweet::as_select(), User::as_select()))
        .order((tweets::timestamp.desc(), tweets::id.desc()))
        .load::<(Tweet, User)>(conn)?;
    to_views(conn, rows)
}

fn to_views(conn: &mut SqliteConnection, rows: Vec<(Tweet, User)>) -> Result<Vec<TweetView>, ApiError> {
    let ids: Vec<i32> = rows.iter().map(|(tweet, _)| tweet.id).collect();

    let mut attachments: HashMap<i32, Vec<Media>> = HashMap::new();
    for media in medias::attached_to(conn, &ids)? {
        if let Some(tweet_id) = media.tweet_id {
            attachments.entry(tweet_id).or_default().push(media);
        }
    }

    let mut likers: HashMap<i32, Vec<Author>> = HashMap::new();
    for (tweet_id, liker) in likes::likers_of(conn, &ids)? {
        likers.entry(tweet_id).or_default().push(liker);
    }

    let views = rows
        .into_iter()
        .map(|(tweet, author)| {
            let media = attachments.remove(&tweet.id).unwrap_or_default();
            let liked_by = likers.remove(&tweet.id).unwrap_or_default();
            tweet.attach(&author, &media, liked_by)
        })
        .collect();
    Ok(views)
}

/// Deletes a tweet owned by `caller`, with its like edges and media rows.
///
/// Returns the removed media so their blobs can be dropped too.
pub fn delete(conn: &mut SqliteConnection, tweet_id: i32, caller: &User) -> Result<Vec<Media>, ApiError> {
    conn.transaction(|conn| {
        let tweet = find(conn, tweet_id)?.ok_or(ApiError::TweetNotFound)?;
        if tweet.user_id != caller.id {
            warn!(tweet_id, caller_id = caller.id, "rejected delete of foreign tweet");
            return Err(ApiError::NotTweetOwner);
        }

        let removed = medias::attached_to(conn, &[tweet.id])?;
        diesel::delete(likes_table::table.filter(likes_table::tweet_id.eq(tweet.id))).execute(conn)?;
        diesel::delete(medias_table::table.filter(medias_table::tweet_id.eq(tweet.id)))
            .execute(conn)?;
        diesel::delete(tweets::table.find(tweet.id)).execute(conn)?;

        debug!(tweet_id, media = removed.len(), "tweet deleted");
        Ok(removed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{follows, test_connection, users as user_store};
    use crate::storage::FsBlobStore;

    #[test]
    fn new_tweet_is_listed_first() {
        let conn = &mut test_connection();
        let alice = user_store::create(conn, "alice", 7).unwrap();

        create(conn, "older", alice.id).unwrap();
        let newest = create(conn, "newest", alice.id).unwrap();

        let views = list(conn).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, newest.id);
        assert_eq!(views[0].content, "newest");
        assert!(views[0].attachments.is_empty());
        assert_eq!(views[0].author, alice.to_author());
        assert!(views[0].likes.is_empty());
    }

    #[test]
    fn views_carry_likes_and_attachments() {
        let conn = &mut test_connection();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::open(dir.path()).unwrap();
        let alice = user_store::create(conn, "alice", 7).unwrap();
        let bob = user_store::create(conn, "bob", 7).unwrap();

        let media = medias::store_upload(conn, &blobs, b"img", "cat.png").unwrap();
        let tweet = publish(conn, "with cat", alice.id, &[media.id]).unwrap();
        likes::like(conn, &bob, tweet.id).unwrap();

        let views = list(conn).unwrap();
        assert_eq!(views[0].attachments, vec![format!("/static/images/{}.png", media.id)]);
        assert_eq!(views[0].likes.len(), 1);
        assert_eq!(views[0].likes[0].user_id, bob.id);
        assert_eq!(views[0].likes[0].name, "bob");
    }

    #[test]
    fn owner_delete_cascades() {
        let conn = &mut test_connection();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::open(dir.path()).unwrap();
        let alice = user_store::create(conn, "alice", 7).unwrap();
        let bob = user_store::create(conn, "bob", 7).unwrap();

        let media = medias::store_upload(conn, &blobs, b"img", "cat.jpg").unwrap();
        let tweet = publish(conn, "bye", alice.id, &[media.id]).unwrap();
        likes::like(conn, &bob, tweet.id).unwrap();

        let removed = delete(conn, tweet.id, &alice).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, media.id);
        assert!(find(conn, tweet.id).unwrap().is_none());
        assert!(medias::find(conn, media.id).unwrap().is_none());
        assert!(!likes::is_liked(conn, tweet.id, bob.id).unwrap());
    }

    #[test]
    fn foreign_delete_is_rejected() {
        let conn = &mut test_connection();
        let alice = user_store::create(conn, "alice", 7).unwrap();
        let bob = user_store::create(conn, "bob", 7).unwrap();
        let tweet = create(conn, "mine", alice.id).unwrap();

        assert!(matches!(delete(conn, tweet.id, &bob), Err(ApiError::NotTweetOwner)));
        assert!(find(conn, tweet.id).unwrap().is_some());
        assert!(matches!(delete(conn, 999, &bob), Err(ApiError::TweetNotFound)));
    }

    #[test]
    fn feed_only_has_followed_authors() {
        let conn = &mut test_connection();
        let alice = user_store::create(conn, "alice", 7).unwrap();
        let bob = user_store::create(conn, "bob", 7).unwrap();
        let carol = user_store::create(conn, "carol", 7).unwrap();

        create(conn, "from bob", bob.id).unwrap();
        create(conn, "from carol", carol.id).unwrap();
        create(conn, "from alice", alice.id).unwrap();
        follows::follow(conn, &alice, bob.id).unwrap();

        let timeline = feed(conn, alice.id).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].content, "from bob");
        assert!(feed(conn, carol.id).unwrap().is_empty());
    }

    #[test]
    fn unknown_media_ids_are_ignored() {
        let conn = &mut test_connection();
        let alice = user_store::create(conn, "alice", 7).unwrap();

        let tweet = publish(conn, "no media", alice.id, &[41, 42]).unwrap();
        assert!(find(conn, tweet.id).unwrap().is_some());
    }
}
