use crate::auth::ApiKey;
use crate::config::AppState;
use crate::database::{self, Db};
use crate::errors::{ApiError, FieldValidator};
use rocket::serde::json::{self, json, Json, Value};
use rocket::State;
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct NewTweet {
    tweet_data: Option<String>,
    tweet_media_ids: Option<Vec<i32>>,
}

fn invalid_json(err: json::Error<'_>) -> ApiError {
    ApiError::Validation(err.to_string())
}

#[post("/tweets", data = "<new_tweet>")]
pub async fn post_tweet(
    new_tweet: Result<Json<NewTweet>, json::Error<'_>>,
    key: ApiKey,
    db: Db,
) -> Result<Value, ApiError> {
    let user = db.run(move |conn| key.resolve(conn)).await?;

    let new_tweet = new_tweet.map_err(invalid_json)?.into_inner();
    let mut extractor = FieldValidator::validate(&new_tweet);
    let content = extractor.extract("tweet_data", new_tweet.tweet_data);
    extractor.check()?;
    let media_ids = new_tweet.tweet_media_ids.unwrap_or_default();

    db.run(move |conn| {
        let tweet = database::tweets::publish(conn, &content, user.id, &media_ids)?;
        Ok(json!({ "result": true, "tweet_id": tweet.id }))
    })
    .await
}

#[delete("/tweets/<id>")]
pub async fn delete_tweet(id: i32, key: ApiKey, db: Db, state: &State<AppState>) -> Result<Value, ApiError> {
    let blobs = state.blobs.clone();
    db.run(move |conn| {
        let user = key.resolve(conn)?;
        let removed = database::tweets::delete(conn, id, &user)?;
        // The rows are gone already; a leftover file is only wasted space.
        for media in removed {
            if let Err(err) = blobs.remove(&media.name) {
                warn!(media_id = media.id, "failed to remove media blob: {}", err);
            }
        }
        Ok(json!({ "result": true }))
    })
    .await
}

#[post("/tweets/<id>/likes")]
pub async fn like_tweet(id: i32, key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        let user = key.resolve(conn)?;
        database::likes::like(conn, &user, id)?;
        Ok(json!({ "result": true }))
    })
    .await
}

#[delete("/tweets/<id>/likes")]
pub async fn unlike_tweet(id: i32, key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        let user = key.resolve(conn)?;
        database::likes::unlike(conn, &user, id)?;
        Ok(json!({ "result": true }))
    })
    .await
}

#[get("/tweets")]
pub async fn get_tweets(key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        key.resolve(conn)?;
        let tweets = database::tweets::list(conn)?;
        Ok(json!({ "result": true, "tweets": tweets }))
    })
    .await
}

#[get("/tweets/feed")]
pub async fn get_feed(key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        let user = key.resolve(conn)?;
        let tweets = database::tweets::feed(conn, user.id)?;
        Ok(json!({ "result": true, "tweets": tweets }))
    })
    .await
}
