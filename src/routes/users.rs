use crate::auth::ApiKey;
use crate::config::AppState;
use crate::database::{self, Db};
use crate::errors::ApiError;
use rocket::serde::json::{json, Value};
use rocket::State;
use tracing::info;

#[post("/users/<name>")]
pub async fn post_user(name: String, db: Db, state: &State<AppState>) -> Result<Value, ApiError> {
    let key_length = state.api_key_length;
    db.run(move |conn| {
        let user = database::users::create(conn, &name, key_length)?;
        info!(user_id = user.id, "user registered");
        Ok(json!({ "result": true, "user": user.to_credentials() }))
    })
    .await
}

#[get("/users/me")]
pub async fn get_me(key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        let user = key.resolve(conn)?;
        let profile = database::users::profile(conn, user)?;
        Ok(json!({ "result": true, "user": profile }))
    })
    .await
}

#[get("/users/<id>")]
pub async fn get_user(id: i32, key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        key.resolve(conn)?;
        let user = database::users::find(conn, id)?.ok_or(ApiError::UserNotFound)?;
        let profile = database::users::profile(conn, user)?;
        Ok(json!({ "result": true, "user": profile }))
    })
    .await
}

#[post("/users/<id>/follow")]
pub async fn follow(id: i32, key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        let user = key.resolve(conn)?;
        database::follows::follow(conn, &user, id)?;
        Ok(json!({ "result": true }))
    })
    .await
}

#[delete("/users/<id>/follow")]
pub async fn unfollow(id: i32, key: ApiKey, db: Db) -> Result<Value, ApiError> {
    db.run(move |conn| {
        let user = key.resolve(conn)?;
        database::follows::unfollow(conn, &user, id)?;
        Ok(json!({ "result": true }))
    })
    .await
}
