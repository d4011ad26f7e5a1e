#[macro_use]
extern crate rocket;
#[macro_use]
extern crate rocket_sync_db_pools;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate validator_derive;

use dotenv::dotenv;

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod routes;
pub mod schema;
pub mod storage;

use errors::ApiError;
use rocket::figment::Figment;
use rocket::{Build, Rocket};
use rocket_cors::Cors;

#[catch(404)]
fn not_found() -> ApiError {
    ApiError::NotFound("Resource was not found".to_string())
}

#[catch(400)]
fn bad_request() -> ApiError {
    ApiError::Validation("Malformed request".to_string())
}

#[catch(422)]
fn unprocessable_entity() -> ApiError {
    ApiError::Validation("Request body could not be parsed".to_string())
}

#[catch(413)]
fn payload_too_large() -> ApiError {
    ApiError::FileSize
}

fn cors_fairing() -> Cors {
    Cors::from_options(&Default::default()).expect("Cors fairing cannot be created")
}

/// The service configured from the environment (and `.env`).
pub fn rocket() -> Rocket<Build> {
    dotenv().ok();
    build(config::from_env())
}

/// The service with an explicit configuration, see [`config::figment`].
pub fn build(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .mount(
            "/api",
            routes![
                routes::medias::post_media,
                routes::tweets::post_tweet,
                routes::tweets::delete_tweet,
                routes::tweets::like_tweet,
                routes::tweets::unlike_tweet,
                routes::tweets::get_tweets,
                routes::tweets::get_feed,
                routes::users::post_user,
                routes::users::get_me,
                routes::users::get_user,
                routes::users::follow,
                routes::users::unfollow,
            ],
        )
        .attach(database::Db::fairing())
        .attach(database::migrations())
        .attach(database::seed::fairing())
        .attach(config::AppState::manage())
        .attach(cors_fairing())
        .register(
            "/",
            catchers![not_found, bad_request, unprocessable_entity, payload_too_large],
        )
}
