use crate::database::users;
use crate::errors::ApiError;
use crate::models::user::User;
use diesel::SqliteConnection;
use rocket::request::{self, FromRequest, Outcome, Request};
use std::convert::Infallible;

pub const API_KEY_HEADER: &str = "api-key";

/// Raw `api-key` header of a request.
///
/// Extraction never fails; the key is checked against the users table by
/// [`ApiKey::resolve`] inside the request's database session.
#[derive(Debug, Clone)]
pub struct ApiKey(Option<String>);

impl ApiKey {
    pub fn resolve(&self, conn: &mut SqliteConnection) -> Result<User, ApiError> {
        users::resolve_caller(conn, self.0.as_deref())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ApiKey {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<ApiKey, Self::Error> {
        let key = request.headers().get_one(API_KEY_HEADER).map(str::to_string);
        Outcome::Success(ApiKey(key))
    }
}
