use crate::database::follows;
use crate::errors::ApiError;
use crate::models::user::{User, UserView};
use crate::schema::users;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

/// Key handed to the first user ever created, so a fresh deployment has a
/// known credential.
pub const BOOTSTRAP_API_KEY: &str = "test";

/// A freshly generated key can collide with an existing one; give up after
/// this many attempts.
const MAX_KEY_ATTEMPTS: usize = 5;

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub api_key: &'a str,
}

/// Random alphanumeric key of `length` characters.
pub fn generate_api_key(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn create(conn: &mut SqliteConnection, name: &str, key_length: usize) -> Result<User, ApiError> {
    let existing: i64 = users::table.count().get_result(conn)?;
    let preferred = if existing == 0 { Some(BOOTSTRAP_API_KEY) } else { None };
    create_with_key(conn, name, preferred, key_length)
}

/// Inserts with `preferred` when it is free, otherwise with a generated key.
fn create_with_key(
    conn: &mut SqliteConnection,
    name: &str,
    preferred: Option<&str>,
    key_length: usize,
) -> Result<User, ApiError> {
    if let Some(key) = preferred {
        match insert(conn, name, key) {
            Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                warn!("bootstrap api key already taken, generating one");
            }
            result => return result.map_err(Into::into),
        }
    }

    let mut attempts = 0;
    loop {
        attempts += 1;
        match insert(conn, name, &generate_api_key(key_length)) {
            Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
                if attempts < MAX_KEY_ATTEMPTS =>
            {
                warn!(attempts, "generated api key already taken, retrying");
            }
            result => return result.map_err(Into::into),
        }
    }
}

fn insert(conn: &mut SqliteConnection, name: &str, api_key: &str) -> QueryResult<User> {
    let user: User = diesel::insert_into(users::table)
        .values(&NewUser { name, api_key })
        .get_result(conn)?;
    debug!(user_id = user.id, "user created");
    Ok(user)
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> Result<Option<User>, ApiError> {
    let user = users::table.find(id).first::<User>(conn).optional()?;
    Ok(user)
}

pub fn find_by_api_key(conn: &mut SqliteConnection, api_key: &str) -> Result<Option<User>, ApiError> {
    let user = users::table
        .filter(users::api_key.eq(api_key))
        .first::<User>(conn)
        .optional()?;
    Ok(user)
}

/// Authentication gate: maps the `api-key` header value to a user.
pub fn resolve_caller(conn: &mut SqliteConnection, api_key: Option<&str>) -> Result<User, ApiError> {
    let api_key = match api_key {
        Some(key) if !key.is_empty() => key,
        _ => return Err(ApiError::MissingApiKey),
    };
    find_by_api_key(conn, api_key)?.ok_or(ApiError::UnknownApiKey)
}

/// The user together with both sides of its follow graph.
pub fn profile(conn: &mut SqliteConnection, user: User) -> Result<UserView, ApiError> {
    let followers = follows::followers_of(conn, user.id)?;
    let following = follows::followed_by(conn, user.id)?;
    Ok(user.to_view(followers, following))
}
