use crate::database::users;
use crate::errors::{ApiError, RelationshipKind};
use crate::models::user::{Author, User};
use crate::schema::{followers, users as users_table};
#[cfg(test)]
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error};
use tracing::{debug, warn};

#[derive(Insertable)]
#[diesel(table_name = followers)]
struct NewFollow {
    follower_id: i32,
    followed_id: i32,
}

#[cfg(test)]
pub(crate) fn is_following(
    conn: &mut SqliteConnection,
    follower_id: i32,
    followed_id: i32,
) -> Result<bool, ApiError> {
    let found = diesel::select(exists(followers::table.find((follower_id, followed_id))))
        .get_result(conn)?;
    Ok(found)
}

/// Adds the `(follower, followed)` edge.
///
/// The composite primary key of `followers` decides duplicates, so two
/// racing requests cannot both insert the same edge.
pub fn follow(conn: &mut SqliteConnection, follower: &User, followed_id: i32) -> Result<(), ApiError> {
    let followed = users::find(conn, followed_id)?.ok_or(ApiError::UserNotFound)?;
    if followed.id == follower.id {
        warn!(user_id = follower.id, "rejected self follow");
        return Err(RelationshipKind::SelfFollow.into());
    }

    let inserted = diesel::insert_into(followers::table)
        .values(&NewFollow {
            follower_id: follower.id,
            followed_id: followed.id,
        })
        .execute(conn);

    match inserted {
        Ok(_) => {
            debug!(follower_id = follower.id, followed_id, "follow edge added");
            Ok(())
        }
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(RelationshipKind::AlreadyFollowing.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn unfollow(conn: &mut SqliteConnection, follower: &User, followed_id: i32) -> Result<(), ApiError> {
    let followed = users::find(conn, followed_id)?.ok_or(ApiError::UserNotFound)?;

    let removed = diesel::delete(followers::table.find((follower.id, followed.id))).execute(conn)?;
    if removed == 0 {
        return Err(RelationshipKind::NotFollowing.into());
    }
    debug!(follower_id = follower.id, followed_id, "follow edge removed");
    Ok(())
}

/// Users following `user_id`.
pub fn followers_of(conn: &mut SqliteConnection, user_id: i32) -> Result<Vec<Author>, ApiError> {
    let authors = followers::table
        .inner_join(users_table::table.on(users_table::id.eq(followers::follower_id)))
        .filter(followers::followed_id.eq(user_id))
        .select((users_table::id, users_table::name))
        .order(users_table::id)
        .load::<Author>(conn)?;
    Ok(authors)
}

/// Users `user_id` follows.
pub fn followed_by(conn: &mut SqliteConnection, user_id: i32) -> Result<Vec<Author>, ApiError> {
    let authors = followers::table
        .inner_join(users_table::table.on(users_table::id.eq(followers::followed_id)))
        .filter(followers::follower_id.eq(user_id))
        .select((users_table::id, users_table::name))
        .order(users_table::id)
        .load::<Author>(conn)?;
    Ok(authors)
}
