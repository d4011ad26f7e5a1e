use crate::database::tweets;
use crate::errors::{ApiError, RelationshipKind};
use crate::models::user::{Author, User};
use crate::schema::{likes, users};
#[cfg(test)]
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error};
use tracing::debug;

#[derive(Insertable)]
#[diesel(table_name = likes)]
struct NewLike {
    tweet_id: i32,
    user_id: i32,
}

#[cfg(test)]
pub(crate) fn is_liked(conn: &mut SqliteConnection, tweet_id: i32, user_id: i32) -> Result<bool, ApiError> {
    let found = diesel::select(exists(likes::table.find((tweet_id, user_id)))).get_result(conn)?;
    Ok(found)
}

/// Adds the `(tweet, user)` edge. Authors may like their own tweets.
pub fn like(conn: &mut SqliteConnection, user: &User, tweet_id: i32) -> Result<(), ApiError> {
    let tweet = tweets::find(conn, tweet_id)?.ok_or(ApiError::TweetNotFound)?;

    let inserted = diesel::insert_into(likes::table)
        .values(&NewLike {
            tweet_id: tweet.id,
            user_id: user.id,
        })
        .execute(conn);

    match inserted {
        Ok(_) => {
            debug!(tweet_id, user_id = user.id, "like added");
            Ok(())
        }
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(RelationshipKind::AlreadyLiked.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn unlike(conn: &mut SqliteConnection, user: &User, tweet_id: i32) -> Result<(), ApiError> {
    let tweet = tweets::find(conn, tweet_id)?.ok_or(ApiError::TweetNotFound)?;

    let removed = diesel::delete(likes::table.find((tweet.id, user.id))).execute(conn)?;
    if removed == 0 {
        return Err(RelationshipKind::NotLiked.into());
    }
    debug!(tweet_id, user_id = user.id, "like removed");
    Ok(())
}

/// `(tweet_id, liker)` pairs for the given tweets, likers in id order.
pub fn likers_of(conn: &mut SqliteConnection, tweet_ids: &[i32]) -> Result<Vec<(i32, Author)>, ApiError> {
    if tweet_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = likes::table
        .inner_join(users::table)
        .filter(likes::tweet_id.eq_any(tweet_ids))
        .select((likes::tweet_id, (users::id, users::name)))
        .order((likes::tweet_id, users::id))
        .load::<(i32, Author)>(conn)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{test_connection, users as user_store};

    fn setup(conn: &mut SqliteConnection) -> (User, User, i32) {
        let author = user_store::create(conn, "author", 7).unwrap();
        let fan = user_store::create(conn, "fan", 7).unwrap();
        let tweet = tweets::create(conn, "hello", author.id).unwrap();
        (author, fan, tweet.id)
    }

    #[test]
    fn like_twice_is_rejected() {
        let conn = &mut test_connection();
        let (_, fan, tweet_id) = setup(conn);

        like(conn, &fan, tweet_id).unwrap();
        assert!(is_liked(conn, tweet_id, fan.id).unwrap());
        match like(conn, &fan, tweet_id) {
            Err(ApiError::Relationship(RelationshipKind::AlreadyLiked)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unlike_without_like_is_rejected() {
        let conn = &mut test_connection();
        let (_, fan, tweet_id) = setup(conn);

        match unlike(conn, &fan, tweet_id) {
            Err(ApiError::Relationship(RelationshipKind::NotLiked)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn like_then_unlike_empties_the_edge_set() {
        let conn = &mut test_connection();
        let (_, fan, tweet_id) = setup(conn);

        like(conn, &fan, tweet_id).unwrap();
        unlike(conn, &fan, tweet_id).unwrap();
        assert!(!is_liked(conn, tweet_id, fan.id).unwrap());
        assert!(likers_of(conn, &[tweet_id]).unwrap().is_empty());
    }

    #[test]
    fn unknown_tweet_is_not_found() {
        let conn = &mut test_connection();
        let (_, fan, _) = setup(conn);

        assert!(matches!(like(conn, &fan, 404), Err(ApiError::TweetNotFound)));
        assert!(matches!(unlike(conn, &fan, 404), Err(ApiError::TweetNotFound)));
    }

    #[test]
    fn authors_may_like_their_own_tweets() {
        let conn = &mut test_connection();
        let (author, fan, tweet_id) = setup(conn);

        like(conn, &author, tweet_id).unwrap();
        like(conn, &fan, tweet_id).unwrap();

        let likers = likers_of(conn, &[tweet_id]).unwrap();
        assert_eq!(
            likers,
            vec![(tweet_id, author.to_author()), (tweet_id, fan.to_author())]
        );
    }
}
