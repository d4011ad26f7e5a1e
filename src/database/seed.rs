use crate::config::SEED_USERS_KEY;
use crate::database::users::NewUser;
use crate::database::Db;
use crate::errors::ApiError;
use crate::schema::users;
use diesel::prelude::*;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use tracing::{error, info};

/// `(name, api_key)` of the users a fresh deployment starts with.
pub const DEFAULT_USERS: [(&str, &str); 2] = [("Alex", "test"), ("Fillipe", "test2")];

/// Inserts [`DEFAULT_USERS`] when there are no users yet; returns how many
/// were inserted. Running it again is a no-op.
pub fn seed_default_users(conn: &mut SqliteConnection) -> Result<usize, ApiError> {
    conn.transaction(|conn| {
        let existing: i64 = users::table.count().get_result(conn)?;
        if existing > 0 {
            return Ok(0);
        }

        let rows: Vec<NewUser> = DEFAULT_USERS
            .iter()
            .map(|&(name, api_key)| NewUser { name, api_key })
            .collect();
        let inserted = diesel::insert_into(users::table).values(&rows).execute(conn)?;
        Ok(inserted)
    })
}

/// Seeds default users at ignite when `seed_users` is enabled.
pub fn fairing() -> AdHoc {
    AdHoc::try_on_ignite("Seed default users", |rocket| async move {
        let enabled = rocket
            .figment()
            .extract_inner::<bool>(SEED_USERS_KEY)
            .unwrap_or(false);
        if !enabled {
            return Ok(rocket);
        }
        seed(rocket).await
    })
}

async fn seed(rocket: Rocket<Build>) -> Result<Rocket<Build>, Rocket<Build>> {
    let Some(db) = Db::get_one(&rocket).await else {
        error!("no database connection available for seeding");
        return Err(rocket);
    };

    match db.run(seed_default_users).await {
        Ok(0) => Ok(rocket),
        Ok(inserted) => {
            info!(inserted, "seeded default users");
            Ok(rocket)
        }
        Err(err) => {
            error!("failed to seed default users: {}", err);
            Err(rocket)
        }
    }
}
