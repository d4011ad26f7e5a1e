pub mod follows;
pub mod likes;
pub mod medias;
pub mod seed;
pub mod tweets;
pub mod users;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use tracing::{error, info};

/// Name of the pool under `databases` in the Rocket config.
pub const DATABASE_NAME: &str = "sqlite_db";

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// One pooled connection per request, released when the request ends.
#[database("sqlite_db")]
pub struct Db(diesel::SqliteConnection);

/// Brings the schema up to date before the server starts taking requests.
pub fn migrations() -> AdHoc {
    AdHoc::try_on_ignite("Diesel Migrations", run_migrations)
}

async fn run_migrations(rocket: Rocket<Build>) -> Result<Rocket<Build>, Rocket<Build>> {
    let Some(db) = Db::get_one(&rocket).await else {
        error!("no database connection available for migrations");
        return Err(rocket);
    };

    let applied = db
        .run(|conn| {
            conn.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                .map_err(|err| err.to_string())
        })
        .await;

    match applied {
        Ok(count) => {
            info!(count, "database migrations applied");
            Ok(rocket)
        }
        Err(err) => {
            error!("failed to run database migrations: {}", err);
            Err(rocket)
        }
    }
}

#[cfg(test)]
pub(crate) fn test_connection() -> diesel::SqliteConnection {
    use diesel::connection::SimpleConnection;
    use diesel::Connection;

    let mut conn =
        diesel::SqliteConnection::establish(":memory:").expect("in-memory sqlite database");
    conn.batch_execute("PRAGMA foreign_keys = ON;")
        .expect("enable foreign keys");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("apply migrations");
    conn
}
