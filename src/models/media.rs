use crate::schema::medias;
use diesel::prelude::*;

/// Public path under which stored media are served.
pub const MEDIA_URL_PREFIX: &str = "/static/images/";

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = medias)]
pub struct Media {
    pub id: i32,
    pub name: String,
    pub tweet_id: Option<i32>,
}

impl Media {
    pub fn url(&self) -> String {
        format!("{}{}", MEDIA_URL_PREFIX, self.name)
    }
}
