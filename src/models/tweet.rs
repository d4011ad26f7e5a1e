use crate::models::media::Media;
use crate::models::user::{Author, User};
use crate::schema::tweets;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = tweets)]
pub struct Tweet {
    pub id: i32,
    pub content: String,
    pub user_id: i32,
    pub timestamp: NaiveDateTime,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Like {
    pub user_id: i32,
    pub name: String,
}

impl From<Author> for Like {
    fn from(author: Author) -> Like {
        Like {
            user_id: author.id,
            name: author.name,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct TweetView {
    pub id: i32,
    pub content: String,
    pub attachments: Vec<String>,
    pub author: Author,
    pub likes: Vec<Like>,
}

impl Tweet {
    pub fn attach(self, author: &User, attachments: &[Media], likers: Vec<Author>) -> TweetView {
        TweetView {
            id: self.id,
            content: self.content,
            attachments: attachments.iter().map(Media::url).collect(),
            author: author.to_author(),
            likes: likers.into_iter().map(Like::from).collect(),
        }
    }
}
