use crate::schema::users;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub api_key: String,
}

/// Short form of a user, as embedded in tweets and follow lists.
#[derive(Queryable, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i32,
    pub name: String,
}

#[derive(Serialize, Debug)]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub followers: Vec<Author>,
    pub following: Vec<Author>,
}

/// Returned once, on creation; the only place an api key is ever shown.
#[derive(Serialize, Debug)]
pub struct UserCredentials<'a> {
    pub id: i32,
    pub name: &'a str,
    pub api_key: &'a str,
}

impl User {
    pub fn to_author(&self) -> Author {
        Author {
            id: self.id,
            name: self.name.clone(),
        }
    }

    pub fn to_view(self, followers: Vec<Author>, following: Vec<Author>) -> UserView {
        UserView {
            id: self.id,
            name: self.name,
            followers,
            following,
        }
    }

    pub fn to_credentials(&self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            name: &self.name,
            api_key: &self.api_key,
        }
    }
}
