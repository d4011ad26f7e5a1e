pub mod medias;
pub mod tweets;
pub mod users;
