pub mod media;
pub mod tweet;
pub mod user;
