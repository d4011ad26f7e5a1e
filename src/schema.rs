table! {
    followers (follower_id, followed_id) {
        follower_id -> Integer,
        followed_id -> Integer,
    }
}

table! {
    likes (tweet_id, user_id) {
        tweet_id -> Integer,
        user_id -> Integer,
    }
}

table! {
    medias (id) {
        id -> Integer,
        name -> Text,
        tweet_id -> Nullable<Integer>,
    }
}

table! {
    tweets (id) {
        id -> Integer,
        content -> Text,
        user_id -> Integer,
        timestamp -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Integer,
        name -> Text,
        api_key -> Text,
    }
}

joinable!(likes -> tweets (tweet_id));
joinable!(likes -> users (user_id));
joinable!(medias -> tweets (tweet_id));
joinable!(tweets -> users (user_id));

allow_tables_to_appear_in_same_query!(followers, likes, medias, tweets, users,);
