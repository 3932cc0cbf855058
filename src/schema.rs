table! {
    areas (id) {
        id -> Text,
        name -> Text,
        country_id -> Text,
        deleted -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

table! {
    authors (id) {
        id -> Text,
        name -> Text,
        avatar -> Nullable<Text>,
        bio -> Nullable<Text>,
        deleted -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

table! {
    categories (id) {
        id -> Text,
        name -> Text,
        description -> Nullable<Text>,
        image -> Nullable<Text>,
        is_city -> Bool,
        country_id -> Nullable<Text>,
        area_id -> Nullable<Text>,
        deleted -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

table! {
    contact_messages (id) {
        id -> Integer,
        name -> Text,
        email -> Text,
        subject -> Nullable<Text>,
        message -> Text,
        is_read -> Bool,
        created_at -> Text,
    }
}

table! {
    countries (id) {
        id -> Text,
        name -> Text,
        deleted -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

table! {
    posts (id) {
        id -> Integer,
        slug -> Text,
        title -> Text,
        excerpt -> Nullable<Text>,
        content -> Text,
        image -> Nullable<Text>,
        category_id -> Text,
        author_id -> Text,
        date -> Text,
        deleted -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

table! {
    short_links (id) {
        id -> Integer,
        original_url -> Text,
        short_code -> Text,
        clicks -> Integer,
        deleted -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

table! {
    users (id) {
        id -> Integer,
        name -> Text,
        email -> Text,
        password_hash -> Text,
        role -> Text,
        status -> Text,
        avatar -> Nullable<Text>,
        last_login_at -> Nullable<Text>,
        deleted -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

joinable!(areas -> countries (country_id));
joinable!(posts -> authors (author_id));
joinable!(posts -> categories (category_id));

allow_tables_to_appear_in_same_query!(
    areas,
    authors,
    categories,
    contact_messages,
    countries,
    posts,
    short_links,
    users,
);
