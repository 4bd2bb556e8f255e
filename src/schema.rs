diesel::table! {
    groups (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        location_name -> Text,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        admin_id -> Uuid,
        created_at -> Timestamptz,
        version -> Int4,
    }
}

diesel::table! {
    groups_meeting_dates (group_id, meeting_date) {
        group_id -> Uuid,
        meeting_date -> Timestamptz,
    }
}

diesel::table! {
    groups_members (group_id, user_id) {
        group_id -> Uuid,
        user_id -> Uuid,
        position -> Int4,
    }
}

diesel::table! {
    groups_topics (group_id, topic_id) {
        group_id -> Uuid,
        topic_id -> Uuid,
        position -> Int4,
    }
}

diesel::table! {
    topics (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Text,
        email -> Text,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        password_hash -> Text,
        avatar_color -> Text,
        role -> Text,
        active -> Bool,
        not_locked -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(groups -> users (admin_id));
diesel::joinable!(groups_meeting_dates -> groups (group_id));
diesel::joinable!(groups_members -> groups (group_id));
diesel::joinable!(groups_members -> users (user_id));
diesel::joinable!(groups_topics -> groups (group_id));
diesel::joinable!(groups_topics -> topics (topic_id));

diesel::allow_tables_to_appear_in_same_query!(
    groups,
    groups_meeting_dates,
    groups_members,
    groups_topics,
    topics,
    users,
);

pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT,
    last_name TEXT,
    password_hash TEXT NOT NULL,
    avatar_color TEXT NOT NULL,
    role TEXT NOT NULL,
    active BOOLEAN NOT NULL,
    not_locked BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS topics (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS groups (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    location_name TEXT NOT NULL,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION,
    admin_id UUID NOT NULL REFERENCES users (id),
    created_at TIMESTAMPTZ NOT NULL,
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS groups_members (
    group_id UUID NOT NULL REFERENCES groups (id),
    user_id UUID NOT NULL REFERENCES users (id),
    position INTEGER NOT NULL,
    PRIMARY KEY (group_id, user_id)
);

CREATE TABLE IF NOT EXISTS groups_meeting_dates (
    group_id UUID NOT NULL REFERENCES groups (id),
    meeting_date TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (group_id, meeting_date)
);

CREATE TABLE IF NOT EXISTS groups_topics (
    group_id UUID NOT NULL REFERENCES groups (id),
    topic_id UUID NOT NULL REFERENCES topics (id),
    position INTEGER NOT NULL,
    PRIMARY KEY (group_id, topic_id)
);
"#;
