table! {
    alerts (id) {
        id -> Int8,
        username -> Text,
        symbol -> Text,
        target -> Float8,
        #[sql_name = "type"]
        alert_type -> Text,
        enabled -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    feedback (id) {
        id -> Uuid,
        username -> Text,
        #[sql_name = "type"]
        feedback_type -> Text,
        subject -> Nullable<Text>,
        message -> Text,
        created_at -> Timestamptz,
        read -> Bool,
    }
}

table! {
    user_settings (username) {
        username -> Text,
        email -> Text,
        email_enabled -> Bool,
        telegram_enabled -> Bool,
        telegram_chat_id -> Nullable<Text>,
        notification_method -> Text,
        setup_complete -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    users (id) {
        id -> Int8,
        username -> Text,
        password_hash -> Text,
        email -> Text,
        name -> Text,
        trial_ends -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        stripe_customer_id -> Nullable<Text>,
        stripe_subscription_id -> Nullable<Text>,
        subscription_plan -> Nullable<Text>,
        cancel_at_period_end -> Nullable<Bool>,
        premium -> Nullable<Bool>,
    }
}

allow_tables_to_appear_in_same_query!(alerts, feedback, user_settings, users,);
