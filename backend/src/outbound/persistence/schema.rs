//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Identifiers are
//! opaque text; every mutable table carries `created_at`, `last_updated_at`
//! and `archived_at`, and reads filter on `archived_at IS NULL`.

diesel::table! {
    /// Registered accounts. Username and email are unique among live rows.
    users (id) {
        id -> Text,
        username -> Text,
        email_address -> Text,
        hashed_password -> Text,
        two_factor_secret -> Text,
        two_factor_secret_verified_at -> Nullable<Timestamptz>,
        email_address_verification_token -> Nullable<Text>,
        email_address_verified_at -> Nullable<Timestamptz>,
        requires_password_change -> Bool,
        password_last_changed_at -> Nullable<Timestamptz>,
        user_account_status -> Text,
        user_account_status_explanation -> Text,
        service_role -> Text,
        first_name -> Text,
        last_name -> Text,
        birthday -> Nullable<Date>,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    households (id) {
        id -> Text,
        name -> Text,
        billing_status -> Text,
        contact_phone -> Text,
        address_line_1 -> Text,
        address_line_2 -> Text,
        city -> Text,
        state -> Text,
        zip_code -> Text,
        country -> Text,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        /// Owning user.
        belongs_to_user -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    household_user_memberships (id) {
        id -> Text,
        belongs_to_household -> Text,
        belongs_to_user -> Text,
        household_role -> Text,
        default_household -> Bool,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    household_invitations (id) {
        id -> Text,
        destination_household -> Text,
        to_email -> Text,
        to_user -> Nullable<Text>,
        to_name -> Text,
        from_user -> Text,
        status -> Text,
        note -> Text,
        status_note -> Text,
        token -> Text,
        expires_at -> Timestamptz,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    meals (id) {
        id -> Text,
        name -> Text,
        description -> Text,
        min_estimated_portions -> Float8,
        max_estimated_portions -> Nullable<Float8>,
        eligible_for_meal_plans -> Bool,
        created_by_user -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    recipes (id) {
        id -> Text,
        name -> Text,
        slug -> Text,
        source -> Text,
        description -> Text,
        min_estimated_portions -> Float8,
        max_estimated_portions -> Nullable<Float8>,
        eligible_for_meals -> Bool,
        created_by_user -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    recipe_steps (id) {
        id -> Text,
        index -> Int4,
        notes -> Text,
        explicit_instructions -> Text,
        minimum_estimated_time_in_seconds -> Nullable<Int4>,
        maximum_estimated_time_in_seconds -> Nullable<Int4>,
        optional -> Bool,
        belongs_to_recipe -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    recipe_ratings (id) {
        id -> Text,
        recipe_id -> Text,
        taste -> Nullable<Float8>,
        difficulty -> Nullable<Float8>,
        cleanup -> Nullable<Float8>,
        instructions -> Nullable<Float8>,
        overall -> Nullable<Float8>,
        notes -> Text,
        by_user -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    valid_instruments (id) {
        id -> Text,
        name -> Text,
        plural_name -> Text,
        description -> Text,
        icon_path -> Text,
        slug -> Text,
        usable_for_storage -> Bool,
        display_in_summary_lists -> Bool,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    user_notifications (id) {
        id -> Text,
        content -> Text,
        status -> Text,
        belongs_to_user -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    meal_plans (id) {
        id -> Text,
        notes -> Text,
        status -> Text,
        voting_deadline -> Timestamptz,
        belongs_to_household -> Text,
        created_by_user -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    meal_plan_events (id) {
        id -> Text,
        notes -> Text,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        meal_name -> Text,
        belongs_to_meal_plan -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Candidate meals for an event. At most one live option per event is
    /// chosen, enforced by a partial unique index.
    meal_plan_options (id) {
        id -> Text,
        assigned_cook -> Nullable<Text>,
        assigned_dishwasher -> Nullable<Text>,
        chosen -> Bool,
        tiebroken -> Bool,
        meal_scale -> Float8,
        meal_id -> Text,
        notes -> Text,
        belongs_to_meal_plan_event -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    meal_plan_option_votes (id) {
        id -> Text,
        /// Lower is preferred; never negative.
        rank -> Int4,
        abstain -> Bool,
        notes -> Text,
        by_user -> Text,
        belongs_to_meal_plan_option -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    webhooks (id) {
        id -> Text,
        name -> Text,
        content_type -> Text,
        url -> Text,
        method -> Text,
        belongs_to_household -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    webhook_trigger_events (id) {
        id -> Text,
        trigger_event -> Text,
        belongs_to_webhook -> Text,
        created_at -> Timestamptz,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Append-only record of mutations. `changes` holds the serialised
    /// field change map.
    audit_log_entries (id) {
        id -> Text,
        resource_type -> Text,
        relevant_id -> Text,
        event_type -> Text,
        changes -> Jsonb,
        belongs_to_user -> Nullable<Text>,
        belongs_to_household -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(household_user_memberships -> households (belongs_to_household));
diesel::joinable!(household_user_memberships -> users (belongs_to_user));
diesel::joinable!(household_invitations -> households (destination_household));
diesel::joinable!(recipe_steps -> recipes (belongs_to_recipe));
diesel::joinable!(recipe_ratings -> recipes (recipe_id));
diesel::joinable!(user_notifications -> users (belongs_to_user));
diesel::joinable!(meal_plans -> households (belongs_to_household));
diesel::joinable!(meal_plan_events -> meal_plans (belongs_to_meal_plan));
diesel::joinable!(meal_plan_options -> meal_plan_events (belongs_to_meal_plan_event));
diesel::joinable!(meal_plan_options -> meals (meal_id));
diesel::joinable!(meal_plan_option_votes -> meal_plan_options (belongs_to_meal_plan_option));
diesel::joinable!(meal_plan_option_votes -> users (by_user));
diesel::joinable!(webhooks -> households (belongs_to_household));
diesel::joinable!(webhook_trigger_events -> webhooks (belongs_to_webhook));

diesel::allow_tables_to_appear_in_same_query!(
    audit_log_entries,
    household_invitations,
    household_user_memberships,
    households,
    meal_plan_events,
    meal_plan_option_votes,
    meal_plan_options,
    meal_plans,
    meals,
    recipe_ratings,
    recipe_steps,
    recipes,
    user_notifications,
    users,
    valid_instruments,
    webhook_trigger_events,
    webhooks,
);
