//! Diesel rows for recipes, meals, valid instruments and user notifications.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    Meal, MealCreationInput, Recipe, RecipeCreationInput, RecipeRating,
    RecipeRatingCreationInput, RecipeStep, RecipeStepCreationInput, UserNotification,
    UserNotificationCreationInput, UserNotificationStatus, ValidInstrument,
    ValidInstrumentCreationInput,
};
use crate::outbound::persistence::null_values::{
    parse_text, seconds_from_db, seconds_to_db, small_from_db, small_to_db,
};
use crate::outbound::persistence::schema::{
    meals, recipe_ratings, recipe_steps, recipes, user_notifications, valid_instruments,
};

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RecipeRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub source: String,
    pub description: String,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meals: bool,
    pub created_by_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = RepositoryError;

    fn try_from(row: RecipeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            source: row.source,
            description: row.description,
            min_estimated_portions: row.min_estimated_portions,
            max_estimated_portions: row.max_estimated_portions,
            eligible_for_meals: row.eligible_for_meals,
            created_by_user: row.created_by_user,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = recipes)]
pub(crate) struct NewRecipeRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub slug: &'a str,
    pub source: &'a str,
    pub description: &'a str,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meals: bool,
    pub created_by_user: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewRecipeRow<'a> {
    pub(crate) fn new(id: &'a str, now: DateTime<Utc>, input: &'a RecipeCreationInput) -> Self {
        Self {
            id,
            name: &input.name,
            slug: &input.slug,
            source: &input.source,
            description: &input.description,
            min_estimated_portions: input.min_estimated_portions,
            max_estimated_portions: input.max_estimated_portions,
            eligible_for_meals: input.eligible_for_meals,
            created_by_user: &input.created_by_user,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = recipes)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct RecipeChanges<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub source: &'a str,
    pub description: &'a str,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meals: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<'a> RecipeChanges<'a> {
    pub(crate) fn new(recipe: &'a Recipe, now: DateTime<Utc>) -> Self {
        Self {
            name: &recipe.name,
            slug: &recipe.slug,
            source: &recipe.source,
            description: &recipe.description,
            min_estimated_portions: recipe.min_estimated_portions,
            max_estimated_portions: recipe.max_estimated_portions,
            eligible_for_meals: recipe.eligible_for_meals,
            last_updated_at: Some(now),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = recipe_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RecipeStepRow {
    pub id: String,
    pub index: i32,
    pub notes: String,
    pub explicit_instructions: String,
    pub minimum_estimated_time_in_seconds: Option<i32>,
    pub maximum_estimated_time_in_seconds: Option<i32>,
    pub optional: bool,
    pub belongs_to_recipe: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<RecipeStepRow> for RecipeStep {
    type Error = RepositoryError;

    fn try_from(row: RecipeStepRow) -> Result<Self, Self::Error> {
        Ok(Self {
            index: small_from_db(row.index, "recipe_steps.index")?,
            minimum_estimated_time_in_seconds: seconds_from_db(
                row.minimum_estimated_time_in_seconds,
            ),
            maximum_estimated_time_in_seconds: seconds_from_db(
                row.maximum_estimated_time_in_seconds,
            ),
            id: row.id,
            notes: row.notes,
            explicit_instructions: row.explicit_instructions,
            optional: row.optional,
            belongs_to_recipe: row.belongs_to_recipe,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = recipe_steps)]
pub(crate) struct NewRecipeStepRow<'a> {
    pub id: &'a str,
    pub index: i32,
    pub notes: &'a str,
    pub explicit_instructions: &'a str,
    pub minimum_estimated_time_in_seconds: Option<i32>,
    pub maximum_estimated_time_in_seconds: Option<i32>,
    pub optional: bool,
    pub belongs_to_recipe: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewRecipeStepRow<'a> {
    pub(crate) fn new(
        id: &'a str,
        now: DateTime<Utc>,
        input: &'a RecipeStepCreationInput,
    ) -> Self {
        Self {
            id,
            index: small_to_db(input.index),
            notes: &input.notes,
            explicit_instructions: &input.explicit_instructions,
            minimum_estimated_time_in_seconds: seconds_to_db(
                input.minimum_estimated_time_in_seconds,
            ),
            maximum_estimated_time_in_seconds: seconds_to_db(
                input.maximum_estimated_time_in_seconds,
            ),
            optional: input.optional,
            belongs_to_recipe: &input.belongs_to_recipe,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = recipe_steps)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct RecipeStepChanges<'a> {
    pub index: i32,
    pub notes: &'a str,
    pub explicit_instructions: &'a str,
    pub minimum_estimated_time_in_seconds: Option<i32>,
    pub maximum_estimated_time_in_seconds: Option<i32>,
    pub optional: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<'a> RecipeStepChanges<'a> {
    pub(crate) fn new(step: &'a RecipeStep, now: DateTime<Utc>) -> Self {
        Self {
            index: small_to_db(step.index),
            notes: &step.notes,
            explicit_instructions: &step.explicit_instructions,
            minimum_estimated_time_in_seconds: seconds_to_db(
                step.minimum_estimated_time_in_seconds,
            ),
            maximum_estimated_time_in_seconds: seconds_to_db(
                step.maximum_estimated_time_in_seconds,
            ),
            optional: step.optional,
            last_updated_at: Some(now),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = recipe_ratings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RecipeRatingRow {
    pub id: String,
    pub recipe_id: String,
    pub taste: Option<f64>,
    pub difficulty: Option<f64>,
    pub cleanup: Option<f64>,
    pub instructions: Option<f64>,
    pub overall: Option<f64>,
    pub notes: String,
    pub by_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<RecipeRatingRow> for RecipeRating {
    type Error = RepositoryError;

    fn try_from(row: RecipeRatingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            recipe_id: row.recipe_id,
            taste: row.taste,
            difficulty: row.difficulty,
            cleanup: row.cleanup,
            instructions: row.instructions,
            overall: row.overall,
            notes: row.notes,
            by_user: row.by_user,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = recipe_ratings)]
pub(crate) struct NewRecipeRatingRow<'a> {
    pub id: &'a str,
    pub recipe_id: &'a str,
    pub taste: Option<f64>,
    pub difficulty: Option<f64>,
    pub cleanup: Option<f64>,
    pub instructions: Option<f64>,
    pub overall: Option<f64>,
    pub notes: &'a str,
    pub by_user: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewRecipeRatingRow<'a> {
    pub(crate) fn new(
        id: &'a str,
        now: DateTime<Utc>,
        input: &'a RecipeRatingCreationInput,
    ) -> Self {
        Self {
            id,
            recipe_id: &input.recipe_id,
            taste: input.taste,
            difficulty: input.difficulty,
            cleanup: input.cleanup,
            instructions: input.instructions,
            overall: input.overall,
            notes: &input.notes,
            by_user: &input.by_user,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = recipe_ratings)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct RecipeRatingChanges<'a> {
    pub taste: Option<f64>,
    pub difficulty: Option<f64>,
    pub cleanup: Option<f64>,
    pub instructions: Option<f64>,
    pub overall: Option<f64>,
    pub notes: &'a str,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<'a> RecipeRatingChanges<'a> {
    pub(crate) fn new(rating: &'a RecipeRating, now: DateTime<Utc>) -> Self {
        Self {
            taste: rating.taste,
            difficulty: rating.difficulty,
            cleanup: rating.cleanup,
            instructions: rating.instructions,
            overall: rating.overall,
            notes: &rating.notes,
            last_updated_at: Some(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Meals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = meals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MealRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meal_plans: bool,
    pub created_by_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<MealRow> for Meal {
    type Error = RepositoryError;

    fn try_from(row: MealRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            min_estimated_portions: row.min_estimated_portions,
            max_estimated_portions: row.max_estimated_portions,
            eligible_for_meal_plans: row.eligible_for_meal_plans,
            created_by_user: row.created_by_user,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meals)]
pub(crate) struct NewMealRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meal_plans: bool,
    pub created_by_user: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewMealRow<'a> {
    pub(crate) fn new(id: &'a str, now: DateTime<Utc>, input: &'a MealCreationInput) -> Self {
        Self {
            id,
            name: &input.name,
            description: &input.description,
            min_estimated_portions: input.min_estimated_portions,
            max_estimated_portions: input.max_estimated_portions,
            eligible_for_meal_plans: input.eligible_for_meal_plans,
            created_by_user: &input.created_by_user,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = meals)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MealChanges<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meal_plans: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<'a> MealChanges<'a> {
    pub(crate) fn new(meal: &'a Meal, now: DateTime<Utc>) -> Self {
        Self {
            name: &meal.name,
            description: &meal.description,
            min_estimated_portions: meal.min_estimated_portions,
            max_estimated_portions: meal.max_estimated_portions,
            eligible_for_meal_plans: meal.eligible_for_meal_plans,
            last_updated_at: Some(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Valid instruments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = valid_instruments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ValidInstrumentRow {
    pub id: String,
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub icon_path: String,
    pub slug: String,
    pub usable_for_storage: bool,
    pub display_in_summary_lists: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<ValidInstrumentRow> for ValidInstrument {
    type Error = RepositoryError;

    fn try_from(row: ValidInstrumentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            plural_name: row.plural_name,
            description: row.description,
            icon_path: row.icon_path,
            slug: row.slug,
            usable_for_storage: row.usable_for_storage,
            display_in_summary_lists: row.display_in_summary_lists,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = valid_instruments)]
pub(crate) struct NewValidInstrumentRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub plural_name: &'a str,
    pub description: &'a str,
    pub icon_path: &'a str,
    pub slug: &'a str,
    pub usable_for_storage: bool,
    pub display_in_summary_lists: bool,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewValidInstrumentRow<'a> {
    pub(crate) fn new(
        id: &'a str,
        now: DateTime<Utc>,
        input: &'a ValidInstrumentCreationInput,
    ) -> Self {
        Self {
            id,
            name: &input.name,
            plural_name: &input.plural_name,
            description: &input.description,
            icon_path: &input.icon_path,
            slug: &input.slug,
            usable_for_storage: input.usable_for_storage,
            display_in_summary_lists: input.display_in_summary_lists,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = valid_instruments)]
pub(crate) struct ValidInstrumentChanges<'a> {
    pub name: &'a str,
    pub plural_name: &'a str,
    pub description: &'a str,
    pub icon_path: &'a str,
    pub slug: &'a str,
    pub usable_for_storage: bool,
    pub display_in_summary_lists: bool,
    pub last_updated_at: DateTime<Utc>,
}

impl<'a> ValidInstrumentChanges<'a> {
    pub(crate) fn new(instrument: &'a ValidInstrument, now: DateTime<Utc>) -> Self {
        Self {
            name: &instrument.name,
            plural_name: &instrument.plural_name,
            description: &instrument.description,
            icon_path: &instrument.icon_path,
            slug: &instrument.slug,
            usable_for_storage: instrument.usable_for_storage,
            display_in_summary_lists: instrument.display_in_summary_lists,
            last_updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// User notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserNotificationRow {
    pub id: String,
    pub content: String,
    pub status: String,
    pub belongs_to_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserNotificationRow> for UserNotification {
    type Error = RepositoryError;

    fn try_from(row: UserNotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_text(&row.status)?,
            id: row.id,
            content: row.content,
            belongs_to_user: row.belongs_to_user,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_notifications)]
pub(crate) struct NewUserNotificationRow<'a> {
    pub id: &'a str,
    pub content: &'a str,
    pub status: &'a str,
    pub belongs_to_user: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewUserNotificationRow<'a> {
    pub(crate) fn new(
        id: &'a str,
        now: DateTime<Utc>,
        input: &'a UserNotificationCreationInput,
    ) -> Self {
        Self {
            id,
            content: &input.content,
            status: UserNotificationStatus::Unread.as_str(),
            belongs_to_user: &input.belongs_to_user,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = user_notifications)]
pub(crate) struct UserNotificationChanges<'a> {
    pub content: &'a str,
    pub status: &'a str,
    pub last_updated_at: DateTime<Utc>,
}

impl<'a> UserNotificationChanges<'a> {
    pub(crate) fn new(notification: &'a UserNotification, now: DateTime<Utc>) -> Self {
        Self {
            content: &notification.content,
            status: notification.status.as_str(),
            last_updated_at: now,
        }
    }
}
