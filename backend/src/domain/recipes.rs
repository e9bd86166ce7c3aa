//! Recipes, their steps and ratings, and the meals assembled from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit_log::resource_types;
use super::ports::{Record, RepositoryError, Validate, require_id, require_text};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeCreationInput {
    pub name: String,
    pub slug: String,
    pub source: String,
    pub description: String,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meals: bool,
    pub created_by_user: String,
}

/// One instruction within a recipe, ordered by `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    pub id: String,
    pub index: u16,
    pub notes: String,
    pub explicit_instructions: String,
    pub minimum_estimated_time_in_seconds: Option<u32>,
    pub maximum_estimated_time_in_seconds: Option<u32>,
    pub optional: bool,
    pub belongs_to_recipe: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStepCreationInput {
    pub index: u16,
    pub notes: String,
    pub explicit_instructions: String,
    pub minimum_estimated_time_in_seconds: Option<u32>,
    pub maximum_estimated_time_in_seconds: Option<u32>,
    pub optional: bool,
    pub belongs_to_recipe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRating {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRatingCreationInput {
    pub recipe_id: String,
    pub taste: Option<f64>,
    pub difficulty: Option<f64>,
    pub cleanup: Option<f64>,
    pub instructions: Option<f64>,
    pub overall: Option<f64>,
    pub notes: String,
    pub by_user: String,
}

/// A named dish that meal plan options point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealCreationInput {
    pub name: String,
    pub description: String,
    pub min_estimated_portions: f64,
    pub max_estimated_portions: Option<f64>,
    pub eligible_for_meal_plans: bool,
    pub created_by_user: String,
}

impl Validate for Recipe {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "recipe id")?;
        require_text(&self.name, "recipe name")
    }
}

impl Validate for RecipeCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.created_by_user, "user id")?;
        require_text(&self.name, "recipe name")
    }
}

impl Validate for RecipeStep {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "recipe step id")?;
        require_id(&self.belongs_to_recipe, "recipe id")
    }
}

impl Validate for RecipeStepCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.belongs_to_recipe, "recipe id")
    }
}

impl Validate for RecipeRating {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "recipe rating id")?;
        require_id(&self.recipe_id, "recipe id")?;
        require_id(&self.by_user, "user id")
    }
}

impl Validate for RecipeRatingCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.recipe_id, "recipe id")?;
        require_id(&self.by_user, "user id")
    }
}

impl Validate for Meal {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "meal id")?;
        require_text(&self.name, "meal name")
    }
}

impl Validate for MealCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.created_by_user, "user id")?;
        require_text(&self.name, "meal name")
    }
}

impl Record for Recipe {
    type Scope = ();
    type Creation = RecipeCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::RECIPES;
    const SCOPE_NAME: &'static str = "";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for RecipeStep {
    type Scope = str;
    type Creation = RecipeStepCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::RECIPE_STEPS;
    const SCOPE_NAME: &'static str = "recipe id";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for RecipeRating {
    type Scope = str;
    type Creation = RecipeRatingCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::RECIPE_RATINGS;
    const SCOPE_NAME: &'static str = "recipe id";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Meal {
    type Scope = ();
    type Creation = MealCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::MEALS;
    const SCOPE_NAME: &'static str = "";

    fn id(&self) -> &str {
        &self.id
    }
}
