//! Standard repository surface for recipes, their steps and ratings, and
//! meals.

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{
    MealChanges, MealRow, NewMealRow, NewRecipeRatingRow, NewRecipeRow, NewRecipeStepRow,
    RecipeChanges, RecipeRatingChanges, RecipeRatingRow, RecipeRow, RecipeStepChanges,
    RecipeStepRow,
};
use super::schema::{meals, recipe_ratings, recipe_steps, recipes};
use super::standard_repository::standard_repository;
use crate::domain::{AuditOwner, Meal, Recipe, RecipeRating, RecipeStep};

standard_repository! {
    record: Recipe,
    row: RecipeRow,
    table: recipes,
    scope: none,
    noun: "recipe",
    new_row: NewRecipeRow::new,
    changes: RecipeChanges::new,
    owner: |recipe| AuditOwner::user(&recipe.created_by_user),
}

standard_repository! {
    record: RecipeStep,
    row: RecipeStepRow,
    table: recipe_steps,
    scope: belongs_to_recipe,
    noun: "recipe step",
    new_row: NewRecipeStepRow::new,
    changes: RecipeStepChanges::new,
    owner: |_step| AuditOwner::nobody(),
}

standard_repository! {
    record: RecipeRating,
    row: RecipeRatingRow,
    table: recipe_ratings,
    scope: recipe_id,
    noun: "recipe rating",
    new_row: NewRecipeRatingRow::new,
    changes: RecipeRatingChanges::new,
    owner: |rating| AuditOwner::user(&rating.by_user),
}

standard_repository! {
    record: Meal,
    row: MealRow,
    table: meals,
    scope: none,
    noun: "meal",
    new_row: NewMealRow::new,
    changes: MealChanges::new,
    owner: |meal| AuditOwner::user(&meal.created_by_user),
}
