mod image_data;
mod ingredient;
mod recipe;
mod recipe_book;
mod shopping_item;

pub use image_data::ImageData;
pub use ingredient::{format_amount, Ingredient, Unit};
pub use recipe::{Recipe, RecipeCategory, RecipeError};
pub(crate) use recipe::deserialize_count;
pub use recipe_book::{BookColor, BookContents, RecipeBook};
pub use shopping_item::{ShoppingCategory, ShoppingItem};
