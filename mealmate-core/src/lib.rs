//! MealMate Core Library
//!
//! Recipe models, local persistence, cloud mirroring and the stores the
//! MealMate front ends drive.

pub mod cloud;
pub mod library;
pub mod models;
pub mod search;
pub mod storage;
pub mod stores;
pub mod transfer;

pub use cloud::{ChangeReason, CloudChange, DocumentCloud, FolderCloud, KeyValueCloud, MemoryCloud};
pub use library::{DocumentUpdate, Library, LibraryError};
pub use models::{
    BookColor, BookContents, ImageData, Ingredient, Recipe, RecipeBook, RecipeCategory,
    RecipeError, ShoppingCategory, ShoppingItem, Unit,
};
pub use search::{pick_random, recipes_not_in_book, resolve_book_recipes, RecipeFilter};
pub use storage::{FileStorage, Preferences, StorageError};
pub use stores::{
    normalize_name, ChangeCause, IngredientStore, KitchenwareStore, LoadSource, RecipeBookStore,
    RecipeStore, ShoppingListStore, StoreEvent, StoreKind,
};
pub use transfer::{export_book, export_recipe, ExportedFile, Imported, TransferError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
