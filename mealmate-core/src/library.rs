//! The application context: every store, wired together.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::cloud::{DocumentCloud, KeyValueCloud};
use crate::models::{Recipe, RecipeBook, RecipeError};
use crate::search::resolve_book_recipes;
use crate::storage::{FileStorage, Preferences};
use crate::stores::{
    IngredientStore, KitchenwareStore, LoadSource, RecipeBookStore, RecipeStore,
    ShoppingListStore, StoreKind, BOOK_EXTENSION, RECIPE_EXTENSION,
};
use crate::transfer::{self, ExportedFile, Imported, TransferError};

/// Directory under the system temp dir where opened files are staged.
const IMPORT_DIR: &str = "mealmate-import";

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Recipe not found: {0}")]
    RecipeNotFound(Uuid),

    #[error("Recipe book not found: {0}")]
    BookNotFound(Uuid),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Cloud documents read off the owning task, waiting to be applied.
///
/// `None` means nothing changed for that collection.
#[derive(Debug, Default)]
pub struct DocumentUpdate {
    pub recipes: Option<Vec<Recipe>>,
    pub books: Option<Vec<RecipeBook>>,
}

impl DocumentUpdate {
    /// Scans the documents directory and reads the collections that changed.
    ///
    /// Does blocking directory I/O; the watch loop runs it on a blocking
    /// thread and hands the result to [`Library::apply_document_update`].
    pub fn scan(documents: &DocumentCloud) -> Self {
        let recipes = documents
            .scan_changes(RECIPE_EXTENSION)
            .then(|| documents.load_all(RECIPE_EXTENSION));
        let books = documents
            .scan_changes(BOOK_EXTENSION)
            .then(|| documents.load_all(BOOK_EXTENSION));
        Self { recipes, books }
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_none() && self.books.is_none()
    }
}

#[derive(Debug)]
pub struct Library {
    cloud: Option<Arc<dyn KeyValueCloud>>,
    documents: Option<Arc<DocumentCloud>>,
    recipes: RecipeStore,
    books: RecipeBookStore,
    shopping: ShoppingListStore,
}

impl Library {
    /// Opens every store in `data_dir`.
    ///
    /// Without a cloud the library runs local-only.
    pub fn open(
        data_dir: impl Into<PathBuf>,
        cloud: Option<Arc<dyn KeyValueCloud>>,
        documents: Option<Arc<DocumentCloud>>,
    ) -> Self {
        let storage = FileStorage::new(data_dir);
        let prefs = Arc::new(Preferences::open(storage.data_dir()));

        let ingredients = IngredientStore::open(prefs.clone(), cloud.clone());
        let kitchenware = KitchenwareStore::open(prefs.clone(), cloud.clone());
        let recipes = RecipeStore::open(
            storage.clone(),
            prefs.clone(),
            documents.clone(),
            ingredients,
            kitchenware,
        );
        let books = RecipeBookStore::open(storage, documents.clone());
        let shopping = ShoppingListStore::open(prefs, cloud.clone());

        tracing::debug!(
            "Opened library: {} recipes, {} books, {} shopping items",
            recipes.recipes().len(),
            books.books().len(),
            shopping.items().len()
        );

        Self {
            cloud,
            documents,
            recipes,
            books,
            shopping,
        }
    }

    pub fn recipes(&self) -> &RecipeStore {
        &self.recipes
    }

    pub fn recipes_mut(&mut self) -> &mut RecipeStore {
        &mut self.recipes
    }

    pub fn books(&self) -> &RecipeBookStore {
        &self.books
    }

    pub fn books_mut(&mut self) -> &mut RecipeBookStore {
        &mut self.books
    }

    pub fn shopping(&self) -> &ShoppingListStore {
        &self.shopping
    }

    pub fn shopping_mut(&mut self) -> &mut ShoppingListStore {
        &mut self.shopping
    }

    pub fn ingredients(&self) -> &IngredientStore {
        self.recipes.ingredients()
    }

    pub fn ingredients_mut(&mut self) -> &mut IngredientStore {
        self.recipes.ingredients_mut()
    }

    pub fn kitchenware(&self) -> &KitchenwareStore {
        self.recipes.kitchenware()
    }

    pub fn kitchenware_mut(&mut self) -> &mut KitchenwareStore {
        self.recipes.kitchenware_mut()
    }

    pub fn cloud(&self) -> Option<&Arc<dyn KeyValueCloud>> {
        self.cloud.as_ref()
    }

    pub fn documents(&self) -> Option<&Arc<DocumentCloud>> {
        self.documents.as_ref()
    }

    /// Where each store's data came from.
    pub fn load_sources(&self) -> Vec<(StoreKind, LoadSource)> {
        vec![
            (StoreKind::Recipes, self.recipes.load_source()),
            (StoreKind::RecipeBooks, self.books.load_source()),
            (StoreKind::Ingredients, self.ingredients().load_source()),
            (StoreKind::Kitchenware, self.kitchenware().load_source()),
            (StoreKind::ShoppingList, self.shopping.load_source()),
        ]
    }

    /// Deletes a recipe and drops it from every reference-mode book.
    pub fn delete_recipe(&mut self, id: Uuid) -> Option<Recipe> {
        let removed = self.recipes.delete(id)?;
        let books = self.books.detach_recipe(id);
        if books > 0 {
            tracing::debug!("Removed recipe {} from {} book(s)", id, books);
        }
        Some(removed)
    }

    fn book(&self, book_id: Uuid) -> Result<&RecipeBook, LibraryError> {
        self.books.get(book_id).ok_or(LibraryError::BookNotFound(book_id))
    }

    /// The recipes a book shows.
    pub fn book_recipes(&self, book_id: Uuid) -> Result<Vec<&Recipe>, LibraryError> {
        let book = self.book(book_id)?;
        Ok(resolve_book_recipes(book, self.recipes.recipes()))
    }

    /// True if a snapshot book holds recipes missing from the collection.
    pub fn has_unsaved_recipes(&self, book_id: Uuid) -> bool {
        let Some(book) = self.books.get(book_id) else {
            return false;
        };
        book.is_snapshot()
            && resolve_book_recipes(book, &[])
                .iter()
                .any(|recipe| !self.recipes.contains(recipe.id))
    }

    /// Copies a snapshot book's missing recipes into the collection.
    ///
    /// The book itself stays a snapshot. Returns how many recipes were added.
    pub fn save_all_recipes(&mut self, book_id: Uuid) -> Result<usize, LibraryError> {
        let book = self.book(book_id)?;
        if !book.is_snapshot() {
            return Ok(0);
        }

        let missing: Vec<Recipe> = resolve_book_recipes(book, &[])
            .into_iter()
            .filter(|recipe| !self.recipes.contains(recipe.id))
            .cloned()
            .collect();
        for recipe in &missing {
            recipe.validate()?;
        }
        for recipe in &missing {
            self.recipes.add(recipe.clone())?;
        }
        Ok(missing.len())
    }

    /// Adds every ingredient of a recipe to the shopping list.
    pub fn add_recipe_to_shopping_list(&mut self, recipe_id: Uuid) -> Result<(), LibraryError> {
        let recipe = self
            .recipes
            .get(recipe_id)
            .ok_or(LibraryError::RecipeNotFound(recipe_id))?;
        self.shopping.add_recipe_ingredients(&recipe.ingredients);
        Ok(())
    }

    pub fn export_recipe(&self, recipe_id: Uuid) -> Result<ExportedFile, LibraryError> {
        let recipe = self
            .recipes
            .get(recipe_id)
            .ok_or(LibraryError::RecipeNotFound(recipe_id))?;
        Ok(transfer::export_recipe(recipe)?)
    }

    pub fn export_book(&self, book_id: Uuid) -> Result<ExportedFile, LibraryError> {
        let book = self.book(book_id)?;
        Ok(transfer::export_book(book, self.recipes.recipes())?)
    }

    /// Imports a `.mealmate` or `.mealmatebook` file.
    ///
    /// The file is first copied to a private temp directory so the source
    /// can go away while we read it. Recipes go through the recipe store
    /// (teaching it their names); books are added as-is.
    pub fn open_file(&mut self, path: &Path) -> Result<Imported, LibraryError> {
        let staged = stage_file(path)?;
        let imported = transfer::read_file(&staged);
        if let Err(e) = fs::remove_file(&staged) {
            tracing::debug!("Failed to remove staged {}: {}", staged.display(), e);
        }

        match imported? {
            Imported::Recipe(recipe) => {
                tracing::info!("Imported recipe '{}'", recipe.name);
                self.recipes.add(recipe.clone())?;
                Ok(Imported::Recipe(recipe))
            }
            Imported::Book(book) => {
                tracing::info!("Imported recipe book '{}'", book.name);
                self.books.add_book(book.clone());
                Ok(Imported::Book(book))
            }
        }
    }

    /// Applies pending key-value cloud notifications.
    ///
    /// Returns true if any store reloaded.
    pub fn process_cloud_changes(&mut self) -> bool {
        let names = self.recipes.process_cloud_changes();
        let shopping = self.shopping.process_cloud_changes();
        names || shopping
    }

    /// Applies cloud documents read by [`DocumentUpdate::scan`].
    pub fn apply_document_update(&mut self, update: DocumentUpdate) -> bool {
        let mut changed = false;
        if let Some(recipes) = update.recipes {
            changed |= self.recipes.replace_from_cloud(recipes);
        }
        if let Some(books) = update.books {
            changed |= self.books.replace_from_cloud(books);
        }
        changed
    }

    /// One synchronous sync pass: pull the key-value cloud, apply its
    /// notifications, then pick up changed documents.
    pub fn synchronize(&mut self) -> bool {
        if let Some(cloud) = &self.cloud {
            if !cloud.synchronize() {
                tracing::debug!("Cloud unavailable, skipping key-value sync");
            }
        }
        let mut changed = self.process_cloud_changes();
        if let Some(documents) = self.documents.clone() {
            changed |= self.apply_document_update(DocumentUpdate::scan(&documents));
        }
        changed
    }
}

/// Copies `path` into the import staging directory.
fn stage_file(path: &Path) -> Result<PathBuf, TransferError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| TransferError::UnsupportedExtension(path.to_path_buf()))?;
    let dir = std::env::temp_dir().join(IMPORT_DIR);
    fs::create_dir_all(&dir).map_err(|e| TransferError::Io(dir.clone(), e))?;

    let staged = dir.join(format!("{}-{}", Uuid::new_v4(), file_name.to_string_lossy()));
    fs::copy(path, &staged).map_err(|e| TransferError::Io(path.to_path_buf(), e))?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{FolderCloud, MemoryCloud};
    use crate::models::{BookContents, Ingredient, ShoppingItem, Unit};
    use tempfile::TempDir;

    fn local_library() -> (Library, TempDir) {
        let temp = TempDir::new().unwrap();
        let library = Library::open(temp.path().join("data"), None, None);
        (library, temp)
    }

    fn recipe(name: &str) -> Recipe {
        Recipe::new(name, 30, 2)
            .with_ingredients(vec![Ingredient::new("Tomato", 2.0, Unit::Piece)])
            .with_kitchenware(vec!["Knife".into()])
    }

    #[test]
    fn test_fresh_library_is_empty() {
        let (library, _temp) = local_library();
        assert!(library.recipes().recipes().is_empty());
        assert!(library
            .load_sources()
            .iter()
            .all(|(_, source)| *source == LoadSource::Empty));
    }

    #[test]
    fn test_delete_recipe_cascades_to_reference_books() {
        let (mut library, _temp) = local_library();
        let salad = recipe("Salad");
        library.recipes_mut().add(salad.clone()).unwrap();

        let weekly = RecipeBook::new("Weekly").with_recipe_ids(vec![salad.id]);
        let shared = RecipeBook::new("Shared").with_snapshot(vec![salad.clone()]);
        library.books_mut().add_book(weekly.clone());
        library.books_mut().add_book(shared.clone());

        assert!(library.delete_recipe(salad.id).is_some());
        assert!(library.books().get(weekly.id).unwrap().recipe_ids().is_empty());
        assert!(library.books().get(shared.id).unwrap().contains_recipe(salad.id));
        assert!(library.delete_recipe(salad.id).is_none());
    }

    #[test]
    fn test_save_all_recipes_adds_missing_only() {
        let (mut library, _temp) = local_library();
        let owned = recipe("Owned");
        let imported = recipe("Imported");
        library.recipes_mut().add(owned.clone()).unwrap();

        let book = RecipeBook::new("Gift").with_snapshot(vec![owned.clone(), imported.clone()]);
        library.books_mut().add_book(book.clone());
        assert!(library.has_unsaved_recipes(book.id));

        assert_eq!(library.save_all_recipes(book.id).unwrap(), 1);
        assert!(library.recipes().contains(imported.id));
        assert!(!library.has_unsaved_recipes(book.id));
        assert!(library.books().get(book.id).unwrap().is_snapshot());
        assert_eq!(library.save_all_recipes(book.id).unwrap(), 0);

        assert!(matches!(
            library.save_all_recipes(Uuid::new_v4()),
            Err(LibraryError::BookNotFound(_))
        ));
    }

    #[test]
    fn test_reference_book_has_no_unsaved_recipes() {
        let (mut library, _temp) = local_library();
        let book = RecipeBook::new("Plain").with_recipe_ids(vec![Uuid::new_v4()]);
        library.books_mut().add_book(book.clone());
        assert!(!library.has_unsaved_recipes(book.id));
        assert_eq!(library.save_all_recipes(book.id).unwrap(), 0);
    }

    #[test]
    fn test_book_recipes_skip_deleted() {
        let (mut library, _temp) = local_library();
        let kept = recipe("Kept");
        let gone = recipe("Gone");
        library.recipes_mut().add(kept.clone()).unwrap();
        library.recipes_mut().add(gone.clone()).unwrap();
        let book = RecipeBook::new("Two").with_recipe_ids(vec![kept.id, gone.id]);
        library.books_mut().add_book(book.clone());

        library.recipes_mut().delete(gone.id);
        let shown = library.book_recipes(book.id).unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, kept.id);
    }

    #[test]
    fn test_add_recipe_to_shopping_list() {
        let (mut library, _temp) = local_library();
        let soup = recipe("Soup");
        let sauce = recipe("Sauce");
        library.recipes_mut().add(soup.clone()).unwrap();
        library.recipes_mut().add(sauce.clone()).unwrap();

        library.add_recipe_to_shopping_list(soup.id).unwrap();
        library.add_recipe_to_shopping_list(sauce.id).unwrap();

        let items = library.shopping().items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 4.0);
        assert!(library.add_recipe_to_shopping_list(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_open_recipe_file() {
        let (mut library, temp) = local_library();
        let shared = recipe("Shakshuka").with_ingredients(vec![Ingredient::new(
            "eggs",
            4.0,
            Unit::Piece,
        )]);
        let path = transfer::export_recipe(&shared)
            .unwrap()
            .write_to(&temp.path().join("inbox"))
            .unwrap();

        let imported = library.open_file(&path).unwrap();
        assert!(matches!(imported, Imported::Recipe(r) if r.id == shared.id));
        assert!(library.recipes().contains(shared.id));
        assert!(library.ingredients().contains("Eggs"));
        assert!(path.exists());
    }

    #[test]
    fn test_open_book_file_keeps_snapshot() {
        let (mut library, temp) = local_library();
        let book = RecipeBook::new("Holiday").with_snapshot(vec![recipe("Stollen")]);
        let path = transfer::export_book(&book, &[])
            .unwrap()
            .write_to(temp.path())
            .unwrap();

        library.open_file(&path).unwrap();
        let stored = library.books().get(book.id).unwrap();
        assert!(matches!(&stored.contents, BookContents::Snapshot(r) if r.len() == 1));
        assert!(library.has_unsaved_recipes(book.id));
    }

    #[test]
    fn test_open_file_errors_leave_library_unchanged() {
        let (mut library, temp) = local_library();
        let bad = temp.path().join("bad.mealmatebook");
        std::fs::write(&bad, b"{ nope").unwrap();

        assert!(matches!(
            library.open_file(&bad),
            Err(LibraryError::Transfer(TransferError::Decode(_, _)))
        ));
        assert!(matches!(
            library.open_file(&temp.path().join("missing.mealmate")),
            Err(LibraryError::Transfer(TransferError::Io(_, _)))
        ));
        assert!(library.books().books().is_empty());
    }

    #[test]
    fn test_export_book_through_library() {
        let (mut library, _temp) = local_library();
        let pie = recipe("Pie");
        library.recipes_mut().add(pie.clone()).unwrap();
        let book = RecipeBook::new("Bakes").with_recipe_ids(vec![pie.id]);
        library.books_mut().add_book(book.clone());

        let file = library.export_book(book.id).unwrap();
        assert!(file.file_name.starts_with("Bakes_"));
        let decoded: RecipeBook = serde_json::from_slice(&file.contents).unwrap();
        assert!(decoded.is_snapshot());
        assert!(decoded.contains_recipe(pie.id));
    }

    #[test]
    fn test_reopen_roundtrip() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        let mut library = Library::open(&data, None, None);
        let dinner = recipe("Dinner");
        library.recipes_mut().add(dinner.clone()).unwrap();
        library.books_mut().add_book(RecipeBook::new("Mains").with_recipe_ids(vec![dinner.id]));
        library.shopping_mut().add_item(ShoppingItem::new("Rice", 1.0, Unit::Kilogram));
        library.kitchenware_mut().add("Rice Cooker");

        let reopened = Library::open(&data, None, None);
        assert_eq!(reopened.recipes().recipes().len(), 1);
        assert_eq!(reopened.books().books(), library.books().books());
        assert_eq!(reopened.shopping().items(), library.shopping().items());
        assert_eq!(reopened.kitchenware().items(), ["Knife", "Rice Cooker"]);
        assert!(reopened.ingredients().contains("Tomato"));
    }

    #[test]
    fn test_memory_cloud_change_reaches_shopping_list() {
        let temp = TempDir::new().unwrap();
        let cloud = Arc::new(MemoryCloud::new());
        let mut library = Library::open(temp.path(), Some(cloud.clone()), None);

        let remote = vec![ShoppingItem::new("Bananas", 6.0, Unit::Piece)];
        cloud.push_external("SavedShoppingList", serde_json::to_vec(&remote).unwrap());

        assert!(library.process_cloud_changes());
        assert_eq!(library.shopping().items(), remote.as_slice());
        assert!(!library.process_cloud_changes());
    }

    #[test]
    fn test_two_devices_share_a_folder() {
        let temp = TempDir::new().unwrap();
        let cloud_dir = temp.path().join("cloud");
        let open = |device: &str| {
            let cloud = Arc::new(FolderCloud::new(&cloud_dir));
            let documents = Arc::new(DocumentCloud::new(cloud_dir.join("Documents")));
            Library::open(temp.path().join(device), Some(cloud), Some(documents))
        };

        let mut phone = open("phone");
        let mut tablet = open("tablet");

        let curry = recipe("Curry");
        phone.recipes_mut().add(curry.clone()).unwrap();
        phone.kitchenware_mut().add("Wok");
        phone
            .shopping_mut()
            .add_item(ShoppingItem::new("Coconut Milk", 1.0, Unit::Piece));

        assert!(tablet.synchronize());
        assert!(tablet.recipes().contains(curry.id));
        assert!(tablet.kitchenware().contains("Wok"));
        assert_eq!(tablet.shopping().items().len(), 1);

        // Nothing new the second time round
        assert!(!tablet.synchronize());
    }

    fn open_device(root: &Path, device: &str) -> Library {
        let cloud_dir = root.join("cloud");
        let cloud = Arc::new(FolderCloud::new(&cloud_dir));
        let documents = Arc::new(DocumentCloud::new(cloud_dir.join("Documents")));
        Library::open(root.join(device), Some(cloud), Some(documents))
    }

    #[test]
    fn test_cleared_shopping_list_reaches_other_device() {
        let temp = TempDir::new().unwrap();
        let mut phone = open_device(temp.path(), "phone");
        let mut tablet = open_device(temp.path(), "tablet");

        phone
            .shopping_mut()
            .add_item(ShoppingItem::new("Eggs", 12.0, Unit::Piece));
        assert!(tablet.synchronize());
        tablet
            .shopping_mut()
            .add_item(ShoppingItem::new("Bread", 1.0, Unit::Piece));

        phone.shopping_mut().clear_all();
        assert!(tablet.synchronize());
        assert!(tablet.shopping().items().is_empty());

        // The tablet's next write must not bring the cleared items back
        tablet
            .shopping_mut()
            .add_item(ShoppingItem::new("Milk", 1.0, Unit::Liter));
        assert!(phone.synchronize());
        let names: Vec<&str> = phone
            .shopping()
            .items()
            .iter()
            .map(|item| item.name.as_str())
            .collect();
        assert_eq!(names, vec!["Milk"]);
    }

    #[test]
    fn test_deleting_last_recipe_reaches_other_device() {
        let temp = TempDir::new().unwrap();
        let mut phone = open_device(temp.path(), "phone");
        let mut tablet = open_device(temp.path(), "tablet");

        let curry = recipe("Curry");
        phone.recipes_mut().add(curry.clone()).unwrap();
        assert!(tablet.synchronize());
        assert!(tablet.recipes().contains(curry.id));

        phone.delete_recipe(curry.id);
        assert!(tablet.synchronize());
        assert!(tablet.recipes().recipes().is_empty());

        let reopened = open_device(temp.path(), "tablet");
        assert!(reopened.recipes().recipes().is_empty());
    }
}
