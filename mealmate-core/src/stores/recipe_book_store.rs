use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{keep_order, ChangeCause, EventSender, LoadSource, StoreEvent, StoreKind};
use crate::cloud::DocumentCloud;
use crate::models::RecipeBook;
use crate::storage::FileStorage;

/// Local snapshot of every book.
pub const BOOKS_FILE: &str = "SavedRecipeBooks.json";

/// Extension of per-book cloud documents and exported books.
pub const BOOK_EXTENSION: &str = "mealmatebook";

#[derive(Debug)]
pub struct RecipeBookStore {
    books: Vec<RecipeBook>,
    storage: FileStorage,
    documents: Option<Arc<DocumentCloud>>,
    source: LoadSource,
    events: EventSender,
}

impl RecipeBookStore {
    pub fn open(storage: FileStorage, documents: Option<Arc<DocumentCloud>>) -> Self {
        let mut store = Self {
            books: Vec::new(),
            storage,
            documents,
            source: LoadSource::NotLoaded,
            events: EventSender::new(StoreKind::RecipeBooks),
        };
        store.load();
        store
    }

    fn load(&mut self) {
        let local: Option<Vec<RecipeBook>> = self.storage.load(BOOKS_FILE);

        if let Some(documents) = &self.documents {
            documents.ensure_directory();
            let from_cloud: Vec<RecipeBook> = documents.load_all(BOOK_EXTENSION);
            if !from_cloud.is_empty() {
                let previous = local.unwrap_or_default();
                self.books = keep_order(from_cloud, &previous, |b| b.id, |b| b.name.as_str());
                self.source = LoadSource::Cloud;
                self.storage.save(&self.books, BOOKS_FILE);
                tracing::debug!("Loaded {} recipe books from cloud", self.books.len());
                return;
            }
        }

        match local {
            Some(books) => {
                self.books = books;
                self.source = LoadSource::LocalFallback;
                if let Some(documents) = &self.documents {
                    for book in &self.books {
                        documents.save(book.id, BOOK_EXTENSION, book);
                    }
                }
                tracing::debug!("Loaded {} recipe books from {}", self.books.len(), BOOKS_FILE);
            }
            None => self.source = LoadSource::Empty,
        }
    }

    fn persist(&mut self, book: &RecipeBook) {
        if let Some(documents) = &self.documents {
            documents.save(book.id, BOOK_EXTENSION, book);
        }
        self.storage.save(&self.books, BOOKS_FILE);
        self.source = self.source.after_local_save();
        self.events.notify(ChangeCause::Local);
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.books.iter().position(|book| book.id == id)
    }

    /// Adds a book as given; imported snapshot books stay snapshots.
    pub fn add_book(&mut self, book: RecipeBook) {
        match self.index_of(book.id) {
            Some(index) => self.books[index] = book.clone(),
            None => self.books.push(book.clone()),
        }
        self.persist(&book);
    }

    /// Replaces the book with the same id. Returns false if unknown.
    pub fn update_book(&mut self, book: RecipeBook) -> bool {
        let Some(index) = self.index_of(book.id) else {
            return false;
        };
        self.books[index] = book.clone();
        self.persist(&book);
        true
    }

    pub fn delete_book(&mut self, id: Uuid) -> Option<RecipeBook> {
        let index = self.index_of(id)?;
        let removed = self.books.remove(index);

        if let Some(documents) = &self.documents {
            documents.delete(id, BOOK_EXTENSION);
        }
        self.storage.save(&self.books, BOOKS_FILE);
        self.source = self.source.after_local_save();
        self.events.notify(ChangeCause::Local);
        Some(removed)
    }

    /// Applies `change` to one book and persists it if anything changed.
    ///
    /// Converting a snapshot book to reference mode counts as a change.
    fn modify(&mut self, book_id: Uuid, change: impl FnOnce(&mut RecipeBook) -> bool) -> bool {
        let Some(index) = self.index_of(book_id) else {
            return false;
        };
        let book = &mut self.books[index];
        let was_snapshot = book.is_snapshot();
        if !change(book) && !was_snapshot {
            return false;
        }

        let book = self.books[index].clone();
        self.persist(&book);
        true
    }

    /// Adds a recipe id to a book, converting a snapshot book to
    /// reference mode first.
    pub fn add_recipe_to_book(&mut self, recipe_id: Uuid, book_id: Uuid) -> bool {
        self.modify(book_id, |book| book.add_recipe_id(recipe_id))
    }

    /// Removes a recipe id from a book, converting a snapshot book to
    /// reference mode first.
    pub fn remove_recipe_from_book(&mut self, recipe_id: Uuid, book_id: Uuid) -> bool {
        self.modify(book_id, |book| book.remove_recipe_id(recipe_id))
    }

    /// Drops a deleted recipe from every reference-mode book.
    ///
    /// Snapshot books are independent copies and keep their recipe.
    /// Returns the number of books changed.
    pub fn detach_recipe(&mut self, recipe_id: Uuid) -> usize {
        let affected: Vec<Uuid> = self
            .books
            .iter()
            .filter(|book| !book.is_snapshot() && book.contains_recipe(recipe_id))
            .map(|book| book.id)
            .collect();

        for book_id in &affected {
            self.modify(*book_id, |book| book.remove_recipe_id(recipe_id));
        }
        affected.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&RecipeBook> {
        self.books.iter().find(|book| book.id == id)
    }

    pub fn books(&self) -> &[RecipeBook] {
        &self.books
    }

    pub fn documents(&self) -> Option<&Arc<DocumentCloud>> {
        self.documents.as_ref()
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Replaces the collection with books read from the cloud documents
    /// after another device changed them, even when none are left.
    pub fn replace_from_cloud(&mut self, books: Vec<RecipeBook>) -> bool {
        self.books = keep_order(books, &self.books, |b| b.id, |b| b.name.as_str());
        self.source = LoadSource::Cloud;
        self.storage.save(&self.books, BOOKS_FILE);
        self.events.notify(ChangeCause::Cloud);
        true
    }

    /// Reloads from the cloud documents if another device changed them.
    pub fn refresh_from_cloud(&mut self) -> bool {
        let Some(documents) = self.documents.clone() else {
            return false;
        };
        if !documents.scan_changes(BOOK_EXTENSION) {
            return false;
        }
        let books = documents.load_all(BOOK_EXTENSION);
        self.replace_from_cloud(books)
    }
}
