//! Sharing recipes and books as files.
//!
//! - `.mealmate`: one recipe.
//! - `.mealmatebook`: one book, with full copies of its recipes embedded
//!   so the receiver doesn't need them in their own collection.

use chrono::{DateTime, Utc};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Recipe, RecipeBook, RecipeError};
use crate::search::resolve_book_recipes;
use crate::stores::{BOOK_EXTENSION, RECIPE_EXTENSION};

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("I/O error for {}: {1}", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("Failed to decode {}: {1}", .0.display())]
    Decode(PathBuf, #[source] serde_json::Error),

    #[error("Failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid recipe: {0}")]
    InvalidRecipe(#[from] RecipeError),

    #[error("Invalid export file name: {0}")]
    InvalidFileName(String),
}

/// An encoded file ready to be written or shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl ExportedFile {
    /// Writes the file into `dir`, replacing an existing file of the same name.
    ///
    /// The file name must be a single path component.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, TransferError> {
        if Path::new(&self.file_name).file_name() != Some(OsStr::new(&self.file_name)) {
            return Err(TransferError::InvalidFileName(self.file_name.clone()));
        }
        fs::create_dir_all(dir).map_err(|e| TransferError::Io(dir.to_path_buf(), e))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.contents).map_err(|e| TransferError::Io(path.clone(), e))?;
        Ok(path)
    }
}

/// A decoded `.mealmate` or `.mealmatebook` file.
#[derive(Debug, Clone)]
pub enum Imported {
    Recipe(Recipe),
    Book(RecipeBook),
}

/// Stem used when a name leaves nothing usable.
const FALLBACK_STEM: &str = "Untitled";

/// Turns a recipe or book name into a file name stem.
///
/// Whitespace, path separators and characters Windows rejects become `_`.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();

    if stem.chars().all(|c| c == '.') {
        return FALLBACK_STEM.to_string();
    }
    stem
}

pub fn export_recipe(recipe: &Recipe) -> Result<ExportedFile, TransferError> {
    Ok(ExportedFile {
        file_name: format!("{}.{}", file_stem(&recipe.name), RECIPE_EXTENSION),
        contents: serde_json::to_vec_pretty(recipe)?,
    })
}

/// Exports a book with its recipes embedded, stamped with the current time.
pub fn export_book(book: &RecipeBook, recipes: &[Recipe]) -> Result<ExportedFile, TransferError> {
    export_book_at(book, recipes, Utc::now())
}

/// Like [`export_book`], with an explicit timestamp for the file name.
pub fn export_book_at(
    book: &RecipeBook,
    recipes: &[Recipe],
    at: DateTime<Utc>,
) -> Result<ExportedFile, TransferError> {
    let embedded: Vec<Recipe> = resolve_book_recipes(book, recipes)
        .into_iter()
        .cloned()
        .collect();
    let exported = book.clone().with_snapshot(embedded);

    Ok(ExportedFile {
        file_name: format!(
            "{}_{}.{}",
            file_stem(&book.name),
            at.timestamp(),
            BOOK_EXTENSION
        ),
        contents: serde_json::to_vec_pretty(&exported)?,
    })
}

/// Decodes a shared file by its extension.
pub fn read_file(path: &Path) -> Result<Imported, TransferError> {
    let extension = path.extension().and_then(|s| s.to_str());
    if extension != Some(RECIPE_EXTENSION) && extension != Some(BOOK_EXTENSION) {
        return Err(TransferError::UnsupportedExtension(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|e| TransferError::Io(path.to_path_buf(), e))?;
    if extension == Some(RECIPE_EXTENSION) {
        let recipe: Recipe =
            serde_json::from_slice(&bytes).map_err(|e| TransferError::Decode(path.to_path_buf(), e))?;
        recipe.validate()?;
        Ok(Imported::Recipe(recipe))
    } else {
        let book: RecipeBook =
            serde_json::from_slice(&bytes).map_err(|e| TransferError::Decode(path.to_path_buf(), e))?;
        Ok(Imported::Book(book))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookContents, Ingredient, Unit};
    use chrono::TimeZone;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn test_export_recipe_file_name_and_contents() {
        let recipe = Recipe::new("Chicken Tikka Masala", 50, 4)
            .with_ingredients(vec![Ingredient::new("Chicken", 500.0, Unit::Gram)]);
        let file = export_recipe(&recipe).unwrap();

        assert_eq!(file.file_name, "Chicken_Tikka_Masala.mealmate");
        let text = String::from_utf8(file.contents.clone()).unwrap();
        assert!(text.contains('\n'));
        assert!(text.contains("\"cookTime\": 50"));

        let decoded: Recipe = serde_json::from_slice(&file.contents).unwrap();
        assert_eq!(decoded.id, recipe.id);
        assert_eq!(decoded.ingredients[0].name, "Chicken");
    }

    #[test]
    fn test_export_name_with_separators_stays_in_directory() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");

        let file = export_recipe(&Recipe::new("Soup/Stew", 60, 4)).unwrap();
        assert_eq!(file.file_name, "Soup_Stew.mealmate");
        assert_eq!(file.write_to(&out).unwrap(), out.join("Soup_Stew.mealmate"));

        let file = export_recipe(&Recipe::new("a/../../escaped", 1, 1)).unwrap();
        let path = file.write_to(&out).unwrap();
        assert_eq!(path.parent().unwrap(), out);
        assert!(!temp.path().join("escaped.mealmate").exists());
    }

    #[test]
    fn test_export_name_fallbacks() {
        assert_eq!(file_stem(".."), FALLBACK_STEM);
        assert_eq!(file_stem("."), FALLBACK_STEM);
        assert_eq!(file_stem("   "), FALLBACK_STEM);
        assert_eq!(file_stem(r#"Mac "n" Cheese?"#), "Mac__n__Cheese_");
        assert_eq!(file_stem("C:\\Pie"), "C__Pie");
    }

    #[test]
    fn test_write_to_rejects_paths() {
        let temp = TempDir::new().unwrap();
        let file = ExportedFile {
            file_name: "../outside.mealmate".to_string(),
            contents: b"{}".to_vec(),
        };
        assert!(matches!(
            file.write_to(temp.path()),
            Err(TransferError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_export_book_embeds_resolved_recipes() {
        let kept = Recipe::new("Scones", 30, 8);
        let other = Recipe::new("Muffins", 25, 12);
        let book = RecipeBook::new("Tea Time").with_recipe_ids(vec![kept.id, Uuid::new_v4()]);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let file = export_book_at(&book, &[kept.clone(), other], at).unwrap();
        assert_eq!(file.file_name, format!("Tea_Time_{}.mealmatebook", at.timestamp()));

        let decoded: RecipeBook = serde_json::from_slice(&file.contents).unwrap();
        assert_eq!(decoded.id, book.id);
        match decoded.contents {
            BookContents::Snapshot(recipes) => {
                assert_eq!(recipes.len(), 1);
                assert_eq!(recipes[0].name, "Scones");
            }
            BookContents::Reference(_) => panic!("expected snapshot"),
        }
    }

    #[test]
    fn test_read_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        let recipe = Recipe::new("Gazpacho", 15, 4);
        let book = RecipeBook::new("Summer").with_snapshot(vec![recipe.clone()]);

        let recipe_path = export_recipe(&recipe).unwrap().write_to(temp.path()).unwrap();
        let book_path = export_book(&book, &[]).unwrap().write_to(temp.path()).unwrap();

        assert!(matches!(read_file(&recipe_path).unwrap(), Imported::Recipe(r) if r.id == recipe.id));
        assert!(matches!(read_file(&book_path).unwrap(), Imported::Book(b) if b.is_snapshot()));
    }

    #[test]
    fn test_read_file_errors() {
        let temp = TempDir::new().unwrap();

        let text = temp.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(matches!(
            read_file(&text),
            Err(TransferError::UnsupportedExtension(_))
        ));

        let missing = temp.path().join("missing.mealmate");
        assert!(matches!(read_file(&missing), Err(TransferError::Io(_, _))));

        let broken = temp.path().join("broken.mealmatebook");
        std::fs::write(&broken, b"{").unwrap();
        assert!(matches!(read_file(&broken), Err(TransferError::Decode(_, _))));
    }

    #[test]
    fn test_read_file_rejects_invalid_step_maps() {
        let temp = TempDir::new().unwrap();
        let recipe = Recipe::new("Bad", 1, 1).with_step_ingredients(3, vec![]);
        let path = temp.path().join("bad.mealmate");
        std::fs::write(&path, serde_json::to_vec(&recipe).unwrap()).unwrap();

        assert!(matches!(
            read_file(&path),
            Err(TransferError::InvalidRecipe(RecipeError::StepIngredientsOutOfRange { .. }))
        ));
    }
}
