use crate::BookRecord;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Category vocabulary created on first run, in display order.
pub const SEED_CATEGORIES: [&str; 7] = [
    "Aventuras",
    "Ciencia Ficción",
    "Histórica",
    "Novela Negra",
    "Romántica",
    "Terror",
    "Tecnología",
];

/// Category name -> saved books, in insertion order. A referenced category always maps to a
/// (possibly empty) list. The same book may appear several times, in one or many categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet {
    categories: IndexMap<String, Vec<BookRecord>>,
}

impl Default for CategorySet {
    fn default() -> Self { Self::seeded() }
}

impl CategorySet {
    pub fn seeded() -> Self {
        let categories = SEED_CATEGORIES.iter().map(|name| (name.to_string(), Vec::new())).collect();
        Self { categories }
    }

    pub fn empty() -> Self { Self { categories: IndexMap::new() } }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool { self.categories.contains_key(name) }

    pub fn len(&self) -> usize { self.categories.len() }

    pub fn is_empty(&self) -> bool { self.categories.is_empty() }

    /// Books saved under `name`; unknown categories read as empty.
    pub fn books_in(&self, name: &str) -> &[BookRecord] {
        self.categories.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends `book` to `name`, creating the category if needed.
    pub fn add(&mut self, book: BookRecord, name: &str) {
        self.categories.entry(name.to_string()).or_default().push(book);
    }

    /// Removes every entry of `name` whose id is `book_id`. Returns how many were removed.
    pub fn remove(&mut self, book_id: &str, name: &str) -> usize {
        let Some(books) = self.categories.get_mut(name) else { return 0 };
        let before = books.len();
        books.retain(|b| b.id != book_id);
        before - books.len()
    }

    /// Creates an empty category. Returns false for blank or already present names.
    pub fn create(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.categories.contains_key(name) { return false; }
        self.categories.insert(name.to_string(), Vec::new());
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BookRecord])> + '_ {
        self.categories.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str) -> BookRecord { BookRecord::new(id, format!("Title {id}")) }

    #[test]
    fn seeded_has_all_genres_empty() {
        let set = CategorySet::seeded();
        assert_eq!(set.names().collect::<Vec<_>>(), SEED_CATEGORIES.to_vec());
        assert!(set.iter().all(|(_, books)| books.is_empty()));
    }

    #[test]
    fn add_creates_unknown_category_and_keeps_order() {
        let mut set = CategorySet::seeded();
        set.add(book("A1"), "Poesía");
        set.add(book("A2"), "Poesía");
        set.add(book("A1"), "Poesía");
        assert_eq!(set.names().last(), Some("Poesía"));
        let ids: Vec<_> = set.books_in("Poesía").iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["A1", "A2", "A1"]);
    }

    #[test]
    fn remove_drops_every_match() {
        let mut set = CategorySet::seeded();
        set.add(book("A1"), "Terror");
        set.add(book("B1"), "Terror");
        set.add(book("A1"), "Terror");
        set.add(book("A1"), "Aventuras");
        assert_eq!(set.remove("A1", "Terror"), 2);
        assert_eq!(set.books_in("Terror").len(), 1);
        assert_eq!(set.books_in("Aventuras").len(), 1);
        assert_eq!(set.remove("A1", "Nope"), 0);
        assert!(!set.contains("Nope"));
    }

    #[test]
    fn create_rejects_blank_and_duplicates() {
        let mut set = CategorySet::seeded();
        assert!(!set.create("  "));
        assert!(!set.create("Terror"));
        assert!(set.create(" Ensayo "));
        assert!(set.contains("Ensayo"));
        assert!(set.books_in("Unknown").is_empty());
    }
}
