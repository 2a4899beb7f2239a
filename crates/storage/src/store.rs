// crates/storage/src/store.rs
//! Transactional in-memory store
//!
//! All command functions in `requests` run inside `Store::read` or
//! `Store::write`. A write clones the live database, lets the closure
//! mutate the clone, and only swaps it in when the closure returns `Ok`.
//! Any error leaves the live database untouched, which gives multi-object
//! commands all-or-nothing semantics without a journal.

use crate::entities::{
    Collection, CustomLibrary, Group, Item, PageIndex, Search, Tag, TypedTag,
};
use citestream_core::{CustomLibraryType, DataError, LibraryId, Result};
use std::collections::BTreeMap;

/// Composite key of a syncable object: owning library plus object key
pub type ObjectKey = (LibraryId, String);

/// The full object graph, one table per entity
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub items: BTreeMap<ObjectKey, Item>,
    pub collections: BTreeMap<ObjectKey, Collection>,
    pub searches: BTreeMap<ObjectKey, Search>,
    pub tags: BTreeMap<ObjectKey, Tag>,
    /// Tag-to-item join rows
    pub typed_tags: Vec<TypedTag>,
    pub groups: BTreeMap<i32, Group>,
    pub custom_libraries: BTreeMap<CustomLibraryType, CustomLibrary>,
    pub page_indices: BTreeMap<ObjectKey, PageIndex>,
}

impl Database {
    /// Looks up an item, erroring when absent
    pub fn item(&self, library_id: LibraryId, key: &str) -> Result<&Item> {
        self.items
            .get(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "Item",
                key: key.to_string(),
            })
    }

    /// Mutable item lookup, erroring when absent
    pub fn item_mut(&mut self, library_id: LibraryId, key: &str) -> Result<&mut Item> {
        self.items
            .get_mut(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "Item",
                key: key.to_string(),
            })
    }

    /// Inserts a new item, refusing to overwrite an existing key
    pub fn insert_item(&mut self, item: Item) -> Result<()> {
        let key = (item.library_id, item.key.clone());
        if self.items.contains_key(&key) {
            return Err(DataError::AlreadyExists {
                entity: "Item",
                key: item.key,
            });
        }
        self.items.insert(key, item);
        Ok(())
    }

    /// Looks up a collection, erroring when absent
    pub fn collection(&self, library_id: LibraryId, key: &str) -> Result<&Collection> {
        self.collections
            .get(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "Collection",
                key: key.to_string(),
            })
    }

    /// Mutable collection lookup, erroring when absent
    pub fn collection_mut(&mut self, library_id: LibraryId, key: &str) -> Result<&mut Collection> {
        self.collections
            .get_mut(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "Collection",
                key: key.to_string(),
            })
    }

    /// Inserts a new collection, refusing to overwrite an existing key
    pub fn insert_collection(&mut self, collection: Collection) -> Result<()> {
        let key = (collection.library_id, collection.key.clone());
        if self.collections.contains_key(&key) {
            return Err(DataError::AlreadyExists {
                entity: "Collection",
                key: collection.key,
            });
        }
        self.collections.insert(key, collection);
        Ok(())
    }

    /// Looks up a saved search, erroring when absent
    pub fn search(&self, library_id: LibraryId, key: &str) -> Result<&Search> {
        self.searches
            .get(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "Search",
                key: key.to_string(),
            })
    }

    /// Mutable search lookup, erroring when absent
    pub fn search_mut(&mut self, library_id: LibraryId, key: &str) -> Result<&mut Search> {
        self.searches
            .get_mut(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "Search",
                key: key.to_string(),
            })
    }

    /// Inserts a new saved search, refusing to overwrite an existing key
    pub fn insert_search(&mut self, search: Search) -> Result<()> {
        let key = (search.library_id, search.key.clone());
        if self.searches.contains_key(&key) {
            return Err(DataError::AlreadyExists {
                entity: "Search",
                key: search.key,
            });
        }
        self.searches.insert(key, search);
        Ok(())
    }

    /// All items of a library
    pub fn items_in_library(&self, library_id: LibraryId) -> impl Iterator<Item = &Item> {
        self.items
            .values()
            .filter(move |item| item.library_id == library_id)
    }

    /// All collections of a library
    pub fn collections_in_library(
        &self,
        library_id: LibraryId,
    ) -> impl Iterator<Item = &Collection> {
        self.collections
            .values()
            .filter(move |collection| collection.library_id == library_id)
    }

    /// All saved searches of a library
    pub fn searches_in_library(&self, library_id: LibraryId) -> impl Iterator<Item = &Search> {
        self.searches
            .values()
            .filter(move |search| search.library_id == library_id)
    }

    /// Keys of an item's direct children
    pub fn child_item_keys(&self, library_id: LibraryId, parent_key: &str) -> Vec<String> {
        self.items_in_library(library_id)
            .filter(|item| item.parent_key.as_deref() == Some(parent_key))
            .map(|item| item.key.clone())
            .collect()
    }

    /// Keys of a collection's direct child collections
    pub fn child_collection_keys(&self, library_id: LibraryId, parent_key: &str) -> Vec<String> {
        self.collections_in_library(library_id)
            .filter(|collection| collection.parent_key.as_deref() == Some(parent_key))
            .map(|collection| collection.key.clone())
            .collect()
    }

    /// Keys of the items assigned to a collection
    pub fn collection_item_keys(&self, library_id: LibraryId, collection_key: &str) -> Vec<String> {
        self.items_in_library(library_id)
            .filter(|item| item.collection_keys.contains(collection_key))
            .map(|item| item.key.clone())
            .collect()
    }

    /// Tag names assigned to an item, via the join rows
    pub fn item_tag_names(&self, library_id: LibraryId, item_key: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .typed_tags
            .iter()
            .filter(|tt| tt.library_id == library_id && tt.item_key == item_key)
            .map(|tt| tt.tag_name.clone())
            .collect();
        names.sort();
        names
    }

    /// Removes every tag join row of an item
    pub fn remove_item_tag_links(&mut self, library_id: LibraryId, item_key: &str) {
        self.typed_tags
            .retain(|tt| !(tt.library_id == library_id && tt.item_key == item_key));
    }

    /// Deletes tags that lost their last join row, keeping colored tags
    /// which stay meaningful without assignments
    pub fn prune_orphaned_tags(&mut self, library_id: LibraryId) {
        let orphaned: Vec<ObjectKey> = self
            .tags
            .iter()
            .filter(|((tag_library, name), tag)| {
                *tag_library == library_id
                    && tag.is_colorless()
                    && !self
                        .typed_tags
                        .iter()
                        .any(|tt| tt.library_id == library_id && &tt.tag_name == name)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in orphaned {
            self.tags.remove(&key);
        }
    }

    /// Group record by identifier, erroring when absent
    pub fn group(&self, identifier: i32) -> Result<&Group> {
        self.groups.get(&identifier).ok_or_else(|| DataError::NotFound {
            entity: "Group",
            key: identifier.to_string(),
        })
    }

    /// Custom library record, created on first access
    pub fn custom_library_mut(&mut self, library_type: CustomLibraryType) -> &mut CustomLibrary {
        self.custom_libraries
            .entry(library_type)
            .or_insert_with(|| CustomLibrary::new(library_type))
    }

    /// Page index record, erroring when absent
    pub fn page_index(&self, library_id: LibraryId, key: &str) -> Result<&PageIndex> {
        self.page_indices
            .get(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "PageIndex",
                key: key.to_string(),
            })
    }

    /// Mutable page index lookup, erroring when absent
    pub fn page_index_mut(&mut self, library_id: LibraryId, key: &str) -> Result<&mut PageIndex> {
        self.page_indices
            .get_mut(&(library_id, key.to_string()))
            .ok_or_else(|| DataError::NotFound {
                entity: "PageIndex",
                key: key.to_string(),
            })
    }
}

/// Owns the live database and mediates all access to it
#[derive(Debug, Default)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a read-only command against the live database
    pub fn read<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        f(&self.db)
    }

    /// Runs a mutating command against a working copy. The copy replaces
    /// the live database only when the command succeeds; on error every
    /// partial mutation is discarded.
    pub fn write<T>(&mut self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut working = self.db.clone();
        let value = f(&mut working)?;
        self.db = working;
        Ok(value)
    }
}
