// crates/storage/src/requests/searches.rs
//! Saved-search commands

use crate::entities::{ChangeType, ObjectChange, Search, SearchChange, SearchCondition};
use crate::store::Database;
use citestream_core::{LibraryId, Result};

/// Creates a new saved search and records its initial change set
pub fn create_search(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    name: &str,
    conditions: Vec<SearchCondition>,
) -> Result<()> {
    let mut search = Search::new(key, library_id, name);
    search.conditions = conditions;
    search.mark_as_changed_local();
    db.insert_search(search)
}

/// Renames a saved search, recording a name delta
pub fn rename_search(db: &mut Database, library_id: LibraryId, key: &str, name: &str) -> Result<()> {
    let search = db.search_mut(library_id, key)?;
    search.name = name.to_string();
    search
        .changes
        .push(ObjectChange::new(vec![SearchChange::Name]));
    search.meta.change_type = ChangeType::User;
    Ok(())
}

/// Replaces the condition list, recording a conditions delta
pub fn set_search_conditions(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    conditions: Vec<SearchCondition>,
) -> Result<()> {
    let search = db.search_mut(library_id, key)?;
    search.conditions = conditions;
    search
        .changes
        .push(ObjectChange::new(vec![SearchChange::Conditions]));
    search.meta.change_type = ChangeType::User;
    Ok(())
}

/// Deletes a saved search outright
pub fn delete_search(db: &mut Database, library_id: LibraryId, key: &str) -> Result<()> {
    db.search(library_id, key)?;
    db.searches.remove(&(library_id, key.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use citestream_core::CustomLibraryType;

    fn test_library() -> LibraryId {
        LibraryId::Custom(CustomLibraryType::MyLibrary)
    }

    fn condition() -> SearchCondition {
        SearchCondition {
            condition: "itemType".to_string(),
            operator: "is".to_string(),
            value: "book".to_string(),
            sort_index: 0,
        }
    }

    #[test]
    fn test_create_and_edit_search() {
        let mut db = Database::default();
        create_search(&mut db, test_library(), "SRCH2345", "Books", vec![condition()])
            .expect("create");

        rename_search(&mut db, test_library(), "SRCH2345", "All books").expect("rename");
        let search = db.search(test_library(), "SRCH2345").expect("search");
        assert_eq!(search.name, "All books");
        assert!(search.changed_fields().contains(&SearchChange::Name));

        delete_search(&mut db, test_library(), "SRCH2345").expect("delete");
        assert!(db.search(test_library(), "SRCH2345").is_err());
    }
}
