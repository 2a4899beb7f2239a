// crates/storage/src/entities/item_types.rs
//! Well-known item type names

/// Annotation on an attachment
pub const ANNOTATION: &str = "annotation";
/// File or link attachment
pub const ATTACHMENT: &str = "attachment";
/// Standalone or child note
pub const NOTE: &str = "note";
/// Book
pub const BOOK: &str = "book";
/// Journal article
pub const JOURNAL_ARTICLE: &str = "journalArticle";

/// Item types that never carry creators
pub fn supports_creators(item_type: &str) -> bool {
    !matches!(item_type, ANNOTATION | ATTACHMENT | NOTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_support() {
        assert!(supports_creators(BOOK));
        assert!(supports_creators(JOURNAL_ARTICLE));
        assert!(!supports_creators(ANNOTATION));
        assert!(!supports_creators(ATTACHMENT));
        assert!(!supports_creators(NOTE));
    }
}
