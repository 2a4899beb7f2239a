// crates/storage/src/entities/field_keys.rs
//! Well-known item field keys

/// Item title
pub const TITLE: &str = "title";
/// Attachment filename
pub const FILENAME: &str = "filename";
/// Attachment content hash; submitted empty, the file store owns the value
pub const MD5: &str = "md5";
/// Attachment modification time; submitted empty like `md5`
pub const MTIME: &str = "mtime";
/// Attachment link mode
pub const LINK_MODE: &str = "linkMode";
/// Attachment content type
pub const CONTENT_TYPE: &str = "contentType";
/// Annotation subtype (highlight, ink, note, image, underline, text)
pub const ANNOTATION_TYPE: &str = "annotationType";
/// Annotation position payload, assembled from geometry at upload time
pub const ANNOTATION_POSITION: &str = "position";
/// Annotation sort index
pub const ANNOTATION_SORT_INDEX: &str = "sortIndex";
/// DOI field on bibliographic items
pub const DOI: &str = "DOI";
/// URL field
pub const URL: &str = "url";

/// Link mode value for attachments whose bytes we uploaded
pub const LINK_MODE_IMPORTED_FILE: &str = "imported_file";

/// Annotation type values
pub mod annotation_type {
    /// Text highlight, geometry is a rect list
    pub const HIGHLIGHT: &str = "highlight";
    /// Freehand ink, geometry is ordered point paths
    pub const INK: &str = "ink";
    /// Sticky note
    pub const NOTE: &str = "note";
    /// Area selection
    pub const IMAGE: &str = "image";
    /// Underline
    pub const UNDERLINE: &str = "underline";
    /// Free text
    pub const TEXT: &str = "text";
}
