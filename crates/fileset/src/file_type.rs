//! Extension category definitions used to derive a record's `type`.

// ---------------------------------------------------------------------------
// Extension category constants
// ---------------------------------------------------------------------------

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "csv", "tsv", "numbers", "ods"];

pub const DATA_EXTENSIONS: &[&str] = &[
    "json", "jsonl", "ndjson", "parquet", "avro", "orc", "xml", "yaml", "yml", "duckdb", "db",
    "sqlite",
];

pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "md", "rst", "doc", "docx", "rtf", "odt", "pdf", "pages",
];

pub const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "key", "odp"];

pub const PICTURE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "svg", "heic",
];

pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz", "zst",
];

pub const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "sql", "sh", "r", "ipynb", "html", "css", "toml", "ini", "cfg",
];

const CATEGORIES: &[(&str, &[&str])] = &[
    ("spreadsheet", SPREADSHEET_EXTENSIONS),
    ("data", DATA_EXTENSIONS),
    ("document", DOCUMENT_EXTENSIONS),
    ("presentation", PRESENTATION_EXTENSIONS),
    ("picture", PICTURE_EXTENSIONS),
    ("archive", ARCHIVE_EXTENSIONS),
    ("code", CODE_EXTENSIONS),
];

/// Extracts the lowercased extension from a filename.
pub fn extension_of_name(name: &str) -> Option<String> {
    let split = name.rfind('.')?;
    if split == 0 || split + 1 >= name.len() {
        return None;
    }
    Some(name[split + 1..].to_ascii_lowercase())
}

/// Derives the `type` category for a filename.
///
/// Known extensions map to their category; an unknown extension is used
/// as-is; a name without an extension yields an empty type.
pub fn file_type_for_name(name: &str) -> String {
    let Some(extension) = extension_of_name(name) else {
        return String::new();
    };
    CATEGORIES
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(category, _)| (*category).to_string())
        .unwrap_or(extension)
}
