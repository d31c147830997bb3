/// Extension-based categorization of files.
///
/// The category set is closed and ordered. Every extension belongs to at most
/// one category, and anything the table does not know lands in
/// [`Category::Others`].
///
/// # Examples
///
/// ```
/// use downsort::file_category::{Category, CategoryTable};
///
/// let table = CategoryTable::standard();
/// assert_eq!(table.category_for(".PDF"), Category::Documents);
/// assert_eq!(table.category_for("png"), Category::Images);
/// assert_eq!(table.category_for(""), Category::Others);
/// ```
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// A named bucket of file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Images,
    Videos,
    Documents,
    Audio,
    Archives,
    Programs,
    /// Fallback for unknown or missing extensions.
    Others,
}

impl Category {
    /// All categories in table order.
    pub const ALL: [Category; 7] = [
        Category::Images,
        Category::Videos,
        Category::Documents,
        Category::Audio,
        Category::Archives,
        Category::Programs,
        Category::Others,
    ];

    /// Returns the folder name used for this category.
    ///
    /// ```
    /// use downsort::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "Images");
    /// assert_eq!(Category::Others.dir_name(), "Others");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Documents => "Documents",
            Category::Audio => "Audio",
            Category::Archives => "Archives",
            Category::Programs => "Programs",
            Category::Others => "Others",
        }
    }

    /// Parses a category from its folder name, ignoring case.
    pub fn from_name(name: &str) -> Option<Category> {
        Self::ALL
            .into_iter()
            .find(|category| category.dir_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

static STANDARD_TABLE: LazyLock<CategoryTable> = LazyLock::new(CategoryTable::new);

/// Maps file extensions to categories.
///
/// Extensions are stored lower-cased with their leading dot.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    extension_map: HashMap<String, Category>,
}

/// Raised when an extension is assigned to a second category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateExtension {
    pub extension: String,
    pub existing: Category,
    pub requested: Category,
}

impl fmt::Display for DuplicateExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extension '{}' already belongs to {}, cannot add it to {}",
            self.extension, self.existing, self.requested
        )
    }
}

impl std::error::Error for DuplicateExtension {}

impl CategoryTable {
    /// Creates a table holding the standard mappings.
    pub fn new() -> Self {
        let mut table = Self {
            extension_map: HashMap::new(),
        };
        table.populate_standard_mappings();
        table
    }

    /// The process-wide standard table, built on first use.
    pub fn standard() -> &'static CategoryTable {
        &STANDARD_TABLE
    }

    fn populate_standard_mappings(&mut self) {
        let standard: [(Category, &[&str]); 6] = [
            (Category::Images, &[".jpg", ".jpeg", ".png", ".gif", ".bmp"]),
            (Category::Videos, &[".mp4", ".mkv", ".avi", ".mov"]),
            (
                Category::Documents,
                &[".pdf", ".doc", ".docx", ".xls", ".xlsx", ".txt"],
            ),
            (Category::Audio, &[".mp3", ".wav", ".aac"]),
            (Category::Archives, &[".zip", ".rar", ".7z", ".tar"]),
            (Category::Programs, &[".exe", ".msi", ".dmg"]),
        ];

        for (category, extensions) in standard {
            for ext in extensions {
                self.extension_map.insert((*ext).to_string(), category);
            }
        }
    }

    /// Adds an extension to a category.
    ///
    /// Re-adding an extension to the category that already owns it is a no-op.
    /// `Others` never owns extensions and empty extensions are refused.
    pub fn add_extension(&mut self, ext: &str, category: Category) -> Result<(), DuplicateExtension> {
        let ext = normalize_extension(ext);
        if ext.is_empty() || category == Category::Others {
            return Err(DuplicateExtension {
                extension: ext,
                existing: Category::Others,
                requested: category,
            });
        }

        match self.extension_map.get(&ext) {
            Some(&existing) if existing != category => Err(DuplicateExtension {
                extension: ext,
                existing,
                requested: category,
            }),
            _ => {
                self.extension_map.insert(ext, category);
                Ok(())
            }
        }
    }

    /// Maps an extension to its category, `Others` when unknown or empty.
    pub fn category_for(&self, ext: &str) -> Category {
        let ext = normalize_extension(ext);
        if ext.is_empty() {
            return Category::Others;
        }
        self.extension_map
            .get(&ext)
            .copied()
            .unwrap_or(Category::Others)
    }

    /// Categorizes a file by the extension of its name.
    ///
    /// ```
    /// use downsort::file_category::{Category, CategoryTable};
    ///
    /// let table = CategoryTable::standard();
    /// assert_eq!(table.category_for_file_name("report.pdf"), Category::Documents);
    /// assert_eq!(table.category_for_file_name("notes"), Category::Others);
    /// assert_eq!(table.category_for_file_name(".bashrc"), Category::Others);
    /// ```
    pub fn category_for_file_name(&self, file_name: &str) -> Category {
        match Path::new(file_name).extension() {
            Some(ext) => self.category_for(&ext.to_string_lossy()),
            None => Category::Others,
        }
    }

    /// Returns the sorted extensions of a category.
    pub fn extensions_of(&self, category: Category) -> Vec<&str> {
        let mut extensions: Vec<&str> = self
            .extension_map
            .iter()
            .filter(|(_, c)| **c == category)
            .map(|(ext, _)| ext.as_str())
            .collect();
        extensions.sort_unstable();
        extensions
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-cases an extension and makes sure it starts with a dot.
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        String::new()
    } else if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
