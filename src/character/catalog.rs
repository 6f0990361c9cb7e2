//! The character catalog: a name → descriptor table loaded once at startup.
//!
//! The source is a flat JSON object whose keys are display names and whose
//! values are free-form persona descriptors:
//!
//! ```json
//! {
//!   "Sherlock Holmes": "the brilliant consulting detective of 221B Baker Street",
//!   "Ada Lovelace": "the first computer programmer"
//! }
//! ```
//!
//! Entries keep file order. Anything other than a non-empty object of
//! string → string pairs is a load error; there is no fallback character.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::debug;

/// File name looked up in the working directory when nothing else is configured.
pub const DEFAULT_CATALOG_FILE: &str = "character-details.json";

/// Errors that can occur while loading the character catalog.
#[derive(Debug)]
pub enum CatalogLoadError {
    /// The catalog file could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The content is not a flat object of string pairs.
    Parse {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },

    /// The object parsed but contained no characters.
    Empty { path: Option<PathBuf> },
}

impl fmt::Display for CatalogLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogLoadError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            CatalogLoadError::Parse {
                path: Some(path),
                source,
            } => write!(f, "Invalid character file {}: {}", path.display(), source),
            CatalogLoadError::Parse { path: None, source } => {
                write!(f, "Invalid character data: {source}")
            }
            CatalogLoadError::Empty { path: Some(path) } => {
                write!(f, "Character file {} defines no characters", path.display())
            }
            CatalogLoadError::Empty { path: None } => {
                write!(f, "Character data defines no characters")
            }
        }
    }
}

impl std::error::Error for CatalogLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogLoadError::Read { source, .. } => Some(source),
            CatalogLoadError::Parse { source, .. } => Some(source),
            CatalogLoadError::Empty { .. } => None,
        }
    }
}

/// Raised when a character name is not part of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCharacterError {
    pub name: String,
}

impl fmt::Display for UnknownCharacterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown character '{}'", self.name)
    }
}

impl std::error::Error for UnknownCharacterError {}

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterEntry {
    pub name: String,
    pub descriptor: String,
}

/// Ordered, immutable set of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterCatalog {
    entries: Vec<CharacterEntry>,
}

impl CharacterCatalog {
    /// Loads the catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| CatalogLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::parse(&contents, Some(path))?;
        debug!(
            path = %path.display(),
            characters = catalog.len(),
            "Loaded character catalog"
        );
        Ok(catalog)
    }

    /// Parses catalog JSON that did not come from a file.
    pub fn from_json_str(contents: &str) -> Result<Self, CatalogLoadError> {
        Self::parse(contents, None)
    }

    fn parse(contents: &str, path: Option<&Path>) -> Result<Self, CatalogLoadError> {
        let catalog: CharacterCatalog =
            serde_json::from_str(contents).map_err(|source| CatalogLoadError::Parse {
                path: path.map(Path::to_path_buf),
                source,
            })?;

        if catalog.is_empty() {
            return Err(CatalogLoadError::Empty {
                path: path.map(Path::to_path_buf),
            });
        }
        Ok(catalog)
    }

    /// Character names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn entries(&self) -> &[CharacterEntry] {
        &self.entries
    }

    pub fn descriptor(&self, name: &str) -> Result<&str, UnknownCharacterError> {
        self.position(name)
            .map(|index| self.entries[index].descriptor.as_str())
            .ok_or_else(|| UnknownCharacterError {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(|entry| entry.name.as_str())
    }

    /// The name after (or before) `name`, wrapping around the ends.
    pub fn neighbor(&self, name: &str, forward: bool) -> Option<&str> {
        let index = self.position(name)?;
        let len = self.entries.len();
        let next = if forward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        };
        Some(self.entries[next].name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}

impl<'de> Deserialize<'de> for CharacterCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = CharacterCatalog;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping character names to descriptions")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut seen = HashSet::new();
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, descriptor)) = map.next_entry::<String, String>()? {
                    if !seen.insert(name.clone()) {
                        return Err(de::Error::custom(format!(
                            "duplicate character name '{name}'"
                        )));
                    }
                    entries.push(CharacterEntry { name, descriptor });
                }
                Ok(CharacterCatalog { entries })
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}
