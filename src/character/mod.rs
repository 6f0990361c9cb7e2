pub mod catalog;

pub use catalog::{
    CatalogLoadError, CharacterCatalog, CharacterEntry, UnknownCharacterError,
    DEFAULT_CATALOG_FILE,
};
