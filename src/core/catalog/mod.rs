//! Card catalog: normalized card data and the snapshot-swapped index.
//!
//! Pure data layer for the preview engine. Owns [`CardRecord`] and the
//! per-theme membership lists; knows nothing about caching or scoring.

pub mod index;
pub mod types;

pub use index::{load_catalog_file, BuildDiagnostics, CardIndex, CatalogSnapshot};
pub use types::{
    normalize_colors, normalize_name, normalize_theme, pip_multiset, CardRecord, RawCardRow,
    Rarity, WUBRG,
};
