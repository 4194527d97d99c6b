//! # gladtex_cache
//!
//! Persistent formula cache for GladTeX.
//!
//! Rendering a formula to an image is expensive. This crate remembers, for
//! every formula that was already rendered, where its image lives and how it
//! has to be positioned, so that later runs can skip the renderer entirely.
//!
//! ## Cache Strategy
//!
//! 1. **Normalized keys**: formulas differing only in incidental whitespace
//!    share one entry (see [`normalize_formula`])
//! 2. **Mode-aware**: display math and inline math renderings are never
//!    interchangeable
//! 3. **Self-healing**: entries whose image vanished are evicted on lookup
//!
//! ## Storage
//!
//! The cache is a single JSON object stamped with [`FORMAT_VERSION`] under
//! [`VERSION_KEY`]. A file written by an incompatible revision is either
//! reported or discarded, depending on
//! [`CacheOptions::keep_incompatible_cache`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use gladtex_cache::{FormulaCache, Position};
//!
//! let mut cache = FormulaCache::open("gladtex.cache", true)?;
//! if !cache.contains(r"\frac{1}{2}", false) {
//!     // render the formula, then:
//!     cache.add(r"\frac{1}{2}", Position::new(12.0, 8.0, 3.0), "eqn000.png", false)?;
//! }
//! cache.save()?;
//! ```

mod config;
mod entry;
mod error;
mod normalize;
mod store;

pub use config::{CacheOptions, DEFAULT_CACHE_FILE};
pub use entry::{CacheEntry, Position};
pub use error::CacheError;
pub use normalize::normalize_formula;
pub use store::{FORMAT_VERSION, FormulaCache, IMAGE_PREFIX, VERSION_KEY};
