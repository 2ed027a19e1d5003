//! # Quillgen
//!
//! An incremental static site generator for writers. Your filesystem is
//! the database: markdown documents with a metadata block become
//! canonical JSON records, records aggregate into a catalog, and
//! templates turn both into published pages. Nothing rebuilds unless its
//! input changed.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! Every build runs four stages in order, each materializing fully on
//! disk before the next begins:
//!
//! ```text
//! 1. Sync       content/   →  build/*.md       (authoring dir → archive)
//! 2. Normalize  *.md       →  *.json           (documents → canonical records)
//! 3. Index      *.json     →  _index.json      (records → site catalog)
//! 4. Render     *.json     →  *.html, *.rss…   (records → one file per format)
//! ```
//!
//! This separation exists for three reasons:
//!
//! - **Debuggability**: every intermediate artifact is a file you can
//!   open — the record for a page sits right next to its source.
//! - **Incremental builds**: each stage compares modification times and
//!   only touches what is stale.
//! - **Resilience**: one malformed document is logged and skipped; it
//!   never takes the rest of the site down with it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `quillgen.toml` loading, validation, and defaults |
//! | [`dates`] | Lenient timestamp parsing, timezone reconciliation, canonical ISO-8601 form |
//! | [`archetype`] | The canonical record: `Item` metadata plus one payload section |
//! | [`normalize`] | Stage 2 — metadata block parsing, markdown conversion, field transforms |
//! | [`defaults`] | Path-derived and configured defaults applied before validation |
//! | [`schema`] | JSON Schema gate every record passes before persistence |
//! | [`index`] | Stage 3 — the guid-keyed site catalog and its tolerant aggregation |
//! | [`templates`] | Specificity-ordered template resolution and MiniJinja rendering |
//! | [`archivist`] | Archive layout, mtime staleness arithmetic, pending-work queries |
//! | [`build`] | Stage orchestration, per-document error containment, the build report |
//! | [`scaffold`] | Starter documents for `quill new` |
//!
//! # Design Decisions
//!
//! ## Records Are Plain JSON
//!
//! The canonical record is an ordinary JSON object, schema-checked at the
//! door and duck-typed afterwards. Indexing and rendering read fields
//! they need and ignore the rest, so a site can carry arbitrary custom
//! metadata through the pipeline without code changes.
//!
//! ## Timestamps Are Normalized Once
//!
//! Authors write dates however they like (`28 Sept 2016`, RFC 3339, bare
//! dates); normalization resolves them against the site timezone and
//! stores one canonical ISO-8601 form. Everything downstream compares
//! strings that all mean what they say.
//!
//! ## Templates Resolve by Specificity
//!
//! An itemtype is a path (`Item/Page/Article`), and template lookup walks
//! it from most to least specific. A site ships one `Item.html.j2` and
//! specializes only the types that need it.

pub mod archetype;
pub mod archivist;
pub mod build;
pub mod config;
pub mod dates;
pub mod defaults;
pub mod index;
pub mod normalize;
pub mod scaffold;
pub mod schema;
pub mod templates;
