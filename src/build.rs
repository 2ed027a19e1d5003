//! The build pipeline.
//!
//! Four phases run in order, each materializing fully before the next:
//!
//! | Phase     | Input                | Output                        |
//! |-----------|----------------------|-------------------------------|
//! | sync      | authoring dir        | sources copied into archive   |
//! | normalize | stale `.md` sources  | canonical `.json` records     |
//! | index     | stale records        | updated `_index.json` catalog |
//! | render    | stale records, index | one output file per format    |
//!
//! Per-document failures (unparseable metadata, bad dates, schema
//! violations, missing templates) are logged and skipped so one broken
//! document never blocks the rest of the site. Filesystem errors abort
//! the build.

use rayon::prelude::*;
use serde_json::Value;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::archetype::ItemKind;
use crate::archivist::{is_stale, Archivist};
use crate::config::{Config, ConfigError};
use crate::defaults::apply_defaults;
use crate::index::{add_to_index, Catalog};
use crate::normalize::normalize;
use crate::schema::{SchemaError, SchemaValidator};
use crate::templates::{RenderError, Renderer, TemplateResolver};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a build run did, phase by phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildReport {
    /// Source files copied into the archive.
    pub copied: usize,
    /// Records produced from stale sources.
    pub normalized: usize,
    /// Documents skipped for per-file errors.
    pub failed: usize,
    /// Records merged into the catalog.
    pub indexed: usize,
    /// Output files written.
    pub rendered: usize,
    /// Outputs skipped because they were fresh or had no template.
    pub skipped: usize,
}

impl std::fmt::Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} synced, {} normalized ({} failed), {} indexed, {} rendered ({} skipped)",
            self.copied, self.normalized, self.failed, self.indexed, self.rendered, self.skipped
        )
    }
}

/// Run the full pipeline: sync, normalize, index, render.
pub fn build(config: &Config, include_future: bool) -> Result<BuildReport, BuildError> {
    config.validate()?;
    let archivist = Archivist::new(config);
    let validator = SchemaValidator::from_config(config)?;
    let mut report = BuildReport::default();

    info!("==> Syncing sources");
    std::fs::create_dir_all(&archivist.root)?;
    std::fs::create_dir_all(&archivist.source)?;
    report.copied = archivist.gather_sources()?;

    info!("==> Normalizing documents");
    let pending = archivist.sources_needing_update()?;
    let outcomes: Result<Vec<bool>, BuildError> = pending
        .par_iter()
        .map(|source| normalize_one(source, &archivist, &validator, config))
        .collect();
    for written in outcomes? {
        if written {
            report.normalized += 1;
        } else {
            report.failed += 1;
        }
    }

    info!("==> Indexing records");
    let to_index = archivist.records_needing_indexing()?;
    if !to_index.is_empty() {
        let records: Vec<Value> = to_index
            .iter()
            .filter_map(|path| archivist.load_json(path))
            .collect();
        let mut catalog = Catalog::load(&archivist.index_path());
        report.indexed = add_to_index(&mut catalog, &records, include_future);
        archivist.write_json(&archivist.index_path(), &serde_json::to_value(&catalog)?)?;
    }

    info!("==> Rendering outputs");
    let renderer = Renderer::new(&config.templates.dir);
    let resolver = TemplateResolver::new(&config.templates);
    let site = serde_json::to_value(&config.site)?;
    let records = archivist.record_paths()?;
    let outcomes: Result<Vec<(usize, usize)>, BuildError> = records
        .par_iter()
        .map(|path| render_one(path, &archivist, &renderer, &resolver, &site))
        .collect();
    for (rendered, skipped) in outcomes? {
        report.rendered += rendered;
        report.skipped += skipped;
    }

    Ok(report)
}

/// Normalize one source into its record. Returns `Ok(false)` for
/// per-document failures, which are logged here and never abort.
fn normalize_one(
    source: &Path,
    archivist: &Archivist,
    validator: &SchemaValidator,
    config: &Config,
) -> Result<bool, BuildError> {
    let raw = std::fs::read_to_string(source)?;
    let record_path = source.with_extension("json");
    let mut archetype = match normalize(&raw, config) {
        Ok(archetype) => archetype,
        Err(e) => {
            warn!(path = %source.display(), error = %e, "cannot normalize, skipping");
            return Ok(false);
        }
    };
    apply_defaults(&mut archetype, &record_path, &archivist.root, config);
    let value = archetype.to_value()?;
    if let Err(e) = validator.validate(&value) {
        warn!(path = %source.display(), error = %e, "record fails validation, skipping");
        return Ok(false);
    }
    archivist.write_json(&record_path, &value)?;
    Ok(true)
}

/// Render every stale output for one record. Returns (rendered, skipped).
fn render_one(
    record_path: &Path,
    archivist: &Archivist,
    renderer: &Renderer,
    resolver: &TemplateResolver,
    site: &Value,
) -> Result<(usize, usize), BuildError> {
    let record = match archivist.load_json(record_path) {
        Some(record) if record.is_object() => record,
        Some(_) => {
            warn!(path = %record_path.display(), "record is not an object, skipping");
            return Ok((0, 1));
        }
        None => return Ok((0, 1)),
    };
    let item = &record["Item"];
    let itemtype = item["itemtype"]
        .as_str()
        .unwrap_or(crate::archetype::BASE_ITEMTYPE)
        .to_string();
    let formats: Vec<String> = match item["wq_output"].as_array() {
        Some(list) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => vec!["html".to_string()],
    };
    let kind = ItemKind::from_itemtype(&itemtype);

    let mut rendered = 0;
    let mut skipped = 0;
    let index_path = archivist.index_path();
    for (format, candidates) in resolver.resolve(&itemtype, &formats) {
        let output = record_path.with_extension(&format);
        let mut stale = is_stale(record_path, Some(&output))?;
        // Listings embed the catalog, so a fresher index re-renders them.
        if !stale && kind == ItemKind::Catalog && index_path.exists() {
            stale = is_stale(&index_path, Some(&output))?;
        }
        if !stale {
            skipped += 1;
            continue;
        }

        let mut context = record.clone();
        context["site"] = site.clone();
        if kind == ItemKind::Catalog {
            context["Index"] = serde_json::to_value(Catalog::load(&index_path))?;
        }
        match renderer.render_first(&candidates, &context) {
            Ok(output_text) => {
                std::fs::write(&output, output_text)?;
                rendered += 1;
            }
            Err(RenderError::MissingTemplate { candidates }) => {
                warn!(
                    path = %record_path.display(),
                    format = format.as_str(),
                    ?candidates,
                    "no template, skipping"
                );
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok((rendered, skipped))
}

/// Validate every source document without writing anything. Returns
/// (documents checked, documents failing).
pub fn check(config: &Config) -> Result<(usize, usize), BuildError> {
    config.validate()?;
    let validator = SchemaValidator::from_config(config)?;
    let source_root = &config.options.source;
    let mut checked = 0;
    let mut failed = 0;
    for entry in walkdir::WalkDir::new(source_root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file()
            || entry.path().extension().map(|e| e != "md").unwrap_or(true)
        {
            continue;
        }
        checked += 1;
        let raw = std::fs::read_to_string(entry.path())?;
        let mut archetype = match normalize(&raw, config) {
            Ok(archetype) => archetype,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "cannot normalize");
                failed += 1;
                continue;
            }
        };
        let record_path = entry.path().with_extension("json");
        apply_defaults(&mut archetype, &record_path, source_root, config);
        if let Err(e) = validator.validate(&archetype.to_value()?) {
            warn!(path = %entry.path().display(), error = %e, "record fails validation");
            failed += 1;
        }
    }
    Ok((checked, failed))
}
