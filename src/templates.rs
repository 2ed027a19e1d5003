//! Template resolution and rendering.
//!
//! Templates are looked up by specificity. An itemtype is a slash path
//! (`Item/Page/Article`); for each output format the candidate chain
//! walks from the full path down to the root:
//!
//! ```text
//! Item_Page_Article.html.j2
//! Item_Page.html.j2
//! Item.html.j2
//! ```
//!
//! The first candidate that exists wins, so a site can provide one
//! generic `Item.html.j2` and specialize only where it matters. Formats
//! other than `html` resolve only through an explicit template binding
//! in the config; a format with no binding is skipped. The derived html
//! chain is never overridden.

use minijinja::{path_loader, Environment, ErrorKind};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::TemplatesConfig;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no template found, tried: {candidates:?}")]
    MissingTemplate { candidates: Vec<String> },
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Candidate template names for one itemtype and format, most specific
/// first.
pub fn candidate_chain(itemtype: &str, format: &str) -> Vec<String> {
    let segments: Vec<&str> = itemtype.split('/').filter(|s| !s.is_empty()).collect();
    (1..=segments.len())
        .rev()
        .map(|n| format!("{}.{format}.j2", segments[..n].join("_")))
        .collect()
}

/// Maps output formats to their candidate template chains.
pub struct TemplateResolver {
    bindings: BTreeMap<String, Vec<String>>,
}

impl TemplateResolver {
    pub fn new(config: &TemplatesConfig) -> Self {
        TemplateResolver {
            bindings: config.formats.clone(),
        }
    }

    /// Candidate chains for every requested format. `html` always uses
    /// the chain derived from the itemtype; other formats participate
    /// only through a configured binding, and a request with none is
    /// logged and dropped from the resolution.
    pub fn resolve(&self, itemtype: &str, formats: &[String]) -> BTreeMap<String, Vec<String>> {
        let mut resolved = BTreeMap::new();
        for format in formats {
            if format == "html" {
                resolved.insert(format.clone(), candidate_chain(itemtype, format));
            } else if let Some(bound) = self.bindings.get(format) {
                resolved.insert(format.clone(), bound.clone());
            } else {
                warn!(
                    format = format.as_str(),
                    itemtype, "format has no template binding, skipping"
                );
            }
        }
        resolved
    }
}

/// Renders records through templates loaded from the template directory.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new(template_dir: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(template_dir));
        Renderer { env }
    }

    /// Render with the first candidate that exists. A candidate that
    /// exists but fails to parse or render is a hard error, not a reason
    /// to fall through.
    pub fn render_first(&self, candidates: &[String], context: &Value) -> Result<String, RenderError> {
        for name in candidates {
            match self.env.get_template(name) {
                Ok(template) => {
                    debug!(template = name.as_str(), "rendering");
                    return Ok(template.render(context)?);
                }
                Err(e) if e.kind() == ErrorKind::TemplateNotFound => continue,
                Err(e) => return Err(RenderError::Template(e)),
            }
        }
        Err(RenderError::MissingTemplate {
            candidates: candidates.to_vec(),
        })
    }
}
