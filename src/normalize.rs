//! Document-to-record normalization.
//!
//! Converts one authored markdown document into an [`Archetype`]:
//!
//! 1. Split off the leading metadata block (`Key: value` lines, ended by
//!    a blank line). A document without one is malformed.
//! 2. Parse the block as a flat, case-insensitive key/value map.
//!    Continuation lines (indented four spaces) append additional values;
//!    a one-element value list unwraps back to a scalar.
//! 3. Convert the body to HTML with the configured extension set.
//! 4. Normalize the sloppy parts: lenient date parsing with timezone
//!    reconciliation, the legacy `date` key renamed to `published`,
//!    `itemtype` capitalized per path segment, `author` expanded to an
//!    attributions list, `license` expanded to a links entry.
//! 5. Apply the mutual `published`/`updated` fallback — after this step
//!    either both are set or neither is (and schema validation will
//!    reject the record downstream).
//! 6. Select the payload section (`Article`/`Page`/`Catalog`) from the
//!    normalized itemtype.
//!
//! Everything here is per-document and pure: no filesystem access, no
//! shared state. Defaults that depend on the source path are applied
//! separately by [`crate::defaults`].

use pulldown_cmark::{html, Options, Parser};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::archetype::{
    Archetype, ArticleSection, Attribution, Category, Item, ItemKind, Link, PageSection,
};
use crate::config::{Config, ConfigError};
use crate::dates::{self, DateError};

#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The document has no parseable metadata block.
    #[error("document has no metadata block")]
    MissingMetadata,
    #[error("unrecognized value for {key:?}: {source}")]
    Date {
        key: String,
        #[source]
        source: DateError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Parse a raw authored document into a canonical record.
pub fn normalize(raw: &str, config: &Config) -> Result<Archetype, NormalizeError> {
    let zone = config.zone()?;
    let (metadata, body) = split_metadata(raw).ok_or(NormalizeError::MissingMetadata)?;
    let html_body = markdown_to_html(body, &config.markdown.extensions);

    let mut item = Item::default();
    for (key, values) in &metadata {
        // Permissive block parsing reads everything as a list; most
        // values are scalars.
        let value = values.first().map(String::as_str).unwrap_or("").to_string();
        match key.as_str() {
            "created" | "date" | "published" | "updated" => {
                let parsed =
                    dates::parse_lenient(&value, zone).map_err(|source| NormalizeError::Date {
                        key: key.clone(),
                        source,
                    })?;
                match key.as_str() {
                    "created" => item.created = Some(parsed),
                    // Legacy DC.date becomes the specific `published`.
                    "date" | "published" => item.published = Some(parsed),
                    _ => item.updated = Some(parsed),
                }
            }
            "itemtype" => item.itemtype = capitalize_path(&value),
            "author" => {
                item.attributions = Some(vec![Attribution {
                    role: "author".to_string(),
                    name: value,
                }]);
            }
            "license" => {
                item.links.get_or_insert_with(Vec::new).push(Link {
                    href: value,
                    rel: "license".to_string(),
                });
            }
            "guid" => item.guid = Some(value),
            "title" => item.title = Some(value),
            "slug" => item.slug = Some(value),
            "contenttype" => item.contenttype = value,
            "copyright" => item.copyright = Some(value),
            "wq_output" => {
                let formats: Vec<String> = value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                item.wq_output = Some(formats);
            }
            "category" => {
                item.category.get_or_insert_with(Category::default).name = Some(value);
            }
            _ => {
                if let Some(sub) = key.strip_prefix("category-") {
                    let category = item.category.get_or_insert_with(Category::default);
                    match sub {
                        "name" => category.name = Some(value),
                        "label" => category.label = Some(value),
                        _ => {
                            category.extra.insert(sub.to_string(), Value::String(value));
                        }
                    }
                } else if values.len() == 1 {
                    item.extra.insert(key.clone(), Value::String(value));
                } else {
                    let list = values.iter().cloned().map(Value::String).collect();
                    item.extra.insert(key.clone(), Value::Array(list));
                }
            }
        }
    }

    // Mutual fallback: each defaults to the other when only one was
    // supplied. If neither was, neither is set and validation fails
    // downstream.
    item.published = item.published.or(item.updated);
    item.updated = item.updated.or(item.published);

    let kind = ItemKind::from_itemtype(&item.itemtype);
    let mut archetype = Archetype {
        item,
        article: None,
        page: None,
        catalog: None,
    };
    match kind {
        ItemKind::Article => {
            archetype.article = Some(ArticleSection { body: html_body });
        }
        ItemKind::Catalog => {
            let mut section = BTreeMap::new();
            section.insert("text".to_string(), Value::String(html_body));
            archetype.catalog = Some(section);
        }
        ItemKind::Page => {
            archetype.page = Some(PageSection { text: html_body });
        }
    }
    Ok(archetype)
}

/// Split a document into its metadata block and body.
///
/// The block is a run of `Key: value` lines starting at the first line,
/// terminated by a blank line or any non-matching line. Keys are
/// `[A-Za-z0-9_-]+`, lowercased. Lines indented four spaces continue the
/// previous key with an additional value. Returns `None` when the
/// document doesn't start with a metadata line.
fn split_metadata(raw: &str) -> Option<(BTreeMap<String, Vec<String>>, &str)> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut meta: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut body_start = raw.len();

    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            // Blank line closes the block; body starts after it.
            body_start = offset + line.len();
            break;
        }
        if let Some((key, value)) = parse_meta_line(trimmed) {
            meta.entry(key.clone()).or_default().push(value);
            current = Some(key);
        } else if let Some(extra) = parse_continuation(trimmed, current.as_deref()) {
            let key = current.clone().unwrap_or_default();
            meta.entry(key).or_default().push(extra);
        } else {
            // Not a metadata line: block over, this line belongs to the body.
            body_start = offset;
            break;
        }
        offset += line.len();
    }

    if meta.is_empty() {
        return None;
    }
    Some((meta, &raw[body_start.min(raw.len())..]))
}

fn parse_meta_line(line: &str) -> Option<(String, String)> {
    let colon = line.find(':')?;
    let key = &line[..colon];
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some((key.to_ascii_lowercase(), line[colon + 1..].trim().to_string()))
}

fn parse_continuation(line: &str, current: Option<&str>) -> Option<String> {
    current?;
    let stripped = line.strip_prefix("    ")?;
    Some(stripped.trim().to_string())
}

/// Capitalize each `/`-delimited segment of a type path:
/// `item/page/article` → `Item/Page/Article`.
fn capitalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert markdown to HTML with the configured extension set.
fn markdown_to_html(body: &str, extensions: &[String]) -> String {
    let mut options = Options::empty();
    for extension in extensions {
        match extension.as_str() {
            "tables" => options.insert(Options::ENABLE_TABLES),
            "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
            "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
            "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
            "smart-punctuation" => options.insert(Options::ENABLE_SMART_PUNCTUATION),
            "heading-attributes" => options.insert(Options::ENABLE_HEADING_ATTRIBUTES),
            other => warn!(extension = other, "unknown markdown extension, skipping"),
        }
    }
    let parser = Parser::new_ext(body, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}
