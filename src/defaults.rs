//! Path-derived and configured defaults for canonical records.
//!
//! Runs after [`crate::normalize`] and before schema validation. Every
//! rule here is additive: a value the document supplied is never
//! overwritten. Two sources feed in:
//!
//! * the `[item_defaults]` table from the site config, and
//! * the record's location in the archive, which determines the default
//!   category and slug.

use serde_json::Value;
use std::path::Path;
use tracing::warn;

use crate::archetype::{Archetype, Attribution, Category, Link};
use crate::config::Config;
use crate::dates;

/// Fill in everything the document left unspecified.
///
/// `record_path` is where the record will live under `root`; the
/// relative directory becomes the default category and the file stem the
/// default slug.
pub fn apply_defaults(archetype: &mut Archetype, record_path: &Path, root: &Path, config: &Config) {
    let zone = config.zone().ok();
    for (key, value) in &config.item_defaults {
        apply_item_default(archetype, key, value, zone);
    }

    let item = &mut archetype.item;

    // Configured date defaults join the same fallback as authored ones.
    item.published = item.published.or(item.updated);
    item.updated = item.updated.or(item.published);

    if item.category.is_none() {
        let label = derive_label(record_path, root);
        item.category = Some(Category {
            name: Some(title_case(&label.replace('-', " "))),
            label: Some(label),
            extra: Default::default(),
        });
    }

    if item.slug.is_none() {
        item.slug = record_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    if item.wq_output.is_none() {
        item.wq_output = Some(vec!["html".to_string()]);
    }
    let attributions = item.attributions.get_or_insert_with(Vec::new);
    item.links.get_or_insert_with(Vec::new);

    if item.copyright_holder.is_none() {
        item.copyright_holder = attributions.iter().find(|a| a.role == "author").cloned();
        if item.copyright_holder.is_none() {
            warn!(
                path = %record_path.display(),
                "no author attribution, cannot determine copyright holder"
            );
        }
    }
    if item.copyright.is_none() {
        if let (Some(updated), Some(holder)) = (&item.updated, &item.copyright_holder) {
            item.copyright = Some(format!(
                "©{} {}",
                chrono::Datelike::year(updated),
                holder.name
            ));
        }
    }
}

/// Apply one configured default. Every typed `Item` field sets only when
/// still empty; a key naming none of them lands in the passthrough map.
/// Date values go through the same lenient parser as authored ones.
fn apply_item_default(
    archetype: &mut Archetype,
    key: &str,
    value: &Value,
    zone: Option<chrono_tz::Tz>,
) {
    let item = &mut archetype.item;
    match key {
        "itemtype" => {
            if let Some(s) = value.as_str() {
                if item.itemtype == crate::archetype::BASE_ITEMTYPE {
                    item.itemtype = s.to_string();
                }
            }
        }
        "contenttype" => {
            if let Some(s) = value.as_str() {
                if item.contenttype == crate::archetype::CONTENT_TYPE_HTML {
                    item.contenttype = s.to_string();
                }
            }
        }
        "guid" => {
            if item.guid.is_none() {
                item.guid = value.as_str().map(str::to_string);
            }
        }
        "title" => {
            if item.title.is_none() {
                item.title = value.as_str().map(str::to_string);
            }
        }
        "slug" => {
            if item.slug.is_none() {
                item.slug = value.as_str().map(str::to_string);
            }
        }
        "created" | "published" | "updated" => {
            let slot = match key {
                "created" => &mut item.created,
                "published" => &mut item.published,
                _ => &mut item.updated,
            };
            if slot.is_none() {
                if let (Some(raw), Some(zone)) = (value.as_str(), zone) {
                    match dates::parse_lenient(raw, zone) {
                        Ok(parsed) => *slot = Some(parsed),
                        Err(e) => {
                            warn!(key, value = raw, error = %e, "unparseable date default, ignored")
                        }
                    }
                }
            }
        }
        "category" => {
            if item.category.is_none() {
                if let Ok(parsed) = serde_json::from_value::<Category>(value.clone()) {
                    item.category = Some(parsed);
                }
            }
        }
        "author" => {
            if item.attributions.is_none() {
                if let Some(name) = value.as_str() {
                    item.attributions = Some(vec![Attribution {
                        role: "author".to_string(),
                        name: name.to_string(),
                    }]);
                }
            }
        }
        "attributions" => {
            if item.attributions.is_none() {
                if let Ok(parsed) = serde_json::from_value::<Vec<Attribution>>(value.clone()) {
                    item.attributions = Some(parsed);
                }
            }
        }
        "links" => {
            if item.links.is_none() {
                if let Ok(parsed) = serde_json::from_value::<Vec<Link>>(value.clone()) {
                    item.links = Some(parsed);
                }
            }
        }
        "wq_output" => {
            if item.wq_output.is_none() {
                let formats: Option<Vec<String>> = value.as_array().map(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                });
                item.wq_output = formats;
            }
        }
        "copyright_holder" => {
            if item.copyright_holder.is_none() {
                if let Ok(parsed) = serde_json::from_value::<Attribution>(value.clone()) {
                    item.copyright_holder = Some(parsed);
                }
            }
        }
        "copyright" => {
            if item.copyright.is_none() {
                item.copyright = value.as_str().map(str::to_string);
            }
        }
        _ => {
            item.extra.entry(key.to_string()).or_insert_with(|| value.clone());
        }
    }
}

/// The record's directory relative to the archive root, as a
/// `/`-delimited label. Records at the root get the empty label.
fn derive_label(record_path: &Path, root: &Path) -> String {
    let parent = record_path.parent().unwrap_or(Path::new(""));
    let relative = parent.strip_prefix(root).unwrap_or(parent);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Uppercase the first letter of each word, lowercase the rest, word
/// boundaries at any non-alphabetic character.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use std::path::PathBuf;

    fn minimal_archetype() -> Archetype {
        let doc = "Title: Hi\nAuthor: V. Author\nPublished: 2016-09-28T12:00:00\n\nBody\n";
        normalize(doc, &Config::default()).unwrap()
    }

    fn resolved(doc: &str, config: &Config) -> Archetype {
        let mut archetype = normalize(doc, config).unwrap();
        let root = PathBuf::from("/b");
        apply_defaults(&mut archetype, &root.join("a.json"), &root, config);
        archetype
    }

    // =========================================================================
    // Path-derived defaults
    // =========================================================================

    #[test]
    fn category_derived_from_directory() {
        let mut archetype = minimal_archetype();
        let root = PathBuf::from("/site/build");
        let path = root.join("field-notes/rust/first-post.json");
        apply_defaults(&mut archetype, &path, &root, &Config::default());
        let category = archetype.item.category.unwrap();
        assert_eq!(category.label.as_deref(), Some("field-notes/rust"));
        assert_eq!(category.name.as_deref(), Some("Field Notes/Rust"));
    }

    #[test]
    fn root_level_record_gets_empty_category() {
        let mut archetype = minimal_archetype();
        let root = PathBuf::from("/site/build");
        let path = root.join("index.json");
        apply_defaults(&mut archetype, &path, &root, &Config::default());
        let category = archetype.item.category.unwrap();
        assert_eq!(category.label.as_deref(), Some(""));
        assert_eq!(category.name.as_deref(), Some(""));
    }

    #[test]
    fn slug_defaults_to_file_stem() {
        let mut archetype = minimal_archetype();
        let root = PathBuf::from("/site/build");
        let path = root.join("notes/first-post.json");
        apply_defaults(&mut archetype, &path, &root, &Config::default());
        assert_eq!(archetype.item.slug.as_deref(), Some("first-post"));
    }

    #[test]
    fn authored_category_is_left_whole() {
        let doc = "Title: Hi\nCategory: Essays\n\nBody\n";
        let archetype = resolved(doc, &Config::default());
        let category = archetype.item.category.unwrap();
        assert_eq!(category.name.as_deref(), Some("Essays"));
        // A partial category from the author stays exactly as written.
        assert_eq!(category.label, None);
    }

    // =========================================================================
    // Copyright
    // =========================================================================

    #[test]
    fn copyright_from_year_and_author() {
        let mut archetype = minimal_archetype();
        let root = PathBuf::from("/b");
        apply_defaults(&mut archetype, &root.join("a.json"), &root, &Config::default());
        assert_eq!(archetype.item.copyright.as_deref(), Some("©2016 V. Author"));
        assert_eq!(
            archetype.item.copyright_holder.as_ref().map(|h| h.name.as_str()),
            Some("V. Author")
        );
    }

    #[test]
    fn copyright_skipped_without_author() {
        let doc = "Title: Hi\nPublished: 2016-09-28T12:00:00\n\nBody\n";
        let archetype = resolved(doc, &Config::default());
        assert!(archetype.item.copyright.is_none());
        assert!(archetype.item.copyright_holder.is_none());
    }

    // =========================================================================
    // Configured item defaults
    // =========================================================================

    #[test]
    fn item_defaults_fill_gaps_only() {
        let mut config = Config::default();
        config
            .item_defaults
            .insert("copyright".to_string(), serde_json::json!("©site"));
        config
            .item_defaults
            .insert("banner".to_string(), serde_json::json!("default.png"));

        let doc = "Title: Hi\nCopyright: ©mine\n\nBody\n";
        let archetype = resolved(doc, &config);
        assert_eq!(archetype.item.copyright.as_deref(), Some("©mine"));
        assert_eq!(archetype.item.extra["banner"], "default.png");
    }

    #[test]
    fn configured_slug_never_overwrites_authored() {
        let mut config = Config::default();
        config
            .item_defaults
            .insert("slug".to_string(), serde_json::json!("default-slug"));

        let doc = "Title: Hi\nSlug: mine\nPublished: 2023-06-01\n\nBody\n";
        let archetype = resolved(doc, &config);
        assert_eq!(archetype.item.slug.as_deref(), Some("mine"));
        // The serialized record carries exactly one slug, the author's.
        let value = archetype.to_value().unwrap();
        assert_eq!(value["Item"]["slug"], "mine");
    }

    #[test]
    fn configured_slug_fills_absent() {
        let mut config = Config::default();
        config
            .item_defaults
            .insert("slug".to_string(), serde_json::json!("default-slug"));

        let doc = "Title: Hi\n\nBody\n";
        let archetype = resolved(doc, &config);
        assert_eq!(archetype.item.slug.as_deref(), Some("default-slug"));
    }

    #[test]
    fn configured_date_defaults_parse_leniently() {
        let mut config = Config::default();
        config
            .item_defaults
            .insert("published".to_string(), serde_json::json!("2024-01-01"));

        let doc = "Title: Hi\n\nBody\n";
        let archetype = resolved(doc, &config);
        let published = archetype.item.published.unwrap();
        assert_eq!(dates::format_iso(&published), "2024-01-01T00:00:00Z");
        // Mutual fallback applies to configured dates too.
        assert_eq!(archetype.item.updated, Some(published));
    }

    #[test]
    fn configured_date_default_keeps_authored_value() {
        let mut config = Config::default();
        config
            .item_defaults
            .insert("published".to_string(), serde_json::json!("2024-01-01"));

        let doc = "Title: Hi\nPublished: 2023-06-01\n\nBody\n";
        let archetype = resolved(doc, &config);
        let value = archetype.to_value().unwrap();
        assert_eq!(value["Item"]["published"], "2023-06-01T00:00:00Z");
    }

    #[test]
    fn configured_author_expands_to_attribution() {
        let mut config = Config::default();
        config
            .item_defaults
            .insert("author".to_string(), serde_json::json!("Site Author"));

        let doc = "Title: Hi\nPublished: 2023-06-01\n\nBody\n";
        let archetype = resolved(doc, &config);
        let attributions = archetype.item.attributions.unwrap();
        assert_eq!(attributions[0].role, "author");
        assert_eq!(attributions[0].name, "Site Author");
        assert_eq!(archetype.item.copyright.as_deref(), Some("©2023 Site Author"));
    }

    #[test]
    fn empty_collections_are_materialized() {
        let doc = "Title: Hi\n\nBody\n";
        let archetype = resolved(doc, &Config::default());
        assert_eq!(archetype.item.attributions, Some(Vec::new()));
        assert_eq!(archetype.item.links, Some(Vec::new()));
        assert_eq!(archetype.item.wq_output, Some(vec!["html".to_string()]));
    }
}
