//! The archetype data model.
//!
//! An archetype is the canonical structured form of one authored document:
//! a common `Item` metadata section plus at most one typed payload section
//! (`Article`, `Page`, or `Catalog`), selected by the item's type path.
//!
//! ## Itemtype hierarchy
//!
//! `itemtype` is a slash-delimited path such as `Item/Page/Article`. The
//! path establishes a specificity hierarchy used by template resolution
//! (most specific template first). Rather than substring-matching type
//! names, the recognized payload kinds form the closed [`ItemKind`]
//! enumeration; anything unrecognized falls back to [`ItemKind::Page`].
//!
//! ## Open fields
//!
//! Authors can attach arbitrary metadata keys. Known fields are typed;
//! everything else lands in the `extra` flatten map and survives the
//! round trip through JSON unchanged. Records serialize with sorted keys
//! (objects go through `serde_json::Value`, whose map is ordered).

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::dates;

/// Content type stamped on every markdown-derived record.
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Base type for documents that declare no `itemtype`.
pub const BASE_ITEMTYPE: &str = "Item/Page";

/// Closed enumeration of payload kinds recognized from `itemtype`.
///
/// Matching is per path segment, most specific (rightmost) first, so
/// `Item/Page/Article` is an article and `Item/Catalog/HomePage` is a
/// catalog. Unrecognized paths are plain pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Article,
    Catalog,
    Page,
}

impl ItemKind {
    pub fn from_itemtype(itemtype: &str) -> Self {
        for segment in itemtype.split('/').rev() {
            match segment {
                "Article" => return ItemKind::Article,
                "Catalog" => return ItemKind::Catalog,
                _ => {}
            }
        }
        ItemKind::Page
    }
}

/// One credited contributor, e.g. `{role: "author", name: "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub role: String,
    pub name: String,
}

/// A related resource link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

/// Publication category.
///
/// `label` is a URL-safe path segment (derived from the source file's
/// directory when absent); `name` is the human-readable variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The common metadata section of every record.
///
/// Most fields are optional at this level; the schema validator decides
/// what a complete record requires. `published`/`updated` use the
/// canonical ISO form from [`crate::dates`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub itemtype: String,
    pub contenttype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        with = "dates::iso_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<FixedOffset>>,
    #[serde(
        default,
        with = "dates::iso_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub published: Option<DateTime<FixedOffset>>,
    #[serde(
        default,
        with = "dates::iso_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributions: Option<Vec<Attribution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wq_output: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_holder: Option<Attribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            guid: None,
            itemtype: BASE_ITEMTYPE.to_string(),
            contenttype: CONTENT_TYPE_HTML.to_string(),
            title: None,
            created: None,
            published: None,
            updated: None,
            category: None,
            slug: None,
            attributions: None,
            links: None,
            wq_output: None,
            copyright_holder: None,
            copyright: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Typed payload for article records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSection {
    pub body: String,
}

/// Typed payload for plain pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSection {
    pub text: String,
}

/// The canonical structured record for one authored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archetype {
    #[serde(rename = "Item")]
    pub item: Item,
    #[serde(rename = "Article", default, skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleSection>,
    #[serde(rename = "Page", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageSection>,
    #[serde(rename = "Catalog", default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<BTreeMap<String, Value>>,
}

impl Archetype {
    pub fn kind(&self) -> ItemKind {
        ItemKind::from_itemtype(&self.item.itemtype)
    }

    /// Serialize to a JSON value, sorted keys throughout.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
