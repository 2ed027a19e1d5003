//! Starter documents for `quill new`.
//!
//! A scaffold carries everything validation will demand later (guid,
//! timestamps, title) so a freshly created document builds cleanly
//! before the author touches it.

use chrono::Utc;
use chrono_tz::Tz;
use uuid::Uuid;

use crate::dates;

/// Canonical itemtype for a scaffold kind named on the command line.
pub fn itemtype_for(kind: &str) -> Option<&'static str> {
    match kind.to_ascii_lowercase().as_str() {
        "article" => Some("Item/Page/Article"),
        "page" => Some("Item/Page"),
        "catalog" => Some("Item/Page/Catalog"),
        _ => None,
    }
}

/// A complete starter document for the given itemtype, stamped with a
/// fresh guid and the current time in the site zone.
pub fn new_markdown(itemtype: &str, title: Option<&str>, zone: Tz) -> String {
    let title = title.unwrap_or("Untitled");
    let now = Utc::now().with_timezone(&zone).fixed_offset();
    let stamp = dates::format_iso(&now);
    format!(
        "Itemtype: {itemtype}\n\
         GUID: {guid}\n\
         Published: {stamp}\n\
         Updated: {stamp}\n\
         Title: {title}\n\
         Slug: {slug}\n\
         \n\
         Write your story here.\n",
        guid = Uuid::new_v4(),
        slug = slugify(title),
    )
}

/// Reduce a title to a URL-safe slug: lowercase, runs of anything but
/// letters and digits collapsed to single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("untitled");
    }
    slug
}
