//! Page loading and querying for vanbuilder.
//!
//! This crate provides:
//! - [`PageHandle`]: read-only CSS-selector queries over a loaded page
//! - [`PageLoader`] / [`HttpPageLoader`]: fetch a URL into an [`HtmlPage`]
//! - [`find_contact_page`]: the contact sub-page fallback
//! - [`discover_gallery_links`]: same-site gallery pages for photo top-up

pub mod links;
pub mod loader;
pub mod page;

pub use links::{discover_gallery_links, extract_links};
pub use loader::{CONTACT_PATHS, HttpPageLoader, PageLoader, is_ssrf_target, find_contact_page};
pub use page::{HtmlPage, PageHandle, PageNode};
