//! URL handling module for Driftwatch
//!
//! This module provides URL normalization, host extraction and the
//! single-domain scope filter applied to every discovered link.

mod normalize;
mod scope;

pub use normalize::{normalize_absolute, normalize_url};
pub use scope::{extract_domain, in_scope, url_in_scope};
