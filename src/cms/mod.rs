//! Strapi CMS access.
//!
//! - `query`: bracket-notation query builder
//! - `client`: REST client (content, auth, updates)
//! - `types`: content types as returned by the CMS

mod client;
mod query;
pub mod types;

pub use client::{CmsError, CmsResult, StrapiClient};
pub use query::{FilterOp, SortDir, Status, StrapiQuery};
