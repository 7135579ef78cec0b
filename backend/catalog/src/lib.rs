//! # Catalog
//!
//! Domain types shared by the server and the seeding CLI.
//!
//! - [`Category`]: the eleven product collections and their naming
//! - [`Product`]: one catalog document, plus the add/update request bodies
//! - [`normalize`]: coercion of the loosely typed static feeds
//! - [`ProductQuery`]: list filtering parsed from a query string
//! - [`order`]: order requests and catalog-side pricing
//! - [`remote`]: fetching the raw feeds over HTTP
pub mod category;
pub mod normalize;
pub mod order;
pub mod product;
pub mod query;
pub mod remote;

pub use category::{Category, ReviewsKind, UnknownCategory};
pub use normalize::{NormalizeError, NormalizedFeed, SkippedRecord, normalize_feed};
pub use order::{Order, OrderError, OrderRequest};
pub use product::{NewProduct, Product, ProductPatch, Reviews, ValidationError};
pub use query::{ProductQuery, QueryError, SortOrder};
pub use remote::{FeedError, HttpFeed, ProductFeed};
