pub mod db;
pub mod models;
pub mod store;

pub use db::Catalog;
pub use models::{NewPhoto, Photo, PhotoId, StoredPhoto};
pub use store::{CatalogError, PhotoStore};
