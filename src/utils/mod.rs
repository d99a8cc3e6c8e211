pub mod format;

pub use format::{city_slug, format_optional};
