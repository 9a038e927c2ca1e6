//! Name table synthesis for regional font builds.
//!
//! Every `(weight, region)` font gets a full set of Windows-platform name
//! records for six locales, including the legacy four-style family names
//! that older font consumers still rely on.

mod compat;
mod error;
mod font;
mod records;

pub use compat::{CompatibilityName, STANDARD_FOUR, compatibility_name};
pub use error::{NamingError, Result};
pub use font::{apply_name_records, rename_font, rewrite_font};
pub use records::{Locale, NameId, NameRecord, Naming, build_name_records};
