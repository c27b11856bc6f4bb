//! Read-only predicates over captured output.
//!
//! Each predicate returns `Ok` or a [`VerifyError`](crate::error::VerifyError)
//! that embeds the output it inspected. The same functions serve CLI output,
//! produced files and HTTP response bodies, whichever backend produced them.

pub mod files;
pub mod http;
pub mod json;
pub mod outcome;
pub mod similarity;
pub mod table;
pub mod text;

pub use similarity::{assert_approximate, best_match, edit_distance, similarity};
pub use table::{CsvSchema, CsvTable};
