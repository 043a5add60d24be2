// Pedantic lint configuration for the crate.
// Most of these are reasonable but too strict for this codebase:
// - cast_possible_truncation / cast_sign_loss / cast_possible_wrap: file-times and
//   sizes are stored as the bit pattern of u64 values in signed SQLite columns
// - missing_errors_doc: Error handling is self-evident from Result types
// - missing_panics_doc: Panics are rare and documented inline
// - module_name_repetitions: `AnalysisClient` in `analysis` reads better than `Client`
// - option_if_let_else: if-let is often clearer
// - needless_pass_by_value: Sometimes clearer semantically
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::needless_pass_by_value
)]

pub mod analysis;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod filetime;
pub mod live;
pub mod models;
pub mod store;
pub mod sync;
