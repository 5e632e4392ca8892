pub mod brackets;
pub mod placeholder;
pub mod reconstruct;
pub mod review;
pub mod symbols;

pub use brackets::bracket_balance;
pub use placeholder::{scan_placeholders, tag_histogram};
pub use reconstruct::{LiteralReverse, Reconstructor};
pub use review::{line_count, review};
pub use symbols::LanguageFamily;
