pub mod commands;
pub mod listing;
pub mod options;
pub mod output;

pub use commands::*;
pub use listing::*;
pub use options::*;
pub use output::*;
