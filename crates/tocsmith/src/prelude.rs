pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, OptionExt, Result};
pub use std::format as f;

/// Borderless table used for status summaries.
pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();
    table.set_format(prettytable::format::FormatBuilder::new().padding(0, 2).build());
    table
}
