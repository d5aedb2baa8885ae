//! Command module
//! This module holds the subcommands that can be used from the CLI.

mod archs;
mod info;
mod macho;
pub mod stub;

pub use archs::*;
pub use info::*;
pub use macho::*;

use cli_table::{CellStruct, Table};

use fatstub_common::StdResult;

pub(crate) fn render_table(
    title: Vec<CellStruct>,
    rows: Vec<Vec<CellStruct>>,
) -> StdResult<String> {
    Ok(rows.table().title(title).display()?.to_string())
}
