mod clean;
mod generate;
mod list;

pub use clean::cmd_clean;
pub use generate::{GenerateArgs, cmd_generate};
pub use list::cmd_list;
