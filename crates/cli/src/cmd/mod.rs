mod run;
mod vscode;

pub mod resolve;

pub use resolve::cmd_resolve;
pub use run::cmd_run;
pub use vscode::cmd_vscode;
