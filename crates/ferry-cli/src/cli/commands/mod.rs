//! CLI command handlers, one file per subcommand.

mod classify;
mod local;
mod remote;
mod upload_batch;

pub use classify::run_classify;
pub use local::run_local;
pub use remote::run_remote;
pub use upload_batch::run_upload_batch;
