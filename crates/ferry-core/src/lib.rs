pub mod backend;
pub mod config;
pub mod credential;
pub mod error;
pub mod locator;
pub mod logging;
pub mod manifest;
pub mod scratch;
pub mod transfer;

pub use error::{TransferError, TransferResult};
pub use locator::{IntoLocator, LocalLocator, Locator, LocatorKind, ObjectStoreLocator};
pub use scratch::{ScratchSpace, Scope, WorkerId};
pub use transfer::Transfer;
