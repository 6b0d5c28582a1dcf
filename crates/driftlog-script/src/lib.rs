//! JSON migration scripts for driftlog.
//!
//! Turns a script file (and everything it includes) into the ordered list of
//! change-set definitions the engine consumes. Variables are substituted into
//! statements before hashing, so changing a variable's value for an existing
//! log shows up as drift.

pub mod error;
pub mod format;
pub mod loader;
pub mod substitute;

pub use error::ScriptError;
pub use format::{ScriptChangeSet, ScriptFile};
pub use loader::JsonScriptLoader;
pub use substitute::{substitute, PlaceholderError};
