// Public API - what other modules can use
pub use dispatcher::CommandDispatcher;
pub use parser::{Command, CommandError};

// Internal modules
mod dispatcher;
mod parser;
