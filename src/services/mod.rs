//! Services separating I/O, formatting and reporting from the mirror logic

pub mod format;
pub mod io;
pub mod progress;

pub use format::{format_size, ContentTypeHandler};
pub use io::MirrorStore;
pub use progress::{ConsoleStatusReporter, NoOpStatusReporter, StatusReporter};
