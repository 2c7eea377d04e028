//! Capture persistence: the repository contract plus in-memory and libSQL backends.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlRepository;
pub use memory::InMemoryRepository;
pub use traits::CaptureRepository;
