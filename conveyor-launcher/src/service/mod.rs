//! Service layer
//!
//! Business logic of the launcher. The catalog and discovery table are
//! read-only from here; the launcher only ever works on copies.

mod launcher;

pub use launcher::PipeLauncher;
