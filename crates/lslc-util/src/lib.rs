//! lslc-util - Shared compiler infrastructure
//!
//! This crate holds the pieces every phase of the compiler needs: the
//! option set that controls language extensions and optimizations, the
//! `#line`-directive map used to resolve error positions back to the
//! preprocessed file, and the compile error type with its renderings.

pub mod error;
pub mod linemap;
pub mod options;

pub use error::{CompileError, ErrorKind};
pub use linemap::{line_col, LineDirective, LineMap};
pub use options::Options;
