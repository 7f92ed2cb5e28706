//! Server pack manifest resolution.
//!
//! Turns a server-pack XML manifest (local file or remote URL, either of
//! the two schema generations, with recursive imports) into a flat,
//! ordered list of [`Module`] entities for an installer to consume.
//!
//! ```no_run
//! use serverpack::PackResolver;
//!
//! let resolver = PackResolver::new();
//! if let Some(modules) = resolver.load_from_url("https://packs.example.org/ServerPack.xml", "main") {
//!     for module in &modules {
//!         println!("{} -> {}", module.name, module.path);
//!     }
//! }
//! ```

pub mod core;

pub use crate::core::diag::{Diagnostic, DiagnosticSink, MemorySink, Severity, TracingSink};
pub use crate::core::error::{PackError, PackResult};
pub use crate::core::pack::{
    locate_server, ConfigFile, ModSide, ModType, Module, ModuleKind, PackFetcher, PackResolver,
    PrioritizedUrl, ServerEntry, ServerList, PLACEHOLDER_PACK_URL,
};
pub use crate::core::xml::{XmlDocument, XmlElement};
