mod decode;
mod fetch;
mod model;
mod resolver;

pub use fetch::{PackFetcher, PLACEHOLDER_PACK_URL};
pub use model::{ConfigFile, ModSide, ModType, Module, ModuleKind, PrioritizedUrl, ServerList};
pub use resolver::{locate_server, PackResolver, ServerEntry};
