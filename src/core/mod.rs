// ─── ServerPack Core ───
// Manifest resolution backend for a Minecraft launcher.
//
// Architecture:
//   core/
//     xml      — parsed element tree + child accessors over quick-xml
//     version  — feature-level / fuzzy compatibility predicates
//     pack/    — entities, retrieval layer, v1/v2 decoders, resolver
//     diag     — injectable diagnostics sink (tracing by default)
//     http     — shared blocking HTTP client
//     error    — central error type

pub mod diag;
pub mod error;
pub mod http;
pub mod pack;
pub mod version;
pub mod xml;
