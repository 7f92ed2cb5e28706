// ─── Resolution Driver ───
// Ties detection, decoding and import expansion into one ordered module
// list. Evaluation is synchronous and depth-first: an import is resolved
// to completion (nested imports and fetches included) before its next
// sibling is looked at.

use std::path::Path;
use std::sync::Arc;

use crate::core::diag::{Diagnostic, DiagnosticSink, TracingSink};
use crate::core::error::{PackError, PackResult};
use crate::core::pack::decode::{attr_flag, module_v1, module_v2};
use crate::core::pack::fetch::PackFetcher;
use crate::core::pack::model::{Module, ServerList};
use crate::core::version;
use crate::core::xml::{XmlDocument, XmlElement};

/// Feature level at which the v2 vocabulary becomes available.
const V2_FEATURE_LEVEL: &str = "3.0";

/// Compatibility version assumed for documents predating the
/// `ServerPack` wrapper element.
const LEGACY_PACK_VERSION: &str = "1.0";

/// Outcome of schema detection for one server lookup.
///
/// `server_element` borrows into the document it was located in and is
/// discarded with it at the end of the resolution pass.
#[derive(Debug)]
pub struct ServerEntry<'doc> {
    /// Detected schema generation: 1 or 2.
    pub pack_version: u8,
    /// The matching `<Server>` subtree, when one exists.
    pub server_element: Option<&'doc XmlElement>,
    /// The pack's declared tool-compatibility version.
    pub mcu_version: String,
}

/// Determine the schema generation of `document` and locate the
/// `<Server>` child matching `server_id` (first match wins).
///
/// A document whose root is not `ServerPack` is a legacy single-server
/// definition: the root itself is the server element and the declared
/// version is fixed at `"1.0"`.
pub fn locate_server<'doc>(document: &'doc XmlDocument, server_id: &str) -> ServerEntry<'doc> {
    let root = document.root();
    if root.name() == "ServerPack" {
        let mcu_version = root.attr("version").to_string();
        let pack_version = if version::meets_feature_level(&mcu_version, V2_FEATURE_LEVEL) {
            2
        } else {
            1
        };
        let server_element = root
            .children("Server")
            .find(|server| server.attr("id") == server_id);
        ServerEntry {
            pack_version,
            server_element,
            mcu_version,
        }
    } else {
        ServerEntry {
            pack_version: 1,
            server_element: Some(root),
            mcu_version: LEGACY_PACK_VERSION.to_string(),
        }
    }
}

impl ServerList {
    /// Build the list-level view of a located entry.
    ///
    /// `version` always comes from the entry, so an import gate never
    /// compares against an unset version even when the server element
    /// itself is missing.
    pub fn from_entry(entry: &ServerEntry<'_>, pack_url: &str) -> Self {
        let attr = |name: &str| {
            entry
                .server_element
                .map(|el| el.attr(name).to_string())
                .unwrap_or_default()
        };
        ServerList {
            server_id: attr("id"),
            name: attr("name"),
            pack_url: pack_url.to_string(),
            news_url: attr("newsUrl"),
            icon_url: attr("iconUrl"),
            address: attr("serverAddress"),
            version: entry.mcu_version.clone(),
            mc_version: attr("version"),
            revision: attr("revision"),
            main_class: attr("mainClass"),
            auto_connect: attr_flag(&attr("autoConnect"), true),
            generate_list: attr_flag(&attr("generateList"), true),
        }
    }
}

/// Resolves a server pack manifest into a flat, ordered module list.
///
/// Stateless between calls: every resolution owns its own document and
/// entity graph, so independent resolutions may run on separate threads.
pub struct PackResolver {
    fetcher: PackFetcher,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for PackResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PackResolver {
    /// Resolver reporting through the `tracing` subscriber.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Resolver reporting through an injected sink.
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            fetcher: PackFetcher::new(sink.clone()),
            sink,
        }
    }

    /// The retrieval layer this resolver fetches documents with.
    pub fn fetcher(&self) -> &PackFetcher {
        &self.fetcher
    }

    /// Resolve `server_id` out of a local manifest file.
    ///
    /// Top-level entry point: every pipeline failure is reported through
    /// the sink and collapses to `None`. A malformed manifest must not
    /// take the embedding application down with it.
    pub fn load_from_file(&self, path: &Path, server_id: &str) -> Option<Vec<Module>> {
        let document = self.fetcher.fetch_file(path)?;
        self.resolve_reported(&document, server_id)
    }

    /// Resolve `server_id` out of a manifest fetched from `url`.
    /// Same catch-all contract as [`PackResolver::load_from_file`].
    pub fn load_from_url(&self, url: &str, server_id: &str) -> Option<Vec<Module>> {
        let document = self.fetcher.fetch_url(url)?;
        self.resolve_reported(&document, server_id)
    }

    fn resolve_reported(&self, document: &XmlDocument, server_id: &str) -> Option<Vec<Module>> {
        match self.resolve(document, server_id) {
            Ok(modules) => Some(modules),
            Err(e) => {
                self.sink.report(Diagnostic::error(e.to_string()));
                None
            }
        }
    }

    /// Resolve one server's ordered module list out of a parsed document.
    ///
    /// v2 collects import-sourced modules first (each import expanded in
    /// document order), then the directly declared modules in document
    /// order. v1 collects the declared modules only.
    pub fn resolve(&self, document: &XmlDocument, server_id: &str) -> PackResult<Vec<Module>> {
        let entry = locate_server(document, server_id);
        self.sink.report(Diagnostic::debug(format!(
            "{server_id}: format={}",
            entry.pack_version
        )));
        let list = ServerList::from_entry(&entry, "");

        match entry.pack_version {
            2 => {
                let server = entry
                    .server_element
                    .ok_or_else(|| PackError::ServerNotFound(server_id.to_string()))?;
                let mut modules = Vec::new();
                for import in server.children("Import") {
                    modules.extend(self.expand_import(import, document, &list)?);
                }
                for el in server.children("Module") {
                    modules.push(module_v2(el)?);
                }
                Ok(modules)
            }
            1 => {
                let server = entry
                    .server_element
                    .ok_or_else(|| PackError::ServerNotFound(server_id.to_string()))?;
                Ok(server.children("Module").map(module_v1).collect())
            }
            other => Err(PackError::UnsupportedPackVersion(other)),
        }
    }

    /// Expand one `<Import>` directive into the modules of its target
    /// server.
    ///
    /// A non-empty `url` attribute names an external document to fetch;
    /// otherwise the target lives in the current document. The target's
    /// declared version must fuzzy-match the importer's or the whole
    /// containing resolution fails; splicing in an incompatible mod set
    /// would break the client it gets installed into.
    fn expand_import(
        &self,
        import: &XmlElement,
        current: &XmlDocument,
        importer: &ServerList,
    ) -> PackResult<Vec<Module>> {
        let url = import.attr("url");
        let import_id = import.text();
        let describe = || {
            if url.is_empty() {
                import_id.to_string()
            } else {
                format!("{url}:{import_id}")
            }
        };

        let fetched;
        let document = if url.is_empty() {
            current
        } else {
            fetched = self
                .fetcher
                .fetch_url(url)
                .ok_or_else(|| PackError::ImportFetch { import: describe() })?;
            &fetched
        };

        let entry = locate_server(document, import_id);
        let imported = ServerList::from_entry(&entry, url);
        if !version::fuzzy_match(&importer.version, &imported.version) {
            return Err(PackError::ImportVersionMismatch { import: describe() });
        }

        self.resolve(document, import_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diag::{MemorySink, Severity};
    use crate::core::pack::model::{ModType, ModuleKind};
    use std::io::Write;

    fn parse(xml: &str) -> XmlDocument {
        XmlDocument::parse(xml).unwrap()
    }

    fn resolver() -> (PackResolver, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (PackResolver::with_sink(sink.clone()), sink)
    }

    #[test]
    fn detects_v2_at_the_feature_threshold() {
        let doc = parse(r#"<ServerPack version="3.0"><Server id="s1"/></ServerPack>"#);
        let entry = locate_server(&doc, "s1");
        assert_eq!(entry.pack_version, 2);
        assert_eq!(entry.mcu_version, "3.0");
        assert!(entry.server_element.is_some());
    }

    #[test]
    fn detects_v1_below_the_feature_threshold() {
        let doc = parse(r#"<ServerPack version="2.7"><Server id="s1"/></ServerPack>"#);
        let entry = locate_server(&doc, "s1");
        assert_eq!(entry.pack_version, 1);
    }

    #[test]
    fn missing_server_id_yields_no_element() {
        let doc = parse(r#"<ServerPack version="3.0"><Server id="a"/><Server id="b"/></ServerPack>"#);
        let entry = locate_server(&doc, "zzz");
        assert!(entry.server_element.is_none());
    }

    #[test]
    fn first_matching_server_wins() {
        let doc = parse(
            r#"<ServerPack version="3.0">
                 <Server id="dup" name="first"/>
                 <Server id="dup" name="second"/>
               </ServerPack>"#,
        );
        let entry = locate_server(&doc, "dup");
        assert_eq!(entry.server_element.unwrap().attr("name"), "first");
    }

    #[test]
    fn bare_root_is_a_legacy_server() {
        let doc = parse("<Server id=\"old\"><Module name=\"A\"><URL>u</URL></Module></Server>");
        let entry = locate_server(&doc, "ignored");
        assert_eq!(entry.pack_version, 1);
        assert_eq!(entry.mcu_version, "1.0");
        assert!(entry.server_element.is_some());
    }

    #[test]
    fn server_list_reads_list_level_attributes() {
        let doc = parse(
            r#"<ServerPack version="3.0.1">
                 <Server id="s1" name="My Server" version="1.7.10"
                         serverAddress="play.example.org" newsUrl="http://news.example"
                         revision="42" autoConnect="false"/>
               </ServerPack>"#,
        );
        let entry = locate_server(&doc, "s1");
        let list = ServerList::from_entry(&entry, "http://pack.example/pack.xml");
        assert_eq!(list.server_id, "s1");
        assert_eq!(list.name, "My Server");
        assert_eq!(list.version, "3.0.1");
        assert_eq!(list.mc_version, "1.7.10");
        assert_eq!(list.address, "play.example.org");
        assert_eq!(list.revision, "42");
        assert_eq!(list.pack_url, "http://pack.example/pack.xml");
        assert!(!list.auto_connect);
        assert!(list.generate_list);
    }

    #[test]
    fn v1_yields_one_module_per_element_at_priority_zero() {
        let doc = parse(
            r#"<ServerPack version="2.0">
                 <Server id="s1">
                   <Module name="A"><URL>ua</URL></Module>
                   <Module name="B"><URL>ub</URL></Module>
                   <Module name="C"><URL>uc</URL></Module>
                 </Server>
               </ServerPack>"#,
        );
        let (resolver, _sink) = resolver();
        let modules = resolver.resolve(&doc, "s1").unwrap();
        assert_eq!(modules.len(), 3);
        for module in &modules {
            assert_eq!(module.urls.len(), 1);
            assert_eq!(module.urls[0].priority, 0);
            assert!(module.is_legacy());
        }
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn legacy_document_resolves_without_wrapper() {
        let doc = parse("<Server><Module name=\"A\"><URL>u</URL></Module></Server>");
        let (resolver, _sink) = resolver();
        let modules = resolver.resolve(&doc, "anything").unwrap();
        assert_eq!(modules.len(), 1);
        assert!(modules[0].is_legacy());
    }

    #[test]
    fn v2_single_module_scenario() {
        let doc = parse(
            r#"<ServerPack version="3.0">
                 <Server id="s1">
                   <Module name="A"><URL priority="1">u1</URL><ModType order="0">Mod</ModType></Module>
                 </Server>
               </ServerPack>"#,
        );
        let (resolver, _sink) = resolver();
        let modules = resolver.resolve(&doc, "s1").unwrap();
        assert_eq!(modules.len(), 1);
        let module = &modules[0];
        assert_eq!(module.name, "A");
        assert_eq!(module.urls.len(), 1);
        assert_eq!(module.urls[0].url, "u1");
        assert_eq!(module.urls[0].priority, 1);
        assert!(module.required);
        assert!(module.is_default);
        match &module.kind {
            ModuleKind::Modern { mod_type, .. } => assert_eq!(*mod_type, ModType::Mod),
            ModuleKind::Legacy { .. } => panic!("expected modern module"),
        }
    }

    #[test]
    fn unknown_server_id_is_a_hard_error() {
        let doc = parse(r#"<ServerPack version="3.0"><Server id="s1"/></ServerPack>"#);
        let (resolver, _sink) = resolver();
        assert!(matches!(
            resolver.resolve(&doc, "nope"),
            Err(PackError::ServerNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn same_document_import_precedes_direct_modules() {
        let doc = parse(
            r#"<ServerPack version="3.0">
                 <Server id="base">
                   <Module name="Base"><ModType>Library</ModType></Module>
                 </Server>
                 <Server id="main">
                   <Import>base</Import>
                   <Module name="Direct"><ModType>Mod</ModType></Module>
                 </Server>
               </ServerPack>"#,
        );
        let (resolver, _sink) = resolver();
        let modules = resolver.resolve(&doc, "main").unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Direct"]);
    }

    #[test]
    fn imports_chain_depth_first() {
        let doc = parse(
            r#"<ServerPack version="3.0">
                 <Server id="inner">
                   <Module name="Innermost"><ModType>Library</ModType></Module>
                 </Server>
                 <Server id="middle">
                   <Import>inner</Import>
                   <Module name="Middle"><ModType>Library</ModType></Module>
                 </Server>
                 <Server id="outer">
                   <Import>middle</Import>
                   <Module name="Outer"><ModType>Mod</ModType></Module>
                 </Server>
               </ServerPack>"#,
        );
        let (resolver, _sink) = resolver();
        let modules = resolver.resolve(&doc, "outer").unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Innermost", "Middle", "Outer"]);
    }

    #[test]
    fn bad_module_fails_the_whole_resolution() {
        let doc = parse(
            r#"<ServerPack version="3.0">
                 <Server id="s1">
                   <Module name="Good"><ModType>Mod</ModType></Module>
                   <Module name="Bad"><ModType>Bogus</ModType></Module>
                 </Server>
               </ServerPack>"#,
        );
        let (resolver, _sink) = resolver();
        assert!(matches!(
            resolver.resolve(&doc, "s1"),
            Err(PackError::UnknownModType(_))
        ));
    }

    #[test]
    fn remote_import_splices_compatible_modules() {
        let mut server = mockito::Server::new();
        let imported_xml = r#"<ServerPack version="3.0.5">
              <Server id="shared">
                <Module name="Shared"><URL>us</URL><ModType>Library</ModType></Module>
              </Server>
            </ServerPack>"#;
        let mock = server
            .mock("GET", "/shared.xml")
            .with_status(200)
            .with_body(imported_xml)
            .create();

        let doc = parse(&format!(
            r#"<ServerPack version="3.0">
                 <Server id="main">
                   <Import url="{}/shared.xml">shared</Import>
                   <Module name="Own"><ModType>Mod</ModType></Module>
                 </Server>
               </ServerPack>"#,
            server.url()
        ));
        let (resolver, sink) = resolver();
        let modules = resolver.resolve(&doc, "main").unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Shared", "Own"]);
        assert_eq!(sink.count(Severity::Error), 0);
        mock.assert();
    }

    #[test]
    fn incompatible_import_version_aborts_resolution() {
        let mut server = mockito::Server::new();
        let imported_xml = r#"<ServerPack version="4.0">
              <Server id="shared">
                <Module name="Shared"><URL>us</URL><ModType>Library</ModType></Module>
              </Server>
            </ServerPack>"#;
        let _mock = server
            .mock("GET", "/shared.xml")
            .with_status(200)
            .with_body(imported_xml)
            .create();

        let doc = parse(&format!(
            r#"<ServerPack version="3.0">
                 <Server id="main">
                   <Import url="{}/shared.xml">shared</Import>
                 </Server>
               </ServerPack>"#,
            server.url()
        ));
        let (resolver, _sink) = resolver();
        let err = resolver.resolve(&doc, "main").unwrap_err();
        match err {
            PackError::ImportVersionMismatch { import } => {
                assert!(import.contains("shared"));
                assert!(import.contains("/shared.xml"));
            }
            other => panic!("expected version mismatch, got {other}"),
        }
    }

    #[test]
    fn unreachable_import_document_aborts_resolution() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/gone.xml").with_status(404).create();

        let doc = parse(&format!(
            r#"<ServerPack version="3.0">
                 <Server id="main">
                   <Import url="{}/gone.xml">shared</Import>
                 </Server>
               </ServerPack>"#,
            server.url()
        ));
        let (resolver, _sink) = resolver();
        assert!(matches!(
            resolver.resolve(&doc, "main"),
            Err(PackError::ImportFetch { import }) if import.contains("shared")
        ));
    }

    #[test]
    fn load_from_file_reports_and_absorbs_failures() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"<ServerPack version="3.0">
                  <Server id="s1"><Module name="Bad"><ModType>Bogus</ModType></Module></Server>
                </ServerPack>"#,
        )
        .unwrap();

        let (resolver, sink) = resolver();
        assert!(resolver.load_from_file(file.path(), "s1").is_none());
        assert_eq!(sink.count(Severity::Error), 1);
    }

    #[test]
    fn load_from_file_resolves_a_valid_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"<ServerPack version="3.0">
                  <Server id="s1"><Module name="A"><URL>u</URL><ModType>Mod</ModType></Module></Server>
                </ServerPack>"#,
        )
        .unwrap();

        let (resolver, _sink) = resolver();
        let modules = resolver.load_from_file(file.path(), "s1").unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "A");
    }

    #[test]
    fn load_from_url_end_to_end_with_import() {
        let mut server = mockito::Server::new();
        let base = server.url();
        let imported_xml = r#"<ServerPack version="3.0">
              <Server id="libs">
                <Module name="Lib"><URL>ul</URL><ModType>Library</ModType></Module>
              </Server>
            </ServerPack>"#;
        let main_xml = format!(
            r#"<ServerPack version="3.0">
                 <Server id="main">
                   <Import url="{base}/libs.xml">libs</Import>
                   <Module name="Main"><URL>um</URL><ModType>Mod</ModType></Module>
                 </Server>
               </ServerPack>"#
        );
        let libs_mock = server
            .mock("GET", "/libs.xml")
            .with_status(200)
            .with_body(imported_xml)
            .create();
        let main_mock = server
            .mock("GET", "/main.xml")
            .with_status(200)
            .with_body(main_xml)
            .create();

        let (resolver, sink) = resolver();
        let modules = resolver
            .load_from_url(&format!("{base}/main.xml"), "main")
            .unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Lib", "Main"]);
        assert_eq!(sink.count(Severity::Error), 0);
        libs_mock.assert();
        main_mock.assert();
    }
}
