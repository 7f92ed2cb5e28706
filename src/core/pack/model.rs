use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::PackError;

/// How a module's payload is installed — strongly typed, no magic strings.
///
/// Unlike every other scalar in a manifest, an unrecognized mod type has
/// no safe fallback: installing a coremod as a plain mod breaks the
/// client, so parsing is strict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModType {
    /// Regular mod placed in the mods folder.
    Mod,
    /// Patched into the client jar.
    Jar,
    /// Coremod loaded before regular mods.
    Coremod,
    /// Support library.
    Library,
    /// LiteLoader mod.
    Litemod,
    /// Archive extracted into the instance.
    Extract,
    /// Optional component offered to the user.
    Option,
}

impl FromStr for ModType {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mod" => Ok(ModType::Mod),
            "Jar" => Ok(ModType::Jar),
            "Coremod" => Ok(ModType::Coremod),
            "Library" => Ok(ModType::Library),
            "Litemod" => Ok(ModType::Litemod),
            "Extract" => Ok(ModType::Extract),
            "Option" => Ok(ModType::Option),
            other => Err(PackError::UnknownModType(other.to_string())),
        }
    }
}

impl fmt::Display for ModType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ModType::Mod => "Mod",
            ModType::Jar => "Jar",
            ModType::Coremod => "Coremod",
            ModType::Library => "Library",
            ModType::Litemod => "Litemod",
            ModType::Extract => "Extract",
            ModType::Option => "Option",
        };
        write!(f, "{tag}")
    }
}

/// Which side of the game a module applies to.
///
/// The `side` attribute is hand-authored; anything unrecognized falls
/// back to `Both` so a typo never drops a module from the set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModSide {
    Client,
    Server,
    #[default]
    Both,
}

impl ModSide {
    pub fn from_attr(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "CLIENT" => ModSide::Client,
            "SERVER" => ModSide::Server,
            _ => ModSide::Both,
        }
    }
}

/// A download source with its selection priority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrioritizedUrl {
    pub url: String,
    pub priority: i32,
}

impl PrioritizedUrl {
    pub fn new(url: impl Into<String>, priority: i32) -> Self {
        Self {
            url: url.into(),
            priority,
        }
    }
}

// Lower priority downloads first; ties resolve lexicographically so the
// order is total and stable across runs.
impl Ord for PrioritizedUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.url.cmp(&other.url))
    }
}

impl PartialOrd for PrioritizedUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A config file shipped alongside a module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigFile {
    pub url: String,
    pub path: String,
    pub md5: String,
    /// Never clobber a user-edited copy.
    pub no_overwrite: bool,
}

/// The schema-generation-specific region of a module.
///
/// Both generations install through the same pipeline; only these fields
/// differ between a legacy (v1) and a modern (v2) manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ModuleKind {
    /// Decoded from a v1 manifest.
    Legacy {
        in_jar: bool,
        extract: bool,
        core_mod: bool,
    },
    /// Decoded from a v2 manifest.
    Modern {
        mod_type: ModType,
        launch_args: String,
        jre_args: String,
        submodules: Vec<Module>,
    },
}

/// One installable unit of a server pack, regardless of which schema
/// generation it was decoded from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub name: String,
    pub id: String,
    /// Download sources in document order; see [`Module::sorted_urls`].
    pub urls: Vec<PrioritizedUrl>,
    pub depends: String,
    pub side: ModSide,
    pub required: bool,
    pub is_default: bool,
    /// v1 `JarOrder` or v2 `ModType@order`.
    pub order: i32,
    pub keep_meta: bool,
    pub in_root: bool,
    /// Carried verbatim from the manifest; verification happens elsewhere.
    pub md5: String,
    pub config_files: Vec<ConfigFile>,
    pub path: String,
    pub metadata: HashMap<String, String>,
    pub kind: ModuleKind,
}

impl Module {
    /// Download sources ordered by ascending priority, URL on ties.
    pub fn sorted_urls(&self) -> Vec<PrioritizedUrl> {
        let mut urls = self.urls.clone();
        urls.sort();
        urls
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self.kind, ModuleKind::Legacy { .. })
    }

    /// Submodules of a modern module; legacy modules have none.
    pub fn submodules(&self) -> &[Module] {
        match &self.kind {
            ModuleKind::Modern { submodules, .. } => submodules,
            ModuleKind::Legacy { .. } => &[],
        }
    }
}

/// List-level description of one server entry: its declared compatibility
/// version plus the presentation fields a launcher shows while browsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerList {
    pub server_id: String,
    pub name: String,
    pub pack_url: String,
    pub news_url: String,
    pub icon_url: String,
    pub address: String,
    /// Declared tool-compatibility version; always populated by
    /// [`ServerList::from_entry`], so the import gate never compares
    /// against an empty string by accident.
    pub version: String,
    /// The game version the pack targets.
    pub mc_version: String,
    pub revision: String,
    pub main_class: String,
    pub auto_connect: bool,
    pub generate_list: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_type_round_trips_known_tags() {
        for tag in ["Mod", "Jar", "Coremod", "Library", "Litemod", "Extract", "Option"] {
            let parsed: ModType = tag.parse().unwrap();
            assert_eq!(parsed.to_string(), tag);
        }
    }

    #[test]
    fn mod_type_rejects_unknown_tag() {
        let err = "Shader".parse::<ModType>().unwrap_err();
        assert!(matches!(err, PackError::UnknownModType(tag) if tag == "Shader"));
    }

    #[test]
    fn side_parses_tolerantly() {
        assert_eq!(ModSide::from_attr("CLIENT"), ModSide::Client);
        assert_eq!(ModSide::from_attr("server"), ModSide::Server);
        assert_eq!(ModSide::from_attr(""), ModSide::Both);
        assert_eq!(ModSide::from_attr("bogus"), ModSide::Both);
    }

    #[test]
    fn urls_order_by_priority_then_lexicographically() {
        let mut urls = vec![
            PrioritizedUrl::new("http://b.example/pack", 1),
            PrioritizedUrl::new("http://mirror.example/pack", 0),
            PrioritizedUrl::new("http://a.example/pack", 1),
        ];
        urls.sort();
        let ordered: Vec<_> = urls.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(
            ordered,
            vec![
                "http://mirror.example/pack",
                "http://a.example/pack",
                "http://b.example/pack",
            ]
        );
    }
}
