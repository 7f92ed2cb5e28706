// ─── Element Decoders ───
// Converts `<Module>` elements of either schema generation into the
// uniform `Module` entity. Manifests are hand-authored, so scalar fields
// degrade to documented defaults instead of failing the decode; the two
// exceptions are a missing or unrecognized `ModType`, which has no safe
// fallback.

use std::collections::HashMap;

use crate::core::error::{PackError, PackResult};
use crate::core::pack::model::{ConfigFile, ModSide, Module, ModuleKind, PrioritizedUrl};
use crate::core::xml::XmlElement;

// ── Parse-or-default helpers ────────────────────────────
// Every scalar in both decoders goes through these three, so the default
// policy cannot drift between schema generations.

/// Strict integer parse; `default` on any failure.
pub(crate) fn int_or(text: &str, default: i32) -> i32 {
    text.parse().unwrap_or(default)
}

/// Strict boolean parse (`true`/`false`, ASCII case-insensitive);
/// `default` on anything else, including the empty string.
pub(crate) fn bool_or(text: &str, default: bool) -> bool {
    if text.eq_ignore_ascii_case("true") {
        true
    } else if text.eq_ignore_ascii_case("false") {
        false
    } else {
        default
    }
}

/// Attribute-flag policy used by the server-list fields: an absent
/// attribute keeps the default, any other text is `true` unless it is
/// exactly `false`.
pub(crate) fn attr_flag(text: &str, default: bool) -> bool {
    if text.is_empty() {
        default
    } else {
        !text.eq_ignore_ascii_case("false")
    }
}

fn text_child(el: &XmlElement, name: &str) -> String {
    el.child_text(name).unwrap_or_default().to_string()
}

fn bool_child(el: &XmlElement, name: &str) -> bool {
    el.child_text(name)
        .map(|text| bool_or(text, false))
        .unwrap_or(false)
}

fn int_child(el: &XmlElement, name: &str, default: i32) -> i32 {
    el.child_text(name)
        .map(|text| int_or(text, default))
        .unwrap_or(default)
}

// ── V1 ──────────────────────────────────────────────────

/// Decode a legacy `<Module>` element.
///
/// v1 has no priority concept: the single `URL` child becomes the sole
/// download source at priority 0. Every boolean child defaults to
/// `false`, so a sparse legacy module decodes without complaint.
pub fn module_v1(el: &XmlElement) -> Module {
    Module {
        name: el.attr("name").to_string(),
        id: el.attr("id").to_string(),
        urls: vec![PrioritizedUrl::new(text_child(el, "URL"), 0)],
        depends: el.attr("depends").to_string(),
        side: ModSide::from_attr(el.attr("side")),
        required: bool_child(el, "Required"),
        is_default: bool_child(el, "IsDefault"),
        order: int_child(el, "JarOrder", 0),
        keep_meta: bool_child(el, "KeepMeta"),
        in_root: bool_child(el, "InRoot"),
        md5: text_child(el, "MD5"),
        config_files: el.children("ConfigFile").map(config_file).collect(),
        path: text_child(el, "ModPath"),
        metadata: meta_map(el),
        kind: ModuleKind::Legacy {
            in_jar: bool_child(el, "InJar"),
            extract: bool_child(el, "Extract"),
            core_mod: bool_child(el, "CoreMod"),
        },
    }
}

// ── V2 ──────────────────────────────────────────────────

/// Decode a modern `<Module>` (or `<Submodule>`) element, recursing
/// through nested submodules.
///
/// A `<Required>` element that is absent entirely means both
/// `required=true` and `is_default=true`; when present, its text
/// defaults to `true` and its `isDefault` attribute to `false`.
pub fn module_v2(el: &XmlElement) -> PackResult<Module> {
    let name = el.attr("name").to_string();

    let urls = el
        .children("URL")
        .map(|u| PrioritizedUrl::new(u.text(), int_or(u.attr("priority"), 0)))
        .collect();

    let (required, is_default) = match el.first_child("Required") {
        None => (true, true),
        Some(req) => (
            bool_or(req.text(), true),
            bool_or(req.attr("isDefault"), false),
        ),
    };

    let type_el = el
        .first_child("ModType")
        .ok_or_else(|| PackError::MissingModType {
            module: name.clone(),
        })?;
    let mod_type = type_el.text().parse()?;

    let submodules = el
        .children("Submodule")
        .map(module_v2)
        .collect::<PackResult<Vec<_>>>()?;

    Ok(Module {
        name,
        id: el.attr("id").to_string(),
        urls,
        depends: el.attr("depends").to_string(),
        side: ModSide::from_attr(el.attr("side")),
        required,
        is_default,
        order: int_or(type_el.attr("order"), 0),
        keep_meta: bool_or(type_el.attr("keepMeta"), false),
        in_root: bool_or(type_el.attr("inRoot"), false),
        md5: text_child(el, "MD5"),
        config_files: el.children("ConfigFile").map(config_file).collect(),
        path: text_child(el, "ModPath"),
        metadata: meta_map(el),
        kind: ModuleKind::Modern {
            mod_type,
            launch_args: type_el.attr("launchArgs").to_string(),
            jre_args: type_el.attr("jreArgs").to_string(),
            submodules,
        },
    })
}

// ── Shared pieces ───────────────────────────────────────

fn config_file(el: &XmlElement) -> ConfigFile {
    ConfigFile {
        url: text_child(el, "URL"),
        path: text_child(el, "Path"),
        md5: text_child(el, "MD5"),
        no_overwrite: bool_child(el, "NoOverwrite"),
    }
}

/// Flatten the first `<Meta>` child into tag → text pairs.
fn meta_map(el: &XmlElement) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(meta) = el.first_child("Meta") {
        for child in meta.all_children() {
            map.insert(child.name().to_string(), child.text().to_string());
        }
    }
    map
}
