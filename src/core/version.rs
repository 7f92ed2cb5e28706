// ─── Version Compatibility ───
// Pack manifests declare the tooling version they were authored for as a
// dotted string ("2.7", "3.0.1"). Two predicates gate the pipeline on it:
// `meets_feature_level` selects the schema generation, `fuzzy_match`
// approves an import between two server lists.

/// Split a dotted version string into numeric components.
///
/// Components that fail to parse count as 0, so a missing or mangled
/// version never unlocks a newer format than the author declared.
fn components(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map(|part| part.trim().parse::<u32>().unwrap_or(0))
        .collect()
}

fn component(parts: &[u32], idx: usize) -> u32 {
    parts.get(idx).copied().unwrap_or(0)
}

/// Does `declared` satisfy the minimum feature level `threshold`?
///
/// Numeric component-wise comparison, missing components are 0:
/// `"3.0" >= "3.0"`, `"3.1" >= "3.0"`, `"2.7" < "3.0"`.
pub fn meets_feature_level(declared: &str, threshold: &str) -> bool {
    let a = components(declared);
    let b = components(threshold);
    let len = a.len().max(b.len());
    for idx in 0..len {
        let left = component(&a, idx);
        let right = component(&b, idx);
        if left != right {
            return left > right;
        }
    }
    true
}

/// Are two declared versions mutually compatible for import purposes?
///
/// Major and minor must match; patch level and anything beyond it is
/// ignored.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    let a = components(a);
    let b = components(b);
    component(&a, 0) == component(&b, 0) && component(&a, 1) == component(&b, 1)
}
