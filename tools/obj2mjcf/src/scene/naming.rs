//! Deterministic identifiers for generated assets

use hashbrown::HashSet;

use crate::material::DEFAULT_MATERIAL_NAME;

/// Make a name safe for use as an identifier and a file name
///
/// Case is preserved. Every character other than ASCII letters, digits,
/// `_` and `-` becomes `_`.
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

/// Hands out unique names in request order
///
/// Names are compared case-insensitively so the derived file names stay
/// distinct on case-insensitive file systems.
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `base`, or `base_<n>` with the smallest free `n`
    pub fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_lowercase()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Mesh names for a source mesh's material groups, in group order
///
/// A single group takes the stem itself, otherwise each group is named
/// `<stem>_<material>`.
pub fn submesh_names(stem: &str, materials: &[Option<&str>], registry: &mut NameRegistry) -> Vec<String> {
    let stem = sanitize_name(stem);
    if materials.len() == 1 {
        return vec![registry.claim(&stem)];
    }
    materials
        .iter()
        .map(|material| {
            let material = material.unwrap_or(DEFAULT_MATERIAL_NAME);
            registry.claim(&format!("{}_{}", stem, sanitize_name(material)))
        })
        .collect()
}
