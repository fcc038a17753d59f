//! Branch-variant prefixes and panel asset paths.

const LEGACY_BRANCHES: [(&str, &str, &str); 3] =
    [("02a", "_a_", "A"), ("02b", "_b_", "B"), ("02c", "_c_", "C")];

/// Returns the art prefix for a scene. An explicit `branch` wins; otherwise
/// legacy scene ids are matched: `02a`/`_a_` ⇒ `A`, `02b`/`_b_` ⇒ `B`,
/// `02c`/`_c_` ⇒ `C`.
#[must_use]
pub fn branch_prefix(scene_id: &str, explicit: Option<&str>) -> String {
    if let Some(branch) = explicit {
        return branch.trim().to_owned();
    }
    for (numbered, infix, prefix) in LEGACY_BRANCHES {
        if scene_id.contains(numbered) || scene_id.contains(infix) {
            return prefix.to_owned();
        }
    }
    String::new()
}

/// Builds `{base}/{prefix}{panel}.{extension}`; without a base the bare file
/// name is returned.
#[must_use]
pub fn asset_path(base: Option<&str>, prefix: &str, panel: &str, extension: &str) -> String {
    let file = format!("{prefix}{panel}.{}", extension.trim_start_matches('.'));
    match base {
        Some(base) if !base.is_empty() => format!("{}/{file}", base.trim_end_matches('/')),
        _ => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_prefix_heuristic() {
        assert_eq!(branch_prefix("scene_02a_river", None), "A");
        assert_eq!(branch_prefix("scene_b_tower", None), "B");
        assert_eq!(branch_prefix("scene_02c", None), "C");
        assert_eq!(branch_prefix("scene_01", None), "");
    }

    #[test]
    fn test_explicit_branch_wins_over_heuristic() {
        assert_eq!(branch_prefix("scene_02a", Some("Z")), "Z");
        assert_eq!(branch_prefix("scene_02a", Some("")), "");
    }

    #[test]
    fn test_asset_path() {
        assert_eq!(
            asset_path(Some("/assets/forest/"), "A", "2", "jpg"),
            "/assets/forest/A2.jpg"
        );
        assert_eq!(asset_path(None, "", "1", ".png"), "1.png");
    }
}
