use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Remove every `../` occurrence from a decoded request path, repeating
/// until none remain. A single replacement pass can leave a crafted
/// input like `....//` with a surviving `../` after the first removal
/// (`....//` -> `../`), so this loops to a fixed point to actually
/// satisfy spec.md §8 invariant 9 against any input.
fn neutralize_traversal(path: &str) -> String {
    let mut current = path.to_string();
    loop {
        let next = current.replace("../", "");
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Percent-decode and traversal-neutralize `raw_path`, then resolve it
/// against `webserv_dir`. `/` maps to `/index.html`.
pub fn resolve_path(webserv_dir: &Path, raw_path: &str) -> PathBuf {
    let decoded = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();
    let decoded = if decoded == "/" { "/index.html".to_string() } else { decoded };
    let neutralized = neutralize_traversal(&decoded);
    webserv_dir.join(neutralized.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_maps_to_index_html() {
        let root = Path::new("/var/www");
        assert_eq!(resolve_path(root, "/"), PathBuf::from("/var/www/index.html"));
    }

    #[test]
    fn percent_encoded_traversal_is_neutralized() {
        let root = Path::new("/var/www");
        let resolved = resolve_path(root, "/%2e%2e/%2e%2e/etc/passwd");
        assert_eq!(resolved, PathBuf::from("/var/www/etc/passwd"));
        assert!(resolved.starts_with(root));
    }

    #[test]
    fn overlapping_traversal_sequences_are_fully_stripped() {
        assert_eq!(neutralize_traversal("..../..//etc/passwd"), "etc/passwd");
    }

    #[test]
    fn ordinary_paths_resolve_unchanged() {
        let root = Path::new("/var/www");
        assert_eq!(resolve_path(root, "/reports/today.html"), PathBuf::from("/var/www/reports/today.html"));
    }
}
