// structural path algebra
use crate::core::errors::FormError;
use crate::core::types::PATH_SEP;

/// Path of `property` directly beneath `parent`.
pub fn compose_child(parent: &str, property: &str) -> String {
    if parent.is_empty() {
        property.to_string()
    } else {
        format!("{parent}{PATH_SEP}{property}")
    }
}

/// Inserts `[index]` right before the last property of the path.
/// A single-segment path has no last property to index and is returned as is.
pub fn insert_index(path: &str, index: usize) -> String {
    match path.rfind(PATH_SEP) {
        Some(i) => format!("{}[{index}]{}", &path[..i], &path[i..]),
        None => path.to_string(),
    }
}

/// Inserts `[index]` right after `prefix`, which must begin the path.
pub fn with_index_after_prefix(path: &str, index: usize, prefix: &str) -> Result<String, FormError> {
    let rest = path
        .strip_prefix(prefix)
        .ok_or_else(|| FormError::PathPrefixMismatch {
            path: path.to_string(),
            prefix: prefix.to_string(),
        })?;
    Ok(format!("{prefix}[{index}]{rest}"))
}

/// Path with every `[n]` group removed, so repeated rows share one label.
pub fn label_key(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) if after[..close].bytes().all(|b| b.is_ascii_digit()) => {
                rest = &after[close + 1..];
            }
            _ => {
                out.push('[');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn is_root_path(path: &str) -> bool {
    !path.contains(PATH_SEP)
}

/// First segment of the path (the root mapping's name).
pub fn root_path(path: &str) -> &str {
    match path.find(PATH_SEP) {
        Some(i) => &path[..i],
        None => path,
    }
}

/// Property name at the end of a field path, without trailing `[]`.
pub fn last_property_name(path: &str) -> &str {
    let last = match path.rfind(PATH_SEP) {
        Some(i) => &path[i + PATH_SEP.len()..],
        None => path,
    };
    remove_trailing_brackets(last)
}

pub fn remove_trailing_brackets(s: &str) -> &str {
    s.strip_suffix("[]").unwrap_or(s)
}

/// Highest `n` among names of the shape `path[n]...`; `None` when no row of
/// the list was submitted.
pub fn find_max_index<'a>(names: impl IntoIterator<Item = &'a str>, path: &str) -> Option<usize> {
    names
        .into_iter()
        .filter_map(|name| {
            let rest = name.strip_prefix(path)?.strip_prefix('[')?;
            let close = rest.find(']')?;
            rest[..close].parse::<usize>().ok()
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_child_joins_with_separator() {
        assert_eq!(compose_child("registration", "confirmation"), "registration-confirmation");
        assert_eq!(compose_child("", "confirmation"), "confirmation");
    }

    #[test]
    fn insert_index_goes_before_last_property() {
        assert_eq!(insert_index("order-lines-product", 3), "order-lines[3]-product");
        assert_eq!(insert_index("order", 3), "order");
    }

    #[test]
    fn index_after_prefix() {
        assert_eq!(
            with_index_after_prefix("registration-confirmation", 2, "registration").unwrap(),
            "registration[2]-confirmation"
        );
        assert_eq!(with_index_after_prefix("order-lines", 0, "order-lines").unwrap(), "order-lines[0]");
    }

    #[test]
    fn index_after_foreign_prefix_is_rejected() {
        let err = with_index_after_prefix("person-name", 1, "order").unwrap_err();
        assert!(matches!(err, FormError::PathPrefixMismatch { .. }));
    }

    #[test]
    fn label_key_strips_all_indices() {
        assert_eq!(label_key("a-b[2]-c[10]"), "a-b-c");
        assert_eq!(label_key("a-b[]"), "a-b");
        assert_eq!(label_key("a-b[x]"), "a-b[x]");
    }

    #[test]
    fn root_detection_and_root_path() {
        assert!(is_root_path("carForm"));
        assert!(!is_root_path("carForm-engine"));
        assert_eq!(root_path("carForm-engine-cylinders"), "carForm");
        assert_eq!(root_path("lines[2]"), "lines[2]");
    }

    #[test]
    fn last_property_name_drops_empty_brackets() {
        assert_eq!(last_property_name("registration-interests[]"), "interests");
        assert_eq!(last_property_name("name"), "name");
    }

    #[test]
    fn max_index_of_submitted_rows() {
        let names = [
            "order-number",
            "order-lines[0]-product",
            "order-lines[2]-product",
            "order-lines[10]-quantity",
            "order-linesX[40]-product",
        ];
        assert_eq!(find_max_index(names, "order-lines"), Some(10));
        assert_eq!(find_max_index(names, "order-notes"), None);
    }
}
