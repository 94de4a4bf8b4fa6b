pub mod logging;

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Name offered in the save dialog, e.g. `FrostyEditor-1.0.6.3-Customized.zip`.
pub fn output_filename(product: &str, version: &str) -> String {
    let name = format!("{}-{}-Customized.zip", product.trim(), version.trim());
    sanitize_filename(&name)
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// True for non-empty relative paths that stay inside their root.
/// Both `/` and `\` count as separators.
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.trim().is_empty()
        && !path.starts_with(['/', '\\'])
        && !path.contains(':')
        && path.split(['/', '\\']).all(|part| part != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.zip"), "test_file.zip");
        assert_eq!(sanitize_filename("normal-name.zip"), "normal-name.zip");
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename("FrostyEditor", "1.0.6.3"),
            "FrostyEditor-1.0.6.3-Customized.zip"
        );
        assert_eq!(output_filename("Odd:Name", " 2 "), "Odd_Name-2-Customized.zip");
    }

    #[test]
    fn test_is_safe_relative_path() {
        assert!(is_safe_relative_path("Plugins/A.dll"));
        assert!(is_safe_relative_path("FrostyEditor/"));
        assert!(!is_safe_relative_path(""));
        assert!(!is_safe_relative_path("/etc/passwd"));
        assert!(!is_safe_relative_path("Plugins/../../x.dll"));
        assert!(!is_safe_relative_path("..\\x.dll"));
        assert!(!is_safe_relative_path("C:\\Windows\\x.dll"));
    }
}
