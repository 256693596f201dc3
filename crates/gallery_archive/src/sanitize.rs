//! Archive path component sanitization
//!
//! Category names become folder names inside exported archives, so they
//! must not contain separators or characters Windows refuses on extraction.

/// Windows reserved filenames
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Forbidden characters and their full-width replacements
const FORBIDDEN_CHARS: &[(char, char)] = &[
    ('\\', '＼'), // U+FF3C
    ('/', '／'),  // U+FF0F
    (':', '：'),  // U+FF1A
    ('*', '＊'),  // U+FF0A
    ('?', '？'),  // U+FF1F
    ('"', '＂'),  // U+FF02
    ('<', '＜'),  // U+FF1C
    ('>', '＞'),  // U+FF1E
    ('|', '｜'),  // U+FF5C
];

/// Make a single path component safe for an archive entry name
pub fn sanitize_component(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| {
            if let Some((_, fullwidth)) = FORBIDDEN_CHARS.iter().find(|(f, _)| *f == c) {
                *fullwidth
            } else if c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let name_upper = result.to_uppercase();
    let base_name = name_upper.split('.').next().unwrap_or("");
    if RESERVED_NAMES.contains(&base_name) {
        result = format!("_{}", result);
    }

    // Windows strips trailing dots and spaces
    while result.ends_with('.') || result.ends_with(' ') {
        result.pop();
    }

    if result.is_empty() {
        result = "_unnamed".to_string();
    }

    result
}

/// Check whether a component survives sanitization unchanged
pub fn is_valid_component(name: &str) -> bool {
    !name.is_empty() && sanitize_component(name) == name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_replaced() {
        assert_eq!(sanitize_component("PBT/PET"), "PBT／PET");
        assert_eq!(sanitize_component("a\\b"), "a＼b");
    }

    #[test]
    fn test_reserved() {
        assert_eq!(sanitize_component("CON"), "_CON");
        assert_eq!(sanitize_component("aux.txt"), "_aux.txt");
    }

    #[test]
    fn test_trailing_and_empty() {
        assert_eq!(sanitize_component("Lab. "), "Lab");
        assert_eq!(sanitize_component("..."), "_unnamed");
        assert_eq!(sanitize_component("\u{1}"), "_");
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid_component("实验室"));
        assert!(!is_valid_component("a:b"));
        assert!(!is_valid_component(""));
    }
}
