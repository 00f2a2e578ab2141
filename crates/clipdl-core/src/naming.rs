//! Output filename rules: sanitizing and base-name derivation.

/// Extension of every saved asset.
pub const MEDIA_EXTENSION: &str = "mp4";

/// Sanitizes a candidate filename for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, whitespace and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing spaces, dots and underscores
/// - Limits length to 255 bytes (Linux NAME_MAX), minus room for the extension
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255 - (MEDIA_EXTENSION.len() + 1);

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = if c == '\0'
            || c == '/'
            || c == '\\'
            || c.is_control()
            || c.is_whitespace()
        {
            '_'
        } else {
            c
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.' || c == '_');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Base name for an `order` + `player` pair, e.g. `5@Bob`.
pub fn player_base_name(order: u32, player: &str) -> String {
    sanitize_filename(&format!("{}@{}", order, player))
}

/// File name (with extension) for a base name.
pub fn media_file_name(base_name: &str) -> String {
    format!("{}.{}", base_name, MEDIA_EXTENSION)
}

/// Leading run of ASCII digits in a file name, parsed as an integer.
/// `"7.mp4"` → 7, `"12@bob.mp4"` → 12, `"x.mp4"` → None.
pub fn leading_number(file_name: &str) -> Option<u64> {
    let end = file_name
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(file_name.len());
    if end == 0 {
        return None;
    }
    file_name[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_slash_and_backslash() {
        assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
    }

    #[test]
    fn spaces_become_underscores() {
        assert_eq!(sanitize_filename("1. Nice  shot"), "1._Nice_shot");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(sanitize_filename("  ..  clip  ..  "), "clip");
    }

    #[test]
    fn control_chars() {
        assert_eq!(sanitize_filename("clip\x00name"), "clip_name");
    }

    #[test]
    fn long_names_leave_room_for_extension() {
        let long = "a".repeat(400);
        let out = sanitize_filename(&long);
        assert_eq!(media_file_name(&out).len(), 255);
    }

    #[test]
    fn player_names() {
        assert_eq!(player_base_name(5, "Bob"), "5@Bob");
        assert_eq!(media_file_name(&player_base_name(5, "Bob")), "5@Bob.mp4");
    }

    #[test]
    fn leading_numbers() {
        assert_eq!(leading_number("7.mp4"), Some(7));
        assert_eq!(leading_number("12@bob.mp4"), Some(12));
        assert_eq!(leading_number("3._title.mp4"), Some(3));
        assert_eq!(leading_number("x.mp4"), None);
        assert_eq!(leading_number(""), None);
    }
}
