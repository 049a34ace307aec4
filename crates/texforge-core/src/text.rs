//! Small string helpers shared by the renderers.

/// Prefixes every line of `text` with `prefix`, stripping trailing whitespace
/// from the resulting lines.
pub fn prefix_lines(prefix: &str, text: &str) -> String {
    text.split('\n')
        .map(|line| format!("{prefix}{line}").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strips trailing whitespace from every line.
pub fn trim_line_ends(text: &str) -> String {
    text.split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a bracketed option list (`[a,b]`), or nothing when empty.
pub fn bracket_options(options: &[String]) -> String {
    if options.is_empty() {
        String::new()
    } else {
        format!("[{}]", options.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_lines_strips_blank_prefixes() {
        assert_eq!(prefix_lines("% ", "a\n\nb"), "% a\n%\n% b");
    }

    #[test]
    fn test_trim_line_ends() {
        assert_eq!(trim_line_ends("a  \n b\t\n"), "a\n b\n");
    }

    #[test]
    fn test_bracket_options() {
        assert_eq!(bracket_options(&[]), "");
        assert_eq!(
            bracket_options(&["11pt".to_string(), "letterpaper".to_string()]),
            "[11pt,letterpaper]"
        );
    }
}
