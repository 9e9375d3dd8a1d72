/// Char-safe preview of user text for log lines, with a trailing ellipsis
/// when anything was cut.
#[inline]
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Strips the longest common leading whitespace from every non-blank line.
pub fn dedent(s: &str) -> String {
    let indent = s
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    s.lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                match line.char_indices().nth(indent) {
                    Some((offset, _)) => &line[offset..],
                    None => "",
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
