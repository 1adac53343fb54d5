use crate::error::ErrorMessage;

/// Column width used when flattening HTML to text. Only affects where the
/// derived text wraps, not what search can match.
const TEXT_WIDTH: usize = 80;

/// Strip scripts, event handlers and other disallowed markup from
/// user-supplied HTML before it is stored.
pub fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Flatten rendered HTML into plain text for search and excerpts.
pub fn plain_text(html: &str) -> Result<String, ErrorMessage> {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH).map_err(|_| ErrorMessage::ServerError)
}

/// First `max_chars` characters of the text with whitespace collapsed,
/// marked with a trailing ellipsis when anything was cut.
pub fn excerpt_of(raw_text: &str, max_chars: usize) -> String {
    let collapsed = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Estimated reading time at 200 words per minute, never below one minute.
pub fn reading_minutes(raw_text: &str) -> i32 {
    let words = raw_text.split_whitespace().count();
    words.div_ceil(200).max(1) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_scripts_keeps_markup() {
        let cleaned = sanitize_html("<p>hi</p><script>alert(1)</script>");
        assert!(cleaned.contains("<p>hi</p>"));
        assert!(!cleaned.contains("script"));
    }

    #[test]
    fn plain_text_strips_tags() {
        let text = plain_text("<p>Hello world</p>").unwrap();
        assert!(text.contains("Hello world"));
    }

    #[test]
    fn excerpt_passes_short_text_through() {
        assert_eq!(excerpt_of("a short line", 300), "a short line");
    }

    #[test]
    fn excerpt_truncates_and_collapses_whitespace() {
        let long = "word ".repeat(100);
        let excerpt = excerpt_of(&long, 20);
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.chars().count() <= 23);
        assert!(!excerpt.contains("  "));
    }

    #[test]
    fn reading_time_floors_at_one_minute() {
        assert_eq!(reading_minutes(""), 1);
        assert_eq!(reading_minutes("word"), 1);
    }

    #[test]
    fn reading_time_rounds_up() {
        let text = "word ".repeat(500);
        assert_eq!(reading_minutes(&text), 3);
    }
}
