//! Custom CSS sanitizer.
//!
//! The form page embeds user-supplied CSS inside a `<style>` block, so every
//! tag, attribute and comment is stripped first and the remaining text is
//! entity-escaped. The content of elements that never render as text
//! (`<script>`, `<style>`, ...) is discarded together with the element.

use std::collections::HashSet;

use ammonia::Builder;

/// Elements whose inner text is dropped along with the tags.
const NON_TEXT_TAGS: [&str; 5] = ["script", "style", "textarea", "option", "noscript"];

/// Strip all markup from `css`, keeping plain text.
///
/// Returns `None` for missing or empty input.
pub fn sanitize_custom_css(css: Option<&str>) -> Option<String> {
    let css = css.filter(|c| !c.is_empty())?;
    let cleaned = Builder::empty()
        .clean_content_tags(NON_TEXT_TAGS.into_iter().collect::<HashSet<_>>())
        .clean(css)
        .to_string();
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_removed_with_its_content() {
        assert_eq!(
            sanitize_custom_css(Some("<script>evil()</script>color: red")),
            Some("color: red".to_string())
        );
    }

    #[test]
    fn empty_and_missing_input_yield_none() {
        assert_eq!(sanitize_custom_css(None), None);
        assert_eq!(sanitize_custom_css(Some("")), None);
    }

    #[test]
    fn plain_css_passes_through() {
        let css = ".form { color: #333; } div p { margin: 0 }";
        assert_eq!(sanitize_custom_css(Some(css)).as_deref(), Some(css));
    }

    #[test]
    fn tags_and_attributes_are_stripped_but_text_kept() {
        assert_eq!(
            sanitize_custom_css(Some(r#"<div class="x" onclick="a>b">body { margin: 0 }</div>"#))
                .as_deref(),
            Some("body { margin: 0 }")
        );
    }

    #[test]
    fn style_element_content_is_dropped() {
        assert_eq!(
            sanitize_custom_css(Some("a{}<STYLE>b{}</style >c{}")).as_deref(),
            Some("a{}c{}")
        );
    }

    #[test]
    fn comments_are_removed() {
        assert_eq!(
            sanitize_custom_css(Some("a{}<!-- hidden -->b{}")).as_deref(),
            Some("a{}b{}")
        );
    }

    #[test]
    fn stray_angle_bracket_is_escaped() {
        assert_eq!(
            sanitize_custom_css(Some("a < b")).as_deref(),
            Some("a &lt; b")
        );
    }

    #[test]
    fn tags_rebuilt_from_fragments_stay_escaped() {
        let cleaned = sanitize_custom_css(Some("p{}<</b>/style><<b>script>alert(1)<</b>/script>"))
            .expect("non-empty input");

        assert!(!cleaned.contains('<'));
        assert!(!cleaned.contains('>'));
        assert_eq!(cleaned, "p{}&lt;/style&gt;&lt;script&gt;alert(1)&lt;/script&gt;");
    }

    #[test]
    fn unterminated_tag_swallows_the_rest() {
        assert_eq!(
            sanitize_custom_css(Some("color: red<img src=x onerror=alert(1)")).as_deref(),
            Some("color: red")
        );
    }

    #[test]
    fn unclosed_script_drops_everything_after_it() {
        assert_eq!(
            sanitize_custom_css(Some("a{}<script>alert(1)")).as_deref(),
            Some("a{}")
        );
    }
}
