// src/utils/html.rs

/// Sanitizes an exercise description before it is stored.
///
/// Whitelist based: formatting tags such as `<p>`, `<code>` and `<pre>`
/// survive, while `<script>`, `<iframe>` and event handler attributes are
/// stripped. Script content is removed entirely.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
