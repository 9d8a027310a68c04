use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: preserves safe tags (like <b>, <sub>, <sup>,
/// which show up in chemistry and math explanations) while stripping dangerous
/// tags (like <script>) and malicious attributes (like onclick).
///
/// Applied on the admin question-authoring path as a fail-safe against stored
/// XSS. The bulk importer has its own plain-text sanitation and does not go
/// through here.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
