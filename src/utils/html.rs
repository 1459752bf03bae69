use ammonia;

/// Sanitizes user-authored text (reviews, comments, bios) before it is stored.
///
/// Safe inline markup such as <b> or <p> survives; <script> and <iframe> are
/// removed together with their content, and event-handler attributes are dropped.
pub fn clean_text(input: &str) -> String {
    ammonia::clean(input)
}
