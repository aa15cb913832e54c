use regex::Regex;

lazy_static::lazy_static! {
    // Conversational opener on the first line, removed together with its line break.
    static ref PREAMBLE_RE: Regex = Regex::new(
        r"(?i)\A(?:Here's|Here’s|Here is|This is|I see|I can see|Let me|Allow me to).+?\n"
    ).unwrap();
    // A line opening with "In conclusion" and everything after it, plus the line breaks leading into it.
    static ref CONCLUSION_RE: Regex =
        Regex::new(r"(?is)(?:\A|\n+)[ \t]*in conclusion\b.*\z").unwrap();
    static ref LIST_MARKER_RE: Regex = Regex::new(r"(?m)^-\s*").unwrap();
    static ref BULLET_RE: Regex = Regex::new(r"(?m)^\s*•\s*").unwrap();
}

/// Clean up a raw model response into plain text.
///
/// The rules run in a fixed order, each on the output of the previous one:
///
/// 1. drop a leading conversational line ("Here's what I see:", "Let me ...")
/// 2. drop a trailing "In conclusion ..." paragraph
/// 3. drop `**` bold markers
/// 4. drop remaining `*` italic markers
/// 5. drop backticks
/// 6. drop `-` list markers at line starts
/// 7. drop `•` bullets at line starts
/// 8. trim
///
/// # Example
///
/// ```rust
/// use image_analyzer::normalize::normalize_response;
///
/// let raw = "Here's what I see:\nA red car.\n\nIn conclusion, it's nice.";
/// assert_eq!(normalize_response(raw), "A red car.");
/// ```
pub fn normalize_response(raw: &str) -> String {
    let text = PREAMBLE_RE.replace(raw, "");
    let text = CONCLUSION_RE.replace(&text, "");
    let text = text.replace("**", "").replace('*', "").replace('`', "");
    let text = LIST_MARKER_RE.replace_all(&text, "");
    let text = BULLET_RE.replace_all(&text, "");
    text.trim().to_string()
}
