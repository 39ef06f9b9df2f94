//! Output filename convention for generation tasks.
//!
//! Prefixes are derived only from names and the batch-wide ordinal, so a
//! re-run with unchanged inputs writes to the same filenames.

/// Characters that are invalid in filenames on at least one target OS.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Substitute for a component that sanitizes to nothing.
const EMPTY_COMPONENT: &str = "untitled";

/// Make a name safe to embed in a filename.
///
/// Whitespace and reserved characters become `_`; other characters
/// (including non-ASCII) are kept. Leading/trailing whitespace is trimmed
/// first.
pub fn sanitize_component(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return EMPTY_COMPONENT.to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if c.is_whitespace() || FORBIDDEN_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Generate the filename prefix for a task.
///
/// Convention: `{sequence_}{scene}_{ordinal:04}`; the sequence component is
/// omitted for single-scene previews.
///
/// ```
/// use tableau_core::naming::filename_prefix;
///
/// assert_eq!(filename_prefix(Some("Opening"), "Beach Walk", 3), "Opening_Beach_Walk_0003");
/// assert_eq!(filename_prefix(None, "Beach Walk", 12), "Beach_Walk_0012");
/// ```
pub fn filename_prefix(sequence_name: Option<&str>, scene_name: &str, ordinal: u32) -> String {
    let mut name = String::new();

    if let Some(seq) = sequence_name {
        name.push_str(&sanitize_component(seq));
        name.push('_');
    }

    name.push_str(&sanitize_component(scene_name));
    name.push_str(&format!("_{ordinal:04}"));
    name
}
