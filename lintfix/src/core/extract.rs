//! Isolation of the answer region in a free-form model response.

/// Token that precedes the answer in every stage prompt.
pub const OUTPUT_MARKER: &str = "Output:";

/// Return the text after the last `Output:` marker, trimmed.
///
/// Prompts may quote the marker in their instructions, so only the final
/// occurrence counts. A response without any marker is returned whole
/// (trimmed); models do not emit the marker reliably.
pub fn extract(response: &str) -> &str {
    match response.rfind(OUTPUT_MARKER) {
        Some(pos) => response[pos + OUTPUT_MARKER.len()..].trim(),
        None => response.trim(),
    }
}
