//! Cleanup of raw model output before display.

/// Literal citation artifacts the file-search tool sometimes leaks into answer text.
///
/// The private-use characters are the markers that wrap inline file citations.
pub const CITATION_ARTIFACTS: [&str; 7] = [
    "\u{e200}",
    "\u{e201}",
    "\u{e202}",
    "filecite",
    "turn0file",
    "turn1file",
    "turn2file",
];

/// Remove every [`CITATION_ARTIFACTS`] substring and trim surrounding whitespace.
pub fn sanitize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut text = raw.to_string();
    for artifact in CITATION_ARTIFACTS {
        if text.contains(artifact) {
            text = text.replace(artifact, "");
        }
    }
    text.trim().to_string()
}
