//! Newline framing. Pretty-printed JSON only has line breaks between
//! tokens, so folding them keeps the text valid JSON on a single line.

pub fn to_frame(text: &str) -> String {
    let mut frame: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    frame.push('\n');
    frame
}
