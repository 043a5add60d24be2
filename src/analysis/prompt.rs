//! Prompt rendering and the string escaping/extraction used on the wire.

use crate::models::FileRecord;

/// Render the analysis prompt for one record.
#[must_use]
pub fn build_prompt(record: &FileRecord) -> String {
    format!(
        "You are a junk-file cleanup assistant for everyday users.\n\
         Analyse the file below very briefly. Output nothing beyond the requested format.\n\
         \n\
         File information:\n\
         - Name: {name}\n\
         - Path: {path}\n\
         - Size: {size} bytes\n\
         - Created: {created}\n\
         - Last modified: {written}\n\
         - Last accessed: {accessed}\n\
         \n\
         Answer in exactly this format:\n\
         \n\
         1. Likely origin: one sentence on where the file comes from or what it is for.\n\
         2. Deletion risk: 0-100 (higher is more dangerous).\n\
         3. Advice: one sentence.\n",
        name = record.file_name(),
        path = record.full_path,
        size = record.size,
        created = or_unknown(&record.creation_time),
        written = or_unknown(&record.last_write_time),
        accessed = or_unknown(&record.last_access_time),
    )
}

fn or_unknown(time: &str) -> &str {
    if time.is_empty() {
        "unknown"
    } else {
        time
    }
}

/// Escape `s` for use inside a JSON string literal.
#[must_use]
pub fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) <= 0x1F => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

/// Find the first `"content"` key in a response body and decode its string
/// value. Only that one value is parsed; the rest of the envelope is ignored.
#[must_use]
pub fn extract_content(body: &str) -> Option<String> {
    const KEY: &str = "\"content\"";
    let after_key = &body[body.find(KEY)? + KEY.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();
    if !after_colon.starts_with('"') {
        return None;
    }
    let mut values = serde_json::Deserializer::from_str(after_colon).into_iter::<String>();
    values.next()?.ok()
}
