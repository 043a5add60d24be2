use serde::Serialize;

use crate::analysis::escape_json;
use crate::models::FileRecord;

/// Format a result as minified JSON.
pub fn format_json<T: Serialize>(result: &T) -> String {
    serde_json::to_string(result)
        .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", escape_json(&e.to_string())))
}

/// Format an error as JSON.
pub fn format_error(err: &dyn std::fmt::Display) -> String {
    format!("{{\"error\":\"{}\"}}", escape_json(&err.to_string()))
}

/// Search results with their count.
#[derive(Debug, Serialize)]
pub struct SearchOutput<'a> {
    pub count: usize,
    pub results: &'a [FileRecord],
}

/// Cut the middle out of `input` so it fits in `max_chars` characters.
pub fn truncate_middle(input: &str, max_chars: usize) -> String {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= max_chars {
        return input.to_string();
    }

    if max_chars <= 3 {
        return "...".to_string();
    }

    let keep = max_chars - 3;
    let left = keep / 2;
    let right = keep - left;

    let start: String = chars[..left].iter().collect();
    let end: String = chars[chars.len() - right..].iter().collect();
    format!("{start}...{end}")
}

/// One numbered line per row, for the interactive session.
pub fn format_rows(rows: &[FileRecord], path_width: usize) -> String {
    let mut out = String::new();
    for (i, r) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>12}  {:<19}  {:<19}  {:<19}\n",
            i + 1,
            truncate_middle(&r.full_path, path_width),
            r.size,
            r.creation_time,
            r.last_access_time,
            r.last_write_time,
            width = path_width,
        ));
    }
    out.push_str(&format!("({} rows)", rows.len()));
    out
}
