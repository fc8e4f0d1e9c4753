//! Human-readable status page served on `/`.

use crate::directory::{DIRECTORY_PATH, StreamDirectory};

/// Render the status page for `directory`.
pub fn status_page(directory: &StreamDirectory) -> String {
    let url = escape_html(directory.stream_url());
    format!(
        "<!doctype html>\n\
         <html><head><meta charset=\"utf-8\"><title>FOV stream server</title></head>\n\
         <body>\n\
         <h1>\u{2705} FOV WebSocket server is alive</h1>\n\
         <p>Try connecting to <code>{url}</code></p>\n\
         <p>Stream directory: <a href=\"{DIRECTORY_PATH}\"><code>{DIRECTORY_PATH}</code></a></p>\n\
         </body></html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
