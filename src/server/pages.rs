//! Minimal HTML pages: landing, composer form and history listing.

use crate::history::HistoryEntry;
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
nav a{margin-right:1rem}table{border-collapse:collapse;width:100%}\
td,th{border-bottom:1px solid #ddd;padding:.4rem;text-align:left}";

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>\
         <nav><a href=\"/\">Home</a><a href=\"/composer\">Composer</a><a href=\"/history\">History</a></nav>\
         {body}</body></html>"
    )
}

pub fn landing() -> String {
    layout(
        "AI Music Composer",
        "<h1>AI Music Composer</h1>\
         <p>Describe a theme, pick a genre and a mood, and get a short original track.</p>\
         <p><a href=\"/composer\">Start composing</a></p>",
    )
}

pub fn composer() -> String {
    layout(
        "Composer",
        r#"<h1>Composer</h1>
<form id="composer">
<p><label>Theme <input name="prompt" required></label></p>
<p><label>Genre <input name="genre" value="Any"></label></p>
<p><label>Mood <input name="mood" value="Calm"></label></p>
<p><button type="submit">Generate</button></p>
</form>
<p id="status"></p>
<audio id="player" controls hidden></audio>
<script>
document.getElementById("composer").addEventListener("submit", async (e) => {
  e.preventDefault();
  const form = new FormData(e.target);
  const status = document.getElementById("status");
  status.textContent = "Generating...";
  const res = await fetch("/generate", {
    method: "POST",
    headers: {"Content-Type": "application/json"},
    body: JSON.stringify(Object.fromEntries(form)),
  });
  const data = await res.json();
  if (!res.ok) { status.textContent = data.error; return; }
  status.innerHTML = '<a href="' + data.url + '">Download</a>';
  const player = document.getElementById("player");
  player.src = data.url;
  player.hidden = false;
});
</script>"#,
    )
}

pub fn history(entries: &[HistoryEntry]) -> String {
    let mut body = String::from("<h1>History</h1>");
    if entries.is_empty() {
        body.push_str("<p>No tracks generated yet.</p>");
        return layout("History", &body);
    }

    body.push_str(
        "<table><tr><th>When</th><th>Theme</th><th>Genre</th><th>Mood</th><th></th></tr>",
    );
    for entry in entries {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href=\"{}\">Download</a></td></tr>",
            escape_html(&entry.timestamp),
            escape_html(&entry.prompt),
            escape_html(&entry.genre),
            escape_html(&entry.mood),
            escape_html(&entry.url),
        );
    }
    body.push_str("</table>");
    layout("History", &body)
}
