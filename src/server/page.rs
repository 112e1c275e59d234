//! Browse page
//!
//! Browsers asking for `text/html` get the listing rendered as a page that
//! loads `/static/js/app.js` for uploads and deletes. Everyone else gets
//! the same [`BrowseView`] as JSON.

use axum::http::{HeaderMap, header};
use serde::Serialize;
use std::fmt::Write;

use crate::storage::{Breadcrumb, Page};

/// Data behind one browse response
#[derive(Debug, Serialize)]
pub struct BrowseView {
    pub path: String,
    #[serde(flatten)]
    pub page: Page,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub storage_left: String,
    pub free: u64,
}

/// Whether the client prefers an HTML page over JSON.
pub fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

pub fn render_browse(view: &BrowseView) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>FlashVault</title>\n</head>\n<body>\n",
    );

    html.push_str("<nav class=\"breadcrumbs\"><a href=\"/browse/\">Home</a>");
    for crumb in &view.breadcrumbs {
        let _ = write!(
            html,
            " / <a href=\"/browse/{}\">{}</a>",
            encode_path(&crumb.path),
            escape(&crumb.name)
        );
    }
    html.push_str("</nav>\n");

    let _ = writeln!(
        html,
        "<p class=\"storage\">{} free &middot; {} items</p>",
        escape(&view.storage_left),
        view.page.count
    );

    let _ = write!(
        html,
        "<form id=\"uploadForm\">\n<input type=\"hidden\" name=\"current_path\" value=\"{}\">\n\
         <input type=\"file\" id=\"fileInput\" multiple>\n</form>\n\
         <div id=\"progressContainer\"><div id=\"progressBar\"></div>\
         <span id=\"progressPercent\">0%</span> <span id=\"progressLabel\"></span> \
         <span id=\"progressTime\"></span></div>\n",
        escape(&view.path)
    );

    html.push_str("<table>\n<tr><th>Name</th><th>Size</th><th>Modified</th><th></th></tr>\n");
    for item in &view.page.entries {
        let encoded = encode_path(&item.path);
        let name = escape(&item.name);
        if item.is_file {
            let _ = writeln!(
                html,
                "<tr><td><a href=\"/download/{encoded}\">{name}</a></td><td>{}</td><td>{}</td>\
                 <td><button data-path=\"{}\" data-name=\"{name}\" class=\"delete\">Delete</button></td></tr>",
                escape(&item.size_label),
                escape(&item.mtime),
                escape(&item.path)
            );
        } else {
            let _ = writeln!(
                html,
                "<tr><td><a href=\"/browse/{encoded}\">{name}/</a></td><td></td><td>{}</td><td></td></tr>",
                escape(&item.mtime)
            );
        }
    }
    html.push_str("</table>\n");

    if view.page.total_pages > 1 {
        let base = format!("/browse/{}", encode_path(&view.path));
        html.push_str("<nav class=\"pages\">");
        if view.page.page > 1 {
            let _ = write!(html, "<a href=\"{base}?page={}\">Previous</a> ", view.page.page - 1);
        }
        let _ = write!(html, "Page {} of {}", view.page.page, view.page.total_pages);
        if view.page.page < view.page.total_pages {
            let _ = write!(html, " <a href=\"{base}?page={}\">Next</a>", view.page.page + 1);
        }
        html.push_str("</nav>\n");
    }

    html.push_str("<script src=\"/static/js/app.js\"></script>\n</body>\n</html>\n");
    html
}

/// Percent-encodes each segment of a `/`-separated relative path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
