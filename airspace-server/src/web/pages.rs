//! HTML page handlers.
//!
//! Each page is a complete HTML document composed from a shared base layout
//! and page-specific content. Templates and the browser shim are embedded at
//! compile time via `include_str!`.

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};

use airspace_core::pages::{NotFound, Route, NAV_ITEMS, SITE_DESCRIPTION, SITE_NAME};

const MAPBOX_GL_VERSION: &str = "3.9.4";

const BASE_CSS: &str = r#"* { margin: 0; padding: 0; box-sizing: border-box; }
html, body { height: 100%; }
body { font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; background: #0b1220; color: #e2e8f0; display: flex; flex-direction: column; }
nav { background: #0f172a; border-bottom: 1px solid #1e293b; padding: 8px 16px; display: flex; align-items: center; gap: 20px; }
nav .brand { color: #38bdf8; font-weight: 700; font-size: 15px; text-decoration: none; }
nav a { color: #94a3b8; text-decoration: none; font-size: 13px; }
nav a:hover, nav a.active { color: #f8fafc; }
main { flex: 1; display: flex; min-height: 0; position: relative; }
.map { flex: 1; position: relative; }
.map-fallback { position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; background: #111827; color: #fca5a5; font-size: 14px; padding: 24px; text-align: center; }
.banner { position: absolute; top: 12px; left: 12px; right: 12px; z-index: 10; background: rgba(185, 28, 28, 0.9); color: #fff; padding: 8px 12px; border-radius: 6px; font-size: 13px; }
.panel { position: absolute; z-index: 5; background: rgba(15, 23, 42, 0.92); border: 1px solid #1e293b; border-radius: 8px; padding: 12px; font-size: 13px; }
.sidebar { width: 320px; background: #0f172a; border-right: 1px solid #1e293b; padding: 12px; overflow-y: auto; font-size: 13px; }
button { background: #1e293b; color: #e2e8f0; border: 1px solid #334155; border-radius: 6px; padding: 6px 10px; cursor: pointer; font-size: 13px; }
button:hover, button.active { background: #0369a1; border-color: #0ea5e9; }
input, select { background: #0b1220; color: #e2e8f0; border: 1px solid #334155; border-radius: 6px; padding: 6px 8px; font-size: 13px; width: 100%; }
.muted { color: #94a3b8; }
.hidden { display: none; }"#;

fn nav_html(active: Option<Route>) -> String {
    let mut s = String::from("<nav>\n    <a href=\"/\" class=\"brand\">");
    s.push_str(SITE_NAME);
    s.push_str("</a>\n");
    for item in NAV_ITEMS {
        let class = match active {
            Some(route) if route.path() == item.path => " class=\"active\"",
            _ => "",
        };
        s.push_str(&format!("    <a href=\"{}\"{}>{}</a>\n", item.path, class, item.title));
    }
    s.push_str("</nav>");
    s
}

fn render_page(active: Option<Route>, title: &str, body: &str) -> Html<String> {
    let nav = nav_html(active);
    let mut s = String::with_capacity(body.len() + BASE_CSS.len() + nav.len() + 1024);
    s.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    s.push_str("<meta charset=\"UTF-8\">\n");
    s.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    s.push_str(&format!("<meta name=\"description\" content=\"{SITE_DESCRIPTION}\">\n"));
    s.push_str("<title>");
    s.push_str(SITE_NAME);
    if !title.is_empty() {
        s.push_str(" | ");
        s.push_str(title);
    }
    s.push_str("</title>\n");
    s.push_str(&format!(
        "<link rel=\"stylesheet\" href=\"https://api.mapbox.com/mapbox-gl-js/v{MAPBOX_GL_VERSION}/mapbox-gl.css\" />\n"
    ));
    s.push_str(&format!(
        "<script src=\"https://api.mapbox.com/mapbox-gl-js/v{MAPBOX_GL_VERSION}/mapbox-gl.js\"></script>\n"
    ));
    s.push_str("<script src=\"/static/airspace.js\"></script>\n");
    s.push_str("<style>\n");
    s.push_str(BASE_CSS);
    s.push_str("\n</style>\n");
    s.push_str("</head>\n<body>\n");
    s.push_str(&nav);
    s.push('\n');
    s.push_str(body);
    s.push_str("\n</body>\n</html>");
    Html(s)
}

fn render_route(route: Route, body: &str) -> Html<String> {
    render_page(Some(route), route.title(), body)
}

// ---------------------------------------------------------------------------
// Page handlers
// ---------------------------------------------------------------------------

pub async fn page_navigate() -> Html<String> {
    render_route(Route::Navigate, include_str!("../../templates/navigate.html"))
}

pub async fn page_mark() -> Html<String> {
    render_route(Route::Mark, include_str!("../../templates/mark.html"))
}

pub async fn page_places() -> Html<String> {
    render_route(Route::Places, include_str!("../../templates/places.html"))
}

pub async fn page_subway() -> Html<String> {
    render_route(Route::Subway, include_str!("../../templates/subway.html"))
}

pub async fn page_traffic() -> Html<String> {
    render_route(Route::Traffic, include_str!("../../templates/traffic.html"))
}

pub async fn page_not_found() -> impl IntoResponse {
    let body = format!(
        "<main><div class=\"map-fallback\" style=\"flex-direction: column; gap: 12px; color: #e2e8f0;\">\
         <code class=\"muted\">{}</code><h1>{}</h1><p class=\"muted\">{}</p>\
         <a href=\"/\"><button>{}</button></a></div></main>",
        NotFound::CODE,
        NotFound::TITLE,
        NotFound::MESSAGE,
        NotFound::ACTION
    );
    (StatusCode::NOT_FOUND, render_page(None, NotFound::TITLE, &body))
}

// ---------------------------------------------------------------------------
// Static assets
// ---------------------------------------------------------------------------

pub async fn static_shim() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        include_str!("../../static/airspace.js"),
    )
}

pub async fn static_airplane() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        include_str!("../../static/airplane.svg"),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_marks_active_route() {
        let nav = nav_html(Some(Route::Subway));
        assert!(nav.contains("<a href=\"/nyc-subway-stops\" class=\"active\">NYC Subway</a>"));
        assert!(nav.contains("<a href=\"/mark\">Mark</a>"));
        assert_eq!(nav.matches("class=\"active\"").count(), 1);
    }

    #[test]
    fn test_render_page_title() {
        let Html(page) = render_route(Route::Traffic, "<main></main>");
        assert!(page.contains("<title>Airspace | Traffic Monitor</title>"));
        assert!(page.contains("/static/airspace.js"));
    }

    #[test]
    fn test_templates_declare_their_scene() {
        for (route, body) in [
            (Route::Navigate, include_str!("../../templates/navigate.html")),
            (Route::Mark, include_str!("../../templates/mark.html")),
            (Route::Places, include_str!("../../templates/places.html")),
            (Route::Subway, include_str!("../../templates/subway.html")),
            (Route::Traffic, include_str!("../../templates/traffic.html")),
        ] {
            let marker = format!("data-scene=\"{}\"", route.slug());
            assert!(body.contains(&marker), "{} template", route.slug());
        }
    }
}
