//! Serves fake clip pages and their media files.
//!
//! - `GET /<channel>/clip/<slug>` returns a page whose `<video>` points at
//!   `/media/<slug>.mp4`; slugs starting with `nomedia` get a page without one.
//! - `GET /media/<slug>.mp4` returns the slug's registered body, or 404.

use std::collections::HashMap;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use super::{read_request, respond};

pub struct ClipServer {
    base: String,
}

impl ClipServer {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn clip_url(&self, channel: &str, slug: &str) -> String {
        format!("{}/{}/clip/{}", self.base, channel, slug)
    }

    pub fn media_url(&self, slug: &str) -> String {
        format!("{}/media/{}.mp4", self.base, slug)
    }
}

/// Starts the server in a background thread with `media` (slug -> body).
/// Runs until the process exits.
pub fn start(media: HashMap<String, Vec<u8>>) -> ClipServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let media = Arc::new(media);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let media = Arc::clone(&media);
            thread::spawn(move || handle(stream, &media));
        }
    });
    ClipServer {
        base: format!("http://127.0.0.1:{}", port),
    }
}

fn handle(mut stream: TcpStream, media: &HashMap<String, Vec<u8>>) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    if request.method != "GET" {
        respond(&mut stream, "405 Method Not Allowed", "text/plain", b"");
        return;
    }
    let segments: Vec<&str> = request
        .path
        .split('?')
        .next()
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match segments.as_slice() {
        [_channel, "clip", slug] if slug.starts_with("nomedia") => {
            let page = "<html><body><div id=\"player\"></div></body></html>";
            respond(&mut stream, "200 OK", "text/html", page.as_bytes());
        }
        [_channel, "clip", slug] => {
            let page = format!(
                "<html><body><video playsinline src=\"/media/{}.mp4\"></video></body></html>",
                slug
            );
            respond(&mut stream, "200 OK", "text/html", page.as_bytes());
        }
        ["media", file] => {
            let slug = file.trim_end_matches(".mp4");
            match media.get(slug) {
                Some(body) => respond(&mut stream, "200 OK", "video/mp4", body),
                None => respond(&mut stream, "404 Not Found", "text/plain", b"not found"),
            }
        }
        _ => respond(&mut stream, "404 Not Found", "text/plain", b"not found"),
    }
}
