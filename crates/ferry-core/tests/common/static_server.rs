//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves GET for any stored path and accepts media uploads in the
//! `POST /upload/b/<bucket>/o?uploadType=media&name=<key>` shape, storing
//! them under `<bucket>/<key>`. Pointing [`ObjectStoreEndpoints`] at it
//! emulates the object store; plain paths double as ordinary HTTP pages.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ferry_core::backend::ObjectStoreEndpoints;

type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

pub struct StaticServer {
    base: String,
    store: Store,
    auth_seen: Arc<Mutex<Vec<String>>>,
}

impl StaticServer {
    /// `http://127.0.0.1:<port>` without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Serves `body` at `/<path>`.
    pub fn put(&self, path: &str, body: &[u8]) {
        self.store
            .lock()
            .unwrap()
            .insert(path.trim_start_matches('/').to_string(), body.to_vec());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.store
            .lock()
            .unwrap()
            .get(path.trim_start_matches('/'))
            .cloned()
    }

    /// Stored paths that start with `prefix`.
    pub fn paths_under(&self, prefix: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .store
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// `Authorization` header values received so far.
    pub fn auth_headers(&self) -> Vec<String> {
        self.auth_seen.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> ObjectStoreEndpoints {
        ObjectStoreEndpoints {
            download: self.base.clone(),
            upload: format!("{}/upload", self.base),
        }
    }
}

/// Starts the server on a background thread; it runs until the process exits.
pub fn start() -> StaticServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let store: Store = Arc::default();
    let auth_seen: Arc<Mutex<Vec<String>>> = Arc::default();
    {
        let store = Arc::clone(&store);
        let auth_seen = Arc::clone(&auth_seen);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let store = Arc::clone(&store);
                let auth_seen = Arc::clone(&auth_seen);
                thread::spawn(move || handle(stream, &store, &auth_seen));
            }
        });
    }
    StaticServer {
        base: format!("http://127.0.0.1:{}", port),
        store,
        auth_seen,
    }
}

struct Request {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn handle(mut stream: TcpStream, store: &Store, auth_seen: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    if let Some(auth) = req.header("Authorization") {
        auth_seen.lock().unwrap().push(auth.to_string());
    }

    let (path, query) = match req.target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (req.target.as_str(), ""),
    };
    let path = urlencoding::decode(path.trim_start_matches('/'))
        .map(|p| p.into_owned())
        .unwrap_or_default();

    match req.method.as_str() {
        "GET" => {
            let body = store.lock().unwrap().get(&path).cloned();
            match body {
                Some(body) => respond(&mut stream, "200 OK", &body),
                None => respond(&mut stream, "404 Not Found", b"not found"),
            }
        }
        "POST" => match upload_key(&path, query) {
            Some(key) => {
                store.lock().unwrap().insert(key, req.body);
                respond(&mut stream, "200 OK", b"{}");
            }
            None => respond(&mut stream, "400 Bad Request", b"bad upload"),
        },
        _ => respond(&mut stream, "405 Method Not Allowed", b""),
    }
}

/// `upload/b/<bucket>/o` + `name=<key>` → `<bucket>/<key>`.
fn upload_key(path: &str, query: &str) -> Option<String> {
    let bucket = path.strip_prefix("upload/b/")?.strip_suffix("/o")?;
    let name = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("name="))?;
    let key = urlencoding::decode(name).ok()?;
    Some(format!("{}/{}", bucket, key))
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Some(Request {
        method,
        target,
        headers,
        body,
    })
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}
