use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// Canned reply for one CMS path.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    #[allow(dead_code)]
    pub fn error(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

/// Minimal Strapi stand-in. Answers by request path and records every
/// request URL it sees.
pub struct CmsStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CmsStub {
    pub fn spawn(replies: Vec<(&str, Reply)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start cms stub server");
        let base_url = format!("http://{}", server.server_addr());
        let replies: HashMap<String, Reply> = replies
            .into_iter()
            .map(|(path, reply)| (path.to_owned(), reply))
            .collect();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_for_thread = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_owned();
                requests_for_thread.lock().unwrap().push(url.clone());

                let path = url.split('?').next().unwrap_or(&url);
                let reply = replies.get(path).cloned().unwrap_or(Reply {
                    status: 404,
                    body: r#"{"data":null,"error":{"status":404,"name":"NotFoundError"}}"#
                        .to_owned(),
                });

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"application/json; charset=utf-8"[..],
                )
                .expect("content-type header");
                let response = tiny_http::Response::from_string(reply.body)
                    .with_status_code(reply.status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Decoded value of `key` in the most recent request's query string.
    pub fn last_param(&self, key: &str) -> Option<String> {
        let requests = self.requests.lock().unwrap();
        let url = requests.last()?;
        let query = url.split_once('?').map(|(_, q)| q)?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[allow(dead_code)]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Drop for CmsStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Article collection response holding one entry in the nested v4 shape.
#[allow(dead_code)]
pub fn article_response(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "data": [{
            "id": 1,
            "attributes": {
                "title": "Hello Strapi",
                "slug": slug,
                "description": "A first post",
                "publishedAt": "2024-03-05T10:00:00.000Z",
                "cover": { "data": { "id": 9, "attributes": {
                    "url": "/uploads/cover.png",
                    "alternativeText": "Cover art",
                    "formats": { "large": { "url": "/uploads/large_cover.png" } }
                } } },
                "author": { "data": { "id": 2, "attributes": { "name": "Ada" } } },
                "category": { "data": { "id": 3, "attributes": { "name": "News", "slug": "news" } } },
                "blocks": [
                    { "__component": "shared.rich-text", "body": "Intro with **emphasis**." },
                    { "__component": "shared.quote", "title": "Grace", "body": "Ship it." },
                    { "__component": "shared.media", "file": { "data": { "attributes": {
                        "url": "https://cdn.example/photo.jpg", "name": "photo.jpg"
                    } } } },
                    { "__component": "shared.slider", "files": { "data": [
                        { "attributes": { "url": "/uploads/one.png" } },
                        { "attributes": { "url": "/uploads/two.png" } }
                    ] } },
                    { "__component": "shared.countdown", "until": "2030-01-01" }
                ]
            }
        }],
        "meta": { "pagination": { "page": 1, "pageSize": 25, "pageCount": 1, "total": 1 } }
    })
}
