/// Local HTTP server standing in for an upstream provider in tests.
///
/// Binds an ephemeral port on 127.0.0.1 and answers every request with
/// whatever the `respond` closure returns for its URL and body. Requests
/// are recorded before they are answered, so once a client call returns
/// every request it made is visible through `requests()`.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// (url, body) of one received request.
pub(crate) type Recorded = (String, String);

pub(crate) struct StubServer {
    server: Arc<tiny_http::Server>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<JoinHandle<()>>,
    base_url: String,
}

impl StubServer {
    pub(crate) fn start<F>(respond: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, String) + Send + 'static,
    {
        let server = Arc::new(tiny_http::Server::http("127.0.0.1:0").expect("bind stub server"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("stub server listens on TCP")
            .port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            std::thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let url = request.url().to_string();
                    let (status, payload) = respond(&url, &body);

                    requests.lock().expect("request log").push((url, body));

                    let response = tiny_http::Response::from_string(payload).with_status_code(status);
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            server,
            requests,
            handle: Some(handle),
            base_url: format!("http://127.0.0.1:{}", port),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("request log").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
