use std::future::Future;
use std::thread;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Transfers a serialized response envelope to the orchestrator.
pub trait ResponseSender {
    fn send_response(&self, url: &str, body: &[u8]) -> Result<(), String>;
}

/// PUTs the envelope to a pre-signed callback URL.
///
/// The body goes out with an empty content type and a `Content-Length` equal
/// to its exact byte length; pre-signed URLs reject anything else.
#[derive(Debug, Clone, Default)]
pub struct HttpResponseSender {
    client: reqwest::Client,
}

impl HttpResponseSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ResponseSender for HttpResponseSender {
    fn send_response(&self, url: &str, body: &[u8]) -> Result<(), String> {
        let request_url = url.to_string();
        let body_bytes = body.to_vec();
        let client = self.client.clone();

        block_on_transfer(async move {
            let response = client
                .put(request_url)
                .header(CONTENT_TYPE, "")
                .header(CONTENT_LENGTH, body_bytes.len())
                .body(body_bytes)
                .send()
                .await
                .map_err(|error| format!("failed to send response: {error}"))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(format!("response endpoint returned {status}"))
            }
        })
    }
}

/// Drives `transfer` to completion from synchronous code.
///
/// `block_in_place` is only allowed on a multi-threaded runtime. Inside a
/// current-thread runtime the transfer runs on a scoped thread with its own
/// runtime instead, so the caller's runtime is never re-entered.
fn block_on_transfer<F>(transfer: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>> + Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(transfer))
        }
        Ok(_) => thread::scope(|scope| {
            scope
                .spawn(|| run_on_dedicated_runtime(transfer))
                .join()
                .map_err(|_| "response transfer thread panicked".to_string())?
        }),
        Err(_) => run_on_dedicated_runtime(transfer),
    }
}

fn run_on_dedicated_runtime<F>(transfer: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to start response runtime: {error}"))?
        .block_on(transfer)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    use super::*;

    const REPLY_HEADERS: &str = "content-length: 0\r\nconnection: close\r\n\r\n";

    struct CapturedRequest {
        head: String,
        body: Vec<u8>,
    }

    impl CapturedRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.head.lines().skip(1).find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim().eq_ignore_ascii_case(name).then_some(value.trim())
            })
        }
    }

    /// Accepts one request on a local port and answers it with `status_line`.
    fn serve_once(status_line: &'static str) -> (String, JoinHandle<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let address = listener.local_addr().expect("local address");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept connection");
            let mut buffer = Vec::new();
            let mut chunk = [0_u8; 1024];

            let header_end = loop {
                let read = stream.read(&mut chunk).expect("read request");
                assert!(read > 0, "connection closed before headers");
                buffer.extend_from_slice(&chunk[..read]);
                let found = buffer.windows(4).position(|window| window == b"\r\n\r\n");
                if let Some(position) = found {
                    break position;
                }
            };

            let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
            let mut captured = CapturedRequest {
                head,
                body: Vec::new(),
            };
            let content_length = captured
                .header("content-length")
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(0);
            let body_start = header_end + 4;
            while buffer.len() < body_start + content_length {
                let read = stream.read(&mut chunk).expect("read body");
                assert!(read > 0, "connection closed before body");
                buffer.extend_from_slice(&chunk[..read]);
            }
            captured.body = buffer[body_start..body_start + content_length].to_vec();

            let reply = format!("HTTP/1.1 {status_line}\r\n{REPLY_HEADERS}");
            stream.write_all(reply.as_bytes()).expect("write reply");
            captured
        });

        (format!("http://{address}/signed"), server)
    }

    #[test]
    fn puts_exact_body_with_empty_content_type() {
        let body = br#"{"Status":"SUCCESS"}"#;
        let (url, server) = serve_once("200 OK");

        HttpResponseSender::new()
            .send_response(&url, body)
            .expect("delivery should succeed");

        let request = server.join().expect("server thread");
        assert!(
            request.head.starts_with("PUT /signed HTTP/1.1"),
            "unexpected request line: {}",
            request.head
        );
        assert_eq!(request.header("content-type"), Some(""));
        assert_eq!(
            request.header("content-length"),
            Some(body.len().to_string().as_str())
        );
        assert_eq!(request.body, body);
    }

    #[test]
    fn rejected_response_is_an_error() {
        let (url, server) = serve_once("403 Forbidden");

        let error = HttpResponseSender::new()
            .send_response(&url, b"{}")
            .expect_err("403 should be reported");

        server.join().expect("server thread");
        assert_eq!(error, "response endpoint returned 403 Forbidden");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sends_from_inside_current_thread_runtime() {
        let (url, server) = serve_once("200 OK");

        let result = HttpResponseSender::new().send_response(&url, b"{}");

        server.join().expect("server thread");
        assert_eq!(result, Ok(()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sends_from_inside_multi_thread_runtime() {
        let (url, server) = serve_once("200 OK");

        let result = HttpResponseSender::new().send_response(&url, b"{}");

        server.join().expect("server thread");
        assert_eq!(result, Ok(()));
    }
}
