use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

/// One request as seen by the mock LRS.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Spawn a single-threaded mock LRS that answers `expected_requests`
/// sequential POSTs with the given status line, then exits.
///
/// Every response carries `Connection: close` so the client opens a fresh
/// connection per request. Returns the endpoint URL and a handle yielding
/// everything the mock received.
pub fn spawn_mock_lrs(
    expected_requests: usize,
    status: u16,
    reason: &str,
    response_body: &str,
) -> (String, JoinHandle<Vec<ReceivedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock LRS");
    let addr = listener.local_addr().expect("mock LRS addr");
    let url = format!("http://{addr}/xapi/statements");

    let reason = reason.to_string();
    let response_body = response_body.to_string();

    let handle = std::thread::spawn(move || {
        let mut received = Vec::with_capacity(expected_requests);

        for _ in 0..expected_requests {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);

            // Request line + headers
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");

            let mut headers = Vec::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header line");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    let name = name.trim().to_string();
                    let value = value.trim().to_string();
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.parse().unwrap_or(0);
                    }
                    headers.push((name, value));
                }
            }

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("request body");

            received.push(ReceivedRequest {
                headers,
                body: String::from_utf8_lossy(&body).to_string(),
            });

            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{response_body}",
                response_body.len()
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).expect("write response");
            stream.flush().expect("flush response");
        }

        received
    });

    (url, handle)
}
