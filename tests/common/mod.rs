//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use call_tracker::backend::{
    current_transaction, AttributeSink, Attributes, ExternalSegment, SegmentHandle, TelemetryResult,
    TracingBackend, TransactionId,
};

/// Start a mock HTTP backend on an ephemeral port.
///
/// `respond` maps the request path to a status code and body.
#[allow(dead_code)]
pub async fn start_programmable_backend<F>(respond: F) -> SocketAddr
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let mut read = 0;
                        loop {
                            match socket.read(&mut buf[read..]).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    read += n;
                                    let end = buf[..read].windows(4).any(|w| w == b"\r\n\r\n");
                                    if end || read == buf.len() {
                                        break;
                                    }
                                }
                            }
                        }
                        let head = String::from_utf8_lossy(&buf[..read]);
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = respond(&path);
                        let status_text = match status {
                            200 => "200 OK",
                            204 => "204 No Content",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend answering 500 on paths starting with `/fail` and 200 elsewhere.
#[allow(dead_code)]
pub async fn start_mock_backend() -> SocketAddr {
    start_programmable_backend(|path| {
        if path.starts_with("/fail") {
            (500, "boom".to_string())
        } else {
            (200, "ok".to_string())
        }
    })
    .await
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Sink that keeps every batch it receives, in order.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct BatchSink {
    batches: Arc<Mutex<Vec<(TransactionId, Attributes)>>>,
}

#[allow(dead_code)]
impl BatchSink {
    pub fn batches_for(&self, transaction: &TransactionId) -> Vec<Attributes> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|(tx, _)| tx == transaction)
            .map(|(_, attrs)| attrs.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

impl AttributeSink for BatchSink {
    fn add_attributes(
        &self,
        transaction: &TransactionId,
        attributes: &Attributes,
    ) -> TelemetryResult<()> {
        self.batches
            .lock()
            .unwrap()
            .push((transaction.clone(), attributes.clone()));
        Ok(())
    }
}

/// Task-local backend that also remembers every segment and error it sees.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub segments: Arc<Mutex<Vec<String>>>,
    pub errors: Arc<Mutex<Vec<String>>>,
}

impl TracingBackend for RecordingBackend {
    fn current_transaction_id(&self) -> Option<TransactionId> {
        current_transaction()
    }

    fn start_external_segment(&self, segment: &ExternalSegment) -> TelemetryResult<SegmentHandle> {
        self.segments.lock().unwrap().push(segment.name.clone());
        Ok(SegmentHandle::detached())
    }

    fn notice_error(&self, message: &str) -> TelemetryResult<()> {
        self.errors.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
