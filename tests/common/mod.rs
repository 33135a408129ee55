//! Shared utilities for integration testing.

use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use filter_proxy::filter::{PolicyStore, StaticResolver};
use filter_proxy::net::connection::ConnectionTracker;
use filter_proxy::net::io::read_until_headers_end;
use filter_proxy::{Proxy, ProxyConfig, Shutdown};

/// A destination server that answers every connection with the same bytes.
pub struct MockDestination {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockDestination {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connections that delivered a request head.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request heads received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock destination on an ephemeral loopback port.
pub fn start_mock_destination(response: Vec<u8>) -> MockDestination {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let response: Arc<[u8]> = response.into();

    let (thread_hits, thread_requests) = (Arc::clone(&hits), Arc::clone(&requests));
    thread::spawn(move || {
        for socket in listener.incoming() {
            let Ok(mut socket) = socket else { break };
            let hits = Arc::clone(&thread_hits);
            let requests = Arc::clone(&thread_requests);
            let response = Arc::clone(&response);
            thread::spawn(move || {
                let Ok(head) = read_until_headers_end(&mut socket) else { return };
                requests
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).into_owned());
                hits.fetch_add(1, Ordering::SeqCst);
                let _ = socket.write_all(&response);
            });
        }
    });

    MockDestination {
        addr,
        hits,
        requests,
    }
}

/// Plain `200 OK` response carrying `body`.
pub fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// A proxy serving on a loopback port from a background thread.
#[allow(dead_code)]
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tracker: ConnectionTracker,
    pub policies: Arc<PolicyStore>,
    handle: JoinHandle<usize>,
    _filter_dir: tempfile::TempDir,
}

impl RunningProxy {
    /// Wait for the accept loop and pool drain to finish.
    /// Returns the number of connections dispatched.
    pub fn join(self) -> usize {
        self.handle.join().unwrap()
    }
}

/// Start a proxy on `127.0.0.1:0` with the given filter text and budget.
pub fn start_proxy(
    filter: &str,
    max_requests: usize,
    pool_size: usize,
    resolver: StaticResolver,
) -> RunningProxy {
    let dir = tempfile::tempdir().unwrap();
    let filter_path = dir.path().join("filter.txt");
    fs::write(&filter_path, filter).unwrap();

    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.max_requests = max_requests;
    config.pool.size = pool_size;
    config.filter.path = filter_path;

    let proxy = Proxy::start(&config, Arc::new(resolver)).unwrap();
    let addr = proxy.local_addr().unwrap();
    let shutdown = proxy.shutdown_handle();
    let tracker = proxy.tracker();
    let policies = proxy.policies();
    let handle = thread::spawn(move || proxy.run());

    RunningProxy {
        addr,
        shutdown,
        tracker,
        policies,
        handle,
        _filter_dir: dir,
    }
}

/// Send `request` to `addr` and read until the proxy closes the connection.
pub fn send(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(request).unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    response
}

/// First line of a response, without the CRLF.
#[allow(dead_code)]
pub fn status_line(response: &[u8]) -> String {
    String::from_utf8_lossy(response)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}
