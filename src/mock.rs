//! In-process owserver stand-ins for tests.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::header::{OwHeader, FORMAT_FLAGS, HEADER_SIZE};
use crate::message::MessageType;

/// Routes `log` output through the test harness.
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a response frame: header followed by `payload`.
pub(crate) fn frame(ret: i32, payload_len: i32, data_len: i32, payload: &[u8]) -> Vec<u8> {
    let header = OwHeader {
        version: 0,
        payload_len,
        function: ret,
        format_flags: FORMAT_FLAGS,
        data_len,
        offset: 0,
    };
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

/// Reads one request, returning its header and raw payload.
fn read_request(stream: &mut TcpStream) -> std::io::Result<(OwHeader, Vec<u8>)> {
    let mut buf = [0u8; HEADER_SIZE];
    stream.read_exact(&mut buf)?;
    let header = OwHeader::from_bytes(&buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let mut payload = vec![0u8; usize::try_from(header.payload_len).unwrap_or(0)];
    stream.read_exact(&mut payload)?;
    Ok((header, payload))
}

/// Accepts a single connection, records the request and answers with
/// canned bytes before closing.
pub(crate) struct ScriptedServer {
    port: u16,
    handle: JoinHandle<Vec<u8>>,
}

impl ScriptedServer {
    pub(crate) fn reply(response: Vec<u8>) -> Self {
        init_logging();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let (header, payload) = read_request(&mut stream).unwrap();
            stream.write_all(&response).unwrap();
            let mut received = header.to_bytes().to_vec();
            received.extend_from_slice(&payload);
            received
        });
        Self { port, handle }
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the exchange to finish and returns the request bytes.
    pub(crate) fn received(self) -> Vec<u8> {
        self.handle.join().unwrap()
    }
}

#[derive(Default)]
struct Tree {
    values: HashMap<String, String>,
    dirs: HashMap<String, Vec<String>>,
    pings: HashSet<String>,
}

/// A fake owserver serving a virtual tree until the test process exits.
#[derive(Default)]
pub(crate) struct FakeOwserver {
    tree: Tree,
}

/// Handle to a running [`FakeOwserver`].
pub(crate) struct RunningOwserver {
    port: u16,
    tree: Arc<Mutex<Tree>>,
    requests: Arc<Mutex<Vec<(MessageType, String)>>>,
}

fn split_uncached(path: &str) -> (bool, String) {
    if path == "/uncached" {
        (true, "/".to_string())
    } else if let Some(rest) = path.strip_prefix("/uncached/") {
        (true, format!("/{}", rest))
    } else {
        (false, path.to_string())
    }
}

impl FakeOwserver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn value(mut self, path: &str, value: &str) -> Self {
        self.tree.values.insert(path.to_string(), value.to_string());
        self
    }

    pub(crate) fn dir(mut self, path: &str, entries: &[&str]) -> Self {
        self.tree.dirs.insert(
            path.to_string(),
            entries.iter().map(|e| e.to_string()).collect(),
        );
        self
    }

    pub(crate) fn ping(mut self, path: &str) -> Self {
        self.tree.pings.insert(path.to_string());
        self
    }

    pub(crate) fn start(self) -> RunningOwserver {
        init_logging();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tree = Arc::new(Mutex::new(self.tree));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let server_tree = Arc::clone(&tree);
        let server_requests = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let Ok((header, payload)) = read_request(&mut stream) else {
                    continue;
                };
                let mut parts = payload.split(|b| *b == 0);
                let path = String::from_utf8_lossy(parts.next().unwrap_or_default()).to_string();
                let value = String::from_utf8_lossy(parts.next().unwrap_or_default()).to_string();
                let Some(function) = MessageType::from_code(header.function) else {
                    continue;
                };
                server_requests.lock().unwrap().push((function, path.clone()));

                let mut tree = server_tree.lock().unwrap();
                let reply = respond(&mut tree, function, &path, value);
                let _ = stream.write_all(&reply);
            }
        });

        RunningOwserver {
            port,
            tree,
            requests,
        }
    }
}

fn respond(tree: &mut Tree, function: MessageType, path: &str, value: String) -> Vec<u8> {
    if tree.pings.contains(path) {
        return frame(0, -1, 0, &[]);
    }
    let (uncached, lookup) = split_uncached(path);
    match function {
        MessageType::Read => match tree.values.get(&lookup) {
            Some(v) => {
                let len = v.len() as i32;
                frame(len, len, len, v.as_bytes())
            }
            None => frame(-2, 0, 0, &[]),
        },
        MessageType::Write => match tree.values.get_mut(&lookup) {
            Some(slot) => {
                *slot = value;
                frame(0, 0, 0, &[])
            }
            None => frame(-2, 0, 0, &[]),
        },
        MessageType::Dir => {
            let mut reply = Vec::new();
            match tree.dirs.get(&lookup) {
                Some(entries) => {
                    for entry in entries {
                        let entry = if uncached {
                            format!("/uncached{}", entry)
                        } else {
                            entry.clone()
                        };
                        let mut payload = entry.clone().into_bytes();
                        payload.push(0);
                        reply.extend(frame(
                            0,
                            payload.len() as i32,
                            entry.len() as i32,
                            &payload,
                        ));
                    }
                    reply.extend(frame(0, 0, 0, &[]));
                }
                None => reply.extend(frame(-2, 0, 0, &[])),
            }
            reply
        }
        MessageType::Presence => {
            if tree.values.contains_key(&lookup) || tree.dirs.contains_key(&lookup) {
                frame(0, 0, 0, &[])
            } else {
                frame(-2, 0, 0, &[])
            }
        }
        _ => frame(-1, 0, 0, &[]),
    }
}

impl RunningOwserver {
    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn config(&self) -> crate::connection::ConnectionConfig {
        crate::connection::ConnectionConfig::new("127.0.0.1").with_port(self.port)
    }

    pub(crate) fn requests(&self) -> Vec<(MessageType, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, function: MessageType) -> usize {
        self.requests()
            .iter()
            .filter(|(f, _)| *f == function)
            .count()
    }

    pub(crate) fn stored(&self, path: &str) -> Option<String> {
        self.tree.lock().unwrap().values.get(path).cloned()
    }
}
