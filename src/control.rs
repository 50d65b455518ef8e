//! Control socket: the runtime face of the mode switch.
//!
//! One request line per connection, one response line back:
//!
//! ```text
//! get          -> 1
//! set 2        -> ok 2 | err <reason>
//! version      -> 1.7
//! suspend      -> ok
//! resume       -> ok
//! quit         -> ok   (daemon shuts down)
//! ```

use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::mode::VERSION;
use crate::service::Tap2Wake;

/// A client gets this long to send its request line.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get,
    Set(String),
    Version,
    Suspend,
    Resume,
    Quit,
}

impl Request {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (line, None),
        };
        match (verb, arg) {
            ("get", None) => Some(Request::Get),
            ("set", Some(value)) => Some(Request::Set(value.to_string())),
            ("version", None) => Some(Request::Version),
            ("suspend", None) => Some(Request::Suspend),
            ("resume", None) => Some(Request::Resume),
            ("quit", None) => Some(Request::Quit),
            _ => None,
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            Request::Get => "get".into(),
            Request::Set(value) => format!("set {}", value),
            Request::Version => "version".into(),
            Request::Suspend => "suspend".into(),
            Request::Resume => "resume".into(),
            Request::Quit => "quit".into(),
        }
    }
}

/// Apply one request to the service and build the response line.
pub fn handle(service: &Tap2Wake, request: &Request) -> String {
    match request {
        Request::Get => service.show_mode().trim_end().to_string(),
        Request::Set(value) => match service.store_mode(value) {
            Ok(mode) => format!("ok {}", mode),
            Err(e) => format!("err {}", e),
        },
        Request::Version => VERSION.to_string(),
        Request::Suspend => {
            service.on_suspend();
            "ok".into()
        }
        Request::Resume => {
            service.on_resume();
            "ok".into()
        }
        Request::Quit => "ok".into(),
    }
}

/// Bind the control socket, replacing a stale socket left by a previous run.
/// Anything else already at `path` is left alone and reported.
pub fn bind(path: &Path) -> Result<UnixListener, Box<dyn std::error::Error + Send + Sync>> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            log::debug!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)?;
        }
        Ok(_) => {
            return Err(format!("{} exists and is not a socket", path.display()).into());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let listener = UnixListener::bind(path)?;
    log::info!("Control socket listening on {}", path.display());
    Ok(listener)
}

/// Serve requests until a `quit` arrives.
///
/// Each connection is answered on its own thread, so a `set` sleeping
/// through the settle delay never holds up a `resume`. `quit` is answered
/// on the accepting thread and waits for in-flight requests.
pub fn serve(listener: &UnixListener, service: &Tap2Wake) {
    thread::scope(|scope| {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("Control accept failed: {}", e);
                    continue;
                }
            };

            let request = match read_request(&stream) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Control request failed: {}", e);
                    continue;
                }
            };

            if request == Some(Request::Quit) {
                log::info!("Quit requested over control socket");
                if let Err(e) = respond(stream, "ok") {
                    log::warn!("Control reply failed: {}", e);
                }
                return;
            }

            scope.spawn(move || {
                let response = match &request {
                    Some(req) => {
                        log::debug!("Control request: {:?}", req);
                        handle(service, req)
                    }
                    None => "err unknown command".into(),
                };
                if let Err(e) = respond(stream, &response) {
                    log::warn!("Control reply failed: {}", e);
                }
            });
        }
    });
}

fn read_request(stream: &UnixStream) -> io::Result<Option<Request>> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line)?;
    Ok(Request::parse(&line))
}

fn respond(mut stream: UnixStream, response: &str) -> io::Result<()> {
    writeln!(stream, "{}", response)
}

/// Send one request to a running daemon and return its response line.
pub fn request(path: &Path, request: &Request) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let mut stream = UnixStream::connect(path)
        .map_err(|e| format!("Cannot reach daemon at {}: {}", path.display(), e))?;
    writeln!(stream, "{}", request.to_line())?;
    stream.shutdown(std::net::Shutdown::Write)?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response.trim_end().to_string())
}
