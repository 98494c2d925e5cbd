use anyhow::{Result, anyhow};
use log::{error, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{Value, json};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    fs,
    io::{self, BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::{Path, PathBuf},
    sync::mpsc::{self, Sender},
    thread,
    time::Duration,
};

use super::dispatch::{Engine, Request, err, ok};
use super::runtime::socket_path;
use posectl::ProfileStore;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

enum IpcMsg {
    Request { req: Request, reply: Sender<Value> },
    Subscribe(UnixStream),
    ProfilesChanged(Vec<PathBuf>),
    Shutdown,
}

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path()?;
    if sock.exists() {
        let _ = fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let store = ProfileStore::open_default()?;
    let mut engine = Engine::new(store, sock.clone())?;
    info!("daemon: active profile '{}'", engine.active_name());

    let (tx, rx) = mpsc::channel::<IpcMsg>();
    spawn_signal_listener(tx.clone())?;
    let _watcher = watch_profiles(engine.config_dir(), tx.clone())?;

    // accept loop; the engine is only touched from here
    listener.set_nonblocking(true)?;
    let result = loop {
        match listener.accept() {
            Ok((stream, _)) => {
                let tx = tx.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, tx) {
                        error!("ipc client error: {e}");
                    }
                });
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) if accept_error_is_fatal(&e) => break Err(anyhow!("accept failed: {e}")),
            Err(e) => {
                // aborted handshakes, fd exhaustion: keep serving
                warn!("accept failed, retrying: {e}");
                thread::sleep(ACCEPT_BACKOFF);
            }
        }

        let mut reload = false;
        let mut shutdown = false;
        while let Ok(msg) = rx.try_recv() {
            match msg {
                IpcMsg::Request { req, reply } => {
                    let _ = reply.send(engine.handle(req));
                }
                IpcMsg::Subscribe(stream) => engine.subscribe(stream),
                IpcMsg::ProfilesChanged(paths) => reload |= engine.needs_reload(&paths),
                IpcMsg::Shutdown => shutdown = true,
            }
        }
        if shutdown {
            break Ok(());
        }
        if reload {
            if let Err(e) = engine.reload() {
                error!("reload failed, keeping last good profile: {e}");
            }
        }

        thread::sleep(Duration::from_millis(2));
    };

    let _ = fs::remove_file(&sock);
    info!("daemon: stopped");
    result
}

/// Only a listener that can no longer accept anything ends the daemon.
fn accept_error_is_fatal(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::InvalidInput
}

fn handle_client(stream: UnixStream, tx: Sender<IpcMsg>) -> Result<()> {
    stream.set_nonblocking(false)?;
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let req: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                writeln!(writer, "{}", err(format!("bad request: {e}")))?;
                continue;
            }
        };

        match req {
            Request::Subscribe => {
                writeln!(writer, "{}", ok(json!("subscribed")))?;
                tx.send(IpcMsg::Subscribe(writer))
                    .map_err(|_| anyhow!("daemon is shutting down"))?;
                return Ok(());
            }
            Request::Shutdown => {
                writeln!(writer, "{}", ok(json!("shutting down")))?;
                let _ = tx.send(IpcMsg::Shutdown);
                return Ok(());
            }
            req => {
                let (reply_tx, reply_rx) = mpsc::channel();
                tx.send(IpcMsg::Request {
                    req,
                    reply: reply_tx,
                })
                .map_err(|_| anyhow!("daemon is shutting down"))?;
                let resp = reply_rx.recv()?;
                writeln!(writer, "{resp}")?;
            }
        }
    }
    Ok(())
}

fn spawn_signal_listener(tx: Sender<IpcMsg>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("daemon: caught signal {sig}");
            let _ = tx.send(IpcMsg::Shutdown);
        }
    });
    Ok(())
}

fn watch_profiles(dir: &Path, tx: Sender<IpcMsg>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(ev) if matches!(ev.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
            let _ = tx.send(IpcMsg::ProfilesChanged(ev.paths));
        }
        Ok(_) => {}
        Err(e) => warn!("profile watch error: {e}"),
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    info!("daemon: watching {}", dir.display());
    Ok(watcher)
}

/// A connection to the running daemon; one request line, one response line.
pub struct Client {
    stream: UnixStream,
    reader: BufReader<UnixStream>,
}

impl Client {
    pub fn connect() -> Result<Self> {
        let sock = socket_path()?;
        if !sock.exists() {
            return Err(anyhow!(
                "posectl daemon is not running (socket missing at {})",
                sock.display()
            ));
        }
        let stream = UnixStream::connect(&sock)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { stream, reader })
    }

    pub fn request(&mut self, req: &Value) -> Result<Value> {
        let line = serde_json::to_string(req)? + "\n";
        self.stream.write_all(line.as_bytes())?;
        let mut resp = String::new();
        if self.reader.read_line(&mut resp)? == 0 {
            return Err(anyhow!("daemon closed the connection"));
        }
        Ok(serde_json::from_str(&resp)?)
    }
}

pub fn client_request(req: Value) -> Result<Value> {
    Client::connect()?.request(&req)
}
