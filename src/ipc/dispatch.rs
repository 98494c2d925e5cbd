use anyhow::Result;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{
    io::Write,
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    time::Duration,
};

use posectl::{GestureEvent, Point, Profile, ProfileStore, Sessions, Skeleton};

/// One line of client input.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Status,
    Reload,
    Use { profile: String },
    List,
    Doctor,
    Frame { skeleton: Skeleton },
    Collide { a: Vec<Point>, b: Vec<Point> },
    Subscribe,
    Shutdown,
}

pub fn ok(data: Value) -> Value {
    json!({"ok": true, "data": data})
}

pub fn err(msg: impl std::fmt::Display) -> Value {
    json!({"ok": false, "error": msg.to_string()})
}

/// What subscribers and `frame` callers see for a recognition.
pub fn event_payload(ev: &GestureEvent, profile: &Profile) -> Value {
    json!({
        "gesture": ev.gesture,
        "tracking_id": ev.tracking_id,
        "action": profile.action_for(ev.gesture),
    })
}

/// Daemon-side state. Lives on the daemon's main loop only; client threads
/// reach it through messages.
pub struct Engine {
    store: ProfileStore,
    active_name: String,
    profile: Profile,
    sessions: Sessions,
    subscribers: Vec<UnixStream>,
    socket: PathBuf,
}

impl Engine {
    pub fn new(store: ProfileStore, socket: PathBuf) -> Result<Self> {
        let (active_name, profile) = store.load_active()?;
        let sessions = Sessions::new(profile.controller());
        Ok(Self {
            store,
            active_name,
            profile,
            sessions,
            subscribers: Vec::new(),
            socket,
        })
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    pub fn config_dir(&self) -> &Path {
        self.store.config_dir()
    }

    /// Subscribe and Shutdown are answered by the connection thread.
    pub fn handle(&mut self, req: Request) -> Value {
        match req {
            Request::Status => ok(json!({
                "active_profile": self.active_name,
                "socket": self.socket,
                "frames": self.sessions.frames(),
                "sessions": self.sessions.len(),
                "subscribers": self.subscribers.len(),
            })),
            Request::Reload => match self.reload() {
                Ok(()) => ok(json!({"active_profile": self.active_name})),
                Err(e) => err(e),
            },
            Request::Use { profile } => match self.use_profile(&profile) {
                Ok(()) => ok(json!({"active_profile": self.active_name})),
                Err(e) => err(e),
            },
            Request::List => ok(json!({
                "profiles": self.store.list(),
                "active": self.active_name,
            })),
            Request::Doctor => ok(self.doctor_report()),
            Request::Frame { skeleton } => {
                let recognized = self.on_frame(&skeleton);
                ok(json!({ "recognized": recognized }))
            }
            Request::Collide { a, b } => ok(json!({
                "intersecting": self.profile.collider().are_intersecting(&a, &b),
            })),
            Request::Subscribe | Request::Shutdown => err("not handled by the engine"),
        }
    }

    /// Re-read the active profile. On failure the last good profile stays.
    pub fn reload(&mut self) -> Result<()> {
        let (name, profile) = self.store.load_active()?;
        self.install(name, profile);
        info!("profile reloaded");
        Ok(())
    }

    pub fn use_profile(&mut self, name: &str) -> Result<()> {
        let profile = self.store.set_active(name)?;
        self.install(name.to_string(), profile);
        info!("switched active profile to {name}");
        Ok(())
    }

    /// Whether a change to `paths` affects what is loaded: an edit of the
    /// active profile, or `active` now naming a different profile. Our own
    /// pointer write from `use` names the profile already installed.
    pub fn needs_reload(&self, paths: &[PathBuf]) -> bool {
        let active = self.store.profile_path(&self.active_name);
        paths.iter().any(|p| {
            *p == active
                || (p == self.store.active_ptr()
                    && self
                        .store
                        .active_name()
                        .is_ok_and(|name| name != self.active_name))
        })
    }

    fn install(&mut self, name: String, profile: Profile) {
        self.sessions.replace_template(profile.controller());
        self.active_name = name;
        self.profile = profile;
    }

    fn on_frame(&mut self, skeleton: &Skeleton) -> Option<Value> {
        let ev = self.sessions.update(skeleton)?;
        let payload = event_payload(&ev, &self.profile);
        self.broadcast(&payload);
        Some(payload)
    }

    pub fn subscribe(&mut self, stream: UnixStream) {
        if let Err(e) = stream.set_write_timeout(Some(Duration::from_millis(100))) {
            warn!("subscriber rejected: {e}");
            return;
        }
        info!("subscriber attached ({} total)", self.subscribers.len() + 1);
        self.subscribers.push(stream);
    }

    fn broadcast(&mut self, payload: &Value) {
        let line = format!("{payload}\n");
        self.subscribers.retain_mut(|s| match s.write_all(line.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                info!("subscriber dropped: {e}");
                false
            }
        });
    }

    fn doctor_report(&self) -> Value {
        let th = &self.profile.thresholds;
        json!({
            "config_dir": self.store.config_dir(),
            "profiles_dir": self.store.profiles_dir(),
            "active_profile": self.active_name,
            "socket": self.socket,
            "gestures": self.profile.gestures.enabled,
            "dedupe": self.profile.gestures.dedupe,
            "max_frames_per_segment": th.max_frames_per_segment,
            "wave_repetitions": th.wave_repetitions,
            "collinear_epsilon": th.collinear_epsilon,
            "bindings": self.profile.bindings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn engine(tag: &str) -> (Engine, PathBuf) {
        let dir = std::env::temp_dir().join(format!("posectl-engine-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let store = ProfileStore::open(&dir).unwrap();
        (Engine::new(store, dir.join("test.sock")).unwrap(), dir)
    }

    #[test]
    fn parses_requests() {
        let r: Request = serde_json::from_str(r#"{"op":"use","profile":"kiosk"}"#).unwrap();
        assert!(matches!(r, Request::Use { profile } if profile == "kiosk"));
        let r: Request = serde_json::from_str(r#"{"op":"collide","a":[[0,0],[1,1]],"b":[]}"#).unwrap();
        assert!(matches!(r, Request::Collide { .. }));
        assert!(serde_json::from_str::<Request>(r#"{"op":"dance"}"#).is_err());
    }

    #[test]
    fn collide_and_status() {
        let (mut e, dir) = engine("collide");
        let r = e.handle(Request::Collide {
            a: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
            b: vec![Point::new(0.0, 10.0), Point::new(10.0, 0.0)],
        });
        assert_eq!(r["data"]["intersecting"], true);

        let r = e.handle(Request::Status);
        assert_eq!(r["ok"], true);
        assert_eq!(r["data"]["active_profile"], "default");
        let _ = fs::remove_dir_all(&dir);
    }

    fn wave_frame(x: f32) -> Skeleton {
        use posectl::JointType::*;
        Skeleton::new(4)
            .with_joint(HandRight, x, 1.4, 2.0)
            .with_joint(ElbowRight, 0.3, 1.1, 2.0)
    }

    fn one_wave_profile(dir: &Path) {
        fs::write(
            dir.join("profiles").join("one.toml"),
            "[thresholds]\nwave_repetitions = 1\n[gestures]\nenabled = [\"wave_right\"]\n",
        )
        .unwrap();
    }

    #[test]
    fn subscribers_get_events_and_closed_peers_are_pruned() {
        use std::io::{BufRead, BufReader};

        let (mut e, dir) = engine("subscribe");
        one_wave_profile(&dir);
        assert_eq!(e.handle(Request::Use { profile: "one".into() })["ok"], true);

        let (ours, theirs) = UnixStream::pair().unwrap();
        e.subscribe(ours);
        assert_eq!(e.handle(Request::Status)["data"]["subscribers"], 1);

        e.handle(Request::Frame { skeleton: wave_frame(0.4) });
        e.handle(Request::Frame { skeleton: wave_frame(0.2) });

        let mut line = String::new();
        BufReader::new(&theirs).read_line(&mut line).unwrap();
        let ev: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(ev, json!({"action": null, "gesture": "wave_right", "tracking_id": 4}));

        drop(theirs);
        // the first write after close may still be buffered; EPIPE follows
        for _ in 0..2 {
            e.broadcast(&json!({"gesture": "wave_right"}));
        }
        assert!(e.subscribers.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn reload_only_for_active_profile_changes() {
        let (mut e, dir) = engine("watch");
        one_wave_profile(&dir);
        let store = ProfileStore::open(&dir).unwrap();
        let active = store.profile_path("default");
        let other = store.profile_path("one");
        let ptr = store.active_ptr().to_path_buf();

        assert!(e.needs_reload(&[active.clone()]));
        assert!(!e.needs_reload(&[other.clone()]));
        assert!(!e.needs_reload(&[dir.join("profiles").join(".default.toml.swp")]));
        // pointer unchanged
        assert!(!e.needs_reload(&[ptr.clone()]));

        // our own `use` rewrites the pointer to what is already installed
        assert_eq!(e.handle(Request::Use { profile: "one".into() })["ok"], true);
        assert!(!e.needs_reload(&[ptr.clone()]));
        assert!(e.needs_reload(&[other]));
        assert!(!e.needs_reload(&[active]));

        // someone else points it elsewhere
        fs::write(&ptr, "default").unwrap();
        assert!(e.needs_reload(&[ptr]));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn frames_recognize_with_bound_action() {
        use posectl::JointType::*;
        let (mut e, dir) = engine("frames");
        fs::write(
            dir.join("profiles").join("one.toml"),
            "[thresholds]\nwave_repetitions = 1\n[gestures]\nenabled = [\"wave_right\"]\n[bindings]\nwave_right = \"hello\"\n",
        )
        .unwrap();
        assert_eq!(e.handle(Request::Use { profile: "one".into() })["ok"], true);

        let frame = |x: f32| {
            Skeleton::new(4)
                .with_joint(HandRight, x, 1.4, 2.0)
                .with_joint(ElbowRight, 0.3, 1.1, 2.0)
        };
        let r = e.handle(Request::Frame { skeleton: frame(0.4) });
        assert!(r["data"]["recognized"].is_null());
        let r = e.handle(Request::Frame { skeleton: frame(0.2) });
        assert_eq!(r["data"]["recognized"]["gesture"], "wave_right");
        assert_eq!(r["data"]["recognized"]["action"], "hello");
        assert_eq!(r["data"]["recognized"]["tracking_id"], 4);

        let r = e.handle(Request::Use { profile: "missing".into() });
        assert_eq!(r["ok"], false);
        assert_eq!(e.active_name(), "one");
        let _ = fs::remove_dir_all(&dir);
    }
}
