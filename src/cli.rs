use anyhow::{Context, Result, anyhow};
use log::info;
use pico_args::Arguments;
use std::{
    env, fs,
    io::{self, BufRead, BufReader},
    process::Command,
};

use posectl::{
    Profile, ProfileStore, Sessions,
    frame::{PolygonPair, valid_frames},
};

use crate::ipc;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    if env::args().len() == 1 || pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // options before the first free arg is taken
    let profile_name: Option<String> = pargs.opt_value_from_str("--profile")?;

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            match topic {
                Some(t) => print_subcmd_help(&t),
                None => print_help(),
            }
            Ok(())
        }

        Some("start") => {
            let exe = env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("posectl: started daemon (pid={})", child.id());
            Ok(())
        }

        Some(op @ ("stop" | "status" | "reload" | "list" | "doctor")) => {
            let op = if op == "stop" { "shutdown" } else { op };
            let r = ipc::client_request(serde_json::json!({ "op": op }))?;
            print_response(&r);
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: posectl use <profile_name>"))?;
            let r = ipc::client_request(serde_json::json!({"op": "use", "profile": name}))?;
            print_response(&r);
            Ok(())
        }

        Some("replay") => {
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: posectl replay <frames.jsonl|->"))?;
            let profile = load_profile(profile_name.as_deref())?;
            replay(&path, &profile)
        }

        Some("send") => {
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: posectl send <frames.jsonl|->"))?;
            send(&path)
        }

        Some("collide") => {
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: posectl collide <polygons.json>"))?;
            let profile = load_profile(profile_name.as_deref())?;
            let txt = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            let pair = PolygonPair::from_json(&txt)?;
            println!("{}", profile.collider().are_intersecting(&pair.a, &pair.b));
            Ok(())
        }

        Some("height") => {
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: posectl height <frames.jsonl|->"))?;
            for (i, skeleton) in valid_frames(open_input(&path)?).enumerate() {
                match skeleton.estimate_height() {
                    Some(h) => println!("{}\t{}\t{h:.2} m", i + 1, skeleton.tracking_id),
                    None => println!("{}\t{}\t-", i + 1, skeleton.tracking_id),
                }
            }
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn load_profile(name: Option<&str>) -> Result<Profile> {
    let store = ProfileStore::open_default()?;
    let profile = match name {
        Some(n) => store.load(n)?,
        None => store.load_active()?.1,
    };
    info!("using profile '{}'", profile.name());
    Ok(profile)
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let f = fs::File::open(path).with_context(|| format!("opening {path}"))?;
    Ok(Box::new(BufReader::new(f)))
}

fn replay(path: &str, profile: &Profile) -> Result<()> {
    let mut sessions = Sessions::new(profile.controller());
    let mut recognized = 0usize;

    for (i, skeleton) in valid_frames(open_input(path)?).enumerate() {
        if let Some(ev) = sessions.update(&skeleton) {
            recognized += 1;
            println!(
                "{}",
                serde_json::json!({
                    "frame": i + 1,
                    "gesture": ev.gesture,
                    "tracking_id": ev.tracking_id,
                    "action": profile.action_for(ev.gesture),
                })
            );
        }
    }

    info!(
        "replayed {} frames, {} gestures recognized",
        sessions.frames(),
        recognized
    );
    Ok(())
}

fn send(path: &str) -> Result<()> {
    let mut client = ipc::Client::connect()?;
    for skeleton in valid_frames(open_input(path)?) {
        let r = client.request(&serde_json::json!({"op": "frame", "skeleton": skeleton}))?;
        if r.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            print_response(&r);
            continue;
        }
        if let Some(ev) = r.pointer("/data/recognized").filter(|v| !v.is_null()) {
            println!("{ev}");
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"posectl — skeleton gesture recognizer

USAGE:
  posectl help [command]                  Show general or command-specific help
  posectl start                           Start the daemon
  posectl stop                            Stop the daemon
  posectl status                          Show daemon state
  posectl reload                          Reload active profile
  posectl use <name>                      Switch active profile
  posectl list                            List profiles
  posectl doctor                          Show paths and profile summary
  posectl replay <frames.jsonl|->         Recognize gestures in a recording
  posectl send <frames.jsonl|->           Stream a recording to the daemon
  posectl collide <polygons.json>         Hit-test two polygons
  posectl height <frames.jsonl|->         Estimate body height per frame

OPTIONS:
  --profile <name>                        Profile for replay/collide (default: active)

TIPS:
  - Profiles: ~/.config/posectl/profiles
  - Active profile pointer: ~/.config/posectl/active
  - Log level: POSECTL_LOG=debug
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: posectl start\nStarts the background daemon."),
        "stop" => println!("usage: posectl stop\nStops the running daemon."),
        "status" => println!(
            "usage: posectl status\nShows active profile, socket, sessions and subscribers."
        ),
        "reload" => println!(
            "usage: posectl reload\nReloads the current profile; keeps last good on error."
        ),
        "use" => {
            println!("usage: posectl use <name>\nSwitches active profile to <name> and reloads.")
        }
        "list" => println!("usage: posectl list\nLists available profiles."),
        "doctor" => println!("usage: posectl doctor\nReports paths and the loaded profile."),
        "replay" => println!(
            "usage: posectl replay [--profile <name>] <frames.jsonl|->\nPrints one JSON line per recognized gesture."
        ),
        "send" => println!(
            "usage: posectl send <frames.jsonl|->\nFeeds frames to the daemon and prints its recognitions."
        ),
        "collide" => println!(
            "usage: posectl collide [--profile <name>] <polygons.json>\nInput: {{\"a\": [[x,y],...], \"b\": [[x,y],...]}}"
        ),
        "height" => println!("usage: posectl height <frames.jsonl|->"),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
