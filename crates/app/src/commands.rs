use anyhow::{anyhow, bail, Context, Result};
use podplay_core::Track;
use podplay_native::EngineEvent;

pub const HELP: &str = "\
commands:
  load <id> <url> [duration_secs] [title...]
  play | pause
  seek <secs> | fwd [secs] | back [secs]
  speed <rate>
  remote play|pause|stop|next|prev|seek <secs>|jump-fwd [secs]|jump-back [secs]
  status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(Track),
    Play,
    Pause,
    Seek(f64),
    Forward(Option<f64>),
    Back(Option<f64>),
    Speed(f64),
    Remote(EngineEvent),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let cmd = match head {
            "load" => {
                let id = rest.first().ok_or_else(|| anyhow!("load needs a track id"))?;
                let url = rest.get(1).ok_or_else(|| anyhow!("load needs a url"))?;
                let duration = rest.get(2).map(|d| seconds(d)).transpose()?.unwrap_or(0.0);
                let title = if rest.len() > 3 {
                    rest[3..].join(" ")
                } else {
                    id.to_string()
                };
                Command::Load(Track::new(*id, title, *url, duration))
            }
            "play" => Command::Play,
            "pause" => Command::Pause,
            "seek" => Command::Seek(required_seconds(&rest, "seek")?),
            "fwd" => Command::Forward(optional_seconds(&rest)?),
            "back" => Command::Back(optional_seconds(&rest)?),
            "speed" => Command::Speed(required_seconds(&rest, "speed")?),
            "remote" => Command::Remote(remote_event(&rest)?),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command {other:?}; try `help`"),
        };
        Ok(Some(cmd))
    }
}

fn remote_event(rest: &[&str]) -> Result<EngineEvent> {
    let name = rest.first().ok_or_else(|| anyhow!("remote needs an event name"))?;
    let args = &rest[1..];
    let event = match *name {
        "play" => EngineEvent::RemotePlay,
        "pause" => EngineEvent::RemotePause,
        "stop" => EngineEvent::RemoteStop,
        "next" => EngineEvent::RemoteNext,
        "prev" | "previous" => EngineEvent::RemotePrevious,
        "seek" => EngineEvent::RemoteSeek {
            position: required_seconds(args, "remote seek")?,
        },
        "jump-fwd" => EngineEvent::RemoteJumpForward {
            interval: optional_seconds(args)?.unwrap_or(0.0),
        },
        "jump-back" => EngineEvent::RemoteJumpBackward {
            interval: optional_seconds(args)?.unwrap_or(0.0),
        },
        other => bail!("unknown remote event {other:?}"),
    };
    Ok(event)
}

fn required_seconds(rest: &[&str], cmd: &str) -> Result<f64> {
    let raw = rest
        .first()
        .ok_or_else(|| anyhow!("{cmd} needs a number"))?;
    seconds(raw)
}

fn optional_seconds(rest: &[&str]) -> Result<Option<f64>> {
    rest.first().map(|raw| seconds(raw)).transpose()
}

fn seconds(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("{raw:?} is not a number"))?;
    if !value.is_finite() {
        bail!("{raw:?} is not a finite number");
    }
    Ok(value)
}

/// `h:mm:ss` or `m:ss`.
pub fn format_clock(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let (h, m, s) = (total / 3_600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
