//! Event scripts: one host signal per line.
//!
//! ```text
//! # comment
//! plugin find
//! caret 0
//! answer fi
//! button Find
//! type hello\n
//! key ctrl+d
//! select 0 5
//! cancel
//! quit
//! ```
//!
//! `type` and `answer` take the rest of the line verbatim, with `\n`, `\t`
//! and `\\` escapes.

use anyhow::{Context, Result, bail};
use core_events::{
    AsyncEventSource, CHANNEL_SEND_FAILURES, CommandEvent, Event, InputEvent, KeyEvent,
};
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub fn parse_script(src: &str) -> Result<Vec<Event>> {
    src.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            Some(parse_line(line).with_context(|| format!("script line {}", i + 1)))
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Event> {
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let event = match verb {
        "key" => Event::Input(InputEvent::Key(rest.trim().parse::<KeyEvent>()?)),
        "type" => Event::Input(InputEvent::TextCommit(unescape(rest))),
        "button" => {
            let name = rest.trim();
            if name.is_empty() {
                bail!("button needs a name");
            }
            Event::ButtonPressed(name.to_string())
        }
        "caret" => Event::Input(InputEvent::MoveCaret(parse_index(rest)?)),
        "select" => {
            let mut parts = rest.split_whitespace();
            let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
                bail!("select takes two indices");
            };
            Event::Input(InputEvent::Select {
                start: parse_index(a)?,
                end: parse_index(b)?,
            })
        }
        "answer" => Event::Command(CommandEvent::DialogResponse(Some(unescape(rest)))),
        "cancel" => Event::Command(CommandEvent::DialogResponse(None)),
        "plugin" => Event::Command(CommandEvent::LoadPlugin(rest.trim().to_string())),
        "quit" => Event::Command(CommandEvent::Quit),
        other => bail!("unknown directive `{other}`"),
    };
    Ok(event)
}

fn parse_index(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .with_context(|| format!("`{}` is not a char index", s.trim()))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Replays parsed script events in order, then asks the loop to shut down.
pub struct ScriptEventSource {
    events: Vec<Event>,
}

impl ScriptEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl AsyncEventSource for ScriptEventSource {
    fn name(&self) -> &'static str {
        "script"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let total = self.events.len();
            for event in self.events.into_iter().chain(std::iter::once(Event::Shutdown)) {
                if tx.send(event).await.is_err() {
                    CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                    warn!(target: "runtime.events", source = "script", "receiver_closed");
                    return;
                }
            }
            debug!(target: "runtime.events", source = "script", total, "script_replayed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{KeyCode, KeyModifiers};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[test]
    fn parses_every_directive() {
        let src = "\
# find the ligature
plugin find
caret 0
answer fi
button Find
type a b\\n
key ctrl+shift+D
select 3 1
cancel

quit
";
        let events = parse_script(src).unwrap();
        assert_eq!(
            events,
            vec![
                Event::Command(CommandEvent::LoadPlugin("find".into())),
                Event::Input(InputEvent::MoveCaret(0)),
                Event::Command(CommandEvent::DialogResponse(Some("fi".into()))),
                Event::ButtonPressed("Find".into()),
                Event::Input(InputEvent::TextCommit("a b\n".into())),
                Event::Input(InputEvent::Key(KeyEvent::new(
                    KeyCode::Char('D'),
                    KeyModifiers::CTRL | KeyModifiers::SHIFT
                ))),
                Event::Input(InputEvent::Select { start: 3, end: 1 }),
                Event::Command(CommandEvent::DialogResponse(None)),
                Event::Command(CommandEvent::Quit),
            ]
        );
    }

    #[test]
    fn type_keeps_leading_spaces() {
        let events = parse_script("type   indented\\t\\\\").unwrap();
        assert_eq!(
            events,
            vec![Event::Input(InputEvent::TextCommit("  indented\t\\".into()))]
        );
    }

    #[test]
    fn errors_name_the_line() {
        let err = parse_script("caret 1\nkey hyper+x\n").unwrap_err();
        assert!(format!("{err:#}").contains("script line 2"), "{err:#}");
        assert!(parse_script("select 1").is_err());
        assert!(parse_script("caret -3").is_err());
        assert!(parse_script("dance").is_err());
    }

    #[tokio::test]
    async fn source_replays_then_shuts_down() {
        let (tx, mut rx) = mpsc::channel::<Event>(4);
        let src = Box::new(ScriptEventSource::new(vec![
            Event::Tick,
            Event::ButtonPressed("x".into()),
        ]));
        let handle = src.spawn(tx);
        assert_eq!(rx.recv().await, Some(Event::Tick));
        assert_eq!(rx.recv().await, Some(Event::ButtonPressed("x".into())));
        assert_eq!(rx.recv().await, Some(Event::Shutdown));
        handle.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn source_waits_on_full_channel_without_dropping() {
        let (tx, mut rx) = mpsc::channel::<Event>(1);
        let script = vec![Event::Tick; 5];
        let handle = Box::new(ScriptEventSource::new(script)).spawn(tx);
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event);
        }
        handle.await.unwrap();
        assert_eq!(received.len(), 6);
        assert_eq!(received.last(), Some(&Event::Shutdown));
    }
}
