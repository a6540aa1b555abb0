//! Telemetry event types for the per-recording event stream.
//!
//! Events are stored as append-only JSONL, optionally preceded by a
//! `# {header}` comment line. Pointer coordinates are screen pixels of the
//! recorded display; timestamps are milliseconds since recording start.
//!
//! Within one recording the stream is strictly ascending: no two events
//! share a timestamp. The range filter and both detectors rely on this.

use serde::{Deserialize, Serialize};

/// Milliseconds since recording start.
pub type TimestampMs = u64;

/// Keyboard modifier state at the time of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// No modifier held.
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Whether any modifier is held.
    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }

    fn is_empty(&self) -> bool {
        !self.any()
    }
}

/// A single recorded telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Milliseconds since recording start.
    #[serde(rename = "t")]
    pub timestamp_ms: TimestampMs,

    /// The event payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Discriminated union of telemetry payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Pointer position sample.
    Mouse { x: f64, y: f64 },

    /// Mouse button press.
    Click {
        x: f64,
        y: f64,
        #[serde(default)]
        button: MouseButton,
    },

    /// Key press.
    Keyboard {
        /// Key name: a single character ("a", "A", "1", " ") or a named key
        /// ("Space", "Backspace", "Enter", "Tab", "ArrowLeft", ...).
        key: String,
        #[serde(default, skip_serializing_if = "Modifiers::is_empty")]
        modifiers: Modifiers,
    },

    /// Scroll wheel movement.
    Scroll {
        x: f64,
        y: f64,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
}

/// Event category, as named in the capture contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Mouse,
    Click,
    Keyboard,
    Scroll,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Header written as the first (comment) line of a telemetry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Recorded display dimensions in pixels.
    pub screen_width: u32,
    pub screen_height: u32,

    /// Nominal pointer sampling rate (Hz).
    #[serde(default)]
    pub sample_rate_hz: u32,
}

impl TelemetryEvent {
    /// Create a pointer sample.
    pub fn mouse(timestamp_ms: TimestampMs, x: f64, y: f64) -> Self {
        Self {
            timestamp_ms,
            kind: EventKind::Mouse { x, y },
        }
    }

    /// Create a left click.
    pub fn click(timestamp_ms: TimestampMs, x: f64, y: f64) -> Self {
        Self {
            timestamp_ms,
            kind: EventKind::Click {
                x,
                y,
                button: MouseButton::Left,
            },
        }
    }

    /// Create an unmodified key press.
    pub fn key(timestamp_ms: TimestampMs, key: impl Into<String>) -> Self {
        Self::key_with_modifiers(timestamp_ms, key, Modifiers::NONE)
    }

    /// Create a key press with modifier state.
    pub fn key_with_modifiers(
        timestamp_ms: TimestampMs,
        key: impl Into<String>,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            timestamp_ms,
            kind: EventKind::Keyboard {
                key: key.into(),
                modifiers,
            },
        }
    }

    /// Create a scroll event.
    pub fn scroll(timestamp_ms: TimestampMs, x: f64, y: f64, dx: f64, dy: f64) -> Self {
        Self {
            timestamp_ms,
            kind: EventKind::Scroll { x, y, dx, dy },
        }
    }

    /// Category of this event.
    pub fn event_type(&self) -> EventType {
        match self.kind {
            EventKind::Mouse { .. } => EventType::Mouse,
            EventKind::Click { .. } => EventType::Click,
            EventKind::Keyboard { .. } => EventType::Keyboard,
            EventKind::Scroll { .. } => EventType::Scroll,
        }
    }

    /// Pointer position if this event carries one.
    pub fn position(&self) -> Option<(f64, f64)> {
        match &self.kind {
            EventKind::Mouse { x, y } => Some((*x, *y)),
            EventKind::Click { x, y, .. } => Some((*x, *y)),
            EventKind::Scroll { x, y, .. } => Some((*x, *y)),
            EventKind::Keyboard { .. } => None,
        }
    }

    /// Key name and modifiers if this is a keyboard event.
    pub fn key_press(&self) -> Option<(&str, Modifiers)> {
        match &self.kind {
            EventKind::Keyboard { key, modifiers } => Some((key.as_str(), *modifiers)),
            _ => None,
        }
    }

    /// Copy of this event with a different timestamp.
    pub fn with_timestamp(&self, timestamp_ms: TimestampMs) -> Self {
        Self {
            timestamp_ms,
            kind: self.kind.clone(),
        }
    }
}

/// Parse events from JSONL content (one JSON object per line).
///
/// Blank lines and `#` comment lines are skipped.
pub fn parse_events(jsonl: &str) -> Result<Vec<TelemetryEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Parse a full telemetry file: the optional `# {header}` line plus events.
pub fn parse_telemetry_file(
    content: &str,
) -> Result<(Option<TelemetryHeader>, Vec<TelemetryEvent>), serde_json::Error> {
    let header = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.strip_prefix('#'))
        .map(|raw| serde_json::from_str::<TelemetryHeader>(raw.trim()))
        .transpose()?;

    Ok((header, parse_events(content)?))
}

/// Serialize events to JSONL, with the header as a leading comment line.
pub fn serialize_events(
    header: Option<&TelemetryHeader>,
    events: &[TelemetryEvent],
) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    if let Some(header) = header {
        output.push_str("# ");
        output.push_str(&serde_json::to_string(header)?);
        output.push('\n');
    }
    for event in events {
        output.push_str(&serde_json::to_string(event)?);
        output.push('\n');
    }
    Ok(output)
}

/// Whether timestamps are strictly ascending.
pub fn is_strictly_ordered(events: &[TelemetryEvent]) -> bool {
    events
        .windows(2)
        .all(|w| w[0].timestamp_ms < w[1].timestamp_ms)
}

/// Restore the stream invariant: sort by timestamp (stable) and bump every
/// collision to `previous + 1`. Returns the number of bumped events.
pub fn enforce_strict_order(events: &mut [TelemetryEvent]) -> usize {
    events.sort_by_key(|e| e.timestamp_ms);

    let mut bumped = 0;
    for i in 1..events.len() {
        let floor = events[i - 1].timestamp_ms.saturating_add(1);
        if events[i].timestamp_ms < floor {
            events[i].timestamp_ms = floor;
            bumped += 1;
        }
    }
    bumped
}
