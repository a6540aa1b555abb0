//! Typing detection: keyboard telemetry to speed-up suggestions.
//!
//! Consecutive typing keys are grouped into periods while the gap between
//! presses stays short. Each period gets a words-per-minute estimate, a
//! confidence that it really is human typing, and a suggested playback
//! multiplier (slow typing gets sped up more).

use reelsync_project_model::event::TelemetryEvent;
use reelsync_project_model::timeline::{TypingPeriod, TypingSuggestion};

/// Configuration for the typing detector.
#[derive(Debug, Clone)]
pub struct TypingDetectorConfig {
    /// A gap at or above this ends the current period (ms).
    pub max_key_gap_ms: f64,

    /// Minimum period span (ms).
    pub min_period_ms: f64,

    /// Minimum keys in a period.
    pub min_keys: usize,

    /// WPM range considered plausible human typing.
    pub plausible_wpm: (f64, f64),

    /// Periods longer than this get the long-period bonus (ms).
    pub long_period_ms: f64,

    /// Multiplier applied to long periods.
    pub long_period_bonus: f64,

    /// Final multiplier bounds.
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

impl Default for TypingDetectorConfig {
    fn default() -> Self {
        Self {
            max_key_gap_ms: 3000.0,
            min_period_ms: 2000.0,
            min_keys: 8,
            plausible_wpm: (20.0, 120.0),
            long_period_ms: 10_000.0,
            long_period_bonus: 1.1,
            min_multiplier: 1.2,
            max_multiplier: 4.0,
        }
    }
}

/// Speed-up tiers: `(wpm upper bound, multiplier)`; at or above the last bound uses `FAST_TYPING_MULTIPLIER`.
const SPEED_TIERS: [(f64, f64); 3] = [(30.0, 3.0), (50.0, 2.5), (70.0, 2.0)];
const FAST_TYPING_MULTIPLIER: f64 = 1.5;

const BASE_CONFIDENCE: f64 = 0.5;
const PLAUSIBLE_WPM_BONUS: f64 = 0.3;
const FEATURE_BONUS: f64 = 0.1;

/// Classification of a typing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Letter,
    Symbol,
    Space,
    Backspace,
    Enter,
    Tab,
}

impl KeyClass {
    /// Classify a key name; `None` for keys that are not typing (arrows, F-keys, ...).
    pub fn of(key: &str) -> Option<Self> {
        match key {
            "Space" | "Spacebar" => Some(Self::Space),
            "Backspace" => Some(Self::Backspace),
            "Enter" | "Return" => Some(Self::Enter),
            "Tab" => Some(Self::Tab),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c == ' ' => Some(Self::Space),
                    (Some(c), None) if c.is_alphabetic() => Some(Self::Letter),
                    (Some(c), None) if !c.is_control() && !c.is_whitespace() => {
                        Some(Self::Symbol)
                    }
                    _ => None,
                }
            }
        }
    }

    /// Whether the key produces a visible character (counts toward WPM).
    pub fn is_printable(&self) -> bool {
        matches!(self, Self::Letter | Self::Symbol | Self::Space)
    }
}

#[derive(Debug, Clone, Copy)]
struct Keystroke {
    t: f64,
    class: KeyClass,
}

/// The typing cluster detector.
pub struct TypingClusterDetector {
    config: TypingDetectorConfig,
}

impl TypingClusterDetector {
    pub fn new(config: TypingDetectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TypingDetectorConfig::default())
    }

    /// Detect typing periods in a chronological event stream.
    ///
    /// Non-keyboard events, non-typing keys, and any key pressed with a
    /// modifier (a shortcut) are ignored.
    pub fn detect(&self, events: &[TelemetryEvent]) -> Vec<TypingPeriod> {
        let strokes: Vec<Keystroke> = events
            .iter()
            .filter_map(|e| {
                let (key, modifiers) = e.key_press()?;
                if modifiers.any() {
                    return None;
                }
                KeyClass::of(key).map(|class| Keystroke {
                    t: e.timestamp_ms as f64,
                    class,
                })
            })
            .collect();

        let mut periods = vec![];
        let mut group: Vec<Keystroke> = vec![];
        for stroke in strokes {
            if let Some(last) = group.last() {
                if stroke.t - last.t >= self.config.max_key_gap_ms {
                    periods.extend(self.finish_period(&group));
                    group.clear();
                }
            }
            group.push(stroke);
        }
        periods.extend(self.finish_period(&group));

        tracing::debug!(periods = periods.len(), "Typing detection complete");
        periods
    }

    /// Turn a group of keystrokes into a period if it is long and busy enough.
    fn finish_period(&self, group: &[Keystroke]) -> Option<TypingPeriod> {
        let (first, last) = (group.first()?, group.last()?);
        let span_ms = last.t - first.t;
        if span_ms < self.config.min_period_ms || group.len() < self.config.min_keys {
            return None;
        }

        let printable = group.iter().filter(|k| k.class.is_printable()).count();
        let minutes = span_ms / 60_000.0;
        let wpm = (printable as f64 / 5.0) / minutes;

        let confidence = self.confidence(group, wpm);
        let multiplier = self.multiplier(wpm, confidence, span_ms);

        Some(TypingPeriod {
            start_time: first.t,
            end_time: last.t,
            key_count: group.len(),
            average_wpm: wpm,
            suggested_speed_multiplier: multiplier,
            confidence,
        })
    }

    fn confidence(&self, group: &[Keystroke], wpm: f64) -> f64 {
        let mut confidence = BASE_CONFIDENCE;

        let (lo, hi) = self.config.plausible_wpm;
        if (lo..=hi).contains(&wpm) {
            confidence += PLAUSIBLE_WPM_BONUS;
        }
        if group.iter().any(|k| k.class == KeyClass::Space) {
            confidence += FEATURE_BONUS;
        }
        if group.iter().any(|k| k.class == KeyClass::Backspace) {
            confidence += FEATURE_BONUS;
        }
        if group.iter().any(|k| k.class == KeyClass::Letter) {
            confidence += FEATURE_BONUS;
        }

        let intervals: Vec<f64> = group.windows(2).map(|w| w[1].t - w[0].t).collect();
        if !intervals.is_empty() {
            let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
            let variance = intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>()
                / intervals.len() as f64;
            if variance.sqrt() < mean / 2.0 {
                confidence += FEATURE_BONUS;
            }
        }

        confidence.min(1.0)
    }

    fn multiplier(&self, wpm: f64, confidence: f64, span_ms: f64) -> f64 {
        let tier = SPEED_TIERS
            .iter()
            .find(|(max_wpm, _)| wpm < *max_wpm)
            .map(|(_, m)| *m)
            .unwrap_or(FAST_TYPING_MULTIPLIER);

        let mut multiplier = 1.0 + (tier - 1.0) * confidence;
        if span_ms > self.config.long_period_ms {
            multiplier *= self.config.long_period_bonus;
        }
        multiplier.clamp(self.config.min_multiplier, self.config.max_multiplier)
    }
}

/// Aggregate periods into one project-level suggestion, weighting each
/// period by `duration × confidence`. `None` when there is nothing to weigh.
pub fn aggregate_suggestion(periods: &[TypingPeriod]) -> Option<TypingSuggestion> {
    let weights: Vec<f64> = periods
        .iter()
        .map(|p| p.duration().max(0.0) * p.confidence)
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let weighted = |f: fn(&TypingPeriod) -> f64| -> f64 {
        periods.iter().zip(&weights).map(|(p, w)| f(p) * w).sum::<f64>() / total
    };

    Some(TypingSuggestion {
        speed_multiplier: weighted(|p| p.suggested_speed_multiplier),
        average_wpm: weighted(|p| p.average_wpm),
        confidence: weighted(|p| p.confidence),
        total_typing_ms: periods.iter().map(TypingPeriod::duration).sum(),
        period_count: periods.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsync_project_model::event::Modifiers;

    fn keys(start: u64, spacing: u64, text: &str) -> Vec<TelemetryEvent> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let key = if c == ' ' { "Space".to_string() } else { c.to_string() };
                TelemetryEvent::key(start + i as u64 * spacing, key)
            })
            .collect()
    }

    #[test]
    fn test_key_classification() {
        assert_eq!(KeyClass::of("a"), Some(KeyClass::Letter));
        assert_eq!(KeyClass::of("Z"), Some(KeyClass::Letter));
        assert_eq!(KeyClass::of("7"), Some(KeyClass::Symbol));
        assert_eq!(KeyClass::of(";"), Some(KeyClass::Symbol));
        assert_eq!(KeyClass::of(" "), Some(KeyClass::Space));
        assert_eq!(KeyClass::of("Space"), Some(KeyClass::Space));
        assert_eq!(KeyClass::of("Backspace"), Some(KeyClass::Backspace));
        assert_eq!(KeyClass::of("Enter"), Some(KeyClass::Enter));
        assert_eq!(KeyClass::of("Tab"), Some(KeyClass::Tab));
        assert_eq!(KeyClass::of("ArrowLeft"), None);
        assert_eq!(KeyClass::of("F5"), None);
        assert_eq!(KeyClass::of(""), None);
    }

    #[test]
    fn test_steady_typing_yields_one_period() {
        let detector = TypingClusterDetector::with_defaults();
        let events = keys(1000, 300, "abcdefghijklmnopqrst");
        let periods = detector.detect(&events);

        assert_eq!(periods.len(), 1);
        let p = &periods[0];
        assert_eq!(p.key_count, 20);
        assert_eq!(p.start_time, 1000.0);
        assert_eq!(p.end_time, 1000.0 + 19.0 * 300.0);
        // 4 words in 5.7s
        assert!((p.average_wpm - 4.0 / (5.7 / 60.0)).abs() < 1e-9);
        // base + plausible wpm + letters + steady cadence
        assert!((p.confidence - 1.0).abs() < 1e-9);
        assert!((p.suggested_speed_multiplier - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_keys_yield_nothing() {
        let detector = TypingClusterDetector::with_defaults();
        let events = keys(0, 400, "abcdefg");
        assert!(detector.detect(&events).is_empty());
    }

    #[test]
    fn test_too_short_span_yields_nothing() {
        let detector = TypingClusterDetector::with_defaults();
        let events = keys(0, 50, "abcdefghijkl");
        assert!(detector.detect(&events).is_empty());
    }

    #[test]
    fn test_long_gap_splits_periods() {
        let detector = TypingClusterDetector::with_defaults();
        let mut events = keys(0, 250, "hello world");
        events.extend(keys(20_000, 250, "second line"));
        let periods = detector.detect(&events);
        assert_eq!(periods.len(), 2);
        assert!(periods[0].end_time < periods[1].start_time);
    }

    #[test]
    fn test_shortcuts_and_navigation_keys_are_excluded() {
        let detector = TypingClusterDetector::with_defaults();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        let events: Vec<_> = (0..20u64)
            .map(|i| {
                if i % 2 == 0 {
                    TelemetryEvent::key_with_modifiers(i * 300, "c", ctrl)
                } else {
                    TelemetryEvent::key(i * 300, "ArrowDown")
                }
            })
            .collect();
        assert!(detector.detect(&events).is_empty());
    }

    #[test]
    fn test_slow_typing_gets_larger_multiplier() {
        let detector = TypingClusterDetector::with_defaults();
        // 12 keys over 11 * 900ms ~ 14.5 wpm: outside plausible range.
        let slow = detector.detect(&keys(0, 900, "slow typing!"));
        // 20 keys over 19 * 120ms ~ 105 wpm
        let fast = detector.detect(&keys(0, 120, "quick brown fox jump"));

        assert_eq!(slow.len(), 1);
        assert_eq!(fast.len(), 1);
        assert!(slow[0].average_wpm < 30.0);
        assert!(fast[0].average_wpm >= 70.0);
        assert!(slow[0].suggested_speed_multiplier > fast[0].suggested_speed_multiplier);
        for p in slow.iter().chain(&fast) {
            assert!((1.2..=4.0).contains(&p.suggested_speed_multiplier));
        }
    }

    #[test]
    fn test_irregular_cadence_loses_bonus() {
        let detector = TypingClusterDetector::with_defaults();
        let stamps = [0u64, 100, 2500, 2600, 2700, 5400, 5450, 5500, 5550];
        let events: Vec<_> = stamps
            .iter()
            .map(|t| TelemetryEvent::key(*t, "x"))
            .collect();
        let periods = detector.detect(&events);
        assert_eq!(periods.len(), 1);
        // base 0.5 + letters 0.1, wpm ~ 19.6 is implausible, cadence irregular
        assert!((periods[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_long_period_bonus_applies() {
        let detector = TypingClusterDetector::with_defaults();
        let text = "a".repeat(60);
        let periods = detector.detect(&keys(0, 200, &text));
        assert_eq!(periods.len(), 1);
        // 60 keys over 11.8s ~ 61 wpm -> tier 2.0, full confidence, then x1.1
        assert!((periods[0].suggested_speed_multiplier - 2.2).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_weights_by_duration_and_confidence() {
        let period = |start: f64, end: f64, m: f64, c: f64| TypingPeriod {
            start_time: start,
            end_time: end,
            key_count: 10,
            average_wpm: 40.0,
            suggested_speed_multiplier: m,
            confidence: c,
        };
        let periods = vec![period(0.0, 3000.0, 3.0, 1.0), period(5000.0, 6000.0, 1.5, 1.0)];
        let suggestion = aggregate_suggestion(&periods).unwrap();
        assert!((suggestion.speed_multiplier - (3.0 * 3.0 + 1.5) / 4.0).abs() < 1e-9);
        assert_eq!(suggestion.total_typing_ms, 4000.0);
        assert_eq!(suggestion.period_count, 2);

        assert!(aggregate_suggestion(&[]).is_none());
    }
}
