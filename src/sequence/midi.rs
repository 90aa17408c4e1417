// MIDI Import - Build a note sequence from a Standard MIDI File using midly
// Merges all tracks, honours the tempo map, and pairs note-on/note-off events

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

use super::note::{Note, NoteSequence};

/// Default tempo when a file carries no tempo meta event (120 BPM)
const DEFAULT_US_PER_QUARTER: u32 = 500_000;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("Failed to parse MIDI file: {0}")]
    ParseError(#[from] midly::Error),

    #[error("Invalid MIDI timing: {0}")]
    InvalidTiming(String),
}

/// A note-on or note-off at an absolute tick
#[derive(Debug, Clone, Copy)]
struct KeyEvent {
    tick: u64,
    channel: u8,
    key: u8,
    /// Zero means release
    velocity: u8,
}

/// Piecewise-constant tempo map for metrical files
struct TempoMap {
    /// (tick, seconds at tick, seconds per tick from here on)
    segments: Vec<(u64, f64, f64)>,
}

impl TempoMap {
    fn new(ppq: u16, mut changes: Vec<(u64, u32)>) -> Self {
        let ppq = ppq as f64;
        let seconds_per_tick = |us_per_quarter: u32| us_per_quarter as f64 / 1_000_000.0 / ppq;

        // Stable sort keeps the last change at a given tick last
        changes.sort_by_key(|(tick, _)| *tick);

        let mut segments = vec![(0u64, 0.0f64, seconds_per_tick(DEFAULT_US_PER_QUARTER))];
        for (tick, us_per_quarter) in changes {
            let (last_tick, last_seconds, last_spt) = segments[segments.len() - 1];
            let seconds = last_seconds + (tick - last_tick) as f64 * last_spt;
            let spt = seconds_per_tick(us_per_quarter);

            if tick == last_tick {
                let last = segments.len() - 1;
                segments[last] = (tick, last_seconds, spt);
            } else {
                segments.push((tick, seconds, spt));
            }
        }

        TempoMap { segments }
    }

    fn seconds(&self, tick: u64) -> f64 {
        let idx = self
            .segments
            .partition_point(|(start, _, _)| *start <= tick)
            .saturating_sub(1);
        let (start, seconds, spt) = self.segments[idx];
        seconds + (tick - start) as f64 * spt
    }
}

/// Tick-to-seconds conversion for either timing mode
enum Clock {
    Metrical(TempoMap),
    Timecode { ticks_per_second: f64 },
}

impl Clock {
    fn seconds(&self, tick: u64) -> f64 {
        match self {
            Clock::Metrical(map) => map.seconds(tick),
            Clock::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
        }
    }
}

/// Parse Standard MIDI File bytes into a note sequence
///
/// All tracks and channels are merged into one performance. Overlapping
/// notes on the same key are paired first-in first-out. Notes still held at
/// the end of the file are released at the last event.
pub fn load_midi(data: &[u8]) -> Result<NoteSequence, MidiError> {
    let smf = Smf::parse(data)?;

    let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
    let mut key_events: Vec<KeyEvent> = Vec::new();
    let mut last_tick = 0u64;

    for track in &smf.tracks {
        let mut tick = 0u64;

        for event in track {
            tick += event.delta.as_int() as u64;
            last_tick = last_tick.max(tick);

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    tempo_changes.push((tick, us_per_quarter.as_int()));
                }
                TrackEventKind::Midi { channel, message } => {
                    let (key, velocity) = match message {
                        MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int()),
                        MidiMessage::NoteOff { key, .. } => (key.as_int(), 0),
                        _ => continue,
                    };
                    key_events.push(KeyEvent {
                        tick,
                        channel: channel.as_int(),
                        key,
                        velocity,
                    });
                }
                _ => {}
            }
        }
    }

    let clock = match smf.header.timing {
        Timing::Metrical(ppq) => {
            let ppq = ppq.as_int();
            if ppq == 0 {
                return Err(MidiError::InvalidTiming(
                    "zero ticks per quarter note".to_string(),
                ));
            }
            Clock::Metrical(TempoMap::new(ppq, tempo_changes))
        }
        Timing::Timecode(fps, subframes) => {
            let ticks_per_second = fps.as_f32() as f64 * subframes as f64;
            if ticks_per_second <= 0.0 {
                return Err(MidiError::InvalidTiming(
                    "zero ticks per second".to_string(),
                ));
            }
            Clock::Timecode { ticks_per_second }
        }
    };

    // Merge tracks; stable sort keeps per-track order within a tick
    key_events.sort_by_key(|e| e.tick);

    let mut held: BTreeMap<(u8, u8), VecDeque<(u64, u8)>> = BTreeMap::new();
    let mut notes = Vec::new();

    for event in key_events {
        let slot = held.entry((event.channel, event.key)).or_default();

        if event.velocity > 0 {
            slot.push_back((event.tick, event.velocity));
        } else if let Some((start_tick, velocity)) = slot.pop_front() {
            notes.push(Note::new(
                clock.seconds(start_tick),
                clock.seconds(event.tick),
                event.key,
                velocity,
            ));
        }
    }

    // Release anything still sounding
    for ((_, key), pending) in held {
        for (start_tick, velocity) in pending {
            notes.push(Note::new(
                clock.seconds(start_tick),
                clock.seconds(last_tick),
                key,
                velocity,
            ));
        }
    }

    Ok(NoteSequence::from_unordered(notes))
}
