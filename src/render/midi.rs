// MIDI Export - Write a variant's notes as a Standard MIDI File using midly
// Single-track files with tempo metadata, ready for a synth or DAW

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fragments::Variant;
use crate::sequence::NoteSequence;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write MIDI: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Invalid export option: {0}")]
    InvalidOption(String),
}

/// MIDI export options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportOptions {
    /// Pulses per quarter note (PPQ) - typically 480 or 960
    pub ppq: u16,

    /// Tempo written to the file; note times are converted at this rate
    pub bpm: f64,

    /// Optional track name meta event
    pub track_name: Option<String>,

    /// Shift notes so the first one starts at tick 0
    pub rebase: bool,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ppq: 480,
            bpm: 120.0,
            track_name: None,
            rebase: true,
        }
    }
}

/// Export a note sequence to MIDI file bytes
pub fn export_notes_midi(
    sequence: &NoteSequence,
    options: &MidiExportOptions,
) -> Result<Vec<u8>, ExportError> {
    if options.ppq == 0 || options.ppq > 0x7FFF {
        return Err(ExportError::InvalidOption(format!(
            "ppq must be between 1 and 32767, got {}",
            options.ppq
        )));
    }
    if !options.bpm.is_finite() || options.bpm <= 0.0 {
        return Err(ExportError::InvalidOption(format!(
            "bpm must be positive, got {}",
            options.bpm
        )));
    }

    let notes = if options.rebase {
        sequence.rebased()
    } else {
        sequence.clone()
    };

    let ticks_per_second = calculate_ticks_per_second(options.bpm, options.ppq);
    let to_tick = |seconds: f64| (seconds.max(0.0) * ticks_per_second).round() as u32;

    // (tick, is_note_on, event); note offs sort ahead of note ons at equal ticks,
    // so every note lasts at least one tick to keep its own off after its on
    let mut events: Vec<(u32, bool, TrackEventKind)> = Vec::with_capacity(notes.size() * 2);
    for note in notes.iter() {
        let key = note.pitch.min(127);
        let vel = note.velocity.clamp(1, 127);
        let tick_on = to_tick(note.start_time);
        let tick_off = to_tick(note.end_time).max(tick_on.saturating_add(1));

        events.push((
            tick_on,
            true,
            TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: vel.into(),
                },
            },
        ));
        events.push((
            tick_off,
            false,
            TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0.into(),
                },
            },
        ));
    }
    events.sort_by_key(|(tick, is_on, _)| (*tick, *is_on));

    let mut track = Track::new();

    if let Some(name) = &options.track_name {
        track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        });
    }

    let us_per_quarter = (60_000_000.0 / options.bpm).round() as u32;
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter.min(0xFF_FFFF).into())),
    });

    // Convert to delta times
    let mut last_tick = 0;
    for (tick, _, kind) in events {
        track.push(TrackEvent {
            delta: tick.saturating_sub(last_tick).into(),
            kind,
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(options.ppq.into())),
        tracks: vec![track],
    };

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;

    Ok(bytes)
}

/// Export the half-open note slice of one variant
pub fn export_variant_midi(
    sequence: &NoteSequence,
    variant: &Variant,
    options: &MidiExportOptions,
) -> Result<Vec<u8>, ExportError> {
    export_notes_midi(&variant.notes_in(sequence), options)
}

fn calculate_ticks_per_second(bpm: f64, ppq: u16) -> f64 {
    ppq as f64 * bpm / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{load_midi, Note};

    fn sequence() -> NoteSequence {
        NoteSequence::new(vec![
            Note::new(1.0, 1.5, 60, 100),
            Note::new(1.5, 2.0, 62, 0),
            Note::new(2.0, 3.0, 64, 90),
            Note::new(3.0, 3.5, 65, 80),
        ])
    }

    #[test]
    fn test_ticks_per_second() {
        // 120 BPM at 480 PPQ: two quarter notes per second
        assert_eq!(calculate_ticks_per_second(120.0, 480), 960.0);
    }

    #[test]
    fn test_export_is_single_track() {
        let bytes = export_notes_midi(&sequence(), &MidiExportOptions::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.tracks.len(), 1);
        assert!(matches!(
            smf.tracks[0].last().map(|e| e.kind),
            Some(TrackEventKind::Meta(MetaMessage::EndOfTrack))
        ));
    }

    #[test]
    fn test_export_reimports_rebased() {
        let bytes = export_notes_midi(&sequence(), &MidiExportOptions::default()).unwrap();
        let reloaded = load_midi(&bytes).unwrap();

        assert_eq!(reloaded.size(), 4);
        assert!((reloaded[0].start_time - 0.0).abs() < 1e-6);
        assert!((reloaded[2].start_time - 1.0).abs() < 1e-6);
        assert!((reloaded[3].end_time - 2.5).abs() < 1e-6);
        // Silent notes are written audible so they survive as notes
        assert_eq!(reloaded[1].velocity, 1);
    }

    #[test]
    fn test_export_without_rebase_keeps_offsets() {
        let options = MidiExportOptions {
            rebase: false,
            ..Default::default()
        };
        let bytes = export_notes_midi(&sequence(), &options).unwrap();
        let reloaded = load_midi(&bytes).unwrap();

        assert!((reloaded[0].start_time - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_track_name_is_written() {
        let options = MidiExportOptions {
            track_name: Some("fragment-0-variant-1".to_string()),
            ..Default::default()
        };
        let bytes = export_notes_midi(&sequence(), &options).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        let name = smf.tracks[0].iter().find_map(|e| match e.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => Some(name),
            _ => None,
        });
        assert_eq!(name, Some(&b"fragment-0-variant-1"[..]));
    }

    #[test]
    fn test_variant_export_uses_half_open_slice() {
        let variant = Variant {
            start_time: 1.0,
            finish_time: 3.5,
            start_note_index: 0,
            finish_note_index: 3,
        };
        let bytes =
            export_variant_midi(&sequence(), &variant, &MidiExportOptions::default()).unwrap();

        assert_eq!(load_midi(&bytes).unwrap().size(), 3);
    }

    #[test]
    fn test_zero_length_note_is_released() {
        let notes = NoteSequence::new(vec![
            Note::new(0.0, 0.0, 60, 100),
            Note::new(1.0, 2.0, 62, 100),
            Note::new(3.0, 4.0, 64, 100),
        ]);
        let bytes = export_notes_midi(&notes, &MidiExportOptions::default()).unwrap();
        let reloaded = load_midi(&bytes).unwrap();

        assert_eq!(reloaded.size(), 3);
        assert_eq!(reloaded[0].pitch, 60);
        // One tick at 960 ticks per second
        assert!(reloaded[0].end_time < 0.01);
        assert!((reloaded[2].end_time - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = MidiExportOptions {
            bpm: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            export_notes_midi(&sequence(), &options),
            Err(ExportError::InvalidOption(_))
        ));
    }
}
