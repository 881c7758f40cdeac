//! Playback Tests
//!
//! Clips, tracks and reverb environments rendered on the null device.

mod common;

use std::time::{Duration, Instant};

use clipdeck::config::WaitStrategy;
use clipdeck::driver::{DriverCall, DriverError, DriverEvent, Format, NullDevice, ReverbPreset, SourceState};
use clipdeck::{AudioError, AudioSubsystem, Track};
use hound::SampleFormat;
use pretty_assertions::assert_eq;
use serial_test::serial;
use tempfile::TempDir;

use common::{null_config, write_silence, write_sine, INIT_EVENTS};

// === Clips ===

#[test]
#[serial]
fn test_stereo_clip_plays_to_completion() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "stereo.wav", 2, 44100, 11025);
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();

    let clip = audio.load_clip(&path).unwrap();
    assert_eq!(clip.frames(), 11025);
    assert_eq!(clip.sample_rate(), 44100);
    assert_eq!(clip.channels(), 2);
    assert_eq!(clip.format(), Format::Stereo16);
    assert_eq!(clip.duration(), Duration::from_millis(250));
    assert!(!audio.is_clip_playing(&clip));

    let started = Instant::now();
    audio.play_clips(std::slice::from_ref(&clip)).unwrap();
    assert!(audio.is_clip_playing(&clip));

    audio.wait_for_clips(std::slice::from_ref(&clip)).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(!audio.is_clip_playing(&clip));
    assert_eq!(clip.source().state(), SourceState::Stopped);
    assert_eq!(clip.source().offset_frames(), 0);
}

#[test]
#[serial]
fn test_poll_wait_strategy() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "mono.wav", 1, 22050, 2205);
    let mut config = null_config();
    config.playback.wait = WaitStrategy::Poll;
    config.playback.poll_interval_ms = 5;
    let audio = AudioSubsystem::init_null(config, &NullDevice::new()).unwrap();

    let clips = vec![audio.load_clip(&path).unwrap()];
    audio.play_clips(&clips).unwrap();
    audio.wait_for_clips(&clips).unwrap();
    assert!(!audio.is_clip_playing(&clips[0]));
}

#[test]
#[serial]
fn test_clip_can_be_replayed() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "blip.wav", 1, 48000, 2400);
    let audio = AudioSubsystem::init_null(null_config(), &NullDevice::new()).unwrap();
    let clips = vec![audio.load_clip(&path).unwrap()];

    for _ in 0..2 {
        audio.play_clips(&clips).unwrap();
        assert!(audio.is_clip_playing(&clips[0]));
        audio.wait_for_clips(&clips).unwrap();
    }
}

#[test]
#[serial]
fn test_device_formats_follow_encoding() {
    let dir = TempDir::new().unwrap();
    let audio = AudioSubsystem::init_null(null_config(), &NullDevice::new()).unwrap();

    let cases = [
        ("u8.wav", 8, SampleFormat::Int, Format::Mono8),
        ("s16.wav", 16, SampleFormat::Int, Format::Mono16),
        ("s24.wav", 24, SampleFormat::Int, Format::Mono16),
        ("f32.wav", 32, SampleFormat::Float, Format::MonoFloat32),
    ];
    for (name, bits, sample_format, expected) in cases {
        let path = write_silence(dir.path(), name, bits, sample_format, 64);
        let clip = audio.load_clip(&path).unwrap();
        assert_eq!(clip.format(), expected, "{}", name);
        assert_eq!(clip.buffer().format(), Some(expected), "{}", name);
        assert_eq!(clip.buffer().frames(), 64, "{}", name);
    }
}

#[test]
#[serial]
fn test_wide_file_keeps_two_channels() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "quad.wav", 4, 8000, 500);
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();

    let clip = audio.load_clip(&path).unwrap();
    assert_eq!(clip.channels(), 4);
    assert_eq!(clip.format(), Format::Stereo16);
    assert!(null.journal().events().contains(&DriverEvent::BufferData {
        buffer: clip.buffer().name(),
        format: Format::Stereo16,
        bytes: 500 * 4,
        sample_rate: 8000,
    }));
}

#[test]
#[serial]
fn test_play_failure_is_playback_error() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 800);
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();
    let clips = vec![audio.load_clip(&path).unwrap()];

    null.faults().fail(DriverCall::SourcePlay);
    let err = audio.play_clips(&clips).unwrap_err();
    assert!(matches!(
        err,
        AudioError::Playback(DriverError::Rejected(DriverCall::SourcePlay))
    ));
    assert!(!audio.is_clip_playing(&clips[0]));
}

#[test]
#[serial]
fn test_play_failure_keeps_started_clips_playing() {
    let dir = TempDir::new().unwrap();
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();
    // Two seconds each, so nothing finishes during the test
    let clips: Vec<_> = ["a.wav", "b.wav", "c.wav"]
        .iter()
        .map(|name| {
            let path = write_sine(dir.path(), name, 1, 8000, 16000);
            audio.load_clip(&path).unwrap()
        })
        .collect();

    null.faults().fail_after(DriverCall::SourcePlay, 1);
    let err = audio.play_clips(&clips).unwrap_err();
    assert!(matches!(
        err,
        AudioError::Playback(DriverError::Rejected(DriverCall::SourcePlay))
    ));

    assert_eq!(clips[0].source().state(), SourceState::Playing);
    assert_eq!(clips[1].source().state(), SourceState::Initial);
    assert_eq!(clips[2].source().state(), SourceState::Initial);
}

#[test]
#[serial]
fn test_wait_without_playing_returns_immediately() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 80000);
    let audio = AudioSubsystem::init_null(null_config(), &NullDevice::new()).unwrap();
    let clips = vec![audio.load_clip(&path).unwrap()];

    let started = Instant::now();
    audio.wait_for_clips(&clips).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}

// === Tracks ===

#[test]
#[serial]
fn test_track_starts_every_entry_together() {
    let dir = TempDir::new().unwrap();
    let drums = write_sine(dir.path(), "drums.wav", 2, 44100, 4410);
    let bass = write_sine(dir.path(), "bass.wav", 1, 22050, 4410);
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();
    let clips = vec![audio.load_clip(&drums).unwrap(), audio.load_clip(&bass).unwrap()];

    let mut track = Track::new();
    track
        .add(0, Duration::ZERO)
        .add(1, Duration::from_millis(500));

    let before = null.journal().len();
    audio.play_track(&track, &clips).unwrap();
    assert!(clips.iter().all(|c| audio.is_clip_playing(c)));
    assert_eq!(
        null.journal().events_since(before),
        vec![
            DriverEvent::SourcePlayed(clips[0].source().name()),
            DriverEvent::SourcePlayed(clips[1].source().name()),
        ]
    );

    audio.wait_for_clips(&clips).unwrap();
    assert!(clips.iter().all(|c| !audio.is_clip_playing(c)));
}

#[test]
#[serial]
fn test_track_with_unknown_clip() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 80);
    let audio = AudioSubsystem::init_null(null_config(), &NullDevice::new()).unwrap();
    let clips = vec![audio.load_clip(&path).unwrap()];

    let mut track = Track::new();
    track.add(0, Duration::ZERO).add(3, Duration::from_secs(1));

    let err = audio.play_track(&track, &clips).unwrap_err();
    assert!(matches!(
        err,
        AudioError::UnknownClip {
            entry: 1,
            clip: 3,
            available: 1
        }
    ));
    // Nothing starts when the track is rejected
    assert!(!audio.is_clip_playing(&clips[0]));
}

// === Reverb ===

#[test]
#[serial]
fn test_reverb_environment_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 22050, 2205);
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();

    let clip = audio.load_clip(&path).unwrap();
    let environment = audio.create_reverb(ReverbPreset::Cave).unwrap();
    assert_eq!(environment.preset(), Some(ReverbPreset::Cave));
    assert_eq!(environment.slot().effect(), Some(environment.effect().name()));
    environment.route(&clip).unwrap();
    assert_eq!(clip.source().aux_send(), Some(environment.slot().name()));

    let clips = [clip];
    audio.play_clips(&clips).unwrap();
    audio.wait_for_clips(&clips).unwrap();

    let skip = INIT_EVENTS + 4;
    drop(environment);
    drop(clips);
    audio.shutdown();

    let events: Vec<DriverEvent> = null
        .journal()
        .events_since(skip)
        .into_iter()
        .filter(|e| !matches!(e, DriverEvent::SourcePlayed(_)))
        .collect();
    assert_eq!(
        events,
        vec![
            DriverEvent::EffectGenerated(3),
            DriverEvent::EffectSlotGenerated(4),
            DriverEvent::EffectReverbSet(3),
            DriverEvent::EffectSlotAttached {
                slot: 4,
                effect: Some(3)
            },
            DriverEvent::SourceAuxSendSet {
                source: 2,
                slot: Some(4)
            },
            DriverEvent::EffectSlotDeleted(4),
            DriverEvent::EffectDeleted(3),
            DriverEvent::SourceDeleted(2),
            DriverEvent::BufferDeleted(1),
            DriverEvent::ContextReleased,
            DriverEvent::ContextDestroyed,
            DriverEvent::DeviceClosed,
        ]
    );
}

/// Create a Generic environment with `call` rejected and return the error
/// plus the events recorded after init
fn environment_with_fault(call: DriverCall) -> (AudioError, Vec<DriverEvent>) {
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();
    null.faults().fail(call);

    let err = audio.create_reverb(ReverbPreset::Generic).unwrap_err();
    (err, null.journal().events_since(INIT_EVENTS))
}

#[test]
#[serial]
fn test_effect_alloc_failure() {
    let (err, events) = environment_with_fault(DriverCall::GenEffect);
    assert!(matches!(err, AudioError::EffectAlloc(_)));
    assert!(events.is_empty());
}

#[test]
#[serial]
fn test_slot_alloc_failure_releases_effect() {
    let (err, events) = environment_with_fault(DriverCall::GenEffectSlot);
    assert!(matches!(err, AudioError::EffectSlotAlloc(_)));
    assert_eq!(
        events,
        vec![DriverEvent::EffectGenerated(1), DriverEvent::EffectDeleted(1)]
    );
}

#[test]
#[serial]
fn test_effect_config_failure() {
    let (err, events) = environment_with_fault(DriverCall::EffectReverb);
    assert!(matches!(err, AudioError::EffectConfig(_)));
    assert_eq!(
        events,
        vec![
            DriverEvent::EffectGenerated(1),
            DriverEvent::EffectSlotGenerated(2),
            DriverEvent::EffectSlotDeleted(2),
            DriverEvent::EffectDeleted(1),
        ]
    );
}

#[test]
#[serial]
fn test_effect_attach_failure() {
    let (err, events) = environment_with_fault(DriverCall::SlotAttach);
    assert!(matches!(err, AudioError::EffectAttach(_)));
    assert_eq!(
        events,
        vec![
            DriverEvent::EffectGenerated(1),
            DriverEvent::EffectSlotGenerated(2),
            DriverEvent::EffectReverbSet(1),
            DriverEvent::EffectSlotDeleted(2),
            DriverEvent::EffectDeleted(1),
        ]
    );
}

#[test]
#[serial]
fn test_invalid_properties_are_rejected() {
    let audio = AudioSubsystem::init_null(null_config(), &NullDevice::new()).unwrap();
    let mut properties = ReverbPreset::Hallway.properties();
    properties.decay_time = 0.0;

    let err = audio.create_environment(&properties).unwrap_err();
    assert!(matches!(
        err,
        AudioError::EffectConfig(DriverError::InvalidValue(_))
    ));
}

#[test]
#[serial]
fn test_route_failure_is_send_route_error() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 80);
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();
    let clip = audio.load_clip(&path).unwrap();
    let environment = audio.create_reverb(ReverbPreset::Room).unwrap();

    null.faults().fail(DriverCall::SourceAuxSend);
    let err = environment.route(&clip).unwrap_err();
    assert_eq!(err.error_code(), "SEND_ROUTE");
    assert_eq!(clip.source().aux_send(), None);

    null.faults().heal(DriverCall::SourceAuxSend);
    environment.route(&clip).unwrap();
    environment.unroute(&clip).unwrap();
    assert_eq!(clip.source().aux_send(), None);
}
