//! Lifecycle Tests
//!
//! Subsystem init/shutdown and the clip loader's release order on every
//! failure path, observed through the null device journal.

mod common;

use clipdeck::config::LoaderConfig;
use clipdeck::driver::{DriverCall, DriverError, DriverEvent, Format, NullDevice};
use clipdeck::{AudioError, AudioSubsystem};
use pretty_assertions::assert_eq;
use serial_test::serial;
use tempfile::TempDir;

use common::{null_config, truncate, write_sine, INIT_EVENTS};
use DriverEvent::*;

// === Subsystem ===

#[test]
#[serial]
fn test_init_load_unload_shutdown_order() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 2, 44100, 4410);
    let null = NullDevice::new();

    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();
    assert!(audio.context().is_current());

    let clip = audio.load_clip(&path).unwrap();
    audio.unload_clip(clip);
    audio.shutdown();

    assert_eq!(
        null.journal().events(),
        vec![
            DeviceOpened,
            ContextCreated,
            ContextMadeCurrent,
            BufferGenerated(1),
            SourceGenerated(2),
            BufferData {
                buffer: 1,
                format: Format::Stereo16,
                bytes: 4410 * 4,
                sample_rate: 44100,
            },
            SourceBufferSet {
                source: 2,
                buffer: Some(1),
            },
            SourceDeleted(2),
            BufferDeleted(1),
            ContextReleased,
            ContextDestroyed,
            DeviceClosed,
        ]
    );
}

#[test]
#[serial]
fn test_shutdown_allows_new_init() {
    let first = NullDevice::new();
    AudioSubsystem::init_null(null_config(), &first)
        .unwrap()
        .shutdown();

    let second = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &second).unwrap();
    assert!(audio.context().is_current());
}

#[test]
#[serial]
fn test_second_init_fails_activation() {
    let first = NullDevice::new();
    let _audio = AudioSubsystem::init_null(null_config(), &first).unwrap();

    let second = NullDevice::new();
    let err = AudioSubsystem::init_null(null_config(), &second).unwrap_err();
    assert!(matches!(
        err,
        AudioError::ContextActivation(DriverError::ContextBusy)
    ));
    assert_eq!(
        second.journal().events(),
        vec![DeviceOpened, ContextCreated, ContextDestroyed, DeviceClosed]
    );
    assert_eq!(first.journal().len(), INIT_EVENTS);
}

#[test]
#[serial]
fn test_device_open_failure() {
    let null = NullDevice::new();
    null.faults().fail(DriverCall::OpenDevice);

    let err = AudioSubsystem::init_null(null_config(), &null).unwrap_err();
    assert_eq!(err.error_code(), "DEVICE_OPEN");
    assert!(null.journal().is_empty());
}

#[test]
#[serial]
fn test_context_create_failure_closes_device() {
    let null = NullDevice::new();
    null.faults().fail(DriverCall::CreateContext);

    let err = AudioSubsystem::init_null(null_config(), &null).unwrap_err();
    assert!(matches!(err, AudioError::ContextCreate(_)));
    assert_eq!(null.journal().events(), vec![DeviceOpened, DeviceClosed]);
}

#[test]
#[serial]
fn test_activation_failure_destroys_context() {
    let null = NullDevice::new();
    null.faults().fail(DriverCall::MakeCurrent);

    let err = AudioSubsystem::init_null(null_config(), &null).unwrap_err();
    assert!(matches!(
        err,
        AudioError::ContextActivation(DriverError::Rejected(DriverCall::MakeCurrent))
    ));
    assert_eq!(
        null.journal().events(),
        vec![DeviceOpened, ContextCreated, ContextDestroyed, DeviceClosed]
    );
}

#[test]
#[serial]
fn test_invalid_config_opens_nothing() {
    let null = NullDevice::new();
    let mut config = null_config();
    config.device.period_frames = 0;

    let err = AudioSubsystem::init_null(config, &null).unwrap_err();
    assert!(matches!(err, AudioError::Config { .. }));
    assert!(null.journal().is_empty());
}

// Only reachable with --no-default-features
#[cfg(not(feature = "cpal"))]
#[test]
#[serial]
fn test_default_backend_without_cpal_fails_to_open() {
    let err = AudioSubsystem::init(clipdeck::AudioConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        AudioError::DeviceOpen(DriverError::BackendUnavailable("cpal"))
    ));
}

// === Loader failure paths ===

/// Load `path` with `call` rejected and return the error plus the events
/// recorded after init
fn load_with_fault(
    path: &std::path::Path,
    call: Option<DriverCall>,
    loader: LoaderConfig,
) -> (AudioError, Vec<DriverEvent>) {
    let null = NullDevice::new();
    let mut config = null_config();
    config.loader = loader;
    let audio = AudioSubsystem::init_null(config, &null).unwrap();
    if let Some(call) = call {
        null.faults().fail(call);
    }

    let err = audio.load_clip(path).unwrap_err();
    (err, null.journal().events_since(INIT_EVENTS))
}

#[test]
#[serial]
fn test_buffer_alloc_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 100);

    let (err, events) = load_with_fault(&path, Some(DriverCall::GenBuffer), LoaderConfig::default());
    assert!(matches!(err, AudioError::BufferAlloc(_)));
    assert!(events.is_empty());
}

#[test]
#[serial]
fn test_source_alloc_failure_releases_buffer() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 100);

    let (err, events) = load_with_fault(&path, Some(DriverCall::GenSource), LoaderConfig::default());
    assert!(matches!(err, AudioError::SourceAlloc(_)));
    assert_eq!(events, vec![BufferGenerated(1), BufferDeleted(1)]);
}

#[test]
#[serial]
fn test_missing_file_releases_source_then_buffer() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.wav");

    let (err, events) = load_with_fault(&path, None, LoaderConfig::default());
    match err {
        AudioError::FileOpen { path: failed, .. } => assert_eq!(failed, path),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        events,
        vec![
            BufferGenerated(1),
            SourceGenerated(2),
            SourceDeleted(2),
            BufferDeleted(1)
        ]
    );
}

#[test]
#[serial]
fn test_unreadable_file_is_file_open_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, b"definitely not RIFF data").unwrap();

    let (err, _) = load_with_fault(&path, None, LoaderConfig::default());
    assert_eq!(err.error_code(), "FILE_OPEN");
}

#[test]
#[serial]
fn test_oversized_clip_is_out_of_memory() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 2, 8000, 1000);

    let loader = LoaderConfig {
        max_decode_bytes: 3999,
    };
    let (err, events) = load_with_fault(&path, None, loader);
    assert!(matches!(
        err,
        AudioError::OutOfMemory {
            requested: 4000,
            limit: 3999
        }
    ));
    assert_eq!(
        events,
        vec![
            BufferGenerated(1),
            SourceGenerated(2),
            SourceDeleted(2),
            BufferDeleted(1)
        ]
    );
}

#[test]
#[serial]
fn test_truncated_file_is_short_read() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 1000);
    truncate(&path, 200);

    let (err, events) = load_with_fault(&path, None, LoaderConfig::default());
    match err {
        AudioError::ShortRead { expected, read } => {
            assert_eq!(expected, 1000);
            assert_eq!(read, 900);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        events,
        vec![
            BufferGenerated(1),
            SourceGenerated(2),
            SourceDeleted(2),
            BufferDeleted(1)
        ]
    );
}

#[test]
#[serial]
fn test_upload_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 100);

    let (err, events) = load_with_fault(&path, Some(DriverCall::BufferData), LoaderConfig::default());
    assert!(matches!(
        err,
        AudioError::Upload(DriverError::Rejected(DriverCall::BufferData))
    ));
    assert_eq!(
        events,
        vec![
            BufferGenerated(1),
            SourceGenerated(2),
            SourceDeleted(2),
            BufferDeleted(1)
        ]
    );
}

#[test]
#[serial]
fn test_bind_failure_releases_uploaded_buffer() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), "tone.wav", 1, 8000, 100);

    let (err, events) = load_with_fault(&path, Some(DriverCall::SourceBuffer), LoaderConfig::default());
    assert!(matches!(err, AudioError::Bind(_)));
    assert_eq!(
        events,
        vec![
            BufferGenerated(1),
            SourceGenerated(2),
            BufferData {
                buffer: 1,
                format: Format::Mono16,
                bytes: 200,
                sample_rate: 8000,
            },
            SourceDeleted(2),
            BufferDeleted(1)
        ]
    );
}

#[test]
#[serial]
fn test_failed_load_leaves_earlier_clips_loaded() {
    let dir = TempDir::new().unwrap();
    let good = write_sine(dir.path(), "good.wav", 1, 8000, 100);
    let null = NullDevice::new();
    let audio = AudioSubsystem::init_null(null_config(), &null).unwrap();

    let clip = audio.load_clip(&good).unwrap();
    assert!(audio.load_clip(dir.path().join("missing.wav")).is_err());

    assert_eq!(clip.source().buffer(), Some(clip.buffer().name()));
    assert_eq!(clip.buffer().frames(), 100);
}
