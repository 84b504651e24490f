//! Control loop behaviour over scripted hardware and a recording backend
//!
//! All tests run on a paused clock; sleeps inside the loop advance it
//! instantly.

mod helpers;

use helpers::*;
use nfcbox_player::backend::PlaybackTarget;
use nfcbox_player::hardware::{ScriptFrame, ScriptedInput};
use nfcbox_player::sampler::InputSampler;
use nfcbox_player::{
    Button, ControlLoop, ControllerState, ErrorKind, PlaybackController, TagDisposition,
};
use std::time::Duration;
use tokio::time::Instant;

type TestLoop<H> = ControlLoop<H, StaticResolver, RecordingBackend>;

fn build_loop(
    frames: Vec<ScriptFrame>,
    resolver: StaticResolver,
    backend: RecordingBackend,
) -> (TestLoop<ScriptedInput>, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
    let input = ScriptedInput::new(frames);
    let cleanups = input.cleanup_counter();
    let sampler = InputSampler::new(input, &PINS);
    let controller = PlaybackController::new(backend, DEVICE_ID, timing().settle);
    (ControlLoop::new(sampler, resolver, controller, timing()), cleanups)
}

fn library() -> StaticResolver {
    StaticResolver::new()
        .with("04A1", "spotify:track:6rqhFgbbKwnb9MLmUQDhG6", "track")
        .with("04B2", "spotify:album:1DFixLWuPkv3KT3TnV35m3", "album")
        .with("04C3", "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M", "playlist")
        .with("04D4", "spotify:show:5CfCWKI5pZ28U0uOzXkDHe", "show")
}

fn transfer() -> Call {
    Call::Transfer {
        device_id: DEVICE_ID.to_string(),
        force_play: true,
    }
}

fn start(target: PlaybackTarget) -> Call {
    Call::Start {
        device_id: DEVICE_ID.to_string(),
        target,
    }
}

#[tokio::test(start_paused = true)]
async fn test_repeated_scans_start_playback_once() {
    let backend = RecordingBackend::new();
    let frames = vec![ScriptFrame::tag("04A1"); 3];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    assert_eq!(control.tick().await.tag, TagDisposition::Started);
    assert_eq!(control.tick().await.tag, TagDisposition::Duplicate);
    assert_eq!(control.tick().await.tag, TagDisposition::Duplicate);

    assert_eq!(
        backend.calls(),
        vec![
            transfer(),
            start(PlaybackTarget::Track("spotify:track:6rqhFgbbKwnb9MLmUQDhG6".into())),
        ]
    );

    let session = control.session();
    assert_eq!(session.last_tag_identifier.as_deref(), Some("04A1"));
    assert!(session.device_ready);
    assert_eq!(session.last_error, None);
    assert_eq!(control.controller().state(), ControllerState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_tag_removed_and_replaced_is_still_duplicate() {
    let backend = RecordingBackend::new();
    let frames = vec![
        ScriptFrame::tag("04A1"),
        ScriptFrame::idle(),
        ScriptFrame::tag("04A1"),
    ];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    control.tick().await;
    assert_eq!(control.tick().await.tag, TagDisposition::NoTag);
    assert_eq!(control.tick().await.tag, TagDisposition::Duplicate);
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_albums_and_playlists_start_as_context() {
    let backend = RecordingBackend::new();
    let frames = vec![ScriptFrame::tag("04B2"), ScriptFrame::tag("04C3")];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    assert_eq!(control.tick().await.tag, TagDisposition::Started);
    assert_eq!(control.tick().await.tag, TagDisposition::Started);

    assert_eq!(
        backend.calls(),
        vec![
            transfer(),
            start(PlaybackTarget::Context("spotify:album:1DFixLWuPkv3KT3TnV35m3".into())),
            transfer(),
            start(PlaybackTarget::Context("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M".into())),
        ]
    );
    assert_eq!(control.session().last_tag_identifier.as_deref(), Some("04C3"));
}

#[tokio::test(start_paused = true)]
async fn test_start_waits_for_settle_delay() {
    let backend = RecordingBackend::new();
    let (mut control, _) = build_loop(vec![ScriptFrame::tag("04A1")], library(), backend);

    let before = Instant::now();
    control.tick().await;
    assert!(Instant::now() - before >= timing().settle);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_tag_makes_no_backend_call() {
    let backend = RecordingBackend::new();
    let frames = vec![ScriptFrame::tag("FFFF"); 2];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    assert_eq!(control.tick().await.tag, TagDisposition::NotFound);
    // Not latched, so the lookup repeats while the tag stays on the reader
    assert_eq!(control.tick().await.tag, TagDisposition::NotFound);

    assert!(backend.calls().is_empty());
    let session = control.session();
    assert_eq!(session.last_tag_identifier, None);
    assert_eq!(session.last_error, Some(ErrorKind::RegistryMiss));
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_media_type_is_rejected_locally() {
    let backend = RecordingBackend::new();
    let frames = vec![ScriptFrame::tag("04D4"); 2];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    assert_eq!(
        control.tick().await.tag,
        TagDisposition::Failed(ErrorKind::UnknownMediaKind)
    );
    assert_eq!(control.tick().await.tag, TagDisposition::Duplicate);

    assert!(backend.calls().is_empty());
    assert_eq!(control.session().last_tag_identifier.as_deref(), Some("04D4"));
    assert_eq!(control.controller().state(), ControllerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_transfer_failure_retries_on_next_read() {
    let backend = RecordingBackend::new();
    backend.fail("transfer", Failure::Unavailable, 1);
    let frames = vec![ScriptFrame::tag("04A1"); 2];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    assert_eq!(
        control.tick().await.tag,
        TagDisposition::Failed(ErrorKind::BackendUnavailable)
    );
    assert_eq!(backend.calls(), vec![transfer()]);
    {
        let session = control.session();
        assert_eq!(session.last_tag_identifier, None);
        assert!(!session.device_ready);
        assert_eq!(session.last_error, Some(ErrorKind::BackendUnavailable));
    }
    assert_eq!(control.controller().state(), ControllerState::Idle);

    assert_eq!(control.tick().await.tag, TagDisposition::Started);
    let session = control.session();
    assert_eq!(session.last_tag_identifier.as_deref(), Some("04A1"));
    assert!(session.device_ready);
    assert_eq!(session.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn test_start_rejection_leaves_tag_unlatched() {
    let backend = RecordingBackend::new();
    backend.fail("start", Failure::Rejected(404), 1);
    let (mut control, _) = build_loop(vec![ScriptFrame::tag("04B2")], library(), backend.clone());

    assert_eq!(
        control.tick().await.tag,
        TagDisposition::Failed(ErrorKind::BackendRejected)
    );
    assert_eq!(backend.calls().len(), 2);
    assert_eq!(control.session().last_tag_identifier, None);
    assert!(!control.session().device_ready);
}

#[tokio::test(start_paused = true)]
async fn test_registry_failure_is_logged_and_loop_continues() {
    let backend = RecordingBackend::new();
    let frames = vec![ScriptFrame::tag("04A1"), ScriptFrame::idle().press(PINS.next)];
    let (mut control, _) = build_loop(frames, StaticResolver::broken(), backend.clone());

    assert_eq!(
        control.tick().await.tag,
        TagDisposition::Failed(ErrorKind::Registry)
    );
    assert_eq!(control.session().last_error, Some(ErrorKind::Registry));

    let summary = control.tick().await;
    assert_eq!(summary.buttons, vec![(Button::Next, true)]);
    assert_eq!(backend.calls(), vec![Call::Next]);
}

#[tokio::test(start_paused = true)]
async fn test_read_error_is_treated_as_no_tag() {
    let backend = RecordingBackend::new();
    let frames = vec![ScriptFrame::read_error("collision"), ScriptFrame::tag("04A1")];
    let (mut control, _) = build_loop(frames, library(), backend);

    assert_eq!(control.tick().await.tag, TagDisposition::NoTag);
    assert_eq!(control.session().last_error, None);
    assert_eq!(control.tick().await.tag, TagDisposition::Started);
}

#[tokio::test(start_paused = true)]
async fn test_play_pause_follows_live_backend_state() {
    let backend = RecordingBackend::new();
    let frames = vec![
        ScriptFrame::idle().press(PINS.play_pause),
        ScriptFrame::idle().press(PINS.play_pause),
        ScriptFrame::idle().press(PINS.play_pause),
    ];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    backend.set_playing(Some(true));
    control.tick().await;
    assert_eq!(backend.calls(), vec![Call::CurrentState, Call::Pause]);

    backend.clear();
    backend.set_playing(Some(false));
    tokio::time::advance(Duration::from_millis(100)).await;
    control.tick().await;
    assert_eq!(backend.calls(), vec![Call::CurrentState, Call::Resume]);

    // Nothing active on the account counts as paused
    backend.clear();
    backend.set_playing(None);
    tokio::time::advance(Duration::from_millis(100)).await;
    control.tick().await;
    assert_eq!(backend.calls(), vec![Call::CurrentState, Call::Resume]);
}

#[tokio::test(start_paused = true)]
async fn test_buttons_dispatch_in_fixed_order_after_tag() {
    let backend = RecordingBackend::new();
    let frame = ScriptFrame::tag("04A1")
        .press(PINS.previous)
        .press(PINS.next)
        .press(PINS.play_pause);
    let (mut control, _) = build_loop(vec![frame], library(), backend.clone());
    backend.set_playing(Some(true));

    let summary = control.tick().await;

    assert_eq!(summary.tag, TagDisposition::Started);
    assert_eq!(
        summary.buttons,
        vec![
            (Button::PlayPause, true),
            (Button::Next, true),
            (Button::Previous, true),
        ]
    );
    assert_eq!(
        backend.calls(),
        vec![
            transfer(),
            start(PlaybackTarget::Track("spotify:track:6rqhFgbbKwnb9MLmUQDhG6".into())),
            Call::CurrentState,
            Call::Pause,
            Call::Next,
            Call::Previous,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_each_honored_press_is_followed_by_debounce_sleep() {
    let backend = RecordingBackend::new();
    let frame = ScriptFrame::idle().press(PINS.next).press(PINS.previous);
    let (mut control, _) = build_loop(vec![frame], library(), backend);

    let before = Instant::now();
    let summary = control.tick().await;

    assert_eq!(summary.buttons.len(), 2);
    assert!(Instant::now() - before >= timing().debounce * 2);
}

#[tokio::test(start_paused = true)]
async fn test_tick_records_honored_press_in_debouncer() {
    let backend = RecordingBackend::new();
    let (mut control, _) = build_loop(
        vec![ScriptFrame::idle().press(PINS.next)],
        library(),
        backend.clone(),
    );

    let before = Instant::now();
    control.tick().await;

    let next = control.debouncer().state(Button::Next);
    assert!(next.is_pressed);
    assert!(next.last_transition_at.is_some_and(|at| at >= before));
    assert_eq!(control.debouncer().state(Button::Previous).last_transition_at, None);
    assert_eq!(backend.calls(), vec![Call::Next]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_button_command_does_not_stop_loop() {
    let backend = RecordingBackend::new();
    backend.fail("next", Failure::Unavailable, 1);
    let frames = vec![
        ScriptFrame::idle().press(PINS.next),
        ScriptFrame::tag("04A1"),
    ];
    let (mut control, _) = build_loop(frames, library(), backend.clone());

    let summary = control.tick().await;
    assert_eq!(summary.buttons, vec![(Button::Next, false)]);
    assert_eq!(control.session().last_error, Some(ErrorKind::BackendUnavailable));
    assert_eq!(control.controller().state(), ControllerState::Idle);

    assert_eq!(control.tick().await.tag, TagDisposition::Started);
}

#[tokio::test(start_paused = true)]
async fn test_run_releases_hardware_once_on_shutdown() {
    let backend = RecordingBackend::new();
    let frames = vec![ScriptFrame::tag("04A1"), ScriptFrame::idle().press(PINS.next)];
    let (control, cleanups) = build_loop(frames, library(), backend.clone());

    let session = control
        .run(tokio::time::sleep(Duration::from_secs(5)))
        .await;

    assert_eq!(cleanup_count(&cleanups), 1);
    assert_eq!(session.last_tag_identifier.as_deref(), Some("04A1"));
    assert!(backend.calls().contains(&Call::Next));
}

#[tokio::test(start_paused = true)]
async fn test_run_with_immediate_shutdown_still_releases() {
    let (control, cleanups) = build_loop(vec![], library(), RecordingBackend::new());

    control.run(async {}).await;

    assert_eq!(cleanup_count(&cleanups), 1);
}

#[tokio::test(start_paused = true)]
async fn test_panic_during_tick_releases_hardware_once() {
    let (input, cleanups) = PanickingInput::new();
    let sampler = InputSampler::new(input, &PINS);
    let controller = PlaybackController::new(RecordingBackend::new(), DEVICE_ID, timing().settle);
    let control = ControlLoop::new(sampler, library(), controller, timing());

    let handle = tokio::spawn(control.run(std::future::pending::<()>()));
    let result = handle.await;

    assert!(result.unwrap_err().is_panic());
    assert_eq!(cleanup_count(&cleanups), 1);
}
