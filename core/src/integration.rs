//! Integration tests for the callback dispatcher
//!
//! Drive a whole [`Frontend`] through the core-facing entry points with
//! scripted collaborators and check what reaches the display, the audio
//! device, the recorder and the netplay link across mode switches.

use retrolink_shared::{AUDIO_BATCH_MAX_FRAMES, DEVICE_JOYPAD, JOYPAD_A, JOYPAD_B, PixelFormat};

use crate::config::Config;
use crate::dispatch::{AudioBinding, AvInfo, CallbackSet, Frontend, InputBinding, VideoBinding};
use crate::error::ConfigError;
use crate::input::SPECTATE_LOST_MESSAGE;
use crate::input::movie::Movie;
use crate::session::{OperatingMode, SessionFlags, SpectateRole};
use crate::test_utils::{ScriptedLink, Shared, TestRig, stereo_ramp};

// ============================================================================
// Helpers
// ============================================================================

const AV: AvInfo = AvInfo {
    fps: 60.0,
    sample_rate: 48_000.0,
};

fn frontend(rig: &TestRig, config: &Config) -> Frontend {
    Frontend::new(config, rig.collaborators(), AV).unwrap()
}

fn netplay_frontend(rig: &TestRig, link: &Shared<ScriptedLink>) -> Frontend {
    let io = rig.collaborators().with_netplay(link.boxed());
    Frontend::new(&Config::default(), io, AV).unwrap()
}

fn rgb565_frame(width: usize, height: usize) -> Vec<u8> {
    vec![0x1f; width * height * 2]
}

// ============================================================================
// Callback table
// ============================================================================

#[test]
fn test_callback_set_per_mode() {
    let normal = CallbackSet::for_mode(OperatingMode::Normal);
    assert_eq!(
        (normal.video, normal.audio, normal.input),
        (VideoBinding::Direct, AudioBinding::Direct, InputBinding::Direct)
    );

    let rewind = CallbackSet::for_mode(OperatingMode::Rewind);
    assert_eq!(rewind.audio, AudioBinding::Rewind);
    assert_eq!(rewind.video, VideoBinding::Direct);

    for mode in [OperatingMode::NetplayHost, OperatingMode::NetplayClient] {
        let set = CallbackSet::for_mode(mode);
        assert_eq!(
            (set.video, set.audio, set.input),
            (VideoBinding::Netplay, AudioBinding::Netplay, InputBinding::Netplay)
        );
    }

    let host = CallbackSet::for_mode(OperatingMode::NetplaySpectate(SpectateRole::Host));
    assert_eq!(host.input, InputBinding::SpectateHost);
    assert_eq!(host.audio, AudioBinding::Direct);
    let client = CallbackSet::for_mode(OperatingMode::NetplaySpectate(SpectateRole::Client));
    assert_eq!(client.input, InputBinding::SpectateClient);
}

// ============================================================================
// Normal mode
// ============================================================================

#[test]
fn test_normal_mode_reaches_every_collaborator() {
    let rig = TestRig::new();
    let mut frontend = frontend(&rig, &Config::default());
    frontend.set_pixel_format(PixelFormat::Rgb565);
    rig.driver.borrow_mut().set(0, DEVICE_JOYPAD, 0, JOYPAD_B, 1);

    let pixels = rgb565_frame(4, 4);
    frontend.video_refresh(Some(&pixels), 4, 4, 8);
    assert_eq!(frontend.audio_sample_batch(&stereo_ramp(64), 64), 64);
    frontend.input_poll();
    let pressed = frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_B);

    assert_eq!(rig.video.borrow().frames.len(), 1);
    assert_eq!(rig.recorder.borrow().frames.len(), 1);
    assert_eq!(rig.recorder.borrow().audio, stereo_ramp(64));
    assert!(rig.audio.borrow().writes > 0);
    assert_eq!(rig.driver.borrow().polls, 1);
    assert_eq!(pressed, 1);
}

#[test]
fn test_batch_frames_clamped_to_data() {
    let rig = TestRig::new();
    let mut frontend = frontend(&rig, &Config::default());

    assert_eq!(frontend.audio_sample_batch(&[1, 2, 3], 5), 1);
    assert_eq!(rig.recorder.borrow().audio, vec![1, 2]);
}

#[test]
fn test_invalid_config_rejected() {
    let rig = TestRig::new();
    let mut config = Config::default();
    config.input.turbo_period = 0;

    let result = Frontend::new(&config, rig.collaborators(), AV);
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_muted_config_only_records() {
    let rig = TestRig::new();
    let mut config = Config::default();
    config.audio.mute = true;
    let mut frontend = frontend(&rig, &config);

    frontend.audio_sample_batch(&stereo_ramp(16), 16);

    assert!(frontend.context().flags.contains(SessionFlags::MUTED));
    assert_eq!(rig.audio.borrow().writes, 0);
    assert_eq!(rig.recorder.borrow().audio.len(), 32);
}

#[test]
fn test_redraw_repeats_last_geometry() {
    let rig = TestRig::new();
    let mut frontend = frontend(&rig, &Config::default());
    assert!(!frontend.redraw());

    frontend.set_pixel_format(PixelFormat::Rgb565);
    let pixels = rgb565_frame(3, 2);
    frontend.video_refresh(Some(&pixels), 3, 2, 6);
    assert!(frontend.redraw());

    let frames = &rig.video.borrow().frames;
    assert_eq!(frames.len(), 2);
    assert_eq!((frames[1].width, frames[1].height, frames[1].pitch), (3, 2, 6));
    assert!(frames[1].pixels.is_none());
}

// ============================================================================
// Movie
// ============================================================================

#[test]
fn test_movie_playback_then_live_input() {
    let rig = TestRig::new();
    rig.driver.borrow_mut().set(0, DEVICE_JOYPAD, 0, JOYPAD_A, 1);
    let movie = Shared::new(Movie::player(vec![0, 1]));
    let io = rig.collaborators().with_movie(movie.boxed());
    let mut frontend = Frontend::new(&Config::default(), io, AV).unwrap();

    frontend.input_poll();
    assert_eq!(frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_A), 0);
    assert_eq!(frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_A), 1);
    assert!(!frontend.context().flags.contains(SessionFlags::MOVIE_END));

    assert_eq!(frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_A), 1);
    assert!(frontend.context().flags.contains(SessionFlags::MOVIE_END));
    assert_eq!(movie.borrow().remaining(), 0);

    frontend.teardown();
    assert!(!frontend.context().flags.contains(SessionFlags::MOVIE_END));
}

// ============================================================================
// Rewind
// ============================================================================

#[test]
fn test_rewind_requires_config() {
    let rig = TestRig::new();
    let mut frontend = frontend(&rig, &Config::default());

    assert!(!frontend.set_mode(OperatingMode::Rewind));
    assert_eq!(frontend.mode(), OperatingMode::Normal);
}

#[test]
fn test_rewind_step_captures_then_flushes() {
    let rig = TestRig::new();
    let mut config = Config::default();
    config.rewind.enable = true;
    config.rewind.step_budget_frames = 4;
    let mut frontend = frontend(&rig, &config);

    assert!(frontend.set_mode(OperatingMode::Rewind));
    frontend.begin_rewind_step();
    frontend.audio_sample(1, 2);
    assert_eq!(frontend.audio_sample_batch(&[3, 4], 1), 1);

    assert_eq!(rig.audio.borrow().writes, 0);
    assert!(rig.recorder.borrow().audio.is_empty());

    frontend.end_rewind_step().unwrap();
    assert_eq!(rig.recorder.borrow().audio, vec![4, 3, 1, 2]);
    assert_eq!(rig.audio.borrow().writes, 1);

    // The configured budget is raised to one frame of audio plus a batch;
    // past that the whole batch is refused.
    assert_eq!(frontend.context().rewind.capacity_frames(), 800 + AUDIO_BATCH_MAX_FRAMES);
    frontend.begin_rewind_step();
    let batch = stereo_ramp(AUDIO_BATCH_MAX_FRAMES);
    assert_eq!(frontend.audio_sample_batch(&batch, AUDIO_BATCH_MAX_FRAMES), AUDIO_BATCH_MAX_FRAMES);
    assert_eq!(frontend.audio_sample_batch(&batch, AUDIO_BATCH_MAX_FRAMES), 0);

    assert!(frontend.set_mode(OperatingMode::Normal));
    frontend.audio_sample_batch(&[7, 8], 1);
    assert_eq!(rig.recorder.borrow().audio, vec![4, 3, 1, 2, 7, 8]);
}

#[test]
fn test_rewind_buffer_holds_a_frame_of_core_audio() {
    let mut config = Config::default();
    config.rewind.enable = true;

    for (fps, sample_rate) in [(60.0, 48_000.0), (50.0, 96_000.0), (59.94, 44_100.0), (30.0, 192_000.0)] {
        let rig = TestRig::new();
        let av = AvInfo { fps, sample_rate };
        let mut frontend = Frontend::new(&config, rig.collaborators(), av).unwrap();
        let per_frame = (sample_rate / fps).ceil() as usize;
        assert!(frontend.context().rewind.capacity_frames() >= per_frame);

        // A whole frame delivered in batches is captured without loss.
        assert!(frontend.set_mode(OperatingMode::Rewind));
        frontend.begin_rewind_step();
        let mut left = per_frame;
        while left > 0 {
            let n = left.min(960);
            assert_eq!(frontend.audio_sample_batch(&stereo_ramp(n), n), n);
            left -= n;
        }
        assert_eq!(frontend.context().rewind.captured().len(), per_frame * 2);
    }
}

// ============================================================================
// Netplay
// ============================================================================

#[test]
fn test_netplay_requires_link() {
    let rig = TestRig::new();
    let mut frontend = frontend(&rig, &Config::default());

    assert!(!frontend.set_mode(OperatingMode::NetplayHost));
    assert!(!frontend.set_mode(OperatingMode::NetplaySpectate(SpectateRole::Client)));
    assert_eq!(frontend.mode(), OperatingMode::Normal);
}

#[test]
fn test_netplay_skip_and_stall_suppress_output() {
    let rig = TestRig::new();
    let link = Shared::new(ScriptedLink::default());
    let mut frontend = netplay_frontend(&rig, &link);
    frontend.set_pixel_format(PixelFormat::Rgb565);
    assert!(frontend.set_mode(OperatingMode::NetplayHost));
    let pixels = rgb565_frame(2, 2);

    link.borrow_mut().skip = true;
    frontend.video_refresh(Some(&pixels), 2, 2, 4);
    frontend.audio_sample(1, 1);
    assert_eq!(frontend.audio_sample_batch(&stereo_ramp(8), 8), 8);

    link.borrow_mut().skip = false;
    link.borrow_mut().stall = true;
    frontend.video_refresh(None, 2, 2, 4);
    assert_eq!(frontend.audio_sample_batch(&stereo_ramp(8), 8), 8);

    assert!(rig.video.borrow().frames.is_empty());
    assert!(rig.recorder.borrow().audio.is_empty());
    assert_eq!(frontend.audio().staged(), 0);

    link.borrow_mut().stall = false;
    frontend.video_refresh(Some(&pixels), 2, 2, 4);
    frontend.audio_sample_batch(&stereo_ramp(8), 8);
    assert_eq!(rig.video.borrow().frames.len(), 1);
    assert_eq!(rig.recorder.borrow().audio.len(), 16);
}

#[test]
fn test_netplay_client_plays_second_port() {
    let rig = TestRig::new();
    let link = Shared::new(ScriptedLink::default());
    let mut frontend = netplay_frontend(&rig, &link);
    assert!(frontend.set_mode(OperatingMode::NetplayClient));

    rig.driver.borrow_mut().set(0, DEVICE_JOYPAD, 0, JOYPAD_A, 1);
    link.borrow_mut().remote.insert((0, DEVICE_JOYPAD, 0, JOYPAD_B), 1);

    frontend.input_poll();
    assert_eq!(frontend.input_state(1, DEVICE_JOYPAD, 0, JOYPAD_A), 1);
    assert_eq!(frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_B), 1);
    assert_eq!(frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_A), 0);

    // Only the local player's answers go out.
    assert_eq!(link.borrow().sent, vec![1]);
}

#[test]
fn test_spectate_host_mirrors_answers() {
    let rig = TestRig::new();
    let link = Shared::new(ScriptedLink::default());
    let mut frontend = netplay_frontend(&rig, &link);
    assert!(frontend.set_mode(OperatingMode::NetplaySpectate(SpectateRole::Host)));
    rig.driver.borrow_mut().set(1, DEVICE_JOYPAD, 0, JOYPAD_B, 1);

    frontend.input_poll();
    frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_B);
    frontend.input_state(1, DEVICE_JOYPAD, 0, JOYPAD_B);

    assert_eq!(link.borrow().sent, vec![0, 1]);

    // Spectating never suppresses presentation.
    link.borrow_mut().skip = true;
    frontend.video_refresh(None, 2, 2, 4);
    assert_eq!(rig.video.borrow().frames.len(), 1);
}

#[test]
fn test_spectate_client_falls_back_when_cut() {
    let rig = TestRig::new();
    let link = Shared::new(ScriptedLink::default());
    link.borrow_mut().incoming.push_back(1);
    let mut frontend = netplay_frontend(&rig, &link);
    assert!(frontend.set_mode(OperatingMode::NetplaySpectate(SpectateRole::Client)));
    rig.driver.borrow_mut().set(0, DEVICE_JOYPAD, 0, JOYPAD_A, 1);

    frontend.input_poll();
    assert_eq!(frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_B), 1);
    assert_eq!(frontend.input_state(0, DEVICE_JOYPAD, 0, JOYPAD_A), 1);
    assert_eq!(frontend.mode(), OperatingMode::Normal);
    assert_eq!(frontend.callbacks().input, InputBinding::Direct);

    frontend.video_refresh(None, 2, 2, 4);
    let messages = &rig.video.borrow().messages;
    assert_eq!(messages[0].as_deref(), Some(SPECTATE_LOST_MESSAGE));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_teardown_restores_session_start() {
    let rig = TestRig::new();
    rig.video.borrow_mut().fail = true;
    let link = Shared::new(ScriptedLink::default());
    let mut frontend = netplay_frontend(&rig, &link);
    assert!(frontend.set_mode(OperatingMode::NetplayHost));

    frontend.video_refresh(None, 2, 2, 4);
    assert!(!frontend.context().is_video_active());
    for i in 0..10 {
        frontend.audio_sample(i, i);
    }
    assert_eq!(frontend.audio().staged(), 20);

    frontend.teardown();

    assert_eq!(frontend.mode(), OperatingMode::Normal);
    assert!(frontend.context().is_video_active());
    assert!(frontend.context().frame_cache.is_none());
    assert_eq!(frontend.audio().staged(), 0);
}
