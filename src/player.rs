use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::debrid::StreamManifest;

/// A saved position this close to the end restarts playback from 0.
pub const NEAR_END_WINDOW: f64 = 10.0;

/// Position reports stay suppressed this long after the first play event,
/// to avoid spurious zero/near-zero reports while the stream spins up.
const REPORT_WARMUP: Duration = Duration::from_secs(1);

/// At-most-once reporting window.
const REPORT_MIN_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Loading,
    Playing,
    Paused,
    Seeking,
    Reloading,
}

/// Snapshot of the host's media element, taken at dispatch time.
///
/// Times and buffered ranges are element-local, i.e. relative to the start
/// of the currently attached manifest. The controller translates them to the
/// absolute timeline using its transcode offset.
#[derive(Debug, Clone, Default)]
pub struct MediaStatus {
    pub current_time: f64,
    pub buffered: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The host finished attaching the manifest requested with this generation.
    ManifestAttached { generation: u64 },
    Play,
    Pause,
    /// Seek to an absolute timeline position in seconds.
    Seek(f64),
    /// Element-local time advanced.
    TimeUpdate,
    /// Periodic timer while playing.
    Tick,
    Teardown,
}

/// Side effects the host must carry out, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    LoadManifest { url: String, generation: u64 },
    SeekElement(f64),
    PlayElement,
    PauseElement,
    SetElementVolume(f64),
    SetElementMuted(bool),
    /// Best-effort, fire-and-forget report of the absolute timeline position.
    ReportPosition(f64),
}

/// Drives a DASH media element against a server-side transcoder.
///
/// The manifest only covers the stream from a fixed transcode offset onward,
/// so a seek outside the buffered window cannot be satisfied client-side: it
/// requires reloading the manifest with a new `t=` offset and resetting the
/// element clock to 0. Seeks inside a buffered range are plain element seeks.
///
/// All decisions run through [`dispatch`](Self::dispatch); the host owns the
/// element and executes the returned commands. Reloads carry a generation so
/// a seek issued while a reload is in flight abandons the stale attach.
pub struct PlaybackController {
    base_url: String,
    duration: f64,
    /// server-side transcode start offset of the current manifest, seconds
    offset: f64,
    state: PlayerState,
    generation: u64,
    was_playing: bool,
    volume: f64,
    muted: bool,
    fullscreen: bool,
    first_play_at: Option<Instant>,
    last_report_at: Option<Instant>,
}

impl PlaybackController {
    /// A saved position within [`NEAR_END_WINDOW`] of the end is treated as
    /// finished and playback restarts from 0.
    pub fn new(manifest: &StreamManifest, initial_position: f64) -> Self {
        let offset = if initial_position > 0.0 && initial_position < manifest.duration - NEAR_END_WINDOW
        {
            initial_position
        } else {
            0.0
        };

        Self {
            base_url: manifest.dash_url.clone(),
            duration: manifest.duration,
            offset,
            state: PlayerState::Idle,
            generation: 0,
            was_playing: false,
            volume: 1.0,
            muted: false,
            fullscreen: false,
            first_play_at: None,
            last_report_at: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Absolute timeline position: transcode offset plus element-local time.
    pub fn position(&self, status: &MediaStatus) -> f64 {
        self.offset + status.current_time
    }

    /// Kick off the first manifest load.
    pub fn start(&mut self) -> Vec<PlayerCommand> {
        self.state = PlayerState::Loading;
        vec![PlayerCommand::LoadManifest {
            url: self.manifest_url(),
            generation: self.generation,
        }]
    }

    pub fn dispatch(&mut self, status: &MediaStatus, event: PlayerEvent) -> Vec<PlayerCommand> {
        match event {
            PlayerEvent::ManifestAttached { generation } => self.on_attached(generation),
            PlayerEvent::Play => {
                self.state = PlayerState::Playing;
                self.was_playing = true;
                if self.first_play_at.is_none() {
                    self.first_play_at = Some(Instant::now());
                }
                Vec::new()
            }
            PlayerEvent::Pause => {
                self.state = PlayerState::Paused;
                self.was_playing = false;
                self.maybe_report(status)
            }
            PlayerEvent::Seek(target) => self.on_seek(status, target),
            PlayerEvent::TimeUpdate => {
                if self.state == PlayerState::Seeking {
                    self.state = if self.was_playing {
                        PlayerState::Playing
                    } else {
                        PlayerState::Paused
                    };
                }
                Vec::new()
            }
            PlayerEvent::Tick => {
                if self.state == PlayerState::Playing {
                    self.maybe_report(status)
                } else {
                    Vec::new()
                }
            }
            PlayerEvent::Teardown => {
                let commands = self.maybe_report(status);
                self.state = PlayerState::Idle;
                commands
            }
        }
    }

    /// Seek 10 seconds back/forward on the absolute timeline.
    pub fn skip(&mut self, status: &MediaStatus, delta: f64) -> Vec<PlayerCommand> {
        let target = (self.position(status) + delta).max(0.0);
        self.dispatch(status, PlayerEvent::Seek(target))
    }

    pub fn set_volume(&mut self, volume: f64) -> Vec<PlayerCommand> {
        self.volume = volume.clamp(0.0, 1.0);

        let mut commands = vec![PlayerCommand::SetElementVolume(self.volume)];
        if self.volume == 0.0 {
            self.muted = true;
            commands.push(PlayerCommand::SetElementMuted(true));
        } else if self.muted {
            self.muted = false;
            commands.push(PlayerCommand::SetElementMuted(false));
        }
        commands
    }

    pub fn toggle_mute(&mut self) -> Vec<PlayerCommand> {
        self.muted = !self.muted;
        vec![PlayerCommand::SetElementMuted(self.muted)]
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    fn on_attached(&mut self, generation: u64) -> Vec<PlayerCommand> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "stale manifest attach ignored");
            return Vec::new();
        }

        match self.state {
            PlayerState::Loading => {
                self.state = PlayerState::Paused;
                vec![PlayerCommand::PlayElement]
            }
            PlayerState::Reloading => {
                self.state = PlayerState::Paused;
                vec![PlayerCommand::SeekElement(0.0), PlayerCommand::PlayElement]
            }
            _ => Vec::new(),
        }
    }

    fn on_seek(&mut self, status: &MediaStatus, target: f64) -> Vec<PlayerCommand> {
        if self.state == PlayerState::Idle {
            return Vec::new();
        }

        // in-buffer: the target falls inside an already-transcoded range
        for &(start, end) in &status.buffered {
            if target >= start + self.offset && target <= end + self.offset {
                debug!(target, "seek inside buffer");
                self.state = PlayerState::Seeking;
                return vec![PlayerCommand::SeekElement(target - self.offset)];
            }
        }

        // outside the transcoded window: request a new transcode from the
        // target and restart the element clock; bumping the generation
        // abandons any reload already in flight
        info!(target, "seek outside buffer, reloading manifest");
        self.offset = target;
        self.generation += 1;
        self.state = PlayerState::Reloading;

        vec![
            PlayerCommand::PauseElement,
            PlayerCommand::LoadManifest {
                url: self.manifest_url(),
                generation: self.generation,
            },
        ]
    }

    fn manifest_url(&self) -> String {
        format!("{}?t={}", self.base_url, self.offset.floor() as u64)
    }

    fn maybe_report(&mut self, status: &MediaStatus) -> Vec<PlayerCommand> {
        let position = self.position(status);
        if position <= 0.0 {
            return Vec::new();
        }

        let now = Instant::now();

        let Some(first_play) = self.first_play_at else {
            return Vec::new();
        };
        if now < first_play + REPORT_WARMUP {
            return Vec::new();
        }

        if let Some(last) = self.last_report_at {
            if now < last + REPORT_MIN_INTERVAL {
                return Vec::new();
            }
        }

        self.last_report_at = Some(now);
        vec![PlayerCommand::ReportPosition(position)]
    }
}
