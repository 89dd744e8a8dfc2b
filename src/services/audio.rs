/// Minimal surface the focus slot needs from a playback handle
pub trait Playback: Send + Sync {
    fn pause(&mut self);
    fn rewind(&mut self);
}

/// Single-owner audio focus slot
///
/// At most one clip plays at a time across the session. Acquiring focus for
/// a new clip pauses and rewinds the previous owner before the new one is
/// installed; swiping or resetting releases the slot the same way.
#[derive(Default)]
pub struct AudioFocus {
    active: Option<(String, Box<dyn Playback>)>,
}

impl AudioFocus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the clip currently holding focus, if any
    pub fn active_clip(&self) -> Option<&str> {
        self.active.as_ref().map(|(id, _)| id.as_str())
    }

    /// Hands focus to a new clip, stopping the previous owner first
    pub fn acquire(&mut self, clip_id: impl Into<String>, handle: Box<dyn Playback>) {
        self.stop();
        self.active = Some((clip_id.into(), handle));
    }

    /// Pauses, rewinds, and releases the active clip
    pub fn stop(&mut self) {
        if let Some((_, mut handle)) = self.active.take() {
            handle.pause();
            handle.rewind();
        }
    }
}

/// Playback handle for a voice clip driven through the API
///
/// The engine owns focus bookkeeping; the handle mirrors the play state so
/// a released clip is always left paused at position zero.
pub struct ClipHandle {
    playing: bool,
    position_secs: f64,
}

impl ClipHandle {
    pub fn start() -> Self {
        Self {
            playing: true,
            position_secs: 0.0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }
}

impl Playback for ClipHandle {
    fn pause(&mut self) {
        self.playing = false;
    }

    fn rewind(&mut self) {
        self.position_secs = 0.0;
    }
}
