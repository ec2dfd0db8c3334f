//! Transport clock - the single source of truth for playhead position
//!
//! The transport counts in source frames of the loaded track. Tempo scaling
//! happens here: each output block consumes `frames * tempo` source frames,
//! with the fractional remainder carried into the next block so long-running
//! playback at non-integer tempo ratios does not drift.

/// How a mixed block left the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// More track remains
    Running,
    /// The block consumed the final source frames; transport has paused
    /// with the position pinned at the track length
    Ended,
}

/// Playhead state for one loaded track
#[derive(Debug, Clone)]
pub struct Transport {
    /// Current playhead in source frames, in [0, len_frames]
    position: usize,
    /// Track length in source frames
    len_frames: usize,
    playing: bool,
    /// Fractional source frames owed from previous blocks
    src_carry: f64,
}

impl Transport {
    pub fn new(len_frames: usize) -> Self {
        Self {
            position: 0,
            len_frames,
            playing: false,
            src_carry: 0.0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len_frames(&self) -> usize {
        self.len_frames
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.len_frames
    }

    /// Start playback. A transport pinned at the end stays paused; the
    /// caller must seek back first.
    pub fn play(&mut self) {
        if !self.at_end() {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Move the playhead, clamping into [0, len_frames)
    ///
    /// Seeking discards the fractional carry so the next block starts exactly
    /// at the requested frame. Seeking to or past the end lands on the last
    /// valid frame; the next mixed block plays the tail and then ends.
    pub fn seek(&mut self, frame: usize) {
        self.position = frame.min(self.len_frames.saturating_sub(1));
        self.src_carry = 0.0;
    }

    /// Source frames the next block of `output_frames` should consume at
    /// `tempo`, clamped to what remains of the track
    ///
    /// The fractional part of the ideal consumption is banked in the carry;
    /// over many blocks the average consumption converges on
    /// `output_frames * tempo` exactly.
    pub fn begin_block(&mut self, output_frames: usize, tempo: f64) -> usize {
        let want = self.src_carry + output_frames as f64 * tempo;
        let whole = want.floor();
        self.src_carry = want - whole;

        let remaining = self.len_frames - self.position;
        (whole as usize).min(remaining)
    }

    /// Advance past a consumed block and report whether the track ended
    ///
    /// At the end the position pins at `len_frames` and playback pauses,
    /// rather than wrapping to zero.
    pub fn advance(&mut self, consumed_src_frames: usize) -> BlockOutcome {
        self.position = (self.position + consumed_src_frames).min(self.len_frames);
        if self.at_end() {
            self.playing = false;
            self.src_carry = 0.0;
            BlockOutcome::Ended
        } else {
            BlockOutcome::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_clamps_to_last_valid_frame() {
        let mut t = Transport::new(1000);
        t.play();

        t.seek(5000);
        assert_eq!(t.position(), 999);
        assert!(t.is_playing());

        // The next block plays the one-frame tail and ends
        let src = t.begin_block(512, 1.0);
        assert_eq!(src, 1);
        assert_eq!(t.advance(src), BlockOutcome::Ended);
        assert_eq!(t.position(), 1000);
        assert!(!t.is_playing());

        // Pinned at the end: play is refused until a seek back
        t.play();
        assert!(!t.is_playing());
        t.seek(0);
        t.play();
        assert!(t.is_playing());
    }

    #[test]
    fn test_unity_tempo_consumes_block_size() {
        let mut t = Transport::new(44100);
        t.play();
        assert_eq!(t.begin_block(512, 1.0), 512);
        assert_eq!(t.advance(512), BlockOutcome::Running);
        assert_eq!(t.position(), 512);
    }

    #[test]
    fn test_fractional_carry_does_not_drift() {
        let mut t = Transport::new(10_000_000);
        t.play();

        // 1.2345 source frames per output frame over many blocks
        let tempo = 1.2345;
        let blocks = 1000usize;
        let block = 512usize;
        let mut consumed = 0usize;
        for _ in 0..blocks {
            let src = t.begin_block(block, tempo);
            t.advance(src);
            consumed += src;
        }

        let ideal = blocks as f64 * block as f64 * tempo;
        assert!((consumed as f64 - ideal).abs() < 1.0);
        assert_eq!(t.position(), consumed);
    }

    #[test]
    fn test_end_of_track_pins_and_pauses() {
        let mut t = Transport::new(700);
        t.play();

        let src = t.begin_block(512, 1.0);
        assert_eq!(src, 512);
        assert_eq!(t.advance(src), BlockOutcome::Running);

        // Final partial block clamps to the remaining frames
        let src = t.begin_block(512, 1.0);
        assert_eq!(src, 188);
        assert_eq!(t.advance(src), BlockOutcome::Ended);
        assert_eq!(t.position(), 700);
        assert!(!t.is_playing());
    }

    #[test]
    fn test_seek_resets_carry() {
        let mut t = Transport::new(100_000);
        t.play();
        t.begin_block(512, 1.5); // leaves a fractional carry
        t.seek(1000);
        t.play();

        // After the seek the next block starts cleanly at the target frame
        assert_eq!(t.position(), 1000);
        assert_eq!(t.begin_block(512, 1.0), 512);
    }
}
