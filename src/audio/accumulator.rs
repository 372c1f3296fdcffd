//! Sample accumulation into fixed-length analysis frames

use super::PipelineError;

/// Fixed-capacity sample buffer that hands out one analysis frame at a time.
///
/// Incoming blocks are appended at the write cursor. Once at least
/// `frame_len` samples are buffered, [`take_frame`](Self::take_frame) exposes
/// the first `frame_len` of them and then moves the unconsumed tail to the
/// front. At most one frame is taken per delivered block, so a burst of
/// several frames' worth of samples is analyzed over the following blocks
/// rather than all at once.
#[derive(Debug, Clone)]
pub struct RingAccumulator {
    samples: Vec<f32>,
    write_pos: usize,
    frame_len: usize,
}

impl RingAccumulator {
    pub fn new(capacity: usize, frame_len: usize) -> Result<Self, PipelineError> {
        if frame_len == 0 || frame_len > capacity {
            return Err(PipelineError::InvalidConfig(format!(
                "frame length {frame_len} does not fit buffer capacity {capacity}"
            )));
        }

        Ok(Self {
            samples: vec![0.0; capacity],
            write_pos: 0,
            frame_len,
        })
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Samples currently buffered and not yet consumed by a frame
    pub fn buffered(&self) -> usize {
        self.write_pos
    }

    /// Free space left before the buffer is full
    pub fn remaining(&self) -> usize {
        self.capacity() - self.write_pos
    }

    pub fn has_frame(&self) -> bool {
        self.write_pos >= self.frame_len
    }

    /// Append samples at the write cursor.
    ///
    /// Writes only what fits; returns the number of samples accepted.
    pub fn push_samples(&mut self, data: &[f32]) -> usize {
        let accepted = data.len().min(self.remaining());
        self.samples[self.write_pos..self.write_pos + accepted].copy_from_slice(&data[..accepted]);
        self.write_pos += accepted;
        accepted
    }

    /// Run `analyze` on the oldest full frame, if one is buffered, then
    /// shift the leftover samples to the front of the buffer.
    pub fn take_frame<R>(&mut self, analyze: impl FnOnce(&[f32]) -> R) -> Option<R> {
        if !self.has_frame() {
            return None;
        }

        let result = analyze(&self.samples[..self.frame_len]);

        self.samples.copy_within(self.frame_len..self.write_pos, 0);
        self.write_pos -= self.frame_len;

        Some(result)
    }

    /// Append a block and take at most one frame from it.
    ///
    /// Samples beyond the remaining capacity are dropped and reported as
    /// [`PipelineError::BufferOverrun`], after the frame (if any) has been
    /// analyzed.
    pub fn push<R>(
        &mut self,
        data: &[f32],
        analyze: impl FnOnce(&[f32]) -> R,
    ) -> Result<Option<R>, PipelineError> {
        let accepted = self.push_samples(data);
        let result = self.take_frame(analyze);

        if accepted < data.len() {
            return Err(PipelineError::BufferOverrun {
                dropped: data.len() - accepted,
                capacity: self.capacity(),
            });
        }

        Ok(result)
    }
}
