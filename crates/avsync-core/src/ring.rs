//! PCM sample ring buffer between the decoder and the audio device
//!
//! A fixed-size circular byte buffer with one producer (the decoder) and one
//! or more consumers (the audio device callback, or a thread skipping stale
//! audio). The read/write positions and the lifetime counters live behind a
//! single mutex so they always move together.
//!
//! # Full vs. empty
//!
//! With only two positions, `write_pos == read_pos` is ambiguous. One slot is
//! always kept free: equal positions mean *empty*, and writers can use at most
//! `capacity - 1` bytes.
//!
//! ```text
//!   read_pos        write_pos
//!      │                │
//!      ▼                ▼
//! ┌───┬───┬───┬───┬───┬───┬───┬───┐
//! │   │ a │ b │ c │ d │   │   │   │   readable: 4, writable: 8 - 4 - 1 = 3
//! └───┴───┴───┴───┴───┴───┴───┴───┘
//! ```
//!
//! # Blocking
//!
//! Only [`SampleRingBuffer::write`] blocks. Reads and skips return whatever is
//! available (possibly nothing) so an audio callback never stalls; it plays
//! silence on underrun instead.

use bytemuck::Pod;
use parking_lot::{Condvar, Mutex};

/// Smallest usable buffer: one byte of payload plus the reserved slot
const MIN_BUFFER_SIZE: usize = 2;

struct RingState {
    storage: Vec<u8>,
    write_pos: usize,
    read_pos: usize,
    total_written: u64,
    total_read: u64,
    closed: bool,
}

impl RingState {
    fn remaining_for_write(&self) -> usize {
        let size = self.storage.len();
        if self.write_pos < self.read_pos {
            self.read_pos - self.write_pos - 1
        } else if self.write_pos == self.read_pos {
            size - 1
        } else {
            size - (self.write_pos - self.read_pos) - 1
        }
    }

    fn remaining_for_read(&self) -> usize {
        let size = self.storage.len();
        if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            size - self.read_pos + self.write_pos
        }
    }

    /// Copy `data` in at `write_pos` as at most two segments (tail, then head)
    ///
    /// Caller guarantees `data.len() <= remaining_for_write()`.
    fn copy_in(&mut self, data: &[u8]) {
        let size = self.storage.len();
        let first = data.len().min(size - self.write_pos);
        self.storage[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        let second = data.len() - first;
        if second > 0 {
            self.storage[..second].copy_from_slice(&data[first..]);
        }
        self.write_pos = (self.write_pos + data.len()) % size;
        self.total_written += data.len() as u64;
    }

    /// Consume `len` bytes from `read_pos`, copying them into `out` if given
    ///
    /// Caller guarantees `len <= remaining_for_read()`.
    fn consume(&mut self, out: Option<&mut [u8]>, len: usize) {
        let size = self.storage.len();
        let first = len.min(size - self.read_pos);
        let second = len - first;
        if let Some(out) = out {
            out[..first].copy_from_slice(&self.storage[self.read_pos..self.read_pos + first]);
            if second > 0 {
                out[first..len].copy_from_slice(&self.storage[..second]);
            }
        }
        self.read_pos = (self.read_pos + len) % size;
        self.total_read += len as u64;
    }
}

/// Fixed-capacity circular byte buffer carrying decoded audio
pub struct SampleRingBuffer {
    state: Mutex<RingState>,
    /// Signalled whenever a read/skip frees space (or the buffer closes)
    space_available: Condvar,
}

impl SampleRingBuffer {
    /// Create a ring buffer with `buf_size` bytes of storage
    ///
    /// Writers can hold at most `buf_size - 1` unread bytes. Sizes below 2
    /// are raised to 2.
    pub fn new(buf_size: usize) -> Self {
        let size = buf_size.max(MIN_BUFFER_SIZE);
        if size != buf_size {
            log::warn!(
                "[RING] Requested size {} is too small, using {} bytes",
                buf_size,
                size
            );
        }
        Self {
            state: Mutex::new(RingState {
                storage: vec![0; size],
                write_pos: 0,
                read_pos: 0,
                total_written: 0,
                total_read: 0,
                closed: false,
            }),
            space_available: Condvar::new(),
        }
    }

    /// Total storage size in bytes (one more than the writable capacity)
    pub fn capacity(&self) -> usize {
        self.state.lock().storage.len()
    }

    /// Bytes that can be written right now without blocking
    pub fn remaining_for_write(&self) -> usize {
        self.state.lock().remaining_for_write()
    }

    /// Bytes that can be read right now
    pub fn remaining_for_read(&self) -> usize {
        self.state.lock().remaining_for_read()
    }

    /// Write all of `data`, blocking while there is not enough free space
    ///
    /// The whole slice is written as one unit when it fits in the writable
    /// capacity. Larger slices are fed through in capacity-sized chunks, each
    /// waiting for room in turn, so they cannot deadlock.
    ///
    /// Returns `false` if the buffer was closed before everything was written.
    pub fn write(&self, data: &[u8]) -> bool {
        if data.is_empty() {
            return true;
        }

        let mut state = self.state.lock();
        let max_chunk = state.storage.len() - 1;

        for chunk in data.chunks(max_chunk) {
            while !state.closed && state.remaining_for_write() < chunk.len() {
                self.space_available.wait(&mut state);
            }
            if state.closed {
                return false;
            }
            state.copy_in(chunk);
        }
        true
    }

    /// Read up to `out.len()` bytes without blocking
    ///
    /// Returns the number of bytes copied, which is 0 when the buffer is
    /// empty (underrun).
    pub fn read(&self, out: &mut [u8]) -> usize {
        let mut state = self.state.lock();
        let len = out.len().min(state.remaining_for_read());
        if len == 0 {
            return 0;
        }
        state.consume(Some(out), len);
        drop(state);
        self.space_available.notify_all();
        len
    }

    /// Discard up to `amount` unread bytes without blocking
    ///
    /// Used to fast-forward past audio that has fallen behind. Skipped bytes
    /// count as read for the audio clock.
    pub fn skip(&self, amount: usize) -> usize {
        let mut state = self.state.lock();
        let len = amount.min(state.remaining_for_read());
        if len == 0 {
            return 0;
        }
        state.consume(None, len);
        drop(state);
        self.space_available.notify_all();
        len
    }

    /// Typed form of [`write`](Self::write) for interleaved PCM samples
    pub fn write_samples<T: Pod>(&self, samples: &[T]) -> bool {
        self.write(bytemuck::cast_slice(samples))
    }

    /// Typed form of [`read`](Self::read)
    ///
    /// Returns the number of bytes read, which may end mid-sample only if the
    /// producer wrote partial samples.
    pub fn read_samples<T: Pod>(&self, out: &mut [T]) -> usize {
        self.read(bytemuck::cast_slice_mut(out))
    }

    /// Bytes ever written (never reset)
    pub fn total_written(&self) -> u64 {
        self.state.lock().total_written
    }

    /// Bytes ever read or skipped (never reset)
    pub fn total_read(&self) -> u64 {
        self.state.lock().total_read
    }

    /// Close the buffer, releasing any producer blocked in [`write`](Self::write)
    ///
    /// Unread data stays readable.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            log::debug!(
                "[RING] Closed after {} bytes written, {} read",
                state.total_written,
                state.total_read
            );
        }
        drop(state);
        self.space_available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn assert_capacity_invariant(ring: &SampleRingBuffer) {
        assert_eq!(
            ring.remaining_for_read() + ring.remaining_for_write(),
            ring.capacity() - 1
        );
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let ring = SampleRingBuffer::new(16);
        assert_eq!(ring.remaining_for_read(), 0);
        assert_eq!(ring.remaining_for_write(), 15);
        assert_eq!(ring.total_written(), 0);
        assert_eq!(ring.total_read(), 0);
    }

    #[test]
    fn test_capacity_invariant_across_operations() {
        let ring = SampleRingBuffer::new(10);
        let mut out = [0u8; 10];
        assert_capacity_invariant(&ring);

        for step in 0..50usize {
            let write_len = (step * 7) % 6;
            if ring.remaining_for_write() >= write_len {
                assert!(ring.write(&vec![step as u8; write_len]));
            }
            assert_capacity_invariant(&ring);

            let read_len = (step * 5) % 5;
            ring.read(&mut out[..read_len]);
            assert_capacity_invariant(&ring);

            if step % 9 == 0 {
                ring.skip(2);
                assert_capacity_invariant(&ring);
            }
        }
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let ring = SampleRingBuffer::new(7);
        let pattern: Vec<u8> = (0..200u32).map(|i| (i * 31 % 251) as u8).collect();
        let mut received = Vec::new();
        let mut out = [0u8; 4];

        for chunk in pattern.chunks(5) {
            assert!(ring.write(chunk));
            loop {
                let n = ring.read(&mut out);
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&out[..n]);
            }
        }

        assert_eq!(received, pattern);
        assert_eq!(ring.total_written(), 200);
        assert_eq!(ring.total_read(), 200);
    }

    #[test]
    fn test_read_on_empty_returns_zero() {
        let ring = SampleRingBuffer::new(8);
        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out), 0);
        assert_eq!(ring.skip(4), 0);
    }

    #[test]
    fn test_short_read_returns_available() {
        let ring = SampleRingBuffer::new(8);
        ring.write(&[1, 2, 3]);
        let mut out = [0u8; 6];
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert_eq!(ring.total_read(), 3);
    }

    #[test]
    fn test_typed_samples() {
        let ring = SampleRingBuffer::new(64);
        assert!(ring.write_samples(&[0.25f32, -0.5, 1.0]));
        assert_eq!(ring.total_written(), 12);

        let mut out = [0f32; 4];
        assert_eq!(ring.read_samples(&mut out), 12);
        assert_eq!(out, [0.25, -0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_zero_length_write_is_noop() {
        let ring = SampleRingBuffer::new(4);
        assert!(ring.write(&[]));
        assert_eq!(ring.total_written(), 0);
        assert_eq!(ring.remaining_for_read(), 0);
    }

    #[test]
    fn test_skip_discards_and_counts() {
        let ring = SampleRingBuffer::new(16);
        ring.write(&[10, 11, 12, 13, 14]);
        assert_eq!(ring.skip(3), 3);
        assert_eq!(ring.total_read(), 3);

        let mut out = [0u8; 8];
        assert_eq!(ring.read(&mut out), 2);
        assert_eq!(&out[..2], &[13, 14]);
    }

    #[test]
    fn test_write_blocks_until_read_frees_space() {
        let ring = Arc::new(SampleRingBuffer::new(8));
        assert!(ring.write(&[0; 6]));
        assert_eq!(ring.remaining_for_write(), 1);

        let finished = Arc::new(AtomicBool::new(false));
        let writer = {
            let ring = ring.clone();
            let finished = finished.clone();
            thread::spawn(move || {
                assert!(ring.write(&[7; 4]));
                finished.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!finished.load(Ordering::SeqCst), "writer must still be blocked");

        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out), 4);

        writer.join().unwrap();
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(ring.remaining_for_read(), 6);
    }

    #[test]
    fn test_skip_also_unblocks_writer() {
        let ring = Arc::new(SampleRingBuffer::new(4));
        ring.write(&[1, 2, 3]);

        let writer = {
            let ring = ring.clone();
            thread::spawn(move || ring.write(&[4, 5]))
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(ring.skip(2), 2);
        assert!(writer.join().unwrap());

        let mut out = [0u8; 3];
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(out, [3, 4, 5]);
    }

    #[test]
    fn test_oversized_write_streams_through() {
        let ring = Arc::new(SampleRingBuffer::new(5));
        let data: Vec<u8> = (0..64).collect();

        let writer = {
            let ring = ring.clone();
            let data = data.clone();
            thread::spawn(move || ring.write(&data))
        };

        let mut received = Vec::new();
        let mut out = [0u8; 3];
        while received.len() < data.len() {
            let n = ring.read(&mut out);
            received.extend_from_slice(&out[..n]);
            if n == 0 {
                thread::yield_now();
            }
        }

        assert!(writer.join().unwrap());
        assert_eq!(received, data);
    }

    #[test]
    fn test_close_releases_blocked_writer() {
        let ring = Arc::new(SampleRingBuffer::new(4));
        ring.write(&[1, 2, 3]);

        let writer = {
            let ring = ring.clone();
            thread::spawn(move || ring.write(&[9]))
        };

        thread::sleep(Duration::from_millis(20));
        ring.close();
        assert!(!writer.join().unwrap());
        assert!(ring.is_closed());

        // Data written before close is still readable
        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out), 3);
    }
}
