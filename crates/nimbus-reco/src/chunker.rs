//! Chunked streaming uploader
//!
//! Coalesces arbitrarily sized audio writes into service-preferred frames.
//! The frame buffer is allocated lazily on the first buffered write of a turn
//! and released by `flush`; a frame size of zero disables buffering and turns
//! every write into a direct passthrough.

use parking_lot::Mutex;

use crate::session::ServiceLink;

#[derive(Default)]
struct UploadBuffer {
    frame_size: usize,
    buf: Option<Vec<u8>>,
    filled: usize,
}

pub(crate) struct ChunkedUploader {
    inner: Mutex<UploadBuffer>,
}

impl ChunkedUploader {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(UploadBuffer::default()),
        }
    }

    /// Sets the frame size for the turn. Zero disables buffering. Audio is
    /// never carried across turns, so any stale buffer is discarded.
    pub fn set_frame_size(&self, frame_size: usize) {
        let mut b = self.inner.lock();
        if b.frame_size != frame_size {
            b.buf = None;
            b.filled = 0;
        }
        b.frame_size = frame_size;
    }

    /// Appends `bytes`, emitting a full frame to the link whenever the buffer
    /// fills exactly. An empty write is a flush composed with the
    /// transport-level flush.
    pub fn write(&self, link: &ServiceLink, bytes: &[u8]) {
        if bytes.is_empty() {
            self.flush(link);
            return;
        }

        let mut b = self.inner.lock();
        if b.frame_size == 0 {
            drop(b);
            link.send_audio(bytes);
            return;
        }

        if b.buf.is_none() {
            b.buf = Some(vec![0u8; b.frame_size]);
            b.filled = 0;
        }

        let mut rest = bytes;
        loop {
            if b.filled == b.frame_size {
                let frame = b.buf.take().unwrap_or_default();
                b.filled = 0;
                link.send_audio(&frame);
                b.buf = Some(frame);
            }
            if rest.is_empty() {
                break;
            }
            let room = b.frame_size - b.filled;
            let n = rest.len().min(room);
            let at = b.filled;
            if let Some(buf) = b.buf.as_mut() {
                buf[at..at + n].copy_from_slice(&rest[..n]);
            }
            b.filled += n;
            rest = &rest[n..];
        }
    }

    /// Emits whatever partial bytes remain (possibly a zero-length write),
    /// releases the buffer, and flushes the transport.
    pub fn flush(&self, link: &ServiceLink) {
        let partial = {
            let mut b = self.inner.lock();
            let filled = b.filled;
            b.filled = 0;
            match b.buf.take() {
                Some(mut buf) => {
                    buf.truncate(filled);
                    buf
                }
                None => Vec::new(),
            }
        };
        link.send_audio(&partial);
        link.flush_audio();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TurnState;
    use crate::transport::RecoSession;
    use parking_lot::Mutex as PlMutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSession {
        writes: PlMutex<Vec<Vec<u8>>>,
        flushes: PlMutex<usize>,
    }

    impl RecoSession for RecordingSession {
        fn send_message(&self, _path: &str, _body: &[u8]) {}
        fn write_audio(&self, bytes: &[u8]) {
            self.writes.lock().push(bytes.to_vec());
        }
        fn flush_audio(&self) {
            *self.flushes.lock() += 1;
        }
    }

    fn linked_session() -> (ServiceLink, Arc<RecordingSession>) {
        let link = ServiceLink::new(Arc::new(TurnState::new()));
        let session = Arc::new(RecordingSession::default());
        link.install(session.clone());
        (link, session)
    }

    #[test]
    fn passthrough_when_frame_size_zero() {
        let (link, session) = linked_session();
        let uploader = ChunkedUploader::new();
        uploader.write(&link, &[1, 2, 3]);
        assert_eq!(session.writes.lock().as_slice(), &[vec![1, 2, 3]]);
    }

    #[test]
    fn fills_then_emits_exact_frames() {
        let (link, session) = linked_session();
        let uploader = ChunkedUploader::new();
        uploader.set_frame_size(4);

        uploader.write(&link, &[1, 2, 3]);
        assert!(session.writes.lock().is_empty());

        uploader.write(&link, &[4, 5]);
        assert_eq!(session.writes.lock().as_slice(), &[vec![1, 2, 3, 4]]);

        uploader.flush(&link);
        assert_eq!(session.writes.lock().as_slice(), &[vec![1, 2, 3, 4], vec![5]]);
        assert_eq!(*session.flushes.lock(), 1);
    }

    #[test]
    fn flush_with_nothing_buffered_emits_empty_write() {
        let (link, session) = linked_session();
        let uploader = ChunkedUploader::new();
        uploader.set_frame_size(4);
        uploader.flush(&link);
        assert_eq!(session.writes.lock().as_slice(), &[Vec::<u8>::new()]);
        assert_eq!(*session.flushes.lock(), 1);
    }

    #[test]
    fn empty_write_is_flush() {
        let (link, session) = linked_session();
        let uploader = ChunkedUploader::new();
        uploader.set_frame_size(4);
        uploader.write(&link, &[9, 9]);
        uploader.write(&link, &[]);
        assert_eq!(session.writes.lock().as_slice(), &[vec![9, 9]]);
        assert_eq!(*session.flushes.lock(), 1);
    }

    #[test]
    fn concatenation_preserved_and_non_final_frames_exact() {
        let (link, session) = linked_session();
        let uploader = ChunkedUploader::new();
        uploader.set_frame_size(8);

        let input: Vec<u8> = (0..=41).collect();
        for chunk in input.chunks(5) {
            uploader.write(&link, chunk);
        }
        uploader.flush(&link);

        let writes = session.writes.lock();
        let flat: Vec<u8> = writes.iter().flatten().copied().collect();
        assert_eq!(flat, input);
        for frame in &writes[..writes.len() - 1] {
            assert_eq!(frame.len(), 8);
        }
        assert_eq!(writes.last().unwrap().len(), 42 % 8);
    }

    #[test]
    fn changing_frame_size_discards_stale_buffer() {
        let (link, session) = linked_session();
        let uploader = ChunkedUploader::new();
        uploader.set_frame_size(4);
        uploader.write(&link, &[1, 2]);

        uploader.set_frame_size(8);
        uploader.write(&link, &[3, 4, 5, 6, 7, 8, 9, 10]);
        uploader.flush(&link);

        let writes = session.writes.lock();
        assert_eq!(writes.as_slice(), &[vec![3, 4, 5, 6, 7, 8, 9, 10]]);
    }

    #[test]
    fn buffer_released_on_flush_and_reallocated() {
        let (link, session) = linked_session();
        let uploader = ChunkedUploader::new();
        uploader.set_frame_size(4);

        uploader.write(&link, &[1, 2, 3, 4, 5]);
        uploader.flush(&link);
        uploader.write(&link, &[6]);
        uploader.flush(&link);

        let writes = session.writes.lock();
        assert_eq!(writes.as_slice(), &[vec![1, 2, 3, 4], vec![5], vec![6]]);
    }
}
