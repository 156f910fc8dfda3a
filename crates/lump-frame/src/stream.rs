use bytes::BytesMut;

use crate::codec::{decode_frame, ReceivedFrame};
use crate::error::{FrameError, Result};
use crate::header::Header;

/// Lazily walks a byte sequence, yielding one decoded frame at a time.
///
/// The stream ends when the source is exhausted on a frame boundary. Running
/// out of bytes inside a frame yields [`FrameError::Truncated`] and an invalid
/// header yields [`FrameError::InvalidSizeClass`]; both end the stream since
/// alignment is lost. A payload that fails to decode yields an error for that
/// frame only and the stream carries on at the next frame.
///
/// To restart, build a new stream over a fresh source.
pub struct FrameStream<I> {
    source: I,
    buf: BytesMut,
    done: bool,
}

impl<I: Iterator<Item = u8>> FrameStream<I> {
    pub fn new<S>(source: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            source: source.into_iter(),
            buf: BytesMut::with_capacity(crate::header::MAX_PAYLOAD + 3),
            done: false,
        }
    }

    /// Consume the stream and return the unread part of the source.
    pub fn into_inner(self) -> I {
        self.source
    }

    fn next_frame(&mut self) -> Option<Result<ReceivedFrame>> {
        let first = self.source.next()?;
        let header = match Header::decode(first) {
            Ok(header) => header,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        let expected = header.frame_len();
        self.buf.clear();
        self.buf.extend_from_slice(&[first]);
        self.buf.extend(self.source.by_ref().take(expected - 1));
        if self.buf.len() < expected {
            self.done = true;
            return Some(Err(FrameError::Truncated {
                expected,
                received: self.buf.len(),
            }));
        }

        match decode_frame(&mut self.buf) {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                Some(Err(FrameError::Truncated {
                    expected,
                    received: self.buf.len(),
                }))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for FrameStream<I> {
    type Item = Result<ReceivedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_frame();
        if item.is_none() {
            self.done = true;
        }
        item
    }
}

impl<I: Iterator<Item = u8>> std::iter::FusedIterator for FrameStream<I> {}
