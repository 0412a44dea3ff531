//! AWS event-stream decoding.
//!
//! The streaming endpoint responds with a proprietary binary framing: each
//! frame is self-length-delimited (prelude, prelude checksum, header block,
//! payload, trailing checksum), so the decoder never buffers more than one
//! frame and never needs the total body length up front.
//!
//! ```text
//! Raw bytes → Frame Decoder → Event Interpreter → text deltas
//!               (frame.rs)       (interpret.rs)
//! ```
//!
//! [`delta_stream`] composes the two into a lazy pull-based stream: nothing
//! is read from the wire until the consumer asks for the next delta.

pub mod frame;
pub mod interpret;

pub use frame::{next_frame, parse_headers, DecodeError, Frame, HeaderValue};
pub use interpret::{interpret, FrameEvent};

use crate::transport::ByteCursor;
use crate::{BoxStream, Error};
use futures::stream;

struct DeltaState {
    cursor: ByteCursor,
    done: bool,
}

/// Turn a byte cursor into a lazy stream of text deltas.
///
/// Frames are decoded strictly in arrival order, one per pull; ignorable
/// frames are skipped inline. On a decode error, a transport error, or a
/// service-reported exception frame, the stream yields exactly one `Err`
/// and then ends - deltas already yielded stay with the consumer.
pub fn delta_stream(cursor: ByteCursor) -> BoxStream<'static, String> {
    let state = DeltaState {
        cursor,
        done: false,
    };
    Box::pin(stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match next_frame(&mut state.cursor).await {
                Ok(None) => return None,
                Ok(Some(frame)) => match interpret(&frame) {
                    FrameEvent::Delta(text) => return Some((Ok(text), state)),
                    FrameEvent::Ignored => continue,
                    FrameEvent::RemoteError {
                        event_type,
                        message,
                    } => {
                        state.done = true;
                        return Some((
                            Err(Error::Remote {
                                event_type,
                                message,
                            }),
                            state,
                        ));
                    }
                },
                Err(e) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
            }
        }
    }))
}
