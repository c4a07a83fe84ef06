// SPDX-License-Identifier: MPL-2.0

//! Output stream abstraction for recordings

use crate::backends::camera::types::{Frame, Framerate};
use std::path::{Path, PathBuf};

/// Errors raised by a video sink; the recorder maps them to `WriteFailure`
pub type SinkResult<T> = Result<T, String>;

/// Opens output streams for new recording sessions
pub trait VideoSinkFactory {
    /// Open an output stream of fixed size and frame rate at `path`
    fn open(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        framerate: Framerate,
    ) -> SinkResult<Box<dyn VideoSink>>;
}

/// An open output stream
pub trait VideoSink {
    /// Append one frame verbatim
    fn write_frame(&mut self, frame: &Frame) -> SinkResult<()>;

    /// Flush pending data and close the stream
    fn finish(self: Box<Self>) -> SinkResult<PathBuf>;
}
