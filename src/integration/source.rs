//! Upstream producers of clustered frames.

use std::convert::Infallible;

use crate::tracker::SceneFrame;

/// Anything that yields clustered, ego-compensated frames in temporal order.
///
/// Implement this for a dataset reader or a live segmentation stage.
///
/// # Example
///
/// ```ignore
/// use panotrack_rs::{FrameSource, SceneFrame};
///
/// struct Reader {
///     // dataset handle
/// }
///
/// impl FrameSource for Reader {
///     type Error = std::io::Error;
///
///     fn next_frame(&mut self) -> Result<Option<SceneFrame>, Self::Error> {
///         Ok(None)
///     }
/// }
/// ```
pub trait FrameSource {
    /// Error type for read failures.
    type Error;

    /// Next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<SceneFrame>, Self::Error>;
}

/// Adapter over an in-memory iterator of frames.
#[derive(Debug, Clone)]
pub struct FrameIter<I> {
    inner: I,
}

impl<I> FrameIter<I>
where
    I: Iterator<Item = SceneFrame>,
{
    pub fn new<T>(frames: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            inner: frames.into_iter(),
        }
    }
}

impl<I> FrameSource for FrameIter<I>
where
    I: Iterator<Item = SceneFrame>,
{
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<SceneFrame>, Self::Error> {
        Ok(self.inner.next())
    }
}
