//! GPU frame timing with `TIME_ELAPSED` queries.

use glow::HasContext;

use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::settings::{MultiViewSettings, RenderMode};

/// Number of queries cycled through so a result is read a frame or more
/// after it was issued.
const QUERY_RING: usize = 3;

/// Smoothing factor of the running average.
const SMOOTHING: f64 = 0.1;

/// Measures GPU time spent in the view passes.
///
/// Queries are issued into a small ring and read back only once the driver
/// reports them available, so the timer never stalls the pipeline.
pub struct GpuTimer {
    queries: [glow::Query; QUERY_RING],
    pending: [bool; QUERY_RING],
    next: usize,
    active: bool,
    average_ms: Option<f64>,
}

/// Whether a `TIME_ELAPSED` query may enclose this frame's draws.
///
/// Timer queries around multi-view draws need
/// `GL_EXT_multiview_timer_query`; the other paths are plain draws.
pub fn timer_allowed(settings: &MultiViewSettings, caps: &Capabilities) -> bool {
    settings.render_mode != RenderMode::MultiViewRendering || caps.multiview_timer_query
}

impl GpuTimer {
    /// Create the query objects.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if a query object cannot be created.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self> {
        let mut queries = Vec::with_capacity(QUERY_RING);
        for _ in 0..QUERY_RING {
            queries.push(unsafe { gl.create_query() }.map_err(|e| Error::gl_object("query", e))?);
        }
        let queries: [glow::Query; QUERY_RING] = queries
            .try_into()
            .map_err(|_| Error::gl_object("query", "query ring size mismatch"))?;
        Ok(Self {
            queries,
            pending: [false; QUERY_RING],
            next: 0,
            active: false,
            average_ms: None,
        })
    }

    /// Start timing if `allowed` and the next ring slot is free.
    ///
    /// # Safety
    ///
    /// Requires the creating context to be current.
    pub unsafe fn begin(&mut self, gl: &glow::Context, allowed: bool) {
        unsafe { self.collect(gl) };
        if !allowed {
            self.average_ms = None;
            return;
        }
        if self.pending[self.next] {
            return;
        }
        unsafe { gl.begin_query(glow::TIME_ELAPSED, self.queries[self.next]) };
        self.active = true;
    }

    /// Stop the query started by [`begin`](Self::begin), if any.
    ///
    /// # Safety
    ///
    /// Requires the creating context to be current.
    pub unsafe fn end(&mut self, gl: &glow::Context) {
        if !self.active {
            return;
        }
        unsafe { gl.end_query(glow::TIME_ELAPSED) };
        self.active = false;
        self.pending[self.next] = true;
        self.next = (self.next + 1) % QUERY_RING;
    }

    unsafe fn collect(&mut self, gl: &glow::Context) {
        for (query, pending) in self.queries.iter().zip(self.pending.iter_mut()) {
            if !*pending {
                continue;
            }
            let available =
                unsafe { gl.get_query_parameter_u32(*query, glow::QUERY_RESULT_AVAILABLE) };
            if available == 0 {
                continue;
            }
            let nanos = unsafe { gl.get_query_parameter_u32(*query, glow::QUERY_RESULT) };
            *pending = false;
            let ms = f64::from(nanos) / 1.0e6;
            self.average_ms = Some(match self.average_ms {
                Some(avg) => avg + (ms - avg) * SMOOTHING,
                None => ms,
            });
        }
    }

    /// Smoothed GPU time of the view passes in milliseconds, or `None` when
    /// the current mode cannot be timed.
    pub fn average_ms(&self) -> Option<f64> {
        self.average_ms
    }

    /// Release the query objects.
    ///
    /// # Safety
    ///
    /// Must be called exactly once, with the creating context current.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        for query in self.queries {
            unsafe { gl.delete_query(query) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ViewCount;

    #[test]
    fn multiview_timing_needs_the_extension() {
        let multiview = MultiViewSettings {
            render_mode: RenderMode::MultiViewRendering,
            view_count: ViewCount::Quad,
            ..Default::default()
        };
        let mut caps = Capabilities {
            multiview: true,
            ..Default::default()
        };
        assert!(!timer_allowed(&multiview, &caps));
        caps.multiview_timer_query = true;
        assert!(timer_allowed(&multiview, &caps));
    }

    #[test]
    fn other_modes_are_always_timed() {
        let caps = Capabilities::default();
        for render_mode in [RenderMode::SoftwareFallback, RenderMode::SinglePassStereo] {
            let settings = MultiViewSettings {
                render_mode,
                ..Default::default()
            };
            assert!(timer_allowed(&settings, &caps));
        }
    }
}
