/// Recovery action after a failed surface acquisition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; the frame can be rebuilt right away.
    Reconfigured,
    /// Transient error; skip this frame, the previous image stays on screen.
    SkipFrame,
    /// Fatal error (commonly OOM); the host should shut down.
    Fatal,
}
