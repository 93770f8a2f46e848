use thiserror::Error;

/// Outcome error reported when the source list is empty at run start.
pub const NO_SOURCES_FOUND: &str = "no sources found";

/// Outcome error reported when the run was cancelled mid-loop.
pub const RUN_CANCELLED: &str = "extraction cancelled";

/// Failures of the capture bridge, i.e. the privileged in-page evaluation.
///
/// A legitimate "the reveal action never fired `window.open`" is *not* an
/// error — the bridge resolves `Ok(None)` for that. `Unreachable` means the
/// evaluation itself could not run or never came back: the page is gone,
/// the CDP connection dropped, or the outer RPC timeout elapsed. The
/// orchestrator folds both into "no URL" but they are logged distinctly.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("capture context unreachable: {0}")]
    Unreachable(String),
}
