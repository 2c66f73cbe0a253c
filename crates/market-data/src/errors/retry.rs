/// Classification for retry policy.
///
/// The engine itself never retries; this tells the caller whether a retry
/// could plausibly succeed.
///
/// | Class | Retry may help? |
/// |-------|-----------------|
/// | `Never` | No |
/// | `Transient` | Yes, at the caller's discretion |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - unknown source, bad symbol, malformed input.
    /// The request is fundamentally invalid and retrying won't help.
    Never,

    /// Network failure, timeout or an unavailable source.
    /// Retrying later may succeed.
    Transient,
}
