use std::fmt;

use serde::{Deserialize, Serialize};

use crate::OptionsError;

const DEFAULT_MAX_DEPTH: usize = 256;

/// What the shared-tree patcher does with callable mapping members, whether
/// they sit under a patched key or inside a newly added composite.
///
/// Callables in sequence positions are always rejected, because skipping one
/// would shift every later index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallablePolicy {
    /// Leave the member out of the tree and count it (default).
    #[default]
    Skip,
    /// Fail with [`ConvertError::Callable`](crate::ConvertError::Callable).
    Reject,
}

impl fmt::Display for CallablePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallablePolicy::Skip => f.write_str("skip"),
            CallablePolicy::Reject => f.write_str("reject"),
        }
    }
}

/// Configuration knobs passed to both patchers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOptions {
    callables: CallablePolicy,
    max_depth: usize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self { callables: CallablePolicy::Skip, max_depth: DEFAULT_MAX_DEPTH }
    }
}

impl PatchOptions {
    /// Returns the callable handling policy.
    ///
    /// ```
    /// # use treesync_core::{CallablePolicy, PatchOptions};
    /// let opts = PatchOptions::default().with_callables(CallablePolicy::Reject);
    /// assert_eq!(opts.callables(), CallablePolicy::Reject);
    /// ```
    #[must_use]
    pub fn callables(&self) -> CallablePolicy {
        self.callables
    }

    /// Returns how many nested levels a patch may descend.
    ///
    /// ```
    /// # use treesync_core::PatchOptions;
    /// assert_eq!(PatchOptions::default().max_depth(), 256);
    /// ```
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Sets the callable handling policy.
    #[must_use]
    pub fn with_callables(mut self, policy: CallablePolicy) -> Self {
        self.callables = policy;
        self
    }

    /// Sets the recursion limit. The root level counts as depth 1.
    ///
    /// ```
    /// # use treesync_core::{OptionsError, PatchOptions};
    /// let opts = PatchOptions::default().with_max_depth(8)?;
    /// assert_eq!(opts.max_depth(), 8);
    /// assert_eq!(PatchOptions::default().with_max_depth(0), Err(OptionsError::ZeroDepth));
    /// # Ok::<(), OptionsError>(())
    /// ```
    pub fn with_max_depth(mut self, depth: usize) -> Result<Self, OptionsError> {
        self.max_depth = depth;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), OptionsError> {
        if self.max_depth == 0 {
            return Err(OptionsError::ZeroDepth);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_skip_callables() {
        let opts = PatchOptions::default();
        assert_eq!(opts.callables(), CallablePolicy::Skip);
        assert_eq!(opts.max_depth(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = PatchOptions::default().with_max_depth(0).unwrap_err();
        assert_eq!(err, OptionsError::ZeroDepth);
    }

    #[test]
    fn policy_renders_lowercase() {
        assert_eq!(CallablePolicy::Reject.to_string(), "reject");
        assert_eq!(serde_json::to_string(&CallablePolicy::Skip).unwrap(), "\"skip\"");
    }
}
