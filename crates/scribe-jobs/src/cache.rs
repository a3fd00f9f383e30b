use crate::context::Context;

/// Decides whether a job's work is already done.
///
/// This is the only caching mechanism in the pipeline. Implementations must
/// be cheap: the filter consults it for every candidate job on every poll.
pub trait ArtifactCache: Send + Sync {
    fn is_satisfied(&self, context: &Context) -> bool;
}

/// "File exists" means "step is done".
///
/// No content hashing and no staleness check: an output produced from an
/// older version of its inputs still counts as satisfied. A context with no
/// outputs is never satisfied.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceCache;

impl ArtifactCache for PresenceCache {
    fn is_satisfied(&self, context: &Context) -> bool {
        !context.outputs().is_empty() && context.outputs().iter().all(|p| p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn satisfied_only_when_every_output_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let ctx = Context::new(0).with_output(&a).with_output(&b);

        assert!(!PresenceCache.is_satisfied(&ctx));
        fs::write(&a, "x").expect("write");
        assert!(!PresenceCache.is_satisfied(&ctx));
        fs::write(&b, "x").expect("write");
        assert!(PresenceCache.is_satisfied(&ctx));
    }

    #[test]
    fn no_outputs_is_never_satisfied() {
        let ctx = Context::new(0);
        assert!(!PresenceCache.is_satisfied(&ctx));
    }
}
