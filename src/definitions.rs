//! Definitions store contract.

use crate::error::{Error, Result};
use crate::types::TriggerKey;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Persistent source of every trigger definition.
///
/// Consulted only on a cold start, when no current partition exists in the
/// replicated store.
pub trait DefinitionsProvider: Send + Sync + 'static {
    /// Every `(tenant_id, trigger_id)` the engine knows about.
    fn all_triggers(&self) -> Result<Vec<TriggerKey>>;
}

/// Load all triggers on a worker thread, bounded by `timeout`.
///
/// The provider call may block on I/O; on timeout the worker is abandoned
/// to finish on its own and the caller proceeds without its result.
pub fn load_all_bounded(
    provider: &Arc<dyn DefinitionsProvider>,
    timeout: Duration,
) -> Result<Vec<TriggerKey>> {
    let (tx, rx) = mpsc::channel();
    let provider = Arc::clone(provider);
    thread::Builder::new()
        .name("definitions-cold-load".into())
        .spawn(move || {
            let _ = tx.send(provider.all_triggers());
        })
        .map_err(|e| Error::DefinitionsUnavailable(format!("cold load spawn failed: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(Error::DefinitionsUnavailable(format!(
            "cold load exceeded {timeout:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Listing(Vec<TriggerKey>);

    impl DefinitionsProvider for Listing {
        fn all_triggers(&self) -> Result<Vec<TriggerKey>> {
            Ok(self.0.clone())
        }
    }

    struct Offline;

    impl DefinitionsProvider for Offline {
        fn all_triggers(&self) -> Result<Vec<TriggerKey>> {
            Err(Error::DefinitionsUnavailable("store offline".into()))
        }
    }

    struct Stuck;

    impl DefinitionsProvider for Stuck {
        fn all_triggers(&self) -> Result<Vec<TriggerKey>> {
            thread::sleep(Duration::from_secs(5));
            Ok(Vec::new())
        }
    }

    #[test]
    fn returns_the_listing() {
        let triggers = vec![TriggerKey::new("t1", "x").unwrap()];
        let provider: Arc<dyn DefinitionsProvider> = Arc::new(Listing(triggers.clone()));
        let loaded = load_all_bounded(&provider, Duration::from_secs(1)).unwrap();
        assert_eq!(loaded, triggers);
    }

    #[test]
    fn propagates_provider_failure() {
        let provider: Arc<dyn DefinitionsProvider> = Arc::new(Offline);
        let result = load_all_bounded(&provider, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::DefinitionsUnavailable(_))));
    }

    #[test]
    fn times_out_a_stuck_provider() {
        let provider: Arc<dyn DefinitionsProvider> = Arc::new(Stuck);
        let result = load_all_bounded(&provider, Duration::from_millis(50));
        assert!(matches!(result, Err(Error::DefinitionsUnavailable(_))));
    }
}
