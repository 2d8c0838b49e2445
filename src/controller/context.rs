use kube::Client;

/// State shared across SqliteDatabase reconciliations.
///
/// Only the cluster client lives here; per-pass state stays on the stack so
/// distinct databases reconcile concurrently without shared mutable state.
#[derive(Clone)]
pub struct Context {
    /// Client used for all dependent reads and applies
    pub client: Client,
}

impl Context {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}
