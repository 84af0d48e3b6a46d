use crate::model::WorkloadKey;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub local_port: u16,
    pub remote_port: u16,
}

/// A running background process that can be told to stop.
pub trait ProcessHandle: Send {
    fn pid(&self) -> Option<u32>;
    fn terminate(&mut self) -> Result<()>;
}

pub trait Launcher: Send {
    fn launch(&self, key: &WorkloadKey, mapping: PortMapping) -> Result<Box<dyn ProcessHandle>>;
}

struct ActiveForward {
    mapping: PortMapping,
    handle: Box<dyn ProcessHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: Option<u32> },
    AlreadyActive,
}

/// Tracks port-forward processes, at most one per workload.
pub struct ProcessRegistry {
    launcher: Box<dyn Launcher>,
    active: HashMap<WorkloadKey, ActiveForward>,
}

impl Debug for ProcessRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProcessRegistry {
    pub fn new(launcher: Box<dyn Launcher>) -> Self {
        Self {
            launcher,
            active: HashMap::new(),
        }
    }

    pub fn start(&mut self, key: &WorkloadKey, mapping: PortMapping) -> Result<StartOutcome> {
        if self.active.contains_key(key) {
            return Ok(StartOutcome::AlreadyActive);
        }

        let handle = self.launcher.launch(key, mapping)?;
        let pid = handle.pid();
        debug!(workload = %key, ?pid, local = mapping.local_port, remote = mapping.remote_port, "port-forward started");
        self.active
            .insert(key.clone(), ActiveForward { mapping, handle });
        Ok(StartOutcome::Started { pid })
    }

    /// Returns whether an entry was removed.
    pub fn stop(&mut self, key: &WorkloadKey) -> bool {
        let Some(mut forward) = self.active.remove(key) else {
            return false;
        };
        if let Err(error) = forward.handle.terminate() {
            warn!(workload = %key, error = %error, "failed to terminate port-forward");
        }
        true
    }

    pub fn stop_all(&mut self) -> usize {
        let keys = self.active.keys().cloned().collect::<Vec<_>>();
        keys.iter().filter(|key| self.stop(key)).count()
    }

    pub fn contains(&self, key: &WorkloadKey) -> bool {
        self.active.contains_key(key)
    }

    pub fn local_port(&self, key: &WorkloadKey) -> Option<u16> {
        self.active
            .get(key)
            .map(|forward| forward.mapping.local_port)
    }

    /// Lowest port at or above `base` not already bound by a tracked forward.
    pub fn free_local_port(&self, base: u16) -> u16 {
        let mut port = base;
        while self
            .active
            .values()
            .any(|forward| forward.mapping.local_port == port)
        {
            match port.checked_add(1) {
                Some(next) => port = next,
                None => return base,
            }
        }
        port
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, Clone)]
    pub struct Counters {
        pub launched: Arc<AtomicUsize>,
        pub terminated: Arc<AtomicUsize>,
    }

    impl Counters {
        pub fn launched(&self) -> usize {
            self.launched.load(Ordering::SeqCst)
        }

        pub fn terminated(&self) -> usize {
            self.terminated.load(Ordering::SeqCst)
        }
    }

    pub struct FakeLauncher {
        pub counters: Counters,
        pub fail: bool,
    }

    struct FakeHandle {
        pid: u32,
        terminated: Arc<AtomicUsize>,
    }

    impl ProcessHandle for FakeHandle {
        fn pid(&self) -> Option<u32> {
            Some(self.pid)
        }

        fn terminate(&mut self) -> Result<()> {
            self.terminated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Launcher for FakeLauncher {
        fn launch(
            &self,
            key: &WorkloadKey,
            _mapping: PortMapping,
        ) -> Result<Box<dyn ProcessHandle>> {
            if self.fail {
                anyhow::bail!("kubectl not found while forwarding {key}");
            }
            let pid = self.counters.launched.fetch_add(1, Ordering::SeqCst) as u32 + 1000;
            Ok(Box::new(FakeHandle {
                pid,
                terminated: Arc::clone(&self.counters.terminated),
            }))
        }
    }

    pub fn fake_registry(fail: bool) -> (ProcessRegistry, Counters) {
        let counters = Counters::default();
        let launcher = FakeLauncher {
            counters: counters.clone(),
            fail,
        };
        (ProcessRegistry::new(Box::new(launcher)), counters)
    }
}
