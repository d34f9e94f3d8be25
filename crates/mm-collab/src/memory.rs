//! In-process connector that records traffic instead of talking to a
//! server. Used by tests and headless demos.

use crate::error::CollabError;
use crate::session::{Channel, Connector};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Link {
    /// `(epoch, frame)` for every frame sent.
    sent: Vec<(u64, String)>,
    /// Epoch of every connect call, successful or not.
    connects: Vec<u64>,
    closed: Vec<u64>,
    refuse: bool,
}

/// Cloneable handle: keep one clone to inspect what the session sent.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    link: Arc<Mutex<Link>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent `connect` calls fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.link().refuse = refuse;
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.link().sent.iter().map(|(_, f)| f.clone()).collect()
    }

    /// Drain and return the frames sent so far.
    pub fn take_sent(&self) -> Vec<String> {
        self.link().sent.drain(..).map(|(_, f)| f).collect()
    }

    pub fn connect_count(&self) -> usize {
        self.link().connects.len()
    }

    pub fn closed_epochs(&self) -> Vec<u64> {
        self.link().closed.clone()
    }
}

impl Connector for MemoryConnector {
    type Channel = MemoryChannel;

    fn connect(&mut self, url: &str, epoch: u64) -> Result<MemoryChannel, CollabError> {
        let mut link = self.link();
        link.connects.push(epoch);
        if link.refuse {
            return Err(CollabError::Transport(format!("connection to {url} refused")));
        }
        Ok(MemoryChannel {
            epoch,
            link: Arc::clone(&self.link),
        })
    }
}

#[derive(Debug)]
pub struct MemoryChannel {
    epoch: u64,
    link: Arc<Mutex<Link>>,
}

impl Channel for MemoryChannel {
    fn send(&mut self, text: &str) -> Result<(), CollabError> {
        let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        link.sent.push((self.epoch, text.to_string()));
        Ok(())
    }

    fn close(&mut self) {
        let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        link.closed.push(self.epoch);
    }
}
