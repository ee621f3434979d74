//! Test doubles shared by the unit tests

use crate::clock::Clock;
use crate::control_plane::{ResourceClient, ResourceSnapshot};
use crate::control_plane::model::{ObjectMeta, ResourceStatus};
use crate::errors::{LoadError, Result};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    origin_unix: i64,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(origin_unix: i64) -> Self {
        Self {
            origin: Instant::now(),
            origin_unix,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }

    fn unix_timestamp(&self) -> i64 {
        self.origin_unix + self.offset.lock().unwrap().as_secs() as i64
    }
}

/// Canned reply for one request
#[derive(Debug, Clone)]
pub enum Reply {
    Snapshot(ResourceSnapshot),
    Status(u16),
}

/// Control plane that replays scripted snapshots per `METHOD path`.
///
/// The last reply of a script repeats forever unless the client was built
/// with [`ScriptedClient::hang_when_exhausted`], in which case the request
/// never completes once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    clock: Option<Arc<ManualClock>>,
    step: Duration,
    hang: bool,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` by `step` on every request
    pub fn with_clock(mut self, clock: Arc<ManualClock>, step: Duration) -> Self {
        self.clock = Some(clock);
        self.step = step;
        self
    }

    pub fn hang_when_exhausted(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn script(self, method: &str, path: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), replies.into());
        self
    }

    /// Number of requests issued for `METHOD path`
    pub fn calls_to(&self, method: &str, path: &str) -> usize {
        let key = format!("{} {}", method, path);
        self.calls.lock().unwrap().iter().filter(|c| **c == key).count()
    }

    async fn reply(&self, method: &str, path: &str) -> Result<ResourceSnapshot> {
        tokio::task::yield_now().await;

        let key = format!("{} {}", method, path);
        self.calls.lock().unwrap().push(key.clone());
        if let Some(clock) = &self.clock {
            clock.advance(self.step);
        }

        let reply = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&key) {
                Some(queue) if queue.len() > 1 || self.hang => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Snapshot(snapshot)) => Ok(snapshot),
            Some(Reply::Status(status)) => Err(LoadError::Api {
                status,
                body: String::new(),
            }),
            None if self.hang => std::future::pending().await,
            None => Err(LoadError::Api {
                status: 404,
                body: format!("no script for {}", key),
            }),
        }
    }
}

#[async_trait]
impl ResourceClient for ScriptedClient {
    async fn get(&self, path: &str) -> Result<ResourceSnapshot> {
        self.reply("GET", path).await
    }

    async fn post(&self, path: &str, _body: &Value) -> Result<ResourceSnapshot> {
        self.reply("POST", path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.reply("DELETE", path).await.map(|_| ())
    }
}

/// Snapshot the control plane has not reconciled yet
pub fn pending(self_link: &str) -> Reply {
    Reply::Snapshot(ResourceSnapshot {
        metadata: ObjectMeta {
            name: None,
            self_link: Some(self_link.to_string()),
        },
        status: None,
    })
}

/// Allocation snapshot carrying `state`
pub fn allocation_in(self_link: &str, state: &str) -> Reply {
    Reply::Snapshot(ResourceSnapshot {
        metadata: ObjectMeta {
            name: None,
            self_link: Some(self_link.to_string()),
        },
        status: Some(ResourceStatus {
            state: Some(state.to_string()),
            ..Default::default()
        }),
    })
}

/// Fleet snapshot reporting `ready` replicas
pub fn fleet_with(self_link: &str, ready: u64) -> Reply {
    Reply::Snapshot(ResourceSnapshot {
        metadata: ObjectMeta {
            name: None,
            self_link: Some(self_link.to_string()),
        },
        status: Some(ResourceStatus {
            ready_replicas: Some(ready),
            ..Default::default()
        }),
    })
}
