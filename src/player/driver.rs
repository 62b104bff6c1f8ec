//! Tokio driver for a session
//!
//! Spawns the three timed sources that feed a session: the position
//! sampler, the display refresh tick and the notification pump. The tasks
//! hold only a weak reference, so they wind down on their own once the
//! session is gone. Whether a tick does anything is decided by the session
//! itself (sampler armed, frame output attached).

use log::debug;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::controller::Session;
use crate::utils::config::SessionConfig;

pub struct SessionDriver {
    tasks: Vec<JoinHandle<()>>,
}

impl SessionDriver {
    pub fn spawn(runtime: &Handle, session: Arc<Session>, config: &SessionConfig) -> Self {
        let id = session.id();
        let wake = session.wake_handle();
        let weak = Arc::downgrade(&session);
        drop(session);

        let position = spawn_ticker(runtime, weak.clone(), config.position_interval(), |session| {
            session.on_position_tick()
        });
        let refresh = spawn_ticker(runtime, weak.clone(), config.refresh_interval(), |session| {
            session.on_display_refresh(Instant::now())
        });
        let notifications = runtime.spawn(async move {
            loop {
                wake.notified().await;
                let Some(session) = weak.upgrade() else {
                    break;
                };
                session.process_notifications();
            }
        });

        debug!("Driver started for session {}", id);
        Self {
            tasks: vec![position, refresh, notifications],
        }
    }

    /// Stop every task; idempotent
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_ticker<F>(runtime: &Handle, session: Weak<Session>, period: Duration, on_tick: F) -> JoinHandle<()>
where
    F: Fn(&Session) + Send + 'static,
{
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(session) = session.upgrade() else {
                break;
            };
            on_tick(&session);
        }
    })
}
