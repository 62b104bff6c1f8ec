//! Session registry and method-call dispatch
//!
//! The registry multiplexes any number of sessions over one command
//! surface. Sessions are keyed by the surface id their texture registration
//! returned. Commands arrive either as typed [`MethodCall`]s or as JSON
//! `{"method": ..., "arguments": ...}` objects; every command except
//! `create` answers immediately with no value, and the outcome of the
//! command is reported later on the session's event stream.

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;

use super::controller::Session;
use super::driver::SessionDriver;
use super::events::EventMessage;
use crate::backend::MediaBackend;
use crate::renderer::TextureRegistry;
use crate::utils::config::SessionConfig;
use crate::utils::error::{AvMediaError, Result};

/// Produces a fresh backend for every created session
pub type BackendFactory = Box<dyn Fn() -> Box<dyn MediaBackend> + Send + Sync>;

/// A decoded command
#[derive(Debug, Clone, PartialEq)]
pub enum MethodCall {
    Create,
    Dispose(i64),
    Open { id: i64, value: String },
    Close(i64),
    Play(i64),
    Pause(i64),
    SeekTo { id: i64, value: f64 },
    SetVolume { id: i64, value: f32 },
    SetSpeed { id: i64, value: f32 },
    SetLooping { id: i64, value: bool },
}

#[derive(Deserialize)]
struct RawCall {
    method: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct ValueArgs<T> {
    id: i64,
    value: T,
}

fn args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    Ok(serde_json::from_value(arguments)?)
}

impl MethodCall {
    /// Decode a JSON method call
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawCall = serde_json::from_str(text)?;
        Self::from_parts(&raw.method, raw.arguments)
    }

    /// Decode a method name and its arguments
    pub fn from_parts(method: &str, arguments: Value) -> Result<Self> {
        let call = match method {
            "create" => MethodCall::Create,
            "dispose" => MethodCall::Dispose(args(arguments)?),
            "open" => {
                let ValueArgs { id, value } = args(arguments)?;
                MethodCall::Open { id, value }
            }
            "close" => MethodCall::Close(args(arguments)?),
            "play" => MethodCall::Play(args(arguments)?),
            "pause" => MethodCall::Pause(args(arguments)?),
            "seekTo" => {
                let ValueArgs { id, value } = args(arguments)?;
                MethodCall::SeekTo { id, value }
            }
            "setVolume" => {
                let ValueArgs { id, value } = args(arguments)?;
                MethodCall::SetVolume { id, value }
            }
            "setSpeed" => {
                let ValueArgs { id, value } = args(arguments)?;
                MethodCall::SetSpeed { id, value }
            }
            "setLooping" => {
                let ValueArgs { id, value } = args(arguments)?;
                MethodCall::SetLooping { id, value }
            }
            other => return Err(AvMediaError::NotImplemented(other.to_string())),
        };
        Ok(call)
    }

    /// Session the call targets, `None` for `create`
    pub fn target(&self) -> Option<i64> {
        match self {
            MethodCall::Create => None,
            MethodCall::Dispose(id)
            | MethodCall::Close(id)
            | MethodCall::Play(id)
            | MethodCall::Pause(id)
            | MethodCall::Open { id, .. }
            | MethodCall::SeekTo { id, .. }
            | MethodCall::SetVolume { id, .. }
            | MethodCall::SetSpeed { id, .. }
            | MethodCall::SetLooping { id, .. } => Some(*id),
        }
    }
}

struct SessionHandle {
    session: Arc<Session>,
    driver: Option<SessionDriver>,
}

/// Owns every live session
pub struct PlayerRegistry {
    sessions: HashMap<i64, SessionHandle>,
    textures: Arc<dyn TextureRegistry>,
    factory: BackendFactory,
    config: SessionConfig,
    runtime: Option<Handle>,
}

impl PlayerRegistry {
    /// Registry whose sessions are driven manually
    pub fn new(textures: Arc<dyn TextureRegistry>, factory: BackendFactory, config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            textures,
            factory,
            config,
            runtime: None,
        }
    }

    /// Spawn a timer driver on `runtime` for every session created from now on
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Create a session and return its id
    pub fn create(&mut self) -> i64 {
        let backend = (self.factory)();
        let session = Arc::new(Session::new(backend, Arc::clone(&self.textures), &self.config));
        let id = session.id();
        let driver = self
            .runtime
            .as_ref()
            .map(|runtime| SessionDriver::spawn(runtime, Arc::clone(&session), &self.config));

        self.sessions.insert(id, SessionHandle { session, driver });
        info!("Registered session {} ({} live)", id, self.sessions.len());
        id
    }

    /// Dispose a session; unknown ids are ignored
    pub fn dispose(&mut self, id: i64) {
        let Some(mut handle) = self.sessions.remove(&id) else {
            debug!("Dispose of unknown session {}", id);
            return;
        };
        if let Some(driver) = handle.driver.as_mut() {
            driver.shutdown();
        }
        handle.session.dispose();
    }

    pub fn session(&self, id: i64) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|handle| Arc::clone(&handle.session))
    }

    /// Subscribe to a session's event stream
    pub fn listen(&self, id: i64) -> Option<Receiver<EventMessage>> {
        self.sessions.get(&id).map(|handle| handle.session.listen())
    }

    pub fn cancel(&self, id: i64) {
        if let Some(handle) = self.sessions.get(&id) {
            handle.session.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Apply a command
    ///
    /// Returns the new id for `create` and `None` for everything else.
    /// Commands addressed to an unknown session are ignored, and command
    /// failures are only logged: the session reports them on its event
    /// stream where that applies.
    pub fn handle(&mut self, call: MethodCall) -> Result<Option<i64>> {
        if call == MethodCall::Create {
            return Ok(Some(self.create()));
        }
        if let MethodCall::Dispose(id) = call {
            self.dispose(id);
            return Ok(None);
        }

        let Some(id) = call.target() else {
            return Ok(None);
        };
        let Some(session) = self.session(id) else {
            debug!("Ignoring {:?} for unknown session {}", call, id);
            return Ok(None);
        };

        let result = match call {
            MethodCall::Open { value, .. } => session.open(&value),
            MethodCall::Close(_) => {
                session.close();
                Ok(())
            }
            MethodCall::Play(_) => {
                session.play();
                Ok(())
            }
            MethodCall::Pause(_) => {
                session.pause();
                Ok(())
            }
            MethodCall::SeekTo { value, .. } => session.seek_to(value),
            MethodCall::SetVolume { value, .. } => session.set_volume(value),
            MethodCall::SetSpeed { value, .. } => session.set_speed(value),
            MethodCall::SetLooping { value, .. } => {
                session.set_looping(value);
                Ok(())
            }
            MethodCall::Create | MethodCall::Dispose(_) => Ok(()),
        };

        match result {
            Err(e) if e.is_caller_error() => warn!("Session {} rejected command: {}", id, e),
            Err(e) => error!("Session {}: {}", id, e),
            Ok(()) => {}
        }
        Ok(None)
    }

    /// Apply a JSON method call and return its JSON answer
    pub fn handle_json(&mut self, text: &str) -> Result<Value> {
        let call = MethodCall::from_json(text)?;
        Ok(match self.handle(call)? {
            Some(id) => Value::from(id),
            None => Value::Null,
        })
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        let ids: Vec<i64> = self.sessions.keys().copied().collect();
        for id in ids {
            self.dispose(id);
        }
    }
}
