// libs/video-call-cell/src/services/engine.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::VideoCallError;

/// Events the media engine pushes to its single registered sink.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The local user is in the channel.
    Joined { local_uid: u32 },
    PeerJoined { uid: u32 },
    PeerLeft { uid: u32 },
    Error { code: i32, message: String },
}

/// Move-only token for one initialized engine instance.
///
/// Control calls borrow the handle; [`MediaEngine::release`] consumes it, so
/// touching a released engine does not compile.
#[derive(Debug)]
pub struct EngineHandle(u64);

impl EngineHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Boundary over the real-time media engine's capability set. Signaling and
/// transport live behind it and are invisible to this workspace.
///
/// Contract: every successful `initialize` is matched by exactly one
/// `release`; `join_channel` completes asynchronously and success is signaled
/// by [`EngineEvent::Joined`] on the sink registered at initialize time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn initialize(
        &self,
        app_id: &str,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<EngineHandle, VideoCallError>;

    async fn join_channel(
        &self,
        handle: &EngineHandle,
        token: &str,
        channel_name: &str,
        local_uid: u32,
    ) -> Result<(), VideoCallError>;

    async fn leave_channel(&self, handle: &EngineHandle) -> Result<(), VideoCallError>;

    async fn release(&self, handle: EngineHandle) -> Result<(), VideoCallError>;

    async fn mute_local_audio(
        &self,
        handle: &EngineHandle,
        muted: bool,
    ) -> Result<(), VideoCallError>;

    async fn mute_local_video(
        &self,
        handle: &EngineHandle,
        muted: bool,
    ) -> Result<(), VideoCallError>;

    async fn set_speakerphone(
        &self,
        handle: &EngineHandle,
        enabled: bool,
    ) -> Result<(), VideoCallError>;

    async fn switch_camera(&self, handle: &EngineHandle) -> Result<(), VideoCallError>;
}

// ==============================================================================
// SIMULATED ENGINE
// ==============================================================================

/// What the simulated engine does after `join_channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinScript {
    /// Local ack, then the remote peer arrives.
    PeerArrives,
    /// Remote presence lands before the local ack.
    PeerArrivesFirst,
    /// Local ack, remote peer never shows.
    LocalOnly,
    /// No ack at all; the join attempt hangs.
    NoAnswer,
    /// Engine error instead of an ack.
    FailsJoin { code: i32 },
}

/// Control calls recorded by the simulated engine, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCall {
    MuteAudio(bool),
    MuteVideo(bool),
    Speakerphone(bool),
    SwitchCamera,
}

/// In-process `MediaEngine` for development and tests, standing in where no
/// real engine is configured. Scripts the remote side of the call and keeps
/// counters so callers can check the initialize/release pairing.
pub struct SimulatedMediaEngine {
    script: JoinScript,
    remote_uid: u32,
    inner: Mutex<SimInner>,
}

struct SimInner {
    next_handle_id: u64,
    sessions: HashMap<u64, mpsc::Sender<EngineEvent>>,
    initialized: u64,
    released: u64,
    controls: Vec<ControlCall>,
}

impl SimulatedMediaEngine {
    pub fn new() -> Self {
        Self::with_script(JoinScript::PeerArrives)
    }

    pub fn with_script(script: JoinScript) -> Self {
        Self {
            script,
            remote_uid: 87654321,
            inner: Mutex::new(SimInner {
                next_handle_id: 1,
                sessions: HashMap::new(),
                initialized: 0,
                released: 0,
                controls: Vec::new(),
            }),
        }
    }

    pub fn initialized_count(&self) -> u64 {
        self.inner.lock().unwrap().initialized
    }

    pub fn released_count(&self) -> u64 {
        self.inner.lock().unwrap().released
    }

    pub fn active_handles(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn control_log(&self) -> Vec<ControlCall> {
        self.inner.lock().unwrap().controls.clone()
    }

    /// Pushes an event on the most recently registered sink, as if the remote
    /// side acted. Returns false when no live session exists.
    pub async fn emit(&self, event: EngineEvent) -> bool {
        let sender = {
            let inner = self.inner.lock().unwrap();
            inner
                .sessions
                .get(&(inner.next_handle_id - 1))
                .cloned()
        };
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    fn sender_for(&self, handle: &EngineHandle) -> Result<mpsc::Sender<EngineEvent>, VideoCallError> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(&handle.id())
            .cloned()
            .ok_or(VideoCallError::Engine {
                code: -1,
                message: "unknown engine handle".to_string(),
            })
    }

    fn record_control(&self, handle: &EngineHandle, call: ControlCall) -> Result<(), VideoCallError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.sessions.contains_key(&handle.id()) {
            return Err(VideoCallError::Engine {
                code: -1,
                message: "unknown engine handle".to_string(),
            });
        }
        inner.controls.push(call);
        Ok(())
    }
}

impl Default for SimulatedMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEngine for SimulatedMediaEngine {
    async fn initialize(
        &self,
        app_id: &str,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<EngineHandle, VideoCallError> {
        debug!("Initializing simulated media engine for app {}", app_id);

        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_handle_id;
        inner.next_handle_id += 1;
        inner.sessions.insert(id, events);
        inner.initialized += 1;
        Ok(EngineHandle::new(id))
    }

    async fn join_channel(
        &self,
        handle: &EngineHandle,
        _token: &str,
        channel_name: &str,
        local_uid: u32,
    ) -> Result<(), VideoCallError> {
        debug!(
            "Simulated join of channel {} as uid {}",
            channel_name, local_uid
        );
        let sender = self.sender_for(handle)?;

        // Receiver side may already be gone; that is the caller's teardown
        // problem, not a join failure.
        match self.script {
            JoinScript::PeerArrives => {
                let _ = sender.send(EngineEvent::Joined { local_uid }).await;
                let _ = sender
                    .send(EngineEvent::PeerJoined {
                        uid: self.remote_uid,
                    })
                    .await;
            }
            JoinScript::PeerArrivesFirst => {
                let _ = sender
                    .send(EngineEvent::PeerJoined {
                        uid: self.remote_uid,
                    })
                    .await;
                let _ = sender.send(EngineEvent::Joined { local_uid }).await;
            }
            JoinScript::LocalOnly => {
                let _ = sender.send(EngineEvent::Joined { local_uid }).await;
            }
            JoinScript::NoAnswer => {}
            JoinScript::FailsJoin { code } => {
                let _ = sender
                    .send(EngineEvent::Error {
                        code,
                        message: "simulated join failure".to_string(),
                    })
                    .await;
            }
        }
        Ok(())
    }

    async fn leave_channel(&self, handle: &EngineHandle) -> Result<(), VideoCallError> {
        self.sender_for(handle)?;
        debug!("Simulated leave of channel for handle {}", handle.id());
        Ok(())
    }

    async fn release(&self, handle: EngineHandle) -> Result<(), VideoCallError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.sessions.remove(&handle.id()).is_none() {
            return Err(VideoCallError::Engine {
                code: -1,
                message: "unknown engine handle".to_string(),
            });
        }
        inner.released += 1;
        Ok(())
    }

    async fn mute_local_audio(
        &self,
        handle: &EngineHandle,
        muted: bool,
    ) -> Result<(), VideoCallError> {
        self.record_control(handle, ControlCall::MuteAudio(muted))
    }

    async fn mute_local_video(
        &self,
        handle: &EngineHandle,
        muted: bool,
    ) -> Result<(), VideoCallError> {
        self.record_control(handle, ControlCall::MuteVideo(muted))
    }

    async fn set_speakerphone(
        &self,
        handle: &EngineHandle,
        enabled: bool,
    ) -> Result<(), VideoCallError> {
        self.record_control(handle, ControlCall::Speakerphone(enabled))
    }

    async fn switch_camera(&self, handle: &EngineHandle) -> Result<(), VideoCallError> {
        self.record_control(handle, ControlCall::SwitchCamera)
    }
}
