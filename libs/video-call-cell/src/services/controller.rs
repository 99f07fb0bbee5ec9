// libs/video-call-cell/src/services/controller.rs
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::CallRole;

use crate::models::{CallPhase, CallSessionConfig, CallSnapshot, VideoCallError};
use crate::services::broker::SessionBroker;
use crate::services::engine::{EngineEvent, EngineHandle, MediaEngine};

const TICK: Duration = Duration::from_secs(1);

/// Builds and launches call sessions.
///
/// One launched session owns the engine handle and all live state for the
/// lifetime of one call screen. Commands, engine events, the duration ticker
/// and the join deadline all funnel through a single loop, so no two
/// lifecycle-mutating operations are ever in flight at once.
pub struct CallSessionController {
    broker: Arc<dyn SessionBroker>,
    engine: Arc<dyn MediaEngine>,
    config: CallSessionConfig,
}

impl CallSessionController {
    pub fn new(
        broker: Arc<dyn SessionBroker>,
        engine: Arc<dyn MediaEngine>,
        config: CallSessionConfig,
    ) -> Self {
        Self {
            broker,
            engine,
            config,
        }
    }

    /// Spawns the session loop for one consultation and hands back the
    /// consumer-facing handle.
    pub fn launch(self, consultation_id: Uuid, role: CallRole) -> CallSession {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(CallSnapshot::default());

        let runner = SessionRunner {
            broker: self.broker,
            engine: self.engine,
            config: self.config,
            consultation_id,
            role,
            state_tx,
            phase: CallPhase::Idle,
            handle: None,
            remote_peer: None,
            buffered_presence: None,
            peer_ever_present: false,
            audio_muted: false,
            video_muted: false,
            speaker_on: false,
            elapsed_seconds: 0,
            failure: None,
            join_reported: false,
        };
        let task = tokio::spawn(runner.run(command_rx));

        CallSession {
            commands: command_tx,
            state: state_rx,
            _task: task,
        }
    }
}

/// Consumer handle for one live call session.
///
/// All methods are fire-and-forget; progress is observed through
/// [`CallSession::watch`] / [`CallSession::snapshot`]. Dropping the handle
/// without calling [`CallSession::end`] is the navigation-away path: the
/// session loop still runs the full teardown before exiting.
pub struct CallSession {
    commands: mpsc::Sender<CallCommand>,
    state: watch::Receiver<CallSnapshot>,
    _task: JoinHandle<()>,
}

impl CallSession {
    /// Kicks off credential exchange and channel join.
    pub async fn start(&self) {
        self.send(CallCommand::Start).await;
    }

    /// Ends the call and reports completion to the backend.
    pub async fn end(&self) {
        self.send(CallCommand::End).await;
    }

    /// Cancels the consultation. Honored only while the remote peer has
    /// never been in the call.
    pub async fn cancel(&self, reason: impl Into<String>) {
        self.send(CallCommand::Cancel {
            reason: reason.into(),
        })
        .await;
    }

    pub async fn toggle_audio(&self) {
        self.send(CallCommand::ToggleAudio).await;
    }

    pub async fn toggle_video(&self) {
        self.send(CallCommand::ToggleVideo).await;
    }

    pub async fn toggle_speaker(&self) {
        self.send(CallCommand::ToggleSpeaker).await;
    }

    pub async fn switch_camera(&self) {
        self.send(CallCommand::SwitchCamera).await;
    }

    /// Current state of the session.
    pub fn snapshot(&self) -> CallSnapshot {
        self.state.borrow().clone()
    }

    /// A live subscription to state changes.
    pub fn watch(&self) -> watch::Receiver<CallSnapshot> {
        self.state.clone()
    }

    /// Waits until the session reaches `phase` or any terminal phase,
    /// whichever comes first, and returns that snapshot.
    pub async fn wait_for_phase(&mut self, phase: CallPhase) -> CallSnapshot {
        loop {
            let snapshot = self.state.borrow().clone();
            if snapshot.phase == phase || snapshot.phase.is_terminal() {
                return snapshot;
            }
            if self.state.changed().await.is_err() {
                return self.state.borrow().clone();
            }
        }
    }

    /// Consumes the handle and waits for the session to finish, returning the
    /// final snapshot. If the call is still active this behaves like
    /// navigating away: the loop tears everything down first.
    pub async fn closed(self) -> CallSnapshot {
        let CallSession {
            commands,
            mut state,
            _task,
        } = self;
        // Closing the command channel is the detach signal.
        drop(commands);
        loop {
            let snapshot = state.borrow().clone();
            if snapshot.phase.is_terminal() {
                return snapshot;
            }
            if state.changed().await.is_err() {
                return state.borrow().clone();
            }
        }
    }

    async fn send(&self, command: CallCommand) {
        if self.commands.send(command).await.is_err() {
            debug!("Call session already closed, command dropped");
        }
    }
}

#[derive(Debug)]
enum CallCommand {
    Start,
    End,
    Cancel { reason: String },
    ToggleAudio,
    ToggleVideo,
    ToggleSpeaker,
    SwitchCamera,
}

/// Latest peer presence seen before the local join ack. Only the newest
/// observation matters; it is applied once the session is connected.
#[derive(Debug, Clone, Copy)]
enum BufferedPresence {
    Present(u32),
    Absent,
}

struct SessionRunner {
    broker: Arc<dyn SessionBroker>,
    engine: Arc<dyn MediaEngine>,
    config: CallSessionConfig,
    consultation_id: Uuid,
    role: CallRole,
    state_tx: watch::Sender<CallSnapshot>,

    phase: CallPhase,
    handle: Option<EngineHandle>,
    remote_peer: Option<u32>,
    buffered_presence: Option<BufferedPresence>,
    peer_ever_present: bool,
    audio_muted: bool,
    video_muted: bool,
    speaker_on: bool,
    elapsed_seconds: u64,
    failure: Option<String>,
    join_reported: bool,
}

impl SessionRunner {
    async fn run(mut self, mut commands: mpsc::Receiver<CallCommand>) {
        let (event_tx, mut events) = mpsc::channel::<EngineEvent>(32);

        // Armed when a join attempt begins; the guard keeps it inert
        // everywhere else.
        let join_deadline = sleep(Duration::from_secs(86400 * 365));
        tokio::pin!(join_deadline);

        let mut ticker = interval_at(Instant::now() + TICK, TICK);

        loop {
            let phase_before = self.phase;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        self.handle_command(command, &event_tx, join_deadline.as_mut())
                            .await;
                    }
                    None => self.handle_detach().await,
                },
                Some(event) = events.recv() => {
                    self.handle_engine_event(event).await;
                }
                _ = ticker.tick(), if self.phase == CallPhase::Connected => {
                    self.elapsed_seconds += 1;
                    self.publish();
                }
                _ = join_deadline.as_mut(), if matches!(self.phase, CallPhase::Initializing | CallPhase::Joining) => {
                    self.handle_join_timeout().await;
                }
            }

            if self.phase == CallPhase::Connected && phase_before != CallPhase::Connected {
                // Fresh ticker so the first elapsed second lands a second
                // from now, not immediately.
                ticker = interval_at(Instant::now() + TICK, TICK);
            }

            if self.phase.is_terminal() {
                break;
            }
        }

        debug!(
            "Call session loop for consultation {} finished in phase {}",
            self.consultation_id, self.phase
        );
    }

    async fn handle_command(
        &mut self,
        command: CallCommand,
        event_tx: &mpsc::Sender<EngineEvent>,
        deadline: Pin<&mut Sleep>,
    ) {
        match command {
            CallCommand::Start => self.handle_start(event_tx, deadline).await,
            CallCommand::End => self.handle_end().await,
            CallCommand::Cancel { reason } => self.handle_cancel(&reason).await,
            CallCommand::ToggleAudio => self.handle_toggle_audio().await,
            CallCommand::ToggleVideo => self.handle_toggle_video().await,
            CallCommand::ToggleSpeaker => self.handle_toggle_speaker().await,
            CallCommand::SwitchCamera => self.handle_switch_camera().await,
        }
    }

    async fn handle_start(
        &mut self,
        event_tx: &mpsc::Sender<EngineEvent>,
        mut deadline: Pin<&mut Sleep>,
    ) {
        if self.phase != CallPhase::Idle {
            warn!("Start ignored while {}", self.phase);
            return;
        }
        info!(
            "Starting call session for consultation {} as {}",
            self.consultation_id, self.role
        );
        self.set_phase(CallPhase::Initializing);

        let timeout = Duration::from_secs(self.config.join_attempt_timeout_seconds);
        let deadline_at = Instant::now() + timeout;
        // One deadline covers the whole attempt: the in-line setup below and
        // the wait for the engine's join ack after it.
        deadline.as_mut().reset(deadline_at);

        match tokio::time::timeout_at(deadline_at, self.connect(event_tx)).await {
            Ok(Ok(())) => {
                // Joining now; the engine ack moves us to Connected.
            }
            Ok(Err(error)) => {
                warn!("Call setup failed: {}", error);
                self.teardown_engine().await;
                self.fail(error);
            }
            Err(_) => {
                warn!("Call setup timed out after {}s", timeout.as_secs());
                self.teardown_engine().await;
                self.fail(VideoCallError::JoinTimeout {
                    seconds: timeout.as_secs(),
                });
            }
        }
    }

    /// Credential exchange and channel join, in order. Any error leaves
    /// cleanup to the caller.
    async fn connect(&mut self, event_tx: &mpsc::Sender<EngineEvent>) -> Result<(), VideoCallError> {
        let consultation = self.broker.fetch_consultation(self.consultation_id).await?;

        if consultation.status.is_terminal() {
            return Err(VideoCallError::ConsultationOver {
                status: consultation.status,
            });
        }
        if !consultation.can_join_now(Utc::now(), &self.config) {
            let (opens_at, closes_at) = consultation.join_window(&self.config);
            return Err(VideoCallError::JoinWindowClosed { opens_at, closes_at });
        }

        let credentials = self
            .broker
            .request_join(self.consultation_id, self.role)
            .await?;
        self.join_reported = true;
        self.set_phase(CallPhase::Joining);

        let handle = self
            .engine
            .initialize(&credentials.app_id, event_tx.clone())
            .await?;
        self.handle = Some(handle);

        if let Some(handle) = self.handle.as_ref() {
            self.engine
                .join_channel(
                    handle,
                    &credentials.token,
                    &credentials.channel_name,
                    credentials.uid,
                )
                .await?;
        }
        Ok(())
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Joined { local_uid } => {
                if self.phase != CallPhase::Joining {
                    debug!("Join ack ignored while {}", self.phase);
                    return;
                }
                info!("Joined channel as uid {}", local_uid);
                if let Some(BufferedPresence::Present(uid)) = self.buffered_presence.take() {
                    self.remote_peer = Some(uid);
                }
                self.set_phase(CallPhase::Connected);
            }
            EngineEvent::PeerJoined { uid } => match self.phase {
                CallPhase::Initializing | CallPhase::Joining => {
                    debug!("Peer {} joined before our ack, buffering", uid);
                    self.buffered_presence = Some(BufferedPresence::Present(uid));
                    self.peer_ever_present = true;
                }
                CallPhase::Connected => {
                    info!("Remote peer {} joined", uid);
                    self.remote_peer = Some(uid);
                    self.peer_ever_present = true;
                    self.publish();
                }
                _ => debug!("Peer join ignored while {}", self.phase),
            },
            EngineEvent::PeerLeft { uid } => match self.phase {
                CallPhase::Initializing | CallPhase::Joining => {
                    self.buffered_presence = Some(BufferedPresence::Absent);
                }
                CallPhase::Connected => {
                    if self.remote_peer == Some(uid) {
                        info!("Remote peer {} left", uid);
                        self.remote_peer = None;
                        self.publish();
                    }
                }
                _ => debug!("Peer leave ignored while {}", self.phase),
            },
            EngineEvent::Error { code, message } => {
                self.handle_engine_error(code, message).await;
            }
        }
    }

    async fn handle_engine_error(&mut self, code: i32, message: String) {
        match self.phase {
            CallPhase::Initializing | CallPhase::Joining => {
                warn!("Engine error ({}) while joining: {}", code, message);
                self.teardown_engine().await;
                self.fail(VideoCallError::Engine { code, message });
            }
            CallPhase::Connected => {
                warn!("Engine error ({}) mid-call: {}", code, message);
                self.teardown_engine().await;
                self.report_end_best_effort().await;
                self.fail(VideoCallError::Engine { code, message });
            }
            _ => debug!(
                "Engine error ({}) ignored while {}: {}",
                code, self.phase, message
            ),
        }
    }

    async fn handle_join_timeout(&mut self) {
        warn!(
            "Join attempt timed out after {}s",
            self.config.join_attempt_timeout_seconds
        );
        self.teardown_engine().await;
        self.fail(VideoCallError::JoinTimeout {
            seconds: self.config.join_attempt_timeout_seconds,
        });
    }

    async fn handle_end(&mut self) {
        match self.phase {
            CallPhase::Connected | CallPhase::Joining | CallPhase::Initializing => {
                info!("Ending call for consultation {}", self.consultation_id);
                self.set_phase(CallPhase::Ending);
                self.teardown_engine().await;
                self.report_end_best_effort().await;
                self.set_phase(CallPhase::Closed);
            }
            CallPhase::Idle => self.set_phase(CallPhase::Closed),
            _ => debug!("End ignored while {}", self.phase),
        }
    }

    async fn handle_cancel(&mut self, reason: &str) {
        if self.peer_ever_present {
            warn!("Cancel ignored: remote peer has already joined this call");
            return;
        }
        if self.phase == CallPhase::Ending || self.phase.is_terminal() {
            debug!("Cancel ignored while {}", self.phase);
            return;
        }
        info!("Cancelling consultation {}", self.consultation_id);
        if let Err(error) = self
            .broker
            .report_cancel(self.consultation_id, reason)
            .await
        {
            warn!("Cancel report failed: {}", error);
        }
        self.teardown_engine().await;
        self.set_phase(CallPhase::Cancelled);
    }

    /// Command channel closed without an explicit end: the consumer went
    /// away. Same teardown as a normal end.
    async fn handle_detach(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        info!(
            "Session handle dropped, tearing down consultation {}",
            self.consultation_id
        );
        self.set_phase(CallPhase::Ending);
        self.teardown_engine().await;
        self.report_end_best_effort().await;
        self.set_phase(CallPhase::Closed);
    }

    async fn handle_toggle_audio(&mut self) {
        if self.phase != CallPhase::Connected {
            debug!("Audio toggle ignored while {}", self.phase);
            return;
        }
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        let target = !self.audio_muted;
        match self.engine.mute_local_audio(handle, target).await {
            Ok(()) => {
                self.audio_muted = target;
                self.publish();
            }
            Err(error) => warn!("Audio toggle failed: {}", error),
        }
    }

    async fn handle_toggle_video(&mut self) {
        if self.phase != CallPhase::Connected {
            debug!("Video toggle ignored while {}", self.phase);
            return;
        }
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        let target = !self.video_muted;
        match self.engine.mute_local_video(handle, target).await {
            Ok(()) => {
                self.video_muted = target;
                self.publish();
            }
            Err(error) => warn!("Video toggle failed: {}", error),
        }
    }

    async fn handle_toggle_speaker(&mut self) {
        if self.phase != CallPhase::Connected {
            debug!("Speaker toggle ignored while {}", self.phase);
            return;
        }
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        let target = !self.speaker_on;
        match self.engine.set_speakerphone(handle, target).await {
            Ok(()) => {
                self.speaker_on = target;
                self.publish();
            }
            Err(error) => warn!("Speaker toggle failed: {}", error),
        }
    }

    async fn handle_switch_camera(&mut self) {
        if self.phase != CallPhase::Connected {
            debug!("Camera switch ignored while {}", self.phase);
            return;
        }
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        if let Err(error) = self.engine.switch_camera(handle).await {
            warn!("Camera switch failed: {}", error);
        }
    }

    /// Leaves the channel and releases the engine, exactly once. Failures are
    /// logged and swallowed; the exit must finish either way.
    async fn teardown_engine(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(error) = self.engine.leave_channel(&handle).await {
                warn!("Engine leave failed: {}", error);
            }
            if let Err(error) = self.engine.release(handle).await {
                warn!("Engine release failed: {}", error);
            }
        }
    }

    /// Tells the backend the call ended, once per joined session. Failures
    /// are logged, never re-surfaced.
    async fn report_end_best_effort(&mut self) {
        if !self.join_reported {
            return;
        }
        self.join_reported = false;
        match self.broker.report_end(self.consultation_id).await {
            Ok(report) => info!("Backend confirmed call end: {}", report.message),
            Err(error) => warn!("End report failed: {}", error),
        }
    }

    fn fail(&mut self, error: VideoCallError) {
        self.failure = Some(error.to_string());
        self.set_phase(CallPhase::Failed);
    }

    fn set_phase(&mut self, phase: CallPhase) {
        if self.phase != phase {
            debug!("Call phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(CallSnapshot {
            phase: self.phase,
            remote_peer: self.remote_peer,
            audio_muted: self.audio_muted,
            video_muted: self.video_muted,
            speaker_on: self.speaker_on,
            elapsed_seconds: self.elapsed_seconds,
            failure: self.failure.clone(),
        });
    }
}
