use chrono::Local;
use facewatch_core::{
    FrameSource, IdentitySummary, Session, SessionError, SessionStatus, TickOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("session task exited")]
    ChannelClosed,
}

/// Messages sent from D-Bus handlers to the session task.
enum SessionRequest {
    SetUploadInterval {
        seconds: u64,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SetRecognitionInterval {
        seconds: u64,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    ListIdentities {
        reply: oneshot::Sender<Vec<IdentitySummary>>,
    },
    ClearGallery {
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    Shutdown,
}

/// Clone-safe handle to the session task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn set_upload_interval(&self, seconds: u64) -> Result<(), EngineError> {
        self.request(|reply| SessionRequest::SetUploadInterval { seconds, reply })
            .await??;
        Ok(())
    }

    pub async fn set_recognition_interval(&self, seconds: u64) -> Result<(), EngineError> {
        self.request(|reply| SessionRequest::SetRecognitionInterval { seconds, reply })
            .await??;
        Ok(())
    }

    pub async fn status(&self) -> Result<SessionStatus, EngineError> {
        self.request(|reply| SessionRequest::Status { reply }).await
    }

    pub async fn identities(&self) -> Result<Vec<IdentitySummary>, EngineError> {
        self.request(|reply| SessionRequest::ListIdentities { reply })
            .await
    }

    /// Returns the number of identities removed.
    pub async fn clear_gallery(&self) -> Result<usize, EngineError> {
        Ok(self
            .request(|reply| SessionRequest::ClearGallery { reply })
            .await??)
    }

    /// Stop the session after the tick in progress. A task that already
    /// exited is not an error.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionRequest::Shutdown).await;
    }
}

/// Spawn the session on its own tokio task.
///
/// Every `tick` a frame is grabbed and fed to the session. A tick and its
/// recognition pass run to completion before the next tick or any control
/// request is handled; ticks that fall due meanwhile are skipped, not queued.
pub fn spawn_session(
    mut session: Session,
    source: Arc<dyn FrameSource>,
    tick: Duration,
) -> (SessionHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<SessionRequest>(8);

    let task = tokio::spawn(async move {
        tracing::info!(tick_ms = tick.as_millis() as u64, "session task started");
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => run_tick(&mut session, source.as_ref()).await,
                req = rx.recv() => match req {
                    Some(SessionRequest::Shutdown) | None => break,
                    Some(req) => handle_request(&mut session, req).await,
                },
            }
        }
        tracing::info!("session task exiting");
    });

    (SessionHandle { tx }, task)
}

async fn run_tick(session: &mut Session, source: &dyn FrameSource) {
    let frame = match source.grab().await {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "frame grab failed");
            return;
        }
    };

    match session.tick(&frame, Local::now()).await {
        TickOutcome::Recognized(resolution) => {
            tracing::debug!(seq = frame.sequence, ?resolution, "tick");
        }
        TickOutcome::NoFace { lost_emitted: true } => {
            tracing::debug!(seq = frame.sequence, "face left the frame");
        }
        _ => {}
    }
}

async fn handle_request(session: &mut Session, req: SessionRequest) {
    match req {
        SessionRequest::SetUploadInterval { seconds, reply } => {
            let _ = reply.send(session.set_upload_interval(seconds));
        }
        SessionRequest::SetRecognitionInterval { seconds, reply } => {
            let _ = reply.send(session.set_recognition_interval(seconds));
        }
        SessionRequest::Status { reply } => {
            let _ = reply.send(session.status());
        }
        SessionRequest::ListIdentities { reply } => {
            let _ = reply.send(session.identities());
        }
        SessionRequest::ClearGallery { reply } => {
            let _ = reply.send(session.clear_gallery().await);
        }
        // Handled by the task loop.
        SessionRequest::Shutdown => {}
    }
}
