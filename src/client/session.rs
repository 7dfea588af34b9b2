use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::client::activity::{ActivityMonitor, Interaction, IDLE_CHECK_INTERVAL, IDLE_TIMEOUT};
use crate::client::api::{AuthApi, SessionUser};

struct SessionSlot {
    token: String,
    user: SessionUser,
    monitor: ActivityMonitor,
}

/// Client-held session state: the session token, the signed-in user and the
/// activity monitor, created together and torn down together.
pub struct ClientSession {
    api: Arc<dyn AuthApi>,
    slot: Mutex<Option<SessionSlot>>,
}

impl ClientSession {
    pub fn new(api: Arc<dyn AuthApi>) -> Arc<Self> {
        Arc::new(Self {
            api,
            slot: Mutex::new(None),
        })
    }

    pub async fn sign_in(self: &Arc<Self>, token: String, user: SessionUser) {
        self.sign_in_with_policy(token, user, IDLE_TIMEOUT, IDLE_CHECK_INTERVAL)
            .await
    }

    /// Store the session and start the idle watcher. Any previous session
    /// is signed out first, so at most one monitor is ever live.
    pub async fn sign_in_with_policy(
        self: &Arc<Self>,
        token: String,
        user: SessionUser,
        idle_timeout: Duration,
        check_interval: Duration,
    ) {
        self.sign_out().await;

        let weak = Arc::downgrade(self);
        let monitor = ActivityMonitor::start_with(idle_timeout, check_interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(session) = weak.upgrade() {
                    session.sign_out().await;
                }
            }
        });

        info!(user_id = %user.id, "signed in");
        *self.slot.lock().await = Some(SessionSlot {
            token,
            user,
            monitor,
        });
    }

    pub async fn is_authenticated(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub async fn current_user(&self) -> Option<SessionUser> {
        self.slot.lock().await.as_ref().map(|slot| slot.user.clone())
    }

    pub async fn record_interaction(&self, interaction: Interaction) {
        if let Some(slot) = self.slot.lock().await.as_ref() {
            slot.monitor.record_interaction(interaction);
        }
    }

    pub async fn time_until_expiry(&self) -> Option<Duration> {
        self.slot
            .lock()
            .await
            .as_ref()
            .and_then(|slot| slot.monitor.time_until_expiry())
    }

    /// Idempotent sign-out. Local state is taken out of the slot before the
    /// revocation call goes on the wire, so no reader observes authenticated
    /// state during the call, and a second sign-out finds nothing to do.
    pub async fn sign_out(&self) {
        let taken = self.slot.lock().await.take();
        let Some(slot) = taken else { return };

        slot.monitor.stop();
        if let Err(e) = self.api.logout(&slot.token).await {
            warn!(error = %e, "session revocation call failed");
        }
        info!("signed out");
    }
}
