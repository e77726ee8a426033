use tracing::warn;

use relaydir_db::models::access_log::NewAccessLogEntry;
use relaydir_db::repositories::access_log_repo::AccessLogRepository;
use relaydir_db::repositories::credential_repo::CredentialRepository;

/// Fire-and-forget audit trail. A logging failure must never fail or delay
/// the request it describes, so everything runs on a detached task and
/// errors only reach the log output.
#[derive(Debug, Clone)]
pub struct AccessLogger {
    access_log: AccessLogRepository,
    credentials: CredentialRepository,
}

impl AccessLogger {
    pub fn new(access_log: AccessLogRepository, credentials: CredentialRepository) -> Self {
        Self {
            access_log,
            credentials,
        }
    }

    pub fn log(&self, entry: NewAccessLogEntry) {
        let access_log = self.access_log.clone();
        let credentials = self.credentials.clone();
        tokio::spawn(async move {
            if let Err(e) = access_log.insert(&entry).await {
                warn!("Failed to write access log entry: {e:#}");
                return;
            }
            if let Some(credential_id) = entry.credential_id {
                if let Err(e) = credentials.touch_last_used(credential_id).await {
                    warn!("Failed to touch credential {credential_id}: {e:#}");
                }
            }
        });
    }
}
