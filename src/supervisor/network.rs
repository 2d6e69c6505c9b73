//! Usage: Process-wide connectivity state + restoration probe helpers.

use std::time::Duration;

pub(crate) const CONNECTIVITY_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Online/offline as reported by platform connectivity events. Consulted,
/// never owned, by the recovery policy.
#[derive(Debug)]
pub(crate) struct NetworkTracker {
    online: bool,
}

impl Default for NetworkTracker {
    fn default() -> Self {
        // Assume online until the platform says otherwise.
        Self { online: true }
    }
}

impl NetworkTracker {
    pub(crate) fn is_online(&self) -> bool {
        self.online
    }

    /// Returns true when the state actually transitioned.
    pub(crate) fn set_online(&mut self, online: bool) -> bool {
        if self.online == online {
            return false;
        }
        self.online = online;
        true
    }
}

/// Debounce probe before acting on an `online` transition: a HEAD against the
/// hosted service, falling back to GET for servers that reject HEAD.
pub(crate) async fn confirm_online(
    client: &reqwest::Client,
    probe_url: &str,
    timeout: Duration,
) -> bool {
    let probe_url = probe_url.trim();
    if probe_url.is_empty() {
        return false;
    }

    let Ok(parsed) = reqwest::Url::parse(probe_url) else {
        tracing::warn!(url = %probe_url, "连通性探测地址无效，跳过探测");
        return false;
    };

    if client
        .head(parsed.clone())
        .timeout(timeout)
        .send()
        .await
        .is_ok()
    {
        return true;
    }

    client.get(parsed).timeout(timeout).send().await.is_ok()
}
