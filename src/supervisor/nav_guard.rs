//! Usage: Navigation guard for in-view new-window / top-level navigation targets.
//!
//! Security boundary: embedded content may only navigate within the hosting
//! domains of the messaging service. Anything else is dropped and logged.

const ALLOWED_APEX_HOST: &str = "whatsapp.com";

pub(crate) fn is_allowed_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == ALLOWED_APEX_HOST || host.ends_with(".whatsapp.com")
}

pub(crate) fn is_allowed_target(raw_url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(raw_url) else {
        return false;
    };
    if parsed.scheme() != "https" {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    is_allowed_host(host)
}
