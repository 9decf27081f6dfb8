//! Validation for the backend URL and the `[realtime]` section.

use crate::schema::InsforgeConfig;

use super::helpers::validate_range;

const URL_SCHEMES: &[&str] = &["http://", "https://", "ws://", "wss://"];

pub(crate) fn validate_base_url(errors: &mut Vec<String>, config: &InsforgeConfig) {
    let url = config.base_url.trim();
    if url.is_empty() {
        errors.push("base_url must not be empty".into());
        return;
    }
    if !URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        errors.push(format!(
            "base_url = {url} must start with one of {}",
            URL_SCHEMES.join(", ")
        ));
    }
}

pub(crate) fn validate_realtime(errors: &mut Vec<String>, config: &InsforgeConfig) {
    let rt = &config.realtime;

    if !rt.path.starts_with('/') {
        errors.push(format!("realtime.path = {} must start with '/'", rt.path));
    }
    validate_range(errors, "realtime.ack_timeout_ms", rt.ack_timeout_ms, 100, 120_000);
    validate_range(
        errors,
        "realtime.connect_timeout_secs",
        rt.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "realtime.reconnect_delay_secs",
        rt.reconnect_delay_secs,
        1,
        300,
    );
    validate_range(
        errors,
        "realtime.max_reconnect_delay_secs",
        rt.max_reconnect_delay_secs,
        1,
        3600,
    );
    if rt.max_reconnect_delay_secs < rt.reconnect_delay_secs {
        errors.push(format!(
            "realtime.max_reconnect_delay_secs = {} is below realtime.reconnect_delay_secs = {}",
            rt.max_reconnect_delay_secs, rt.reconnect_delay_secs
        ));
    }
}
