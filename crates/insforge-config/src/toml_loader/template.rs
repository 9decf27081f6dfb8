/// Default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# InsForge client configuration
# Only override what you want to change -- missing fields use defaults.

base_url = "http://localhost:7130"
# anon_key = "..."        # used as the socket token when signed out

[realtime]
# path = "/socket.io/"
# ack_timeout_ms = 10000        # 100-120000
# connect_timeout_secs = 15     # 1-120
# reconnect = true
# reconnect_delay_secs = 1
# max_reconnect_delay_secs = 30  # 1-3600, >= reconnect_delay_secs

[logging]
# level = "INFO"          # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
