use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "LabLink Chat";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address; override with the LABLINK_CHAT_ADDR env var.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8710";

/// Upload constraints enforced before anything is persisted.
pub const MAX_ATTACHMENTS_PER_MESSAGE: usize = 5;
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_ATTACHMENT_TYPES: [&str; 4] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "application/pdf",
];

/// Whole-request ceiling for the multipart endpoint: five maximum-size
/// parts plus form-field and boundary overhead.
pub const MAX_UPLOAD_BODY_BYTES: usize =
    MAX_ATTACHMENTS_PER_MESSAGE * MAX_ATTACHMENT_BYTES + 1024 * 1024;

/// Get the application data directory
pub fn data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("LabLinkChat")
}

/// Get the SQLite database path
pub fn database_path() -> PathBuf {
    data_dir().join("chat.db")
}

pub fn default_log_filter() -> &'static str {
    "info,lablink_chat=debug"
}
