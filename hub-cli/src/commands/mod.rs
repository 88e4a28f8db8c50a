mod backup;
mod logs;
mod status;

// Status commands
pub use status::{run_status, show_client_version};

// Backup commands
pub use backup::run_backup_command;

// Logs commands
pub use logs::run_logs_command;
