//! Test fixtures and sample data
//!
//! Provides pre-built config templates and remote command outputs.

use crate::CommandResult;

/// Minimal valid config TOML template
///
/// `{backup_dir}` must be replaced with an existing directory.
pub fn minimal_config_toml() -> &'static str {
    r#"
[schedule]
iteration_seconds = 3600
error_iteration_seconds = 300

[server]
host = "mc.example.org"
user = "minecraft"
directory = "/srv/minecraft"

[backup]
directory = "{backup_dir}"
allowed_gigabytes = 10.0
warning_ratio = 0.8
"#
}

/// Config with hooks, mentions and password authentication
pub fn full_config_toml() -> &'static str {
    r#"
[schedule]
iteration_seconds = 21600
error_iteration_seconds = 600
command_timeout_seconds = 900

[notifications]
webhook = "https://discord.com/api/webhooks/1/abc"
warning_mentions = [{ id = "123" }]
error_mentions = [{ id = "456", is_role = true }, { id = "789" }]

[server]
host = "mc.example.org"
port = 2222
user = "minecraft"
auth = "password"
password = "hunter2"
directory = "/srv/minecraft"
target = "world_nether"
archive_prefix = "nether"
pre_save_command = "screen -S mc -X stuff 'save-off\n'"
post_save_command = "screen -S mc -X stuff 'save-on\n'"

[backup]
directory = "{backup_dir}"
allowed_gigabytes = 50.0
warning_ratio = 0.9

[logging]
level = "debug"
max_files = 3
"#
}

/// Render a template against a backup directory
pub fn render_config(template: &str, backup_dir: &std::path::Path) -> String {
    template.replace("{backup_dir}", &backup_dir.display().to_string())
}

/// Typical `ls -la` output of a server directory
pub fn directory_listing() -> CommandResult {
    CommandResult::ok(
        "total 24\n\
         drwxr-xr-x 5 minecraft minecraft 4096 Mar  9 07:00 .\n\
         drwxr-xr-x 3 root      root      4096 Jan  1 00:00 ..\n\
         -rw-r--r-- 1 minecraft minecraft 1024 Mar  9 07:00 server.properties\n\
         drwxr-xr-x 8 minecraft minecraft 4096 Mar  9 07:05 world\n",
    )
}

/// `cd` into a directory that does not exist
pub fn missing_directory(dir: &str) -> CommandResult {
    CommandResult::failed(format!("bash: line 1: cd: {}: No such file or directory\n", dir))
}

/// tar complaining about the target
pub fn tar_failure() -> CommandResult {
    CommandResult::failed("tar: world: Cannot stat: No such file or directory\ntar: Exiting with failure status due to previous errors\n")
}
