//! Declarative configuration: loading, schema checks, semantic checks.
//!
//! The TOML is walked by hand rather than through a derive because every
//! message below is part of the CLI contract, down to how offending values
//! render, and because unknown fields must *warn* instead of failing.
//!
//! # File format
//!
//! ```toml
//! target-location = "/mnt/backups/{TODAY}"
//! exclude         = ["*.o", "cache"]
//! rsync-options   = ["--one-file-system"]
//!
//! [backup-folders]
//! "/home/alice"            = {}
//! "nas:/srv/media"         = { target = "media", exclude = ["*.iso"] }
//! "{TOML_FOLDER}/projects" = { target = "projects", chmod = "755" }
//! ```
//!
//! `{TOML_FOLDER}` resolves here, to the directory holding the config file;
//! `{TODAY}` and `{LATEST}` stay in the template until the orchestrator
//! knows the date they stand for.

use std::io::Write;
use std::path::{Path, PathBuf};

use toml::Value;

use crate::endpoint::Endpoint;
use crate::errors::{BlueError, errno_detail_path};

/// Run mode, inferred from the placeholders in `target-location`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `{TODAY}` target: one new dated snapshot per run.
    Snapshot,
    /// `{LATEST}` target: mirror the newest snapshot off-site.
    Offsite,
    /// Plain target: refresh flat sub-targets, no date wrapper.
    Collect,
}

/// One `[backup-folders]` entry, validated and resolved.
#[derive(Debug)]
pub struct FolderRule {
    /// The source string exactly as written in the config.
    pub key: String,
    /// Source endpoint with `{TOML_FOLDER}` resolved.
    pub source: Endpoint,
    pub target: Option<String>,
    /// Directory name under the snapshot: `target` or the source basename.
    pub sub_target: String,
    pub exclude: Vec<String>,
    pub rsync_options: Vec<String>,
    pub chown: Option<String>,
    pub chmod: Option<String>,
}

#[derive(Debug)]
pub struct Config {
    pub file: PathBuf,
    /// Directory containing the config file; value of `{TOML_FOLDER}`.
    pub dir: PathBuf,
    /// Target endpoint with `{TOML_FOLDER}` resolved.
    pub target: Endpoint,
    pub exclude: Vec<String>,
    pub rsync_options: Vec<String>,
    pub folders: Vec<FolderRule>,
    pub mode: Mode,
}

const TOP_LEVEL_FIELDS: [&str; 4] = [
    "target-location",
    "exclude",
    "rsync-options",
    "backup-folders",
];
const FOLDER_FIELDS: [&str; 5] = ["target", "exclude", "rsync-options", "chown", "chmod"];

/// Load and validate the configuration at `path`.
///
/// Unknown fields are reported to `warn` and ignored; everything else in
/// here is fatal.  `first_time` is needed because collect mode rejects it.
pub fn load(path: &Path, first_time: bool, warn: &mut dyn Write) -> Result<Config, BlueError> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        BlueError::Config(format!(
            "Failed to read '{}': {}",
            path.display(),
            errno_detail_path(&err, path.display())
        ))
    })?;

    let table: toml::Table = text.parse().map_err(|err: toml::de::Error| {
        BlueError::Config(format!(
            "Failed to parse '{}': {}",
            path.display(),
            err.message()
        ))
    })?;

    let dir = path
        .canonicalize()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    validate(path, &dir, &table, first_time, warn)
}

fn validate(
    file: &Path,
    dir: &Path,
    table: &toml::Table,
    first_time: bool,
    warn: &mut dyn Write,
) -> Result<Config, BlueError> {
    let cfg_err = BlueError::Config;

    for key in table.keys() {
        if !TOP_LEVEL_FIELDS.contains(&key.as_str()) {
            let _ = writeln!(warn, "Unknown field in '{}': '{}'", file.display(), key);
        }
    }

    // ── Schema ────────────────────────────────────────────────────────────
    let file_scope = file.display().to_string();

    let target_raw = match table.get("target-location") {
        None => {
            return Err(cfg_err(format!(
                "Missing string 'target-location' in {}",
                file.display()
            )));
        }
        Some(Value::String(s)) => s.clone(),
        Some(value) => {
            return Err(cfg_err(format!(
                "Expected string for 'target-location' in {} got: {}",
                file.display(),
                display_value(value)
            )));
        }
    };

    let exclude = optional_string_array(table.get("exclude"), "exclude", &file_scope)?;
    let rsync_options =
        optional_string_array(table.get("rsync-options"), "rsync-options", &file_scope)?;

    let folders_table = match table.get("backup-folders") {
        None => {
            return Err(cfg_err(format!(
                "Missing table 'backup-folders' in {}",
                file.display()
            )));
        }
        Some(Value::Table(folders)) => folders,
        Some(value) => {
            return Err(cfg_err(format!(
                "Expected table for 'backup-folders' in {} got: {}",
                file.display(),
                display_value(value)
            )));
        }
    };

    let toml_folder = dir.to_string_lossy();
    let vars = [("TOML_FOLDER", toml_folder.as_ref())];
    let target = Endpoint::parse(&target_raw).resolve(&vars);

    let mut folders = Vec::new();
    for (key, value) in folders_table {
        let info = match value {
            Value::Table(info) => info,
            value => {
                return Err(cfg_err(format!(
                    "Expected table for '{key}' in backup-folders got: {}",
                    display_value(value)
                )));
            }
        };
        for field in info.keys() {
            if !FOLDER_FIELDS.contains(&field.as_str()) {
                let _ = writeln!(warn, "Unknown field for '{key}': '{field}'");
            }
        }

        let rule_target = optional_string(info.get("target"), "target", key)?;
        let rule_exclude = optional_string_array(info.get("exclude"), "exclude", key)?;
        let rule_options = optional_string_array(info.get("rsync-options"), "rsync-options", key)?;
        let chown = optional_string(info.get("chown"), "chown", key)?;
        let chmod = optional_string(info.get("chmod"), "chmod", key)?;

        let source = Endpoint::parse(key).resolve(&vars);
        let sub_target = match &rule_target {
            Some(target) => target.clone(),
            None => source_basename(&source),
        };

        folders.push(FolderRule {
            key: key.clone(),
            source,
            target: rule_target,
            sub_target,
            exclude: rule_exclude,
            rsync_options: rule_options,
            chown,
            chmod,
        });
    }

    // ── Semantics ─────────────────────────────────────────────────────────
    if !target.is_absolute() {
        return Err(cfg_err(format!(
            "Target location '{target_raw}' must be absolute path."
        )));
    }

    if folders.is_empty() {
        return Err(cfg_err(format!("No backup folders in {}", file.display())));
    }

    for rule in &folders {
        if !rule.source.is_absolute() {
            return Err(cfg_err(format!(
                "Source location '{}' must be absolute path.",
                rule.key
            )));
        }
        if rule.source.is_remote() && rule.target.is_none() {
            return Err(cfg_err(format!(
                "Remote source '{}' requires a target path.",
                rule.key
            )));
        }
        if rule.key.contains("{TOML_FOLDER}") && rule.target.is_none() {
            return Err(cfg_err(format!(
                "Source with TOML_FOLDER '{}' requires a target path.",
                rule.key
            )));
        }
        if rule.source.is_remote() && target.is_remote() {
            return Err(cfg_err(format!(
                "Source '{}' and target cannot both be remote.",
                rule.key
            )));
        }
    }

    for (idx, first) in folders.iter().enumerate() {
        for second in &folders[idx + 1..] {
            let a = claimed_target(first);
            let b = claimed_target(second);
            if !a.is_empty() && !b.is_empty() && (path_prefix(a, b) || path_prefix(b, a)) {
                return Err(cfg_err(format!(
                    "Target folder of '{}' overlaps with target folder of '{}'.",
                    first.key, second.key
                )));
            }
        }
    }

    // ── Mode ──────────────────────────────────────────────────────────────
    let mode = match (target.contains_key("TODAY"), target.contains_key("LATEST")) {
        (true, true) => {
            return Err(cfg_err(
                "Target location cannot contain both {TODAY} and {LATEST}.".to_owned(),
            ));
        }
        (true, false) => Mode::Snapshot,
        (false, true) => {
            if folders.len() != 1 {
                return Err(cfg_err(
                    "Only one backup folder allowed in offsite mode.".to_owned(),
                ));
            }
            let rule = &folders[0];
            if !rule.source.contains_key("LATEST") {
                return Err(cfg_err(
                    "Missing backup folder with {LATEST} field in offsite mode.".to_owned(),
                ));
            }
            if rule.target.as_deref() != Some("") {
                return Err(cfg_err(
                    "Backup folder target must be empty (target='') in offsite mode.".to_owned(),
                ));
            }
            Mode::Offsite
        }
        (false, false) => {
            if first_time {
                return Err(cfg_err(
                    "--first-time cannot be specified in collect mode.".to_owned(),
                ));
            }
            for rule in &folders {
                if rule.source.contains_key("LATEST") {
                    return Err(cfg_err(format!(
                        "Source '{}' cannot contain {{LATEST}} in collect mode.",
                        rule.key
                    )));
                }
                if rule.target.as_deref().unwrap_or("").is_empty() {
                    return Err(cfg_err(format!(
                        "Source '{}' requires a target path in collect mode.",
                        rule.key
                    )));
                }
            }
            Mode::Collect
        }
    };

    Ok(Config {
        file: file.to_path_buf(),
        dir: dir.to_path_buf(),
        target,
        exclude,
        rsync_options,
        folders,
        mode,
    })
}

/// Render an offending value for an error message: strings bare, everything
/// else in TOML notation.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn optional_string(
    value: Option<&Value>,
    field: &str,
    scope: &str,
) -> Result<Option<String>, BlueError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(value) => Err(BlueError::Config(format!(
            "Expected string for '{field}' in {scope} got: {}",
            display_value(value)
        ))),
    }
}

fn optional_string_array(
    value: Option<&Value>,
    field: &str,
    scope: &str,
) -> Result<Vec<String>, BlueError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let err = || {
        BlueError::Config(format!(
            "Expected array of strings for '{field}' in {scope} got: {}",
            display_value(value)
        ))
    };
    let array = value.as_array().ok_or_else(err)?;
    array
        .iter()
        .map(|item| item.as_str().map(str::to_owned).ok_or_else(err))
        .collect()
}

fn source_basename(source: &Endpoint) -> String {
    Path::new(source.local_path().trim_end_matches('/'))
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The destination path a rule lays claim to: its explicit target, or the
/// resolved source path when the basename convention applies.
fn claimed_target(rule: &FolderRule) -> &str {
    match rule.target.as_deref() {
        Some(target) if !target.is_empty() => target,
        _ => rule.source.local_path(),
    }
}

fn path_prefix(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("blue.toml");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn load_ok(path: &Path) -> (Config, String) {
        let mut warn = Vec::new();
        let config = load(path, false, &mut warn).expect("config should load");
        (config, String::from_utf8(warn).unwrap())
    }

    fn load_err(path: &Path, first_time: bool) -> String {
        let mut warn = Vec::new();
        load(path, first_time, &mut warn)
            .expect_err("config should be rejected")
            .to_string()
    }

    #[test]
    fn unknown_fields_warn_but_do_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             no-such-field=3\n\
             [backup-folders]\n\
             '{TOML_FOLDER}'={target='target', not-this-either=3}\n",
        );
        let (config, warnings) = load_ok(&path);
        assert_eq!(config.mode, Mode::Snapshot);
        assert_eq!(
            warnings,
            format!(
                "Unknown field in '{}': 'no-such-field'\n\
                 Unknown field for '{{TOML_FOLDER}}': 'not-this-either'\n",
                path.display()
            )
        );
    }

    #[test]
    fn source_without_target_uses_basename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("backup-source")).unwrap();
        let canon = dir.path().canonicalize().unwrap();
        let path = write_config(
            dir.path(),
            &format!(
                "target-location='{{TOML_FOLDER}}/backup-target/{{TODAY}}'\n\
                 [backup-folders]\n\
                 '{}/backup-source'={{}}\n",
                canon.display()
            ),
        );
        let (config, warnings) = load_ok(&path);
        assert_eq!(warnings, "");
        assert_eq!(config.folders[0].sub_target, "backup-source");
    }

    #[test]
    fn explicit_target_wins_over_basename() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/backup-target/{TODAY}'\n\
             [backup-folders]\n\
             '{TOML_FOLDER}/backup-source'={target='src'}\n",
        );
        let (config, _) = load_ok(&path);
        assert_eq!(config.folders[0].sub_target, "src");
    }

    #[test]
    fn missing_target_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        assert_eq!(
            load_err(&path, false),
            format!("Missing string 'target-location' in {}", path.display())
        );
    }

    #[test]
    fn target_location_not_a_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "target-location=['{TOML_FOLDER}/{TODAY}']\n");
        assert_eq!(
            load_err(&path, false),
            format!(
                "Expected string for 'target-location' in {} got: [\"{{TOML_FOLDER}}/{{TODAY}}\"]",
                path.display()
            )
        );
    }

    #[test]
    fn missing_backup_folders() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "target-location='{TOML_FOLDER}/{TODAY}'\n");
        assert_eq!(
            load_err(&path, false),
            format!("Missing table 'backup-folders' in {}", path.display())
        );
    }

    #[test]
    fn backup_folders_not_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\nbackup-folders=3\n",
        );
        assert_eq!(
            load_err(&path, false),
            format!(
                "Expected table for 'backup-folders' in {} got: 3",
                path.display()
            )
        );
    }

    #[test]
    fn global_exclude_not_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             exclude='exclude-me'\n\
             [backup-folders]\n",
        );
        assert_eq!(
            load_err(&path, false),
            format!(
                "Expected array of strings for 'exclude' in {} got: exclude-me",
                path.display()
            )
        );
    }

    #[test]
    fn global_rsync_options_not_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             rsync-options='--my-rsync-option'\n\
             [backup-folders]\n",
        );
        assert_eq!(
            load_err(&path, false),
            format!(
                "Expected array of strings for 'rsync-options' in {} got: --my-rsync-option",
                path.display()
            )
        );
    }

    #[test]
    fn folder_info_not_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             '/to_backup'=3\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Expected table for '/to_backup' in backup-folders got: 3"
        );
    }

    #[test]
    fn folder_exclude_not_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             '/my-folder'={exclude='exclude-me'}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Expected array of strings for 'exclude' in /my-folder got: exclude-me"
        );
    }

    #[test]
    fn folder_rsync_options_not_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             '/my-folder'={rsync-options='--my-rsync-option'}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Expected array of strings for 'rsync-options' in /my-folder got: --my-rsync-option"
        );
    }

    #[test]
    fn remote_source_requires_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location = '{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             '127.0.0.1:/my-folder' = {}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Remote source '127.0.0.1:/my-folder' requires a target path."
        );
    }

    #[test]
    fn toml_folder_source_requires_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location = '{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             '{TOML_FOLDER}' = {}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Source with TOML_FOLDER '{TOML_FOLDER}' requires a target path."
        );
    }

    #[test]
    fn relative_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='.'\n\
             [backup-folders]\n\
             '{TOML_FOLDER}'={target='target'}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Target location '.' must be absolute path."
        );
    }

    #[test]
    fn relative_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             'host:bla-bla-bla'={target='bla'}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Source location 'host:bla-bla-bla' must be absolute path."
        );
    }

    #[test]
    fn both_remote_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='nas:/backups/{TODAY}'\n\
             [backup-folders]\n\
             '127.0.0.1:/my-folder'={target='folder'}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Source '127.0.0.1:/my-folder' and target cannot both be remote."
        );
    }

    #[test]
    fn overlapping_sources_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location = '{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             '/home' = {}\n\
             '/home/user' = {}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Target folder of '/home' overlaps with target folder of '/home/user'."
        );
    }

    #[test]
    fn overlapping_explicit_targets_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location = '{TOML_FOLDER}/{TODAY}'\n\
             [backup-folders]\n\
             '/a' = {target='data'}\n\
             '/b' = {target='data/sub'}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Target folder of '/a' overlaps with target folder of '/b'."
        );
    }

    #[test]
    fn failed_read_reports_errno() {
        use std::os::unix::fs::PermissionsExt;

        if rustix::process::geteuid().is_root() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        assert_eq!(
            load_err(&path, false),
            format!(
                "Failed to read '{p}': [Errno 13] Permission denied: '{p}'",
                p = path.display()
            )
        );
    }

    // ── Offsite mode ──────────────────────────────────────────────────────

    #[test]
    fn offsite_allows_only_one_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/offsite/{LATEST}'\n\
             [backup-folders]\n\
             '{TOML_FOLDER}/target-1/{LATEST}' = { target = '1' }\n\
             '{TOML_FOLDER}/target-2/{LATEST}' = { target = '2' }\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Only one backup folder allowed in offsite mode."
        );
    }

    #[test]
    fn offsite_requires_latest_in_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/offsite/{LATEST}'\n\
             [backup-folders]\n\
             '{TOML_FOLDER}/target' = {target=''}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Missing backup folder with {LATEST} field in offsite mode."
        );
    }

    #[test]
    fn offsite_requires_empty_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/offsite/{LATEST}'\n\
             [backup-folders]\n\
             '{TOML_FOLDER}/target/{LATEST}' = { target = 'target' }\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Backup folder target must be empty (target='') in offsite mode."
        );
    }

    #[test]
    fn offsite_mode_is_inferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/offsite/{LATEST}'\n\
             [backup-folders]\n\
             '{TOML_FOLDER}/target/{LATEST}' = { target = '' }\n",
        );
        let (config, _) = load_ok(&path);
        assert_eq!(config.mode, Mode::Offsite);
    }

    // ── Collect mode ──────────────────────────────────────────────────────

    #[test]
    fn collect_mode_rejects_first_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/collected'\n\
             [backup-folders]\n\
             '/data'={target='data'}\n",
        );
        assert_eq!(
            load_err(&path, true),
            "--first-time cannot be specified in collect mode."
        );
    }

    #[test]
    fn collect_mode_requires_explicit_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/collected'\n\
             [backup-folders]\n\
             '/data'={}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Source '/data' requires a target path in collect mode."
        );
    }

    #[test]
    fn ambiguous_placeholders_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='/backups/{TODAY}/{LATEST}'\n\
             [backup-folders]\n\
             '/data'={target='data'}\n",
        );
        assert_eq!(
            load_err(&path, false),
            "Target location cannot contain both {TODAY} and {LATEST}."
        );
    }

    #[test]
    fn global_and_rule_options_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "target-location='{TOML_FOLDER}/{TODAY}'\n\
             exclude=['*.o']\n\
             rsync-options=['--one-file-system']\n\
             [backup-folders]\n\
             '/data'={exclude=['cache'], rsync-options=['--sparse'], chown='0:0', chmod='755'}\n",
        );
        let (config, _) = load_ok(&path);
        assert_eq!(config.exclude, vec!["*.o"]);
        assert_eq!(config.rsync_options, vec!["--one-file-system"]);
        let rule = &config.folders[0];
        assert_eq!(rule.exclude, vec!["cache"]);
        assert_eq!(rule.rsync_options, vec!["--sparse"]);
        assert_eq!(rule.chown.as_deref(), Some("0:0"));
        assert_eq!(rule.chmod.as_deref(), Some("755"));
    }
}
