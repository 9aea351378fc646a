//! `.adfilter` config file loader for the CLI binary (SPEC_FULL.md §6).
//!
//! Mirrors `fop`'s `load_config`/`parse_bool`/`parse_list` trio: a flat
//! `key = value` file, `#`-prefixed comments, command-line arguments take
//! precedence over whatever is found here.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")).map(PathBuf::from)
}

/// Load `.adfilter` from `custom_path`, or else `./.adfilter`, or else
/// `~/.adfilter`. Returns the parsed key/value map and the path actually
/// used (for `--show-config` style diagnostics).
pub fn load_config(custom_path: Option<&PathBuf>) -> (HashMap<String, String>, Option<PathBuf>) {
    let mut config = HashMap::with_capacity(8);

    let config_path: Option<PathBuf> = if let Some(path) = custom_path {
        if path.exists() {
            Some(path.clone())
        } else {
            eprintln!("Warning: config file not found: {}", path.display());
            None
        }
    } else {
        let candidates = [PathBuf::from(".adfilter"), home_dir().map(|h| h.join(".adfilter")).unwrap_or_default()];
        candidates.into_iter().find(|p| p.exists())
    };

    if let Some(path) = config_path.as_ref() {
        if let Ok(content) = fs::read_to_string(path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some(eq_pos) = line.find('=') {
                    let key = line[..eq_pos].trim().to_string();
                    let value = line[eq_pos + 1..].trim().to_string();
                    config.insert(key, value);
                }
            }
        }
    }

    (config, config_path)
}

pub fn parse_bool(config: &HashMap<String, String>, key: &str, default: bool) -> bool {
    config
        .get(key)
        .map(|v| {
            let v = v.trim();
            v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
        })
        .unwrap_or(default)
}

pub fn parse_usize(config: &HashMap<String, String>, key: &str, default: usize) -> usize {
    config.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub fn parse_string(config: &HashMap<String, String>, key: &str) -> Option<String> {
    config.get(key).map(|v| v.trim().to_string())
}
