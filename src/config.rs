//! Startup configuration read from environment variables.

use crate::pagination::DEFAULT_PAGE_SIZE_OPTIONS;
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub log_level: Level,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log_level: Level::INFO,
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
        }
    }
}

impl Config {
    /// Optional:
    /// - `SCHOOLD_WORKSPACE`: workspace opened at startup
    /// - `SCHOOLD_LOG`: `error`, `warn`, `info` (default), `debug` or `trace`
    /// - `SCHOOLD_PAGE_SIZE`: default rows per page, default 10
    /// - `SCHOOLD_PAGE_SIZE_OPTIONS`: comma list, default `10,25,50,100`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let workspace = get("SCHOOLD_WORKSPACE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let log_level = get("SCHOOLD_LOG")
            .and_then(|v| v.trim().parse::<Level>().ok())
            .unwrap_or(defaults.log_level);
        let page_size = get("SCHOOLD_PAGE_SIZE")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.page_size);
        let page_size_options = get("SCHOOLD_PAGE_SIZE_OPTIONS")
            .map(|v| parse_size_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.page_size_options);

        Self {
            workspace,
            log_level,
            page_size,
            page_size_options,
        }
    }
}

fn parse_size_list(raw: &str) -> Vec<usize> {
    let mut sizes: Vec<usize> = raw
        .split(',')
        .filter_map(|p| p.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .collect();
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn values_are_parsed_and_bad_ones_ignored() {
        let cfg = Config::from_lookup(lookup(&[
            ("SCHOOLD_WORKSPACE", "/tmp/school"),
            ("SCHOOLD_LOG", "debug"),
            ("SCHOOLD_PAGE_SIZE", "0"),
            ("SCHOOLD_PAGE_SIZE_OPTIONS", "50, 5,x,5,20"),
        ]));
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/school")));
        assert_eq!(cfg.log_level, Level::DEBUG);
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.page_size_options, vec![5, 20, 50]);
    }
}
