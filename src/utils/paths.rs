use std::env;
use std::path::PathBuf;

// =============================================================================
// Core Path Functions
// =============================================================================

/// Get user home directory
/// NEVER use "~" as Rust's std::fs does not expand it
pub fn get_home_dir() -> Result<PathBuf, String> {
    dirs::home_dir().ok_or_else(|| "Could not determine home directory".to_string())
}

/// Get judge root directory
/// Priority:
/// 1. JUDGE_ROOT environment variable
/// 2. Fallback: $HOME/.judge
pub fn get_judge_root() -> Result<PathBuf, String> {
    if let Ok(root) = env::var("JUDGE_ROOT") {
        return Ok(PathBuf::from(root));
    }
    Ok(get_home_dir()?.join(".judge"))
}

/// Get default data directory
/// Returns: <judge_root>/data
pub fn get_data_dir() -> Result<PathBuf, String> {
    Ok(get_judge_root()?.join("data"))
}

/// Get default server configuration file
/// Returns: <judge_root>/server.yaml
pub fn get_config_path() -> Result<PathBuf, String> {
    Ok(get_judge_root()?.join("server.yaml"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_do_not_use_tilde() {
        if let Ok(data) = get_data_dir() {
            assert!(!data.to_string_lossy().contains('~'));
            assert!(data.ends_with("data"));
        }
    }

    #[test]
    fn test_config_lives_under_root() {
        if let (Ok(root), Ok(config)) = (get_judge_root(), get_config_path()) {
            assert!(config.starts_with(&root));
        }
    }
}
