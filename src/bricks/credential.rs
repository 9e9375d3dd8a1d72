use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::client::BricksError;

const TOKEN_FILE: &str = "credentials";

/// Persists the data-access token under the data directory so later runs can
/// reuse it. Overwrites any previous token.
pub fn save_token(data_dir: &Path, token: &str) -> Result<PathBuf, BricksError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(BricksError::Credential(
            "access token must not be empty".to_string(),
        ));
    }

    fs::create_dir_all(data_dir)?;
    let path = data_dir.join(TOKEN_FILE);
    fs::write(&path, token)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    info!("access token saved to {}", path.display());
    Ok(path)
}

/// Token saved by a previous `save_token`, if any.
pub fn load_token(data_dir: &Path) -> Result<Option<String>, BricksError> {
    let path = data_dir.join(TOKEN_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let token = fs::read_to_string(&path)?.trim().to_string();
    Ok((!token.is_empty()).then_some(token))
}
