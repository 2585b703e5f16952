use crate::error::{GhprsError, Result};

/// Environment variables checked, in order, when the config has no token.
const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Try to run a CLI command and capture stdout as a token
fn try_cli_token(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

fn env_token() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

/// Picks the token to authenticate with:
/// 1. the token from the configuration file
/// 2. `GITHUB_TOKEN`, then `GH_TOKEN`
/// 3. `gh auth token`
pub fn resolve_token(configured: Option<String>) -> Result<String> {
    resolve_with(configured, env_token, || {
        try_cli_token("gh", &["auth", "token"])
    })
}

fn resolve_with(
    configured: Option<String>,
    from_env: impl FnOnce() -> Option<String>,
    from_cli: impl FnOnce() -> Option<String>,
) -> Result<String> {
    configured
        .or_else(from_env)
        .or_else(from_cli)
        .ok_or_else(|| {
            GhprsError::Auth(
                "configuration file is missing token and neither GITHUB_TOKEN nor `gh auth token` provided one"
                    .to_string(),
            )
        })
}
