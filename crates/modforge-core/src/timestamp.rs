use std::path::Path;
use std::process::Command;

pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    #[error("failed to run git in '{dir}': {source}")]
    Spawn {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git log failed with {status}: {stderr}")]
    GitFailed { status: String, stderr: String },
    #[error("invalid commit timestamp '{value}'")]
    Invalid { value: String },
}

/// Where the pinned build time came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampSource {
    Explicit,
    SourceDateEpoch,
    Git,
}

/// Resolves the single timestamp every self-owned archive entry is pinned to.
///
/// Precedence: `explicit`, then `SOURCE_DATE_EPOCH`, then the committer time
/// of `HEAD`. The wall clock is never consulted.
pub fn resolve_timestamp(
    project_dir: &Path,
    explicit: Option<u64>,
) -> Result<(u64, TimestampSource), TimestampError> {
    let env_value = std::env::var(SOURCE_DATE_EPOCH).ok();
    resolve_with_env(project_dir, explicit, env_value.as_deref())
}

fn resolve_with_env(
    project_dir: &Path,
    explicit: Option<u64>,
    env_value: Option<&str>,
) -> Result<(u64, TimestampSource), TimestampError> {
    if let Some(value) = explicit {
        return Ok((value, TimestampSource::Explicit));
    }
    if let Some(raw) = env_value {
        match raw.trim().parse::<u64>() {
            Ok(value) => return Ok((value, TimestampSource::SourceDateEpoch)),
            Err(_) => {
                tracing::warn!(value = raw, "ignoring unparsable {}", SOURCE_DATE_EPOCH);
            }
        }
    }
    let value = git_commit_time(project_dir)?;
    Ok((value, TimestampSource::Git))
}

/// Committer time of the latest commit, in Unix seconds.
pub fn git_commit_time(project_dir: &Path) -> Result<u64, TimestampError> {
    let output = Command::new("git")
        .args(["log", "--max-count=1", "--date=unix", "--pretty=format:%cd"])
        .current_dir(project_dir)
        .output()
        .map_err(|source| TimestampError::Spawn {
            dir: project_dir.display().to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(TimestampError::GitFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    parse_commit_time(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_commit_time(stdout: &str) -> Result<u64, TimestampError> {
    let trimmed = stdout.trim();
    trimmed.parse::<u64>().map_err(|_| TimestampError::Invalid {
        value: trimmed.to_string(),
    })
}
