use crate::error::Error;
use serde::Deserialize;
use sse::ChannelKey;

const MAX_OWNER_LEN: usize = 39;
const MAX_REPO_LEN: usize = 100;

/// Path parameters of a repository event stream
///
/// # Fields
///
/// * `owner` - The user or organization that owns the repository
/// * `repo` - The repository name
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryParams {
    pub(crate) owner: String,
    pub(crate) repo: String,
}

impl RepositoryParams {
    /// Check both segments against GitHub's naming rules and build the channel key.
    pub(crate) fn into_channel_key(self) -> Result<ChannelKey, Error> {
        if !is_valid_owner(&self.owner) {
            return Err(Error::invalid_path(format!(
                "invalid repository owner: {}",
                self.owner
            )));
        }
        if !is_valid_repo(&self.repo) {
            return Err(Error::invalid_path(format!(
                "invalid repository name: {}",
                self.repo
            )));
        }
        Ok(ChannelKey::repository(self.owner, self.repo))
    }
}

// Alphanumerics and single inner hyphens.
fn is_valid_owner(owner: &str) -> bool {
    !owner.is_empty()
        && owner.len() <= MAX_OWNER_LEN
        && !owner.starts_with('-')
        && !owner.ends_with('-')
        && owner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_repo(repo: &str) -> bool {
    !repo.is_empty()
        && repo.len() <= MAX_REPO_LEN
        && repo != "."
        && repo != ".."
        && repo
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
