/// A configured remote and its addresses in declaration order
/// (fetch URL first, then the push URL when one is set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpec {
    pub name: String,
    pub urls: Vec<String>,
}

impl RemoteSpec {
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            urls,
        }
    }

    /// Reads every remote from the repository config.
    pub fn list(repo: &git2::Repository) -> Result<Vec<RemoteSpec>, git2::Error> {
        let names = repo.remotes()?;
        let mut remotes = Vec::with_capacity(names.len());
        for name in names.iter().flatten() {
            let remote = repo.find_remote(name)?;
            let mut urls = Vec::new();
            if let Some(url) = remote.url() {
                urls.push(url.to_string());
            }
            if let Some(push_url) = remote.pushurl() {
                if !urls.iter().any(|u| u == push_url) {
                    urls.push(push_url.to_string());
                }
            }
            remotes.push(RemoteSpec::new(name, urls));
        }
        Ok(remotes)
    }
}
