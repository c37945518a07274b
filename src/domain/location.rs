use crate::utils::error::{PluginError, Result};
use percent_encoding::percent_decode_str;
use url::Url;

/// Which archive layout the repository host serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoHost {
    /// `/<owner>/<repo>/(blob|tree)/<ref>/<path>`
    GitHub,
    /// `/<namespace...>/<repo>/-/(blob|tree)/<ref>/<path>`, namespaces may nest subgroups
    GitLab,
}

/// A repository URL split into its parts.
///
/// Accepts `/<owner>/<repo>`, `/<owner>/<repo>/(blob|tree)/<ref>/<path>` and the GitLab
/// variant with a `-` segment before `blob`/`tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub host: RepoHost,
    pub origin: String,
    /// Owner or GitLab namespace, subgroups joined with `/`.
    pub owner: String,
    pub repo: String,
    pub git_ref: Option<String>,
    /// Decoded path segments below the ref.
    pub path: Vec<String>,
    /// `true` for `blob` URLs, whose last path segment names a file.
    pub points_at_file: bool,
}

impl RepoLocation {
    pub fn parse(target: &str) -> Result<Self> {
        let invalid = |reason: &str| PluginError::InvalidDocRef {
            value: target.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(target).map_err(|e| invalid(&format!("invalid URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https URLs are supported"));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        // 只有第一個 blob/tree 前的 `-` 才是 GitLab 分隔符，路徑中的 `-` 目錄不算
        let dash = segments
            .iter()
            .position(|s| matches!(*s, "blob" | "tree"))
            .filter(|&kind| kind > 0 && segments[kind - 1] == "-")
            .map(|kind| kind - 1);

        let (host, namespace, repo, rest) = match dash {
            Some(dash) if dash >= 2 => (
                RepoHost::GitLab,
                &segments[..dash - 1],
                segments[dash - 1],
                &segments[dash + 1..],
            ),
            Some(_) => return Err(invalid("expected /<namespace>/<repo> before '-'")),
            None if segments.len() >= 2 => {
                (RepoHost::GitHub, &segments[..1], segments[1], &segments[2..])
            }
            None => return Err(invalid("expected /<owner>/<repo> in the URL path")),
        };

        let (git_ref, path, points_at_file) = match rest.first().copied() {
            None => (None, Vec::new(), false),
            Some(kind @ ("blob" | "tree")) => {
                let git_ref = rest
                    .get(1)
                    .ok_or_else(|| invalid(&format!("missing ref after '{}'", kind)))?;
                let path = rest[2..]
                    .iter()
                    .map(|segment| {
                        percent_decode_str(segment)
                            .decode_utf8()
                            .map(|decoded| decoded.into_owned())
                            .map_err(|_| invalid("path segment is not valid UTF-8"))
                    })
                    .collect::<Result<Vec<String>>>()?;
                let points_at_file = kind == "blob" && !path.is_empty();
                (Some(git_ref.to_string()), path, points_at_file)
            }
            Some(other) => {
                return Err(invalid(&format!(
                    "unsupported path segment '{}', expected 'blob' or 'tree'",
                    other
                )))
            }
        };

        Ok(Self {
            host,
            origin: url.origin().ascii_serialization(),
            owner: namespace.join("/"),
            repo: repo.trim_end_matches(".git").to_string(),
            git_ref,
            path,
            points_at_file,
        })
    }

    /// Directory part of the path, relative to the repository root. Empty for the root.
    pub fn directory(&self) -> String {
        let dir = if self.points_at_file {
            &self.path[..self.path.len() - 1]
        } else {
            &self.path[..]
        };
        dir.join("/")
    }

    pub fn archive_url(&self) -> String {
        let git_ref = self.git_ref.as_deref().unwrap_or("HEAD");
        match self.host {
            RepoHost::GitHub => format!(
                "{}/{}/{}/archive/{}.zip",
                self.origin, self.owner, self.repo, git_ref
            ),
            RepoHost::GitLab => format!(
                "{}/{}/{}/-/archive/{}/{}-{}.zip",
                self.origin, self.owner, self.repo, git_ref, self.repo, git_ref
            ),
        }
    }
}
