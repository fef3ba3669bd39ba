use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::{debug, trace};

use crate::error::{PluginError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmProvider {
    Git,
    Hg,
    Svn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmRevision {
    pub revision: String,
    pub timestamp: String,
}

impl fmt::Display for ScmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScmProvider::Git => "git",
            ScmProvider::Hg => "hg",
            ScmProvider::Svn => "svn",
        };
        f.write_str(s)
    }
}

impl ScmProvider {
    /// Determines the provider from a Maven SCM URL like `scm:git:https://...`. Returns `None` for
    ///  providers there is no probe for.
    pub fn from_connection(url: &str) -> Result<Option<ScmProvider>> {
        let provider = url.strip_prefix("scm:")
            .and_then(|rest| rest.split(|c| c == ':' || c == '|').next())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PluginError::ScmProbe {
                command: "parse SCM URL".to_string(),
                stderr: format!("not a valid SCM URL: {:?}", url),
            })?;

        Ok(match provider {
            "git" => Some(ScmProvider::Git),
            "hg" => Some(ScmProvider::Hg),
            "svn" => Some(ScmProvider::Svn),
            _ => None,
        })
    }

    /// Asks the provider's command line tool for the revision checked out in `working_directory`
    pub fn probe(self, working_directory: &Path) -> Result<ScmRevision> {
        debug!("probing {} revision of {}", self, working_directory.display());

        match self {
            ScmProvider::Git => {
                let revision = chomp(&run(working_directory, "git", &["rev-parse", "HEAD"])?);
                let timestamp = chomp(&run(working_directory, "git", &["log", "-1", "--format=%cI", "HEAD"])?);
                Ok(ScmRevision { revision, timestamp })
            }
            ScmProvider::Hg => {
                let revision = parse_hg_id(&run(working_directory, "hg", &["id", "-i", "--debug"])?);
                let timestamp = last_line(&run(working_directory, "hg", &["log", "-r", &revision, "--template", "{date|isodate}"])?);
                Ok(ScmRevision { revision, timestamp })
            }
            ScmProvider::Svn => {
                let revision = chomp(&run(working_directory, "svn", &["info", "--show-item", "last-changed-revision"])?);
                let timestamp = chomp(&run(working_directory, "svn", &["info", "--show-item", "last-changed-date"])?);
                Ok(ScmRevision { revision, timestamp })
            }
        }
    }
}

fn run(working_directory: &Path, program: &str, args: &[&str]) -> Result<String> {
    let command_line = format!("{} {}", program, args.join(" "));
    trace!("running {:?} in {}", command_line, working_directory.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(working_directory)
        .output()
        .map_err(|e| PluginError::ScmProbe {
            command: command_line.clone(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(PluginError::ScmProbe {
            command: command_line,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// removes trailing line terminators
fn chomp(output: &str) -> String {
    output.trim_end_matches(|c| c == '\n' || c == '\r').to_string()
}

fn last_line(output: &str) -> String {
    output.lines()
        .filter(|l| !l.trim().is_empty())
        .last()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// `hg id -i --debug` prints the full changeset hash, followed by '+' if the working copy has
///  uncommitted changes
fn parse_hg_id(output: &str) -> String {
    let id = last_line(output);
    id.strip_suffix('+')
        .map(|s| s.to_string())
        .unwrap_or(id)
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::git("scm:git:https://github.com/example/demo.git", Some(ScmProvider::Git))]
    #[case::git_ssh("scm:git:git@github.com:example/demo.git", Some(ScmProvider::Git))]
    #[case::hg("scm:hg:http://hg.example.org/demo", Some(ScmProvider::Hg))]
    #[case::svn("scm:svn:https://svn.example.org/trunk", Some(ScmProvider::Svn))]
    #[case::svn_pipe_delimiter("scm:svn|https://svn.example.org/trunk", Some(ScmProvider::Svn))]
    #[case::unsupported("scm:cvs:pserver:example.org:/cvs", None)]
    fn test_from_connection(#[case] url: &str, #[case] expected: Option<ScmProvider>) {
        assert_eq!(ScmProvider::from_connection(url).unwrap(), expected);
    }

    #[rstest]
    #[case::no_scm_prefix("https://github.com/example/demo.git")]
    #[case::empty_provider("scm::x")]
    #[case::empty("")]
    fn test_invalid_connection(#[case] url: &str) {
        assert!(matches!(ScmProvider::from_connection(url), Err(PluginError::ScmProbe { .. })));
    }

    #[rstest]
    #[case::clean("0123456789abcdef0123456789abcdef01234567\n", "0123456789abcdef0123456789abcdef01234567")]
    #[case::modified("0123456789abcdef0123456789abcdef01234567+\n", "0123456789abcdef0123456789abcdef01234567")]
    #[case::debug_noise("some debug output\nabcdef+\n", "abcdef")]
    fn test_parse_hg_id(#[case] output: &str, #[case] expected: &str) {
        assert_eq!(parse_hg_id(output), expected);
    }

    #[rstest]
    #[case::unix("abc\n", "abc")]
    #[case::windows("abc\r\n", "abc")]
    #[case::none("abc", "abc")]
    fn test_chomp(#[case] output: &str, #[case] expected: &str) {
        assert_eq!(chomp(output), expected);
    }

    #[test]
    fn test_probe_outside_working_copy_fails() {
        let dir = tempfile::tempdir().unwrap();
        // fails whether or not the tool is installed
        let result = ScmProvider::Hg.probe(&dir.path().join("does-not-exist"));
        match result {
            Err(PluginError::ScmProbe { command, .. }) => assert!(command.starts_with("hg id")),
            other => panic!("expected probe failure, got {:?}", other),
        }
    }
}
