use std::collections::HashMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use gag_api_client::github::{BRANCHES_QUERY, CREATE_PULL_REQUEST_MUTATION, REPOSITORY_ID_QUERY};
use gag_api_client::{GraphqlTransport, check_response};
use serde_json::{Value, json};

use crate::transport::{CommandOutput, GitTransport, SystemGit};

/// Run git in `cwd`, panicking with its output on failure.
pub fn run_git(cwd: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {} failed\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Trimmed stdout of a successful git command.
pub fn git_stdout(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("run git");
    assert!(output.status.success(), "git {} failed", args.join(" "));
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Initialize a minimal git repository for testing.
///
/// Creates a repo with an initial commit (README plus an `epgs/` folder) so
/// that HEAD exists.
pub fn init_test_repo(dir: &Path) {
    run_git(dir, &["init", "--initial-branch=main"]);
    run_git(dir, &["config", "user.email", "test@test.com"]);
    run_git(dir, &["config", "user.name", "Test"]);
    std::fs::write(dir.join("README"), "test repo").unwrap();
    std::fs::create_dir_all(dir.join("epgs")).unwrap();
    std::fs::write(dir.join("epgs").join(".gitkeep"), "").unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-m", "init"]);
}

/// Create `<root>/remote.git`, a bare repository seeded by [`init_test_repo`].
pub fn init_bare_remote(root: &Path) -> PathBuf {
    let seed = root.join("seed");
    std::fs::create_dir_all(&seed).unwrap();
    init_test_repo(&seed);
    let remote = root.join("remote.git");
    run_git(
        root,
        &["clone", "--bare", seed.to_str().unwrap(), remote.to_str().unwrap()],
    );
    remote
}

/// First argument that is not a `-c key=value` override.
pub fn subcommand(args: &[String]) -> &str {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-c" {
            iter.next();
            continue;
        }
        return arg;
    }
    ""
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub cwd: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn subcommand(&self) -> &str {
        subcommand(&self.args)
    }
}

/// Stand-in for git that answers like a healthy remote unless told otherwise.
///
/// Clones always create the target directory and by default print the
/// exact confirmation text; `checkout -b` prints the exact branch confirmation. Clones of the
/// handle share the call log.
#[derive(Clone, Default)]
pub struct ScriptedGit {
    calls: Arc<Mutex<Vec<Invocation>>>,
    responses: HashMap<String, CommandOutput>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `subcommand` invocation with `output` instead.
    pub fn respond(mut self, subcommand: &str, output: CommandOutput) -> Self {
        self.responses.insert(subcommand.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.subcommand().to_string())
            .collect()
    }
}

impl GitTransport for ScriptedGit {
    fn run(&self, cwd: Option<&Path>, args: &[&OsStr]) -> io::Result<CommandOutput> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls.lock().unwrap().push(Invocation {
            cwd: cwd.map(Path::to_path_buf),
            args: args.clone(),
        });

        let sub = subcommand(&args);
        if sub == "clone" {
            // The directory appears whatever git ends up printing.
            std::fs::create_dir_all(args.last().map(String::as_str).unwrap_or_default())?;
        }
        if let Some(output) = self.responses.get(sub) {
            return Ok(output.clone());
        }
        Ok(match sub {
            "ls-remote" => CommandOutput::ok("4b825dc642cb6eb9a060e54bf8d69288fbee4904\tHEAD\n", ""),
            "clone" => {
                let target = args.last().cloned().unwrap_or_default();
                CommandOutput::ok("", format!("Cloning into '{target}'...\n"))
            }
            "checkout" => {
                let branch = args.last().cloned().unwrap_or_default();
                CommandOutput::ok("", format!("Switched to a new branch '{branch}'\n"))
            }
            _ => CommandOutput::ok("", ""),
        })
    }
}

/// Real git, with every `https://` remote swapped for a local path.
pub struct LocalRemote {
    pub git: SystemGit,
    pub remote: PathBuf,
}

impl GitTransport for LocalRemote {
    fn run(&self, cwd: Option<&Path>, args: &[&OsStr]) -> io::Result<CommandOutput> {
        let args: Vec<&OsStr> = args
            .iter()
            .map(|a| {
                if a.to_string_lossy().starts_with("https://") {
                    self.remote.as_os_str()
                } else {
                    *a
                }
            })
            .collect();
        self.git.run(cwd, &args)
    }
}

/// GitHub stand-in keyed on which query is sent.
#[derive(Clone)]
pub struct FakeGithub {
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
    pub repo_id: Option<String>,
    pub branches: Vec<(&'static str, &'static str)>,
    pub pr_errors: Option<Value>,
}

impl Default for FakeGithub {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            repo_id: Some("R_kgDOrepo1".to_string()),
            branches: vec![("main", "REF_main")],
            pr_errors: None,
        }
    }
}

impl GraphqlTransport for FakeGithub {
    fn execute(&self, query: &str, variables: Value) -> gag_api_client::Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), variables.clone()));
        let body = if query == REPOSITORY_ID_QUERY {
            match &self.repo_id {
                Some(id) => json!({"data": {"repository": {"id": id}}}),
                None => json!({"data": {"repository": null}, "errors": [
                    {"type": "NOT_FOUND", "message": "Could not resolve to a Repository"}
                ]}),
            }
        } else if query == BRANCHES_QUERY {
            let nodes: Vec<Value> = self
                .branches
                .iter()
                .map(|(name, id)| json!({"id": id, "name": name}))
                .collect();
            json!({"data": {"repository": {
                "name": variables["repo_name"],
                "refs": {"totalCount": nodes.len(), "nodes": nodes}
            }}})
        } else if query == CREATE_PULL_REQUEST_MUTATION {
            match &self.pr_errors {
                Some(errors) => json!({"data": {"createPullRequest": null}, "errors": errors}),
                None => json!({"data": {"createPullRequest": {"pullRequest": {
                    "number": 7,
                    "url": "https://github.com/org/repo1/pull/7"
                }}}}),
            }
        } else {
            json!({"data": null})
        };
        check_response(body)
    }
}
