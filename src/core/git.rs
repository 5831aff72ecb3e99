//! History store backed by a real git repository.
//!
//! Only plumbing commands are used (`hash-object`, `mktree`, `commit-tree`,
//! `update-ref`, ...), so no index or working tree state is involved while
//! building and independent chains can be written concurrently. Inherited
//! `GIT_*` variables are stripped from every invocation: running inside some
//! other repository's hook must not redirect writes there.

use crate::core::error::StoreError;
use crate::core::history::{CommitRecord, HistoryStore, NewCommit, ObjectId, Tree};
use crate::core::people::Person;
use chrono::DateTime;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Mutex;
use tracing::debug;

pub struct GitStore {
    root: PathBuf,
    /// Serialized tree -> tree id, so identical snapshots are written once.
    trees: Mutex<FxHashMap<String, String>>,
}

enum Node {
    Blob(ObjectId),
    Dir(BTreeMap<String, Node>),
}

impl GitStore {
    /// Create a fresh repository at `root` whose HEAD points at `main`.
    pub fn init(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root)?;
        let store = Self {
            root: root.to_path_buf(),
            trees: Mutex::new(FxHashMap::default()),
        };
        store.run_git(&["init", "-q"], None, &[])?;
        store.run_git(&["symbolic-ref", "HEAD", "refs/heads/main"], None, &[])?;
        Ok(store)
    }

    /// Open an existing repository (or any directory inside one).
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        if !root.is_dir() {
            return Err(StoreError::NotFound(root.display().to_string()));
        }
        let store = Self {
            root: root.to_path_buf(),
            trees: Mutex::new(FxHashMap::default()),
        };
        store.run_git(&["rev-parse", "--git-dir"], None, &[])?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.root);
        for (key, _) in std::env::vars_os() {
            if key.to_string_lossy().starts_with("GIT_") {
                cmd.env_remove(key);
            }
        }
        cmd
    }

    fn output(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
        env: &[(&str, String)],
    ) -> Result<Output, StoreError> {
        let mut cmd = self.command(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
        }
        Ok(child.wait_with_output()?)
    }

    /// Run git and return raw stdout, failing on a non-zero exit.
    fn run_git(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
        env: &[(&str, String)],
    ) -> Result<Vec<u8>, StoreError> {
        let output = self.output(args, stdin, env)?;
        if !output.status.success() {
            return Err(StoreError::Git {
                command: args.first().copied().unwrap_or("").to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn run_git_line(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<String, StoreError> {
        let out = self.run_git(args, stdin, &[])?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    /// Resolve a revision to an object id, or `None` if it does not resolve.
    fn try_rev_parse(&self, spec: &str) -> Result<Option<ObjectId>, StoreError> {
        let output = self.output(&["rev-parse", "--verify", "--quiet", spec], None, &[])?;
        if !output.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!id.is_empty()).then(|| ObjectId::new(id)))
    }

    fn write_tree(&self, tree: &Tree) -> Result<String, StoreError> {
        let key: String = tree
            .entries()
            .map(|(path, id)| format!("{}\0{}\n", path, id))
            .collect();
        if let Some(id) = self.trees.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(id.clone());
        }

        let mut root = BTreeMap::new();
        for (path, id) in tree.entries() {
            insert_node(&mut root, path, id.clone())?;
        }
        let id = self.write_dir(&root)?;
        self.trees
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, id.clone());
        Ok(id)
    }

    fn write_dir(&self, dir: &BTreeMap<String, Node>) -> Result<String, StoreError> {
        let mut listing = String::new();
        for (name, node) in dir {
            match node {
                Node::Blob(id) => listing.push_str(&format!("100644 blob {}\t{}\n", id, name)),
                Node::Dir(children) => {
                    let id = self.write_dir(children)?;
                    listing.push_str(&format!("040000 tree {}\t{}\n", id, name));
                }
            }
        }
        self.run_git_line(&["mktree"], Some(listing.as_bytes()))
    }

    fn read_tree(&self, tree_id: &str) -> Result<Tree, StoreError> {
        let out = self.run_git(&["ls-tree", "-r", "-z", tree_id], None, &[])?;
        let mut tree = Tree::new();
        for entry in out.split(|b| *b == 0).filter(|e| !e.is_empty()) {
            let line = String::from_utf8_lossy(entry);
            let (_mode, kind, oid, path) =
                parse_ls_tree_line(&line).ok_or_else(|| StoreError::Corrupt {
                    id: tree_id.to_string(),
                    reason: format!("unparseable ls-tree entry {:?}", line),
                })?;
            if kind == "blob" {
                tree.insert(path, ObjectId::new(oid));
            }
        }
        Ok(tree)
    }

    /// Write `.git/description`.
    pub fn set_description(&self, description: &str) -> Result<(), StoreError> {
        let git_dir = self.run_git_line(&["rev-parse", "--git-dir"], None)?;
        let path = self.root.join(git_dir).join("description");
        fs::write(path, format!("{}\n", description))?;
        Ok(())
    }

    /// Point HEAD at `branch` and populate the working tree from it.
    pub fn checkout(&self, branch: &str) -> Result<(), StoreError> {
        self.run_git(&["checkout", "-q", "-f", branch], None, &[])?;
        Ok(())
    }
}

fn insert_node(
    dir: &mut BTreeMap<String, Node>,
    path: &str,
    id: ObjectId,
) -> Result<(), StoreError> {
    match path.split_once('/') {
        None => {
            dir.insert(path.to_string(), Node::Blob(id));
            Ok(())
        }
        Some((head, rest)) => {
            let child = dir
                .entry(head.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            match child {
                Node::Dir(children) => insert_node(children, rest, id),
                Node::Blob(_) => Err(StoreError::Corrupt {
                    id: path.to_string(),
                    reason: format!("{} is both a file and a directory", head),
                }),
            }
        }
    }
}

/// Split `"<mode> <type> <oid>\t<path>"`.
fn parse_ls_tree_line(line: &str) -> Option<(String, String, String, String)> {
    let (meta, path) = line.split_once('\t')?;
    let mode_type_oid: Vec<&str> = meta.split_whitespace().collect();
    if mode_type_oid.len() != 3 {
        return None;
    }
    Some((
        mode_type_oid[0].to_string(),
        mode_type_oid[1].to_string(),
        mode_type_oid[2].to_string(),
        path.to_string(),
    ))
}

/// Parse an `author`/`committer` header value: `Name <email> <epoch> <tz>`.
fn parse_signature(value: &str) -> Option<(Person, i64)> {
    let open = value.find('<')?;
    let close = value[open..].find('>')? + open;
    let name = value[..open].trim();
    let email = &value[open + 1..close];
    let epoch = value[close + 1..].split_whitespace().next()?.parse().ok()?;
    Some((Person::new(name, email), epoch))
}

fn git_date(commit: &NewCommit) -> String {
    format!("{} +0000", commit.when.and_utc().timestamp())
}

impl HistoryStore for GitStore {
    fn hash_object(&self, bytes: &[u8]) -> Result<ObjectId, StoreError> {
        self.run_git_line(&["hash-object", "--stdin"], Some(bytes))
            .map(ObjectId::new)
    }

    fn add_pooled_object(&self, bytes: &[u8]) -> Result<ObjectId, StoreError> {
        self.run_git_line(&["hash-object", "-w", "--stdin"], Some(bytes))
            .map(ObjectId::new)
    }

    fn read_object(&self, id: &ObjectId) -> Result<Vec<u8>, StoreError> {
        let kind = self.run_git_line(&["cat-file", "-t", id.as_str()], None)?;
        if kind != "blob" {
            return Err(StoreError::WrongKind {
                id: id.to_string(),
                expected: "blob",
            });
        }
        self.run_git(&["cat-file", "blob", id.as_str()], None, &[])
    }

    fn commit(&self, commit: &NewCommit) -> Result<ObjectId, StoreError> {
        let tree = self.write_tree(&commit.tree)?;
        let mut args = vec!["commit-tree", tree.as_str()];
        if let Some(parent) = &commit.parent {
            args.extend(["-p", parent.as_str()]);
        }
        let date = git_date(commit);
        let env = [
            ("GIT_AUTHOR_NAME", commit.author.name.clone()),
            ("GIT_AUTHOR_EMAIL", commit.author.email.clone()),
            ("GIT_AUTHOR_DATE", date.clone()),
            ("GIT_COMMITTER_NAME", commit.author.name.clone()),
            ("GIT_COMMITTER_EMAIL", commit.author.email.clone()),
            ("GIT_COMMITTER_DATE", date),
        ];
        let out = self.run_git(&args, Some(commit.message.as_bytes()), &env)?;
        let id = String::from_utf8_lossy(&out).trim().to_string();
        debug!(commit = %id, title = %commit.message.lines().next().unwrap_or(""), "git commit-tree");
        Ok(ObjectId::new(id))
    }

    fn read_commit(&self, id: &ObjectId) -> Result<CommitRecord, StoreError> {
        let kind = self.run_git_line(&["cat-file", "-t", id.as_str()], None)?;
        if kind != "commit" {
            return Err(StoreError::WrongKind {
                id: id.to_string(),
                expected: "commit",
            });
        }
        let raw = self.run_git(&["cat-file", "commit", id.as_str()], None, &[])?;
        let raw = String::from_utf8_lossy(&raw).into_owned();
        let corrupt = |reason: &str| StoreError::Corrupt {
            id: id.to_string(),
            reason: reason.to_string(),
        };
        let (headers, message) = raw.split_once("\n\n").unwrap_or((raw.as_str(), ""));

        let mut tree_id = None;
        let mut parent = None;
        let mut author = None;
        for line in headers.lines() {
            if let Some(v) = line.strip_prefix("tree ") {
                tree_id = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix("parent ") {
                if parent.is_some() {
                    return Err(corrupt("merge commits are not supported"));
                }
                parent = Some(ObjectId::new(v));
            } else if let Some(v) = line.strip_prefix("author ") {
                author = parse_signature(v);
            }
        }
        let tree_id = tree_id.ok_or_else(|| corrupt("missing tree header"))?;
        let (author, epoch) = author.ok_or_else(|| corrupt("missing or bad author header"))?;
        let when = DateTime::from_timestamp(epoch, 0)
            .ok_or_else(|| corrupt("author timestamp out of range"))?
            .naive_utc();

        Ok(CommitRecord {
            id: id.clone(),
            parent,
            author,
            when,
            message: message.to_string(),
            tree: self.read_tree(&tree_id)?,
        })
    }

    fn set_branch(&self, name: &str, target: &ObjectId) -> Result<(), StoreError> {
        let refname = format!("refs/heads/{}", name);
        self.run_git(&["update-ref", &refname, target.as_str()], None, &[])?;
        Ok(())
    }

    fn branches(&self) -> Result<Vec<String>, StoreError> {
        let out = self.run_git_line(
            &["for-each-ref", "--format=%(refname)", "refs/heads", "refs/remotes"],
            None,
        )?;
        Ok(out
            .lines()
            .filter_map(|r| {
                r.strip_prefix("refs/heads/")
                    .or_else(|| r.strip_prefix("refs/remotes/"))
            })
            .filter(|b| !b.ends_with("/HEAD"))
            .map(str::to_string)
            .collect())
    }

    fn branch_head(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        if let Some(id) = self.try_rev_parse(&format!("refs/heads/{}^{{commit}}", name))? {
            return Ok(Some(id));
        }
        self.try_rev_parse(&format!("refs/remotes/{}^{{commit}}", name))
    }

    fn tag_object(&self, name: &str, target: &ObjectId) -> Result<(), StoreError> {
        let refname = format!("refs/tags/{}", name);
        if self.try_rev_parse(&refname)?.is_some() {
            return Err(StoreError::RefExists(format!("tag {}", name)));
        }
        self.run_git(&["update-ref", &refname, target.as_str()], None, &[])?;
        Ok(())
    }

    fn tags(&self) -> Result<Vec<String>, StoreError> {
        let out = self.run_git_line(&["for-each-ref", "--format=%(refname)", "refs/tags"], None)?;
        Ok(out
            .lines()
            .filter_map(|r| r.strip_prefix("refs/tags/"))
            .map(str::to_string)
            .collect())
    }

    fn resolve_tag(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        self.try_rev_parse(&format!("refs/tags/{}^{{}}", name))
    }

    fn delete_tag(&self, name: &str) -> Result<(), StoreError> {
        let refname = format!("refs/tags/{}", name);
        if self.try_rev_parse(&refname)?.is_none() {
            return Err(StoreError::NotFound(format!("tag {}", name)));
        }
        self.run_git(&["update-ref", "-d", &refname], None, &[])?;
        Ok(())
    }

    fn ancestor(&self, head: &ObjectId, n: usize) -> Result<ObjectId, StoreError> {
        let spec = format!("{}~{}^{{commit}}", head, n);
        self.try_rev_parse(&spec)?
            .ok_or_else(|| StoreError::NotFound(format!("{}~{}", head, n)))
    }

    fn pickaxe(&self, head: &ObjectId, token: &str) -> Result<Vec<CommitRecord>, StoreError> {
        let pickaxe = format!("-S{}", token);
        let out = self.run_git_line(
            &["log", "--first-parent", "--format=%H", &pickaxe, head.as_str()],
            None,
        )?;
        out.lines()
            .filter(|l| !l.is_empty())
            .map(|l| self.read_commit(&ObjectId::new(l)))
            .collect()
    }
}
