use git2::{IndexAddOption, Repository, Signature};
use std::fs;
use std::path::Path;

/// Creates a git repository at `dir` with one commit containing `files`.
/// When `branch` is given, a branch of that name is created on the commit.
pub fn init_source_repo(dir: &Path, files: &[&str], branch: Option<&str>) -> Repository {
    let repo = Repository::init(dir).unwrap();

    for file in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, format!("# {}\n", file)).unwrap();
    }

    let commit_id = {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let signature = Signature::now("geo-manifest", "geo-manifest@example.com").unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
            .unwrap()
    };

    if let Some(branch) = branch {
        let commit = repo.find_commit(commit_id).unwrap();
        repo.branch(branch, &commit, false).unwrap();
    }

    repo
}
