pub mod checkout;
pub mod git_cloner;

pub use checkout::remove_dir_if_exists;
pub use git_cloner::{validate_source_url, CloneProgress, SafeCloner};
