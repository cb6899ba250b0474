use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Creates a test home directory under target/home with a random 8-character name
/// The directory will be automatically cleaned up when the returned guard is dropped
pub struct TestHomeGuard {
    path: PathBuf,
}

impl TestHomeGuard {
    pub fn new() -> Self {
        let random_name: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();

        let path = PathBuf::from("target/home").join(random_name);
        fs::create_dir_all(&path).expect("Failed to create test home directory");

        Self { path }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute path of the `.rollout` directory, usable as ROLLOUT_HOME.
    pub fn rollout_home(&self) -> PathBuf {
        let home = self.path.join(".rollout");
        fs::create_dir_all(&home).expect("Failed to create .rollout directory");
        home.canonicalize().expect("Failed to resolve .rollout directory")
    }

    #[allow(dead_code)]
    pub fn setup_rollout_structure(&self) -> PathBuf {
        let home = self.rollout_home();
        fs::create_dir_all(home.join("updates")).expect("Failed to create updates directory");
        home
    }
}

impl Drop for TestHomeGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            fs::remove_dir_all(&self.path).unwrap_or_else(|e| {
                eprintln!(
                    "Failed to cleanup test directory {}: {}",
                    self.path.display(),
                    e
                );
            });
        }
    }
}
