//! Common test utilities for dexgraph integration tests

use std::path::PathBuf;
use tempfile::TempDir;

/// App description with a root module and one feature module
#[allow(dead_code)]
pub const SPLIT_APP: &str = r"
name: //apps/sample:app
modules:
  - name: dex
    root: true
  - name: video
    deps: [dex]
units:
  - target: //lib:a
    output: out/a.jar
  - target: //lib:b
    output: out/b.jar
  - target: //lib:c
    output: out/c.jar
  - target: //lib:d
    output: out/d.jar
  - target: //video:player
    module: video
    output: out/player.jar
resources:
  types: [string]
dex:
  use_split_dex: true
  dex_compression: jar
  dex_group_lib_limit: 2
";

/// A scratch directory holding app descriptions and build outputs
pub struct TestWorkspace {
    #[allow(dead_code)]
    pub temp: TempDir,
    pub path: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a file, creating parent directories
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    #[allow(dead_code)]
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }
}
