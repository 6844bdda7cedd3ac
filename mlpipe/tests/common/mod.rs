#![allow(dead_code)]

use assert_cmd::Command;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Stand-in for the docker CLI. Builds exit with `FAKE_BUILD_EXIT`; container
/// runs append their `PIPELINE_STAGE` to `FAKE_LOG`, exit with
/// `FAKE_FAIL_CODE` for `FAKE_FAIL_STAGE`, and write the train/predict
/// artifacts into the mounted host directories unless `FAKE_PRODUCE=0`.
const FAKE_DOCKER: &str = r#"#!/bin/sh
cmd="$1"
shift
case "$cmd" in
  build)
    exit "${FAKE_BUILD_EXIT:-0}"
    ;;
  image)
    echo '{"Id":"sha256:fake","Created":"2024-01-01T00:00:00Z","Size":1024,"Os":"linux","Architecture":"amd64","RepoTags":["ml-pipeline:latest"]}'
    exit 0
    ;;
  run)
    stage=""
    models=""
    preds=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --rm) shift ;;
        --name) shift 2 ;;
        -v)
          case "$2" in
            *:/app/models) models="${2%:/app/models}" ;;
            *:/app/predictions) preds="${2%:/app/predictions}" ;;
          esac
          shift 2
          ;;
        -e)
          case "$2" in
            PIPELINE_STAGE=*) stage="${2#PIPELINE_STAGE=}" ;;
          esac
          shift 2
          ;;
        *) break ;;
      esac
    done
    shift
    if [ "$1" = "env" ]; then
      echo "PATH=/usr/local/bin:/usr/bin"
      echo "PYTHONUNBUFFERED=1"
      exit 0
    fi
    if [ -n "$FAKE_LOG" ]; then
      echo "$stage" >> "$FAKE_LOG"
    fi
    if [ -n "$FAKE_FAIL_STAGE" ] && [ "$stage" = "$FAKE_FAIL_STAGE" ]; then
      exit "${FAKE_FAIL_CODE:-1}"
    fi
    if [ "${FAKE_PRODUCE:-1}" = "1" ]; then
      case "$stage" in
        train)
          echo model > "$models/latest_model.pkl"
          echo '{"accuracy": 0.93}' > "$models/metrics_20240101_000000.json"
          ;;
        predict)
          printf 'id,prediction\n1,0\n2,1\n' > "$preds/latest_predictions.csv"
          ;;
      esac
    fi
    exit 0
    ;;
esac
exit 0
"#;

pub struct TestContext {
    pub dir: TempDir,
    pub docker: PathBuf,
    pub log: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let docker = dir.path().join("fake-docker");
        std::fs::write(&docker, FAKE_DOCKER).unwrap();
        std::fs::set_permissions(&docker, std::fs::Permissions::from_mode(0o755)).unwrap();
        let log = dir.path().join("stages.log");
        Self { dir, docker, log }
    }

    pub fn workdir(&self) -> &Path {
        self.dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mlpipe"));
        cmd.timeout(Duration::from_secs(60));
        cmd.current_dir(self.workdir());
        cmd.env_remove("MLPIPE_IMAGE");
        cmd.env_remove("MLPIPE_WORKDIR");
        cmd.env_remove("RUST_LOG");
        cmd.env("MLPIPE_DOCKER", &self.docker);
        cmd.env("FAKE_LOG", &self.log);
        cmd
    }

    pub fn logged_stages(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.workdir().join(relative)
    }
}
