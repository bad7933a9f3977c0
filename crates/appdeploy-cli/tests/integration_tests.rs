//! Integration tests for the appdeploy binary
//!
//! Everything runs in write-to-folder mode so no cluster is needed.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the appdeploy command
fn appdeploy(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_appdeploy"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute appdeploy")
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

const SERVICE: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: {{ namespace }}
spec:
  ports:
    - port: {{ variable("port", 80) }}
"#;

const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: {{ variables.replicas }}
  template:
    spec:
      containers:
        - name: web
          image: "nginx:{{ variable("tag", "latest") }}"
"#;

const OPTIONAL: &str = r#"{% if variables.worker %}
apiVersion: apps/v1
kind: Deployment
metadata:
  name: worker
{% endif %}
"#;

fn manifest_folder() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "service.yaml", SERVICE);
    write(dir.path(), "deployment.yaml", DEPLOYMENT);
    write(dir.path(), "worker.yaml", OPTIONAL);
    write(
        dir.path(),
        "variables.yaml",
        "namespace: staging\nreplicas: 2\nworker: false\n",
    );
    dir
}

mod folder_mode {
    use super::*;

    #[test]
    fn test_writes_rendered_manifests() {
        let source = manifest_folder();
        let out = TempDir::new().unwrap();

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ]);

        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert_eq!(
            listing(out.path()),
            vec!["deployment--web.yaml", "service--web.yaml"]
        );

        let service = fs::read_to_string(out.path().join("service--web.yaml")).unwrap();
        assert!(service.contains("namespace: staging"));
        assert!(service.contains("port: 80"));

        let deployment = fs::read_to_string(out.path().join("deployment--web.yaml")).unwrap();
        assert!(deployment.contains("replicas: 2"));
        assert!(deployment.contains("nginx:latest"));

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("2 applied, 1 skipped, 0 deleted in namespace staging"));
    }

    #[test]
    fn test_vars_override_source() {
        let source = manifest_folder();
        let out = TempDir::new().unwrap();

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--var",
            "namespace=production",
            "-v",
            "tag=1.27",
            "--var",
            "worker=true",
        ]);

        assert!(output.status.success());
        assert_eq!(
            listing(out.path()),
            vec![
                "deployment--web.yaml",
                "deployment--worker.yaml",
                "service--web.yaml"
            ]
        );

        let service = fs::read_to_string(out.path().join("service--web.yaml")).unwrap();
        assert!(service.contains("namespace: production"));
        let deployment = fs::read_to_string(out.path().join("deployment--web.yaml")).unwrap();
        assert!(deployment.contains("nginx:1.27"));
    }

    #[test]
    fn test_removes_stale_manifests() {
        let source = manifest_folder();
        let out = TempDir::new().unwrap();
        write(out.path(), "service--old.yaml", "stale");
        write(out.path(), "deployment--worker.yaml", "stale");
        write(out.path(), "configmap--settings.yaml", "kept");
        write(out.path(), "cronjob--nightly.yaml", "kept");
        write(out.path(), "notes.txt", "kept");

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ]);

        assert!(output.status.success());
        assert_eq!(
            listing(out.path()),
            vec![
                "configmap--settings.yaml",
                "cronjob--nightly.yaml",
                "deployment--web.yaml",
                "notes.txt",
                "service--web.yaml",
            ]
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("2 deleted"));
    }

    #[test]
    fn test_manage_cronjobs_flag() {
        let source = manifest_folder();
        let out = TempDir::new().unwrap();
        write(out.path(), "cronjob--nightly.yaml", "stale");

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--manage-cronjobs",
        ]);

        assert!(output.status.success());
        assert!(!out.path().join("cronjob--nightly.yaml").exists());
    }

    #[test]
    fn test_rerun_is_stable() {
        let source = manifest_folder();
        let out = TempDir::new().unwrap();
        let args = [
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ];

        assert!(appdeploy(&args).status.success());
        let first = listing(out.path());
        assert!(appdeploy(&args).status.success());
        assert_eq!(listing(out.path()), first);
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_empty_folder_refused() {
        let source = TempDir::new().unwrap();
        write(source.path(), "variables.yaml", "namespace: x\n");
        let out = TempDir::new().unwrap();
        write(out.path(), "service--keep.yaml", "x");

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("0 manifests"));
        assert!(out.path().join("service--keep.yaml").exists());
    }

    #[test]
    fn test_missing_folder() {
        let dir = TempDir::new().unwrap();
        let output = appdeploy(&[
            dir.path().join("nope").to_str().unwrap(),
            "--output-dir",
            dir.path().to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_template_error_skips_cleanup() {
        let source = manifest_folder();
        write(source.path(), "broken.yaml", "kind: Service\nmetadata:\n  name: {{ variables.nope.deeper }}\n");
        let out = TempDir::new().unwrap();
        write(out.path(), "service--old.yaml", "stale");

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(3));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("broken.yaml"));
        assert!(out.path().join("service--old.yaml").exists());
    }

    #[test]
    fn test_not_a_manifest() {
        let source = TempDir::new().unwrap();
        write(source.path(), "config.yaml", "just: data\n");
        let out = TempDir::new().unwrap();

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(3));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("config.yaml"));
    }

    #[test]
    fn test_duplicate_resource_refused() {
        let source = manifest_folder();
        write(source.path(), "service-copy.yaml", SERVICE);
        let out = TempDir::new().unwrap();
        write(out.path(), "service--old.yaml", "stale");

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("produced by several items"));
        assert!(out.path().join("service--old.yaml").exists());
    }

    #[test]
    fn test_both_variable_files_refused() {
        let source = manifest_folder();
        write(source.path(), "variables.yml", "namespace: other\n");
        let out = TempDir::new().unwrap();

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(4));
        assert!(listing(out.path()).is_empty());
    }

    #[test]
    fn test_invalid_var() {
        let source = manifest_folder();
        let out = TempDir::new().unwrap();

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--var",
            "novalue",
        ]);

        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_unknown_context() {
        let source = manifest_folder();
        let home = TempDir::new().unwrap();
        let kubeconfig = home.path().join("config");
        fs::write(
            &kubeconfig,
            "apiVersion: v1\nkind: Config\ncurrent-context: dev\ncontexts:\n  - name: dev\n    context:\n      cluster: c\n      user: u\nclusters:\n  - name: c\n    cluster:\n      server: https://127.0.0.1:1\nusers:\n  - name: u\n    user: {}\n",
        )
        .unwrap();

        let output = appdeploy(&[
            source.path().to_str().unwrap(),
            "--kubeconfig",
            kubeconfig.to_str().unwrap(),
            "--context",
            "prod",
        ]);

        assert_eq!(output.status.code(), Some(7));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Unknown context: prod"));
    }
}

mod cli {
    use super::*;

    #[test]
    fn test_help() {
        let output = appdeploy(&["--help"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("--output-dir"));
        assert!(stdout.contains("--var"));
    }

    #[test]
    fn test_folder_required() {
        let output = appdeploy(&[]);
        assert!(!output.status.success());
    }
}
