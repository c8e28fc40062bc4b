use assert_cmd::Command;
use mockito::{Matcher, Mock, Server, ServerGuard};
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use std::io::Write;
use tempfile::{TempDir, tempdir};
use zip::ZipWriter;
use zip::write::FileOptions;

fn create_zip(files: &[(&str, &str)]) -> Vec<u8> {
    create_zip_with_modes(&files.iter().map(|(n, c)| (*n, *c, None)).collect::<Vec<_>>())
}

fn create_zip_with_modes(files: &[(&str, &str, Option<u32>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content, mode) in files {
        let mut options: FileOptions<()> = FileOptions::default();
        if let Some(mode) = mode {
            options = options.unix_permissions(*mode);
        }
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Catalog with two packages: Acme@app (latest 1.0.0) depends on Acme@core.
fn catalog_body(url: &str, core_hash: &str, app_hash: &str) -> String {
    format!(
        r#"[
            {{
                "author": "Acme",
                "name": "core",
                "description": "Core library",
                "versions": [
                    {{"versionName": "1.0.0", "downloadURL": "{url}/core.zip", "hash": "{core_hash}", "latest": true}}
                ]
            }},
            {{
                "author": "Acme",
                "name": "app",
                "description": "An app",
                "versions": [
                    {{"versionName": "1.0.0", "downloadURL": "{url}/app.zip", "hash": "{app_hash}", "latest": true}}
                ]
            }}
        ]"#
    )
}

const CORE_MANIFEST: &str = r#"{
    "author": "Acme",
    "name": "core",
    "description": "Core library",
    "version": "1.0.0",
    "dependencies": []
}"#;

const APP_MANIFEST: &str = r#"{
    "author": "Acme",
    "name": "app",
    "description": "An app",
    "version": "1.0.0",
    "dependencies": [{"id": "Acme@core"}]
}"#;

/// Serve the two-package catalog plus both artifacts. The returned mocks
/// must stay alive for the duration of the test.
fn serve_catalog(server: &mut ServerGuard) -> Vec<Mock> {
    let core_zip = create_zip(&[("manifest.json", CORE_MANIFEST), ("lib/core.txt", "core")]);
    let app_zip = create_zip(&[("manifest.json", APP_MANIFEST), ("bin/app.txt", "app")]);
    let body = catalog_body(&server.url(), &digest(&core_zip), &digest(&app_zip));

    vec![
        server
            .mock("GET", "/index.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create(),
        server
            .mock("GET", "/core.zip")
            .with_status(200)
            .with_body(core_zip)
            .create(),
        server
            .mock("GET", "/app.zip")
            .with_status(200)
            .with_body(app_zip)
            .create(),
    ]
}

fn depot(root: &TempDir, server: &ServerGuard) -> Command {
    let mut cmd = Command::cargo_bin("depot").unwrap();
    cmd.arg("--root")
        .arg(root.path())
        .arg("--catalog-url")
        .arg(format!("{}/index.json", server.url()))
        .env_remove("DEPOT_ROOT");
    cmd
}

fn registry(root: &TempDir) -> serde_json::Value {
    let raw = std::fs::read_to_string(root.path().join("installed.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn registered_ids(root: &TempDir) -> Vec<String> {
    registry(root)["installed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            format!(
                "{}@{}",
                m["author"].as_str().unwrap(),
                m["name"].as_str().unwrap()
            )
        })
        .collect()
}

#[test]
fn test_install_with_dependency_end_to_end() {
    let mut server = Server::new();
    let _mocks = serve_catalog(&mut server);
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["install", "Acme@app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed Acme@app 1.0.0"));

    // files for both packages landed under the root
    assert!(root.path().join("Acme/app/bin/app.txt").exists());
    assert!(root.path().join("Acme/core/lib/core.txt").exists());

    // both are registered, and core knows app depends on it
    let mut ids = registered_ids(&root);
    ids.sort();
    assert_eq!(ids, ["Acme@app", "Acme@core"]);

    let doc = registry(&root);
    let core = doc["installed"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "core")
        .unwrap();
    assert_eq!(core["dependents"][0], "Acme@app");
}

#[test]
fn test_install_twice_is_idempotent() {
    let mut server = Server::new();
    let _mocks = serve_catalog(&mut server);
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["install", "Acme@core"])
        .assert()
        .success();
    let before = std::fs::read_to_string(root.path().join("installed.json")).unwrap();

    depot(&root, &server)
        .args(["install", "Acme@core"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already installed"));

    let after = std::fs::read_to_string(root.path().join("installed.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_uninstall_blocks_on_dependents_without_confirmation() {
    let mut server = Server::new();
    let _mocks = serve_catalog(&mut server);
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["install", "Acme@app"])
        .assert()
        .success();

    // declining the prompt leaves core registered
    depot(&root, &server)
        .args(["uninstall", "Acme@core"])
        .write_stdin("n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Aborted by the operator"));
    assert!(registered_ids(&root).contains(&"Acme@core".to_string()));

    // confirming goes through
    depot(&root, &server)
        .args(["uninstall", "Acme@core"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("removed Acme@core 1.0.0"));
    assert!(!registered_ids(&root).contains(&"Acme@core".to_string()));
}

#[test]
fn test_autoremove_cascades_after_uninstall() {
    let mut server = Server::new();
    let _mocks = serve_catalog(&mut server);
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["install", "Acme@app"])
        .assert()
        .success();

    // app has no dependents, so no prompt is needed
    depot(&root, &server)
        .args(["uninstall", "Acme@app"])
        .assert()
        .success();

    // core is now orphaned: its only recorded dependent is gone
    depot(&root, &server)
        .args(["autoremove"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1 orphaned package(s)"));

    assert!(registered_ids(&root).is_empty());
    assert!(!root.path().join("Acme/core").exists());
}

#[test]
fn test_install_rejects_tampered_artifact() {
    let mut server = Server::new();
    let root = tempdir().unwrap();

    let core_zip = create_zip(&[("manifest.json", CORE_MANIFEST)]);
    // catalog advertises a hash the artifact does not have
    let body = catalog_body(&server.url(), &digest(b"something else"), "unused");
    let _index = server
        .mock("GET", "/index.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .create();
    let _artifact = server
        .mock("GET", "/core.zip")
        .with_status(200)
        .with_body(core_zip)
        .create();

    depot(&root, &server)
        .args(["install", "Acme@core"])
        .write_stdin("n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Checksum"));

    // nothing was registered or placed
    assert!(!root.path().join("installed.json").exists());
    assert!(!root.path().join("Acme").exists());
}

#[test]
fn test_who_depends_output() {
    let mut server = Server::new();
    let _mocks = serve_catalog(&mut server);
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["install", "Acme@app"])
        .assert()
        .success();

    depot(&root, &server)
        .args(["who-depends", "Acme@core"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme@app"));

    depot(&root, &server)
        .args(["who-depends", "Acme@app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no installed package depends on"));
}

#[test]
fn test_uninstall_missing_package_is_reported_not_fatal() {
    let server = Server::new();
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["uninstall", "Acme@ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not installed"));
}

#[test]
fn test_listing_commands() {
    let mut server = Server::new();
    let _mocks = serve_catalog(&mut server);
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["list-all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme@core: Core library"))
        .stdout(predicate::str::contains("Acme@app: An app"));

    depot(&root, &server)
        .args(["search", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme@app"))
        .stdout(predicate::str::contains("Acme@core").not());

    depot(&root, &server)
        .args(["versions", "Acme@core"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0 (latest)"));

    depot(&root, &server)
        .args(["install", "Acme@core"])
        .assert()
        .success();
    depot(&root, &server)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme@core (1.0.0): Core library"));
}

#[test]
fn test_update_replaces_stale_version() {
    let mut server = Server::new();
    let root = tempdir().unwrap();

    let v1_manifest = r#"{
        "author": "Acme",
        "name": "tool",
        "description": "A tool",
        "version": "1.0.0",
        "dependencies": []
    }"#;
    let v2_manifest = r#"{
        "author": "Acme",
        "name": "tool",
        "description": "A tool",
        "version": "2.0.0",
        "dependencies": []
    }"#;
    let v1_zip = create_zip(&[("manifest.json", v1_manifest), ("v1.txt", "1")]);
    let v2_zip = create_zip(&[("manifest.json", v2_manifest), ("v2.txt", "2")]);

    let url = server.url();
    let body = format!(
        r#"[{{
            "author": "Acme",
            "name": "tool",
            "description": "A tool",
            "versions": [
                {{"versionName": "1.0.0", "downloadURL": "{url}/v1.zip", "hash": "{}", "latest": false}},
                {{"versionName": "2.0.0", "downloadURL": "{url}/v2.zip", "hash": "{}", "latest": true}}
            ]
        }}]"#,
        digest(&v1_zip),
        digest(&v2_zip),
    );
    let _index = server
        .mock("GET", "/index.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .create();
    let _v1 = server
        .mock("GET", "/v1.zip")
        .with_status(200)
        .with_body(v1_zip)
        .create();
    let _v2 = server
        .mock("GET", "/v2.zip")
        .with_status(200)
        .with_body(v2_zip)
        .create();

    depot(&root, &server)
        .args(["install", "Acme@tool", "1.0.0"])
        .assert()
        .success();
    assert!(root.path().join("Acme/tool/v1.txt").exists());

    depot(&root, &server)
        .args(["update", "Acme@tool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated Acme@tool 1.0.0 -> 2.0.0"));

    // the old tree is gone, the new one is in place and registered
    assert!(!root.path().join("Acme/tool/v1.txt").exists());
    assert!(root.path().join("Acme/tool/v2.txt").exists());

    depot(&root, &server)
        .args(["update", "Acme@tool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already at 2.0.0"));
}

#[cfg(unix)]
#[test]
fn test_post_install_hook_runs_in_package_dir() {
    let mut server = Server::new();
    let root = tempdir().unwrap();

    let manifest = r#"{
        "author": "Acme",
        "name": "hooked",
        "description": "Ships a hook",
        "version": "1.0.0",
        "dependencies": [],
        "postInstallScript": "setup.sh"
    }"#;
    let zip = create_zip_with_modes(&[
        ("manifest.json", manifest, None),
        ("setup.sh", "#!/bin/sh\ntouch hook_ran\n", Some(0o755)),
    ]);

    let url = server.url();
    let body = format!(
        r#"[{{
            "author": "Acme",
            "name": "hooked",
            "description": "Ships a hook",
            "versions": [
                {{"versionName": "1.0.0", "downloadURL": "{url}/hooked.zip", "hash": "{}", "latest": true}}
            ]
        }}]"#,
        digest(&zip),
    );
    let _index = server
        .mock("GET", "/index.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .create();
    let _artifact = server
        .mock("GET", "/hooked.zip")
        .with_status(200)
        .with_body(zip)
        .create();

    depot(&root, &server)
        .args(["install", "Acme@hooked"])
        .assert()
        .success();

    assert!(root.path().join("Acme/hooked/hook_ran").exists());
}

#[test]
fn test_registry_document_round_trips() {
    let mut server = Server::new();
    let _mocks = serve_catalog(&mut server);
    let root = tempdir().unwrap();

    depot(&root, &server)
        .args(["install", "Acme@app"])
        .assert()
        .success();

    // a repair rewrites the registry; the document must survive unchanged
    // in content (entry order may differ, dependents must be preserved)
    let before = registry(&root);
    depot(&root, &server)
        .args(["repair", "Acme@core"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repaired Acme@core 1.0.0"));
    let after = registry(&root);

    let entry_by_name = |doc: &serde_json::Value, name: &str| -> serde_json::Value {
        doc["installed"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["name"] == name)
            .unwrap()
            .clone()
    };
    assert_eq!(entry_by_name(&before, "app"), entry_by_name(&after, "app"));
    assert_eq!(
        entry_by_name(&before, "core")["dependents"],
        entry_by_name(&after, "core")["dependents"]
    );
}
