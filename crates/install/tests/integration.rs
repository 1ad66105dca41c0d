//! End-to-end tests for the batch content installer

use httpmock::prelude::*;
use malt_config::Config;
use malt_errors::Error;
use malt_events::{channel, Frame, ReportReceiver, Stage};
use malt_install::ContentInstaller;
use malt_state::Registry;
use malt_types::ItemKind;
use std::path::Path;

/// A minimal content bundle: icon subdirectory plus an entry page
fn tool_bundle() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in [
        ("media/icon.svg", "<svg/>"),
        ("pages/index.html", "<html>tool</html>"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

fn catalog_item(name: &str, version: &str, url: String, purchased: bool) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "title": name,
        "version": version,
        "download_url": url,
        "purchased": purchased,
    })
}

fn config_rooted_at(root: &Path, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.paths.app_root = root.to_path_buf();
    config.service.tool_mall_url = server.url("/mall/tools");
    config.service.course_mall_url = server.url("/mall/courses");
    config.service.tools_update_url = server.url("/updates/tools");
    config.service.netdisk_login_url = server.url("/netdisk/login");
    config.network.retries = 0;
    config
}

fn drain(mut rx: ReportReceiver) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

fn mock_netdisk_login(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/netdisk/login");
        then.status(200).body("disk-token");
    });
}

fn mock_tool_catalog(server: &MockServer, items: Vec<serde_json::Value>) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/mall/tools")
            .header("productKey", "k-1")
            .header("productSerial", "s-1");
        then.status(200)
            .json_body(serde_json::json!({"code": 0, "tools": items}));
    });
}

#[tokio::test]
async fn install_downloads_extracts_and_registers_purchased_items() {
    let server = MockServer::start();
    let bundle = tool_bundle();
    mock_netdisk_login(&server);
    mock_tool_catalog(
        &server,
        vec![
            catalog_item("paint", "1.0", server.url("/bundles/paint.tar"), true),
            catalog_item("logic", "2.0", server.url("/bundles/logic.tar"), true),
            catalog_item("locked", "1.0", server.url("/bundles/locked.tar"), false),
        ],
    );
    for name in ["paint", "logic"] {
        server.mock(|when, then| {
            when.method(GET)
                .path(format!("/bundles/{name}.tar"))
                .header("authorization", "Bearer disk-token");
            then.status(200).body(&bundle);
        });
    }
    let locked = server.mock(|when, then| {
        when.method(GET).path("/bundles/locked.tar");
        then.status(200).body(&bundle);
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let registry = Registry::open(&config.paths.state_dir(), ItemKind::Tool);
    let installer = ContentInstaller::new(config, registry.clone()).unwrap();

    let (tx, rx) = channel();
    let count = installer.install("k-1", "s-1", &tx).await.unwrap();
    assert_eq!(count, 2);

    // Unpurchased items are never fetched.
    locked.assert_hits(0);

    let items = registry.all().await.unwrap();
    assert_eq!(items.len(), 2);
    let paint = registry.get("paint").await.unwrap().unwrap();
    assert_eq!(paint.icon, "asset/tools/paint/media/icon.svg");
    assert_eq!(paint.relpath, "asset/tools/paint/pages/index.html");

    // Extracted tree is in place and the bundle file is gone.
    let paint_dir = dir.path().join("asset/tools/paint");
    assert!(paint_dir.join("pages/index.html").exists());
    assert!(!paint_dir.join("tool.tar").exists());

    // Per-item stage frames and a single terminal DONE.
    let frames = drain(rx);
    let done: Vec<_> = frames
        .iter()
        .filter(|frame| matches!(frame, Frame::Progress { state, .. } if state.stage == Stage::Done))
        .collect();
    assert_eq!(done.len(), 1);
    assert!(frames.iter().any(|frame| matches!(
        frame,
        Frame::Progress { state, .. }
            if state.stage == Stage::Uncompression && state.name.as_deref() == Some("paint")
    )));
}

#[tokio::test]
async fn install_twice_converges_to_the_same_registry() {
    let server = MockServer::start();
    let bundle = tool_bundle();
    mock_netdisk_login(&server);
    mock_tool_catalog(
        &server,
        vec![catalog_item(
            "paint",
            "1.0",
            server.url("/bundles/paint.tar"),
            true,
        )],
    );
    server.mock(|when, then| {
        when.method(GET).path("/bundles/paint.tar");
        then.status(200).body(&bundle);
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let registry = Registry::open(&config.paths.state_dir(), ItemKind::Tool);
    let installer = ContentInstaller::new(config, registry.clone()).unwrap();

    let (tx, _rx) = channel();
    installer.install("k-1", "s-1", &tx).await.unwrap();
    let first = registry.all().await.unwrap();

    installer.install("k-1", "s-1", &tx).await.unwrap();
    let second = registry.all().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].name, second[0].name);
    assert_eq!(first[0].version, second[0].version);
    assert_eq!(first[0].relpath, second[0].relpath);
}

#[tokio::test]
async fn one_failing_item_aborts_the_call_with_one_error_frame() {
    let server = MockServer::start();
    let bundle = tool_bundle();
    mock_netdisk_login(&server);
    mock_tool_catalog(
        &server,
        vec![
            catalog_item("paint", "1.0", server.url("/bundles/paint.tar"), true),
            catalog_item("broken", "1.0", server.url("/bundles/broken.tar"), true),
        ],
    );
    server.mock(|when, then| {
        when.method(GET).path("/bundles/paint.tar");
        then.status(200).body(&bundle);
    });
    server.mock(|when, then| {
        when.method(GET).path("/bundles/broken.tar");
        then.status(404);
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let registry = Registry::open(&config.paths.state_dir(), ItemKind::Tool);
    let installer = ContentInstaller::new(config, registry).unwrap();

    let (tx, rx) = channel();
    let err = installer.install("k-1", "s-1", &tx).await.unwrap_err();
    assert!(matches!(err, Error::Install(_)));

    let errors: Vec<i32> = drain(rx)
        .into_iter()
        .filter_map(|frame| match frame {
            Frame::Error { code, .. } => Some(code),
            Frame::Progress { .. } => None,
        })
        .collect();
    assert_eq!(errors, vec![72]);
}

#[tokio::test]
async fn public_bucket_registers_from_metadata_without_downloading() {
    let server = MockServer::start();
    mock_tool_catalog(
        &server,
        vec![catalog_item(
            "paint",
            "1.0",
            "https://bucket.example.com/paint.tar".to_string(),
            true,
        )],
    );
    let netdisk = server.mock(|when, then| {
        when.method(POST).path("/netdisk/login");
        then.status(200).body("disk-token");
    });

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_rooted_at(dir.path(), &server);
    config.service.public_bucket = true;
    let registry = Registry::open(&config.paths.state_dir(), ItemKind::Tool);
    let installer = ContentInstaller::new(config, registry.clone()).unwrap();

    let (tx, _rx) = channel();
    let count = installer.install("k-1", "s-1", &tx).await.unwrap();
    assert_eq!(count, 1);
    netdisk.assert_hits(0);

    let paint = registry.get("paint").await.unwrap().unwrap();
    assert_eq!(paint.version, "1.0");
}

#[tokio::test]
async fn verdict_without_new_content_means_no_download() {
    let server = MockServer::start();
    let update = server.mock(|when, then| {
        when.method(POST).path("/updates/tools");
        then.status(200)
            .json_body(serde_json::json!({"code": 0, "newver": false}));
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let registry = Registry::open(&config.paths.state_dir(), ItemKind::Tool);
    let installer = ContentInstaller::new(config, registry.clone()).unwrap();

    let verdict = installer.check_updates("k-1", "s-1").await.unwrap();
    update.assert();
    assert!(!verdict.newver);
    assert!(verdict.items.is_empty());
    // Nothing was fetched or registered.
    assert!(registry.all().await.unwrap().is_empty());
    assert!(!dir.path().join("asset").exists());
}
