//! End-to-end tests for the upgrade orchestrator

use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use httpmock::prelude::*;
use malt_config::Config;
use malt_errors::{Error, UpgradeError};
use malt_events::{channel, Frame, ReportReceiver, Stage};
use malt_hash::Hash;
use malt_state::AccountStore;
use malt_types::{Account, Asset, Upgrade};
use malt_upgrade::UpgradeOrchestrator;
use std::path::Path;

fn account(version: &str, newver: bool, upgrade: Option<Upgrade>) -> Account {
    Account {
        metadata: Account::METADATA.to_string(),
        name: "malt".to_string(),
        key: "k-1".to_string(),
        serial: "AAAA-BBBB".to_string(),
        os: "linux".to_string(),
        version: version.to_string(),
        create_time: Utc::now(),
        newver,
        upgrade,
    }
}

fn upgrade_descriptor(source: String, hash: String) -> Upgrade {
    Upgrade {
        name: "malt".to_string(),
        version: "2.4.0".to_string(),
        asset: Asset {
            os: "linux".to_string(),
            source,
            hash,
        },
        changelog: "fixes".to_string(),
        date: Utc::now(),
    }
}

/// A minimal application archive: new web tree, new server binary
fn tgz_asset() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content) in [
        ("web/index.html", "<html>new</html>"),
        ("bin/malt-server", "new-elf"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn config_rooted_at(root: &Path, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.paths.app_root = root.to_path_buf();
    config.service.login_url = server.url("/login");
    config.service.check_url = server.url("/check");
    config.service.netdisk_login_url = server.url("/netdisk/login");
    config.service.public_bucket = true;
    config.network.retries = 0;
    config
}

fn seed_live_tree(root: &Path) {
    std::fs::create_dir_all(root.join("conf")).unwrap();
    std::fs::write(root.join("conf/app.toml"), "x = 1").unwrap();
    std::fs::create_dir_all(root.join("asset/medal")).unwrap();
    std::fs::write(root.join("asset/medal/star.png"), [1u8]).unwrap();
    std::fs::create_dir_all(root.join("web")).unwrap();
    std::fs::write(root.join("web/index.html"), "<html>old</html>").unwrap();
    std::fs::create_dir_all(root.join("bin")).unwrap();
    std::fs::write(root.join("bin/malt-server"), "old-elf").unwrap();
}

fn drain(mut rx: ReportReceiver) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

fn error_frames(frames: &[Frame]) -> Vec<i32> {
    frames
        .iter()
        .filter_map(|frame| match frame {
            Frame::Error { code, .. } => Some(*code),
            Frame::Progress { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn full_upgrade_emits_the_stage_sequence_and_swaps_the_tree() {
    let server = MockServer::start();
    let asset = tgz_asset();
    let hash = Hash::from_data(&asset).to_hex();
    server.mock(|when, then| {
        when.method(GET).path("/asset.tgz");
        then.status(200)
            .header("content-length", asset.len().to_string())
            .body(&asset);
    });

    let dir = tempfile::tempdir().unwrap();
    seed_live_tree(dir.path());
    let config = config_rooted_at(dir.path(), &server);

    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts
        .save(&account(
            "2.3.0",
            true,
            Some(upgrade_descriptor(server.url("/asset.tgz"), hash)),
        ))
        .await
        .unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config, accounts.clone()).unwrap();
    let (tx, rx) = channel();
    orchestrator.launch(&tx).await.unwrap();

    let frames = drain(rx);
    assert!(error_frames(&frames).is_empty());

    // DOWNLOAD frames come first, percent never decreases, and the stage
    // closes at 100 before UNCOMPRESSION begins.
    let stages: Vec<(Stage, i32)> = frames
        .iter()
        .map(|frame| match frame {
            Frame::Progress { state, .. } => (state.stage, state.progress),
            Frame::Error { .. } => unreachable!(),
        })
        .collect();

    let download: Vec<i32> = stages
        .iter()
        .take_while(|(stage, _)| *stage == Stage::Download)
        .map(|(_, percent)| *percent)
        .collect();
    assert!(!download.is_empty());
    assert!(download.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(*download.last().unwrap(), 100);

    let tail: Vec<(Stage, i32)> = stages[download.len()..].to_vec();
    assert_eq!(
        tail,
        vec![
            (Stage::Uncompression, 0),
            (Stage::Uncompression, 100),
            (Stage::Done, 100),
        ]
    );

    // The staged tree replaced the live one; backups were taken first.
    let root = dir.path();
    assert_eq!(
        std::fs::read_to_string(root.join("web/index.html")).unwrap(),
        "<html>new</html>"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("bin/malt-server")).unwrap(),
        "new-elf"
    );
    assert!(root.join("backup/conf/app.toml").exists());
    assert!(root.join("backup/medal/star.png").exists());

    // Pending flag survives until the reboot is confirmed.
    assert!(accounts.load().await.unwrap().newver);
    orchestrator.confirm_reboot().await.unwrap();
    let confirmed = accounts.load().await.unwrap();
    assert!(!confirmed.newver);
    assert_eq!(confirmed.version, "2.4.0");
}

#[tokio::test]
async fn unreachable_asset_emits_one_error_and_leaves_the_flag() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/asset.tgz");
        then.status(404);
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts
        .save(&account(
            "2.3.0",
            true,
            Some(upgrade_descriptor(
                server.url("/asset.tgz"),
                "00".repeat(32),
            )),
        ))
        .await
        .unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config, accounts.clone()).unwrap();
    let (tx, rx) = channel();
    let err = orchestrator.launch(&tx).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));

    let frames = drain(rx);
    assert_eq!(error_frames(&frames), vec![81]);
    assert!(accounts.load().await.unwrap().newver);
}

#[tokio::test]
async fn checksum_mismatch_aborts_before_extraction() {
    let server = MockServer::start();
    let asset = tgz_asset();
    server.mock(|when, then| {
        when.method(GET).path("/asset.tgz");
        then.status(200).body(&asset);
    });

    let dir = tempfile::tempdir().unwrap();
    seed_live_tree(dir.path());
    let config = config_rooted_at(dir.path(), &server);
    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts
        .save(&account(
            "2.3.0",
            true,
            Some(upgrade_descriptor(
                server.url("/asset.tgz"),
                Hash::from_data(b"something else").to_hex(),
            )),
        ))
        .await
        .unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config, accounts).unwrap();
    let (tx, rx) = channel();
    orchestrator.launch(&tx).await.unwrap_err();

    assert_eq!(error_frames(&drain(rx)), vec![81]);
    // The live tree must be untouched: no extraction happened.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("web/index.html")).unwrap(),
        "<html>old</html>"
    );
}

#[tokio::test]
async fn second_launch_stops_with_already_latest() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts
        .save(&account("2.4.0", false, None))
        .await
        .unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config.clone(), accounts).unwrap();
    let (tx, rx) = channel();
    let err = orchestrator.launch(&tx).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Upgrade(UpgradeError::AlreadyLatest)
    ));

    // One informational frame, and no file operations at all.
    assert_eq!(error_frames(&drain(rx)), vec![83]);
    assert!(!config.paths.temp_dir().exists());
}

#[tokio::test]
async fn check_records_the_descriptor_and_caches_the_token() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/login")
            .json_body(serde_json::json!({"key": "k-1", "serial": "AAAA-BBBB"}));
        then.status(200)
            .json_body(serde_json::json!({"code": 0, "token": "tok-1"}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/check")
            .header("authorization", "Bearer tok-1")
            .json_body(serde_json::json!({"os": "linux", "version": "2.3.0"}));
        then.status(200).json_body(serde_json::json!({
            "code": 0,
            "upgrade": {
                "name": "malt",
                "version": "2.4.0",
                "asset": {"os": "linux", "source": "https://cdn.example.com/a.tgz", "hash": "00"},
                "changelog": "fixes",
                "date": "2024-05-02T00:00:00Z"
            }
        }));
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts.save(&account("2.3.0", false, None)).await.unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config, accounts.clone()).unwrap();

    let summary = orchestrator.check().await.unwrap().unwrap();
    assert_eq!(summary.version, "2.4.0");

    let recorded = accounts.load().await.unwrap();
    assert!(recorded.newver);
    assert_eq!(recorded.upgrade.unwrap().version, "2.4.0");

    // A second check reuses the cached bearer token.
    orchestrator.check().await.unwrap();
    login.assert_hits(1);
}

#[tokio::test]
async fn check_with_no_update_is_a_no_op() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200)
            .json_body(serde_json::json!({"code": 0, "token": "tok-1"}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/check");
        then.status(200)
            .json_body(serde_json::json!({"code": 0, "upgrade": null}));
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts.save(&account("2.4.0", false, None)).await.unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config, accounts.clone()).unwrap();
    assert!(orchestrator.check().await.unwrap().is_none());
    assert!(!accounts.load().await.unwrap().newver);
}

#[tokio::test]
async fn failed_login_surfaces_as_login_token_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200)
            .json_body(serde_json::json!({"code": 1, "token": ""}));
    });

    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts.save(&account("2.3.0", false, None)).await.unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config, accounts).unwrap();
    let err = orchestrator.check().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Upgrade(UpgradeError::LoginToken { .. })
    ));
}

#[tokio::test]
async fn private_bucket_downloads_carry_the_netdisk_token() {
    let server = MockServer::start();
    let asset = tgz_asset();
    let hash = Hash::from_data(&asset).to_hex();
    server.mock(|when, then| {
        when.method(POST).path("/netdisk/login");
        then.status(200).body("disk-token");
    });
    let download = server.mock(|when, then| {
        when.method(GET)
            .path("/asset.tgz")
            .header("authorization", "Bearer disk-token");
        then.status(200).body(&asset);
    });

    let dir = tempfile::tempdir().unwrap();
    seed_live_tree(dir.path());
    let mut config = config_rooted_at(dir.path(), &server);
    config.service.public_bucket = false;

    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts
        .save(&account(
            "2.3.0",
            true,
            Some(upgrade_descriptor(server.url("/asset.tgz"), hash)),
        ))
        .await
        .unwrap();

    let mut orchestrator = UpgradeOrchestrator::new(config, accounts).unwrap();
    let (tx, rx) = channel();
    orchestrator.launch(&tx).await.unwrap();
    download.assert();
    assert!(error_frames(&drain(rx)).is_empty());
}

#[tokio::test]
async fn reboot_writes_the_pid_file_and_reports_spawn_failures() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    let config = config_rooted_at(dir.path(), &server);
    let accounts = AccountStore::open(&config.paths.state_dir());
    accounts.save(&account("2.4.0", false, None)).await.unwrap();

    let orchestrator = UpgradeOrchestrator::new(config.clone(), accounts).unwrap();
    let (tx, rx) = channel();

    // The helper binary does not exist in this sandbox, so the hand-off
    // fails after the pid file is written.
    let err = orchestrator.reboot(&tx).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Upgrade(UpgradeError::RebootFailed { .. })
    ));
    assert_eq!(error_frames(&drain(rx)), vec![82]);

    let pid = malt_state::read_pid(&config.paths.pid_file()).await.unwrap();
    assert_eq!(pid, std::process::id());
}
