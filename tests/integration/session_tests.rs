use super::fakes::{config_in, file_names, FakeConverter, Rig};
use batchscan::config::DuplexMode;
use batchscan::error::ExitCode;
use batchscan::scanner::BatchParams;
use batchscan::session::{
    DuplexSessionController, OddPageManifest, Phase, Protocol, SessionOutcome, Toolchain,
};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

const ODD_TS: i64 = 1_700_000_000;
const EVEN_TS: i64 = 1_700_000_100;

fn read_document(outcome: &SessionOutcome) -> Vec<String> {
    match outcome {
        SessionOutcome::Compiled { document, .. } => fs::read_to_string(document)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect(),
        other => panic!("Expected Compiled, got {other:?}"),
    }
}

#[test]
fn test_odd_phase_writes_manifest() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(3);
    let controller = DuplexSessionController::new(&config, rig.tools(), ODD_TS);

    assert_eq!(controller.resolve_protocol(), Protocol::RunOdd);
    let outcome = controller.run();
    assert_eq!(
        outcome,
        SessionOutcome::OddPagesStored {
            manifest: config.manifest_path(),
            pages: 3,
            complete: true,
        }
    );
    assert_eq!(ExitCode::from(&outcome), ExitCode::Success);
    assert_eq!(rig.scanner.requests.borrow()[0].batch, BatchParams::odd());

    let manifest = OddPageManifest::load(&config.manifest_path()).unwrap();
    let expected: Vec<PathBuf> = [1, 3, 5]
        .iter()
        .map(|n| config.output_dir.join(format!("brscan-{ODD_TS}-part-00{n}.pdf")))
        .collect();
    assert_eq!(manifest.files, expected);
    assert_eq!(manifest.phase, Phase::Odd);

    // Raw rasters are gone once converted
    let names = file_names(&config.output_dir);
    assert!(names.iter().all(|n| !n.ends_with(".pnm")), "{names:?}");

    // Odd preview assembled next to the pages
    let calls = rig.assembler.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, expected);
    assert!(calls[0].1.starts_with(&config.output_dir));
    assert!(calls[0].1.to_string_lossy().ends_with("-odd.pdf"));

    // Nothing is exported or announced yet
    assert!(file_names(&config.export_dir).is_empty());
    assert!(rig.notifier.sent.borrow().is_empty());
}

#[test]
fn test_odd_preview_can_be_disabled() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.odd_preview = false;
    let rig = Rig::with_sheets(2);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert!(matches!(outcome, SessionOutcome::OddPagesStored { pages: 2, .. }));
    assert!(rig.assembler.calls.borrow().is_empty());
}

#[test]
fn test_even_phase_interleaves_and_cleans_up() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(3);
    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();

    let controller = DuplexSessionController::new(&config, rig.tools(), EVEN_TS);
    match controller.resolve_protocol() {
        Protocol::RunEven { odd_files } => assert_eq!(odd_files.len(), 3),
        other => panic!("Expected RunEven, got {other:?}"),
    }

    let outcome = controller.run();
    assert_eq!(rig.scanner.requests.borrow()[1].batch, BatchParams::even(6));
    match &outcome {
        SessionOutcome::Compiled {
            document,
            pages,
            interleaved,
            complete,
        } => {
            assert_eq!(*pages, 6);
            assert!(*interleaved);
            assert!(*complete);
            assert!(document.starts_with(&config.export_dir));
            assert!(document.to_string_lossy().ends_with("-6.pdf"));
        }
        other => panic!("Expected Compiled, got {other:?}"),
    }

    assert_eq!(
        read_document(&outcome),
        vec![
            format!("brscan-{ODD_TS}-part-001.pdf"),
            format!("brscan-{EVEN_TS}-part-002.pdf"),
            format!("brscan-{ODD_TS}-part-003.pdf"),
            format!("brscan-{EVEN_TS}-part-004.pdf"),
            format!("brscan-{ODD_TS}-part-005.pdf"),
            format!("brscan-{EVEN_TS}-part-006.pdf"),
        ]
    );

    assert!(!config.manifest_path().exists());
    assert!(file_names(&config.output_dir).is_empty());

    let sent = rig.notifier.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("with 6 pages created successfully!"));
}

#[test]
fn test_even_count_mismatch_compiles_even_pages_alone() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(3);
    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();

    rig.scanner.sheets.set(2);
    let outcome = DuplexSessionController::new(&config, rig.tools(), EVEN_TS).run();

    assert!(matches!(
        outcome,
        SessionOutcome::Compiled {
            pages: 2,
            interleaved: false,
            complete: true,
            ..
        }
    ));
    assert_eq!(
        read_document(&outcome),
        vec![
            format!("brscan-{EVEN_TS}-part-004.pdf"),
            format!("brscan-{EVEN_TS}-part-006.pdf"),
        ]
    );
    assert!(!config.manifest_path().exists());
}

#[test]
fn test_stale_manifest_restarts_odd_phase() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    OddPageManifest::new(vec![config.output_dir.join("gone-part-001.pdf")])
        .save(&config.manifest_path())
        .unwrap();

    let rig = Rig::with_sheets(2);
    let controller = DuplexSessionController::new(&config, rig.tools(), ODD_TS);
    assert_eq!(controller.resolve_protocol(), Protocol::RunOdd);
    assert!(!config.manifest_path().exists());

    let outcome = controller.run();
    assert!(matches!(outcome, SessionOutcome::OddPagesStored { pages: 2, .. }));
    assert_eq!(rig.scanner.requests.borrow()[0].batch, BatchParams::odd());
    let manifest = OddPageManifest::load(&config.manifest_path()).unwrap();
    assert_eq!(manifest.files.len(), 2);
}

#[test]
fn test_partially_missing_odd_pages_shrink_the_document() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(3);
    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    fs::remove_file(config.output_dir.join(format!("brscan-{ODD_TS}-part-003.pdf"))).unwrap();

    rig.scanner.sheets.set(2);
    let controller = DuplexSessionController::new(&config, rig.tools(), EVEN_TS);
    assert_eq!(controller.resolve_protocol().expected_pages(), Some(4));

    let outcome = controller.run();
    assert_eq!(rig.scanner.requests.borrow()[1].batch, BatchParams::even(4));
    assert_eq!(
        read_document(&outcome),
        vec![
            format!("brscan-{ODD_TS}-part-001.pdf"),
            format!("brscan-{EVEN_TS}-part-002.pdf"),
            format!("brscan-{ODD_TS}-part-005.pdf"),
            format!("brscan-{EVEN_TS}-part-004.pdf"),
        ]
    );
}

#[test]
fn test_single_mode_compiles_without_manifest() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Off;
    let rig = Rig::with_sheets(2);

    let controller = DuplexSessionController::new(&config, rig.tools(), ODD_TS);
    assert_eq!(controller.resolve_protocol(), Protocol::Single);
    let outcome = controller.run();

    assert_eq!(rig.scanner.requests.borrow()[0].batch, BatchParams::sequential());
    assert_eq!(
        read_document(&outcome),
        vec![
            format!("brscan-{ODD_TS}-part-001.pdf"),
            format!("brscan-{ODD_TS}-part-002.pdf"),
        ]
    );
    assert!(!config.manifest_path().exists());
    assert!(file_names(&config.output_dir).is_empty());
    assert_eq!(rig.notifier.sent.borrow().len(), 1);
    assert_eq!(ExitCode::from(&outcome), ExitCode::Success);
}

#[test]
fn test_auto_duplex_is_a_single_pass() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Auto;
    let rig = Rig::with_sheets(4);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert!(matches!(outcome, SessionOutcome::Compiled { pages: 4, .. }));
    assert!(!config.manifest_path().exists());
}

#[test]
fn test_single_mode_ignores_pending_manifest() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    let rig = Rig::with_sheets(1);
    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();

    config.duplex = DuplexMode::Off;
    let controller = DuplexSessionController::new(&config, rig.tools(), EVEN_TS);
    assert_eq!(controller.resolve_protocol(), Protocol::Single);
}

#[test]
fn test_dry_run_touches_nothing() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.dry_run = true;
    let rig = Rig::with_sheets(3);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    match &outcome {
        SessionOutcome::DryRun { phase, command } => {
            assert_eq!(*phase, Phase::Odd);
            assert!(command.contains("part-%03d.pnm"), "{command}");
        }
        other => panic!("Expected DryRun, got {other:?}"),
    }
    assert!(rig.scanner.requests.borrow().is_empty());
    assert!(file_names(&config.output_dir).is_empty());
    assert_eq!(ExitCode::from(&outcome), ExitCode::Success);
}

#[test]
fn test_scan_failure_keeps_pending_manifest() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(2);
    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();

    rig.scanner.fail.set(true);
    let outcome = DuplexSessionController::new(&config, rig.tools(), EVEN_TS).run();
    match &outcome {
        SessionOutcome::ScanFailed { phase, error } => {
            assert_eq!(*phase, Phase::Even);
            assert!(error.contains("Document feeder out of documents"));
        }
        other => panic!("Expected ScanFailed, got {other:?}"),
    }
    assert_eq!(ExitCode::from(&outcome), ExitCode::ScanFailed);
    assert!(config.manifest_path().exists());
}

#[test]
fn test_empty_even_scan_keeps_pending_manifest() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(2);
    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();

    rig.scanner.sheets.set(0);
    let outcome = DuplexSessionController::new(&config, rig.tools(), EVEN_TS).run();
    assert_eq!(outcome, SessionOutcome::NothingScanned { phase: Phase::Even });
    assert_eq!(ExitCode::from(&outcome), ExitCode::NothingScanned);
    assert!(config.manifest_path().exists());

    // The operator can simply run again
    rig.scanner.sheets.set(2);
    let outcome = DuplexSessionController::new(&config, rig.tools(), EVEN_TS + 1).run();
    assert!(matches!(
        outcome,
        SessionOutcome::Compiled {
            pages: 4,
            interleaved: true,
            ..
        }
    ));
}

#[test]
fn test_empty_odd_scan_writes_no_manifest() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(0);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert_eq!(outcome, SessionOutcome::NothingScanned { phase: Phase::Odd });
    assert!(!config.manifest_path().exists());
}

#[test]
fn test_partial_conversion_keeps_raw_scans() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Off;
    let rig = Rig {
        converter: FakeConverter::failing_on(&["part-002"]),
        ..Rig::with_sheets(3)
    };

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert!(matches!(
        outcome,
        SessionOutcome::Compiled {
            pages: 2,
            complete: false,
            ..
        }
    ));
    assert_eq!(ExitCode::from(&outcome), ExitCode::PartialSuccess);

    let names = file_names(&config.output_dir);
    assert!(names.contains(&format!("brscan-{ODD_TS}-part-001.pnm")));
    assert!(names.contains(&format!("brscan-{ODD_TS}-part-002.pnm")));
    assert!(names.contains(&format!("brscan-{ODD_TS}-part-003.pdf")));
}

#[test]
fn test_total_conversion_failure_writes_no_manifest() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig {
        converter: FakeConverter::failing_on(&["part-"]),
        ..Rig::with_sheets(2)
    };

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert_eq!(
        outcome,
        SessionOutcome::ConversionFailed {
            phase: Phase::Odd,
            scanned: 2,
        }
    );
    assert!(!config.manifest_path().exists());
    assert_eq!(file_names(&config.output_dir).len(), 2);
}

#[test]
fn test_assembly_failure_keeps_pages() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Off;
    let rig = Rig::with_sheets(2);
    rig.assembler.fail.set(true);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    match &outcome {
        SessionOutcome::Incomplete { phase, pages, error } => {
            assert_eq!(*phase, Phase::Single);
            assert_eq!(*pages, 2);
            assert!(error.contains("pdftk"));
        }
        other => panic!("Expected Incomplete, got {other:?}"),
    }
    assert_eq!(ExitCode::from(&outcome), ExitCode::PartialSuccess);
    assert_eq!(file_names(&config.output_dir).len(), 2);
    assert!(rig.notifier.sent.borrow().is_empty());
}

#[test]
fn test_rejected_notification_is_not_fatal() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Off;
    let rig = Rig::with_sheets(1);
    rig.notifier.reject.set(true);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert!(matches!(outcome, SessionOutcome::Compiled { complete: true, .. }));
    assert_eq!(rig.notifier.sent.borrow().len(), 1);
}

#[test]
fn test_runs_without_notifier() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Off;
    let rig = Rig::with_sheets(1);
    let tools = Toolchain {
        notifier: None,
        ..rig.tools()
    };

    let outcome = DuplexSessionController::new(&config, tools, ODD_TS).run();
    assert!(matches!(outcome, SessionOutcome::Compiled { pages: 1, .. }));
    assert!(rig.notifier.sent.borrow().is_empty());
}

#[test]
fn test_scratch_clearing_keeps_log_file() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Off;
    let log = config.log_dir.join(batchscan::logging::LOG_FILE_NAME);
    fs::write(&log, "earlier runs\n").unwrap();
    let rig = Rig::with_sheets(1);

    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert_eq!(file_names(&config.output_dir), vec!["batchscan.log".to_string()]);
}

/// `target` spelled relative to the working directory.
#[cfg(unix)]
fn relative_to_cwd(target: &std::path::Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap();
    let mut relative = PathBuf::new();
    for _ in cwd.components().skip(1) {
        relative.push("..");
    }
    relative.join(target.strip_prefix("/").unwrap())
}

#[cfg(unix)]
#[test]
fn test_manifest_lists_absolute_paths_for_relative_output_dir() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.output_dir = relative_to_cwd(&config.output_dir);
    config.log_dir = config.output_dir.clone();
    assert!(config.output_dir.is_relative());
    let rig = Rig::with_sheets(2);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert!(matches!(outcome, SessionOutcome::OddPagesStored { pages: 2, .. }));

    let manifest = OddPageManifest::load(&config.manifest_path()).unwrap();
    assert_eq!(manifest.files.len(), 2);
    assert!(manifest.files.iter().all(|p| p.is_absolute()), "{:?}", manifest.files);
    assert!(manifest.files.iter().all(|p| p.exists()));

    let outcome = DuplexSessionController::new(&config, rig.tools(), EVEN_TS).run();
    assert!(matches!(
        outcome,
        SessionOutcome::Compiled {
            pages: 4,
            interleaved: true,
            ..
        }
    ));
}

#[test]
fn test_document_survives_when_exported_into_output_dir() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.duplex = DuplexMode::Off;
    config.export_dir = config.output_dir.clone();
    let rig = Rig::with_sheets(2);

    let outcome = DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    let document = match &outcome {
        SessionOutcome::Compiled {
            document, complete, ..
        } => {
            assert!(*complete);
            document.clone()
        }
        other => panic!("Expected Compiled, got {other:?}"),
    };

    assert!(document.exists());
    assert_eq!(read_document(&outcome).len(), 2);
    let name = document.file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(file_names(&config.output_dir), vec![name]);
}

#[test]
fn test_even_partial_conversion_keeps_scratch_files() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let rig = Rig::with_sheets(2);
    DuplexSessionController::new(&config, rig.tools(), ODD_TS).run();
    assert!(config.manifest_path().exists());

    rig.converter
        .failing
        .borrow_mut()
        .push(format!("{EVEN_TS}-part-002"));
    let outcome = DuplexSessionController::new(&config, rig.tools(), EVEN_TS).run();
    assert_eq!(
        read_document(&outcome),
        vec![format!("brscan-{EVEN_TS}-part-004.pdf")]
    );
    match &outcome {
        SessionOutcome::Compiled {
            pages,
            interleaved,
            complete,
            ..
        } => {
            assert_eq!(*pages, 1);
            assert!(!*interleaved);
            assert!(!*complete);
        }
        other => panic!("Expected Compiled, got {other:?}"),
    }
    assert_eq!(ExitCode::from(&outcome), ExitCode::PartialSuccess);
    assert!(!config.manifest_path().exists());

    let names = file_names(&config.output_dir);
    for kept in [
        format!("brscan-{ODD_TS}-part-001.pdf"),
        format!("brscan-{ODD_TS}-part-003.pdf"),
        format!("brscan-{EVEN_TS}-part-002.pnm"),
        format!("brscan-{EVEN_TS}-part-004.pnm"),
        format!("brscan-{EVEN_TS}-part-004.pdf"),
    ] {
        assert!(names.contains(&kept), "{kept} missing from {names:?}");
    }
}
