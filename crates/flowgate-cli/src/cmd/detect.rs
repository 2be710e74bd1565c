use crate::output::{print_json, print_table};
use flowgate_core::drift::{verify_item, ArtifactScan, VerifyReport};
use flowgate_core::manifest::Manifest;
use flowgate_core::paths;
use flowgate_core::types::Stage;
use flowgate_core::FlowgateError;
use serde::Serialize;
use std::path::Path;

const EXIT_OK: i32 = 0;
const EXIT_FATAL: i32 = 1;
const EXIT_DRIFT: i32 = 2;

pub fn run(
    root: &Path,
    workitem: Option<&str>,
    verify: bool,
    all_workitems: bool,
    json: bool,
) -> anyhow::Result<i32> {
    if verify {
        run_verify(root, workitem, json)
    } else if all_workitems {
        run_all(root, json)
    } else {
        run_detect(root, workitem, json)
    }
}

// ---------------------------------------------------------------------------
// --verify
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct VerifyOutput {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    workitems: Vec<VerifyReport>,
}

fn run_verify(root: &Path, workitem: Option<&str>, json: bool) -> anyhow::Result<i32> {
    let Some(manifest) = Manifest::load_from_root(root) else {
        let error = FlowgateError::ManifestMissing(paths::MANIFEST_FILE.to_string());
        if json {
            print_json(&VerifyOutput {
                ok: false,
                error: Some(error.to_string()),
                warning: None,
                workitems: Vec::new(),
            })?;
            return Ok(EXIT_FATAL);
        }
        return Err(error.into());
    };

    let reports: Vec<VerifyReport> = manifest
        .items
        .iter()
        .filter(|item| workitem.map_or(true, |token| item.matches(token)))
        .map(|item| verify_item(root, item))
        .collect();
    let ok = reports.iter().all(|r| r.ok);
    let warning = (manifest.is_empty())
        .then(|| "manifest exists but has no work items registered".to_string());

    if json {
        print_json(&VerifyOutput {
            ok,
            error: None,
            warning,
            workitems: reports,
        })?;
    } else {
        println!("Manifest verification");
        if reports.is_empty() {
            println!("\n  No work items to verify.");
            if let Some(token) = workitem {
                println!("  Work item '{token}' not found in manifest.");
            }
        }
        for report in &reports {
            let status = if report.ok { "OK" } else { "DRIFT" };
            println!("\n  [{status}] {}", report.workitem);
            println!(
                "    Manifest stage: {}, Detected: {}",
                report.manifest_stage.as_deref().unwrap_or("?"),
                stage_str(report.detected_stage)
            );
            for issue in &report.issues {
                println!("    ! {issue}");
            }
        }
        let overall = if ok { "PASS" } else { "DRIFT DETECTED" };
        println!("\nOverall: {overall}");
    }

    Ok(if ok { EXIT_OK } else { EXIT_DRIFT })
}

// ---------------------------------------------------------------------------
// --all-workitems
// ---------------------------------------------------------------------------

fn run_all(root: &Path, json: bool) -> anyhow::Result<i32> {
    let Some(manifest) = Manifest::load_from_root(root) else {
        let error = FlowgateError::ManifestMissing(paths::MANIFEST_FILE.to_string());
        if json {
            // Soft condition outside --verify: report it, don't fail
            print_json(&serde_json::json!({ "error": error.to_string(), "workitems": [] }))?;
            return Ok(EXIT_OK);
        }
        return Err(error.into());
    };

    #[derive(Serialize)]
    struct ItemStatus<'a> {
        workitem: &'a str,
        id: Option<&'a str>,
        manifest_track: Option<&'a str>,
        manifest_stage: Option<&'a str>,
        detected_stage: Option<Stage>,
        next_stage: Option<Stage>,
    }

    let statuses: Vec<ItemStatus> = manifest
        .items
        .iter()
        .map(|item| {
            let scan = ArtifactScan::gather(root, item.id.as_deref());
            ItemStatus {
                workitem: &item.slug,
                id: item.id.as_deref(),
                manifest_track: item.track.as_deref(),
                manifest_stage: item.stage.as_deref(),
                detected_stage: scan.detect_stage(),
                next_stage: scan.next_stage(),
            }
        })
        .collect();

    if json {
        print_json(&serde_json::json!({ "workitems": statuses }))?;
    } else {
        let rows: Vec<Vec<String>> = statuses
            .iter()
            .map(|s| {
                vec![
                    s.workitem.to_string(),
                    s.id.unwrap_or("-").to_string(),
                    s.manifest_track.unwrap_or("?").to_string(),
                    s.manifest_stage.unwrap_or("?").to_string(),
                    stage_str(s.detected_stage).to_string(),
                ]
            })
            .collect();
        print_table(&["WORKITEM", "ID", "TRACK", "STAGE", "DETECTED"], &rows);
    }

    Ok(EXIT_OK)
}

// ---------------------------------------------------------------------------
// Default detection
// ---------------------------------------------------------------------------

fn run_detect(root: &Path, workitem: Option<&str>, json: bool) -> anyhow::Result<i32> {
    let scan = ArtifactScan::gather(root, workitem);
    let detected = scan.detect_stage();
    let next = scan.next_stage();
    let track = scan.suggest_track();

    if json {
        #[derive(Serialize)]
        struct DetectOutput<'a> {
            project_root: String,
            detected_at: String,
            workitem: Option<&'a str>,
            detected_stage: Option<Stage>,
            next_stage: Option<Stage>,
            suggested_track: &'static str,
            artifacts: &'a ArtifactScan,
        }
        print_json(&DetectOutput {
            project_root: root.display().to_string(),
            detected_at: chrono::Utc::now().to_rfc3339(),
            workitem,
            detected_stage: detected,
            next_stage: next,
            suggested_track: track.as_str(),
            artifacts: &scan,
        })?;
    } else {
        println!("Workflow status for {}", root.display());
        match detected {
            Some(stage) => println!("\nDetected stage: {stage} ({})", stage.name()),
            None => println!("\nDetected stage: none (not started)"),
        }
        if let Some(next) = next {
            println!("Next stage: {next} ({})", next.name());
        }
        println!("\nSuggested track: {track}");
        println!("  {}", track.description());
        let stages: Vec<&str> = track.stages().iter().map(|s| s.as_str()).collect();
        println!("  Stages: {}", stages.join(" -> "));

        println!("\nArtifacts found:");
        for (name, count) in [
            ("prd", scan.prd.iter().count()),
            ("discovery", scan.discovery.len()),
            ("specs", scan.specs.len()),
            ("adrs", scan.adrs.len()),
            ("features", scan.features.len()),
            ("opnotes", scan.opnotes.len()),
            ("tests", scan.tests.len()),
        ] {
            let mark = if count > 0 { "x" } else { " " };
            println!("  [{mark}] {name} ({count})");
        }
    }

    Ok(EXIT_OK)
}

fn stage_str(stage: Option<Stage>) -> &'static str {
    stage.map(Stage::as_str).unwrap_or("none")
}
