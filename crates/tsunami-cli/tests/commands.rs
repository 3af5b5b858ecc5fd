//! # Subcommand Tests
//!
//! Drives each handler against the manifest fixtures and captures its
//! output in memory.

use std::path::{Path, PathBuf};

use tsunami_cli::decode::{run_decode, DecodeArgs, OutputFormat};
use tsunami_cli::describe::run_describe;
use tsunami_cli::encode::{run_encode, EncodeArgs};
use tsunami_cli::matching::{run_match, MatchArgs};
use tsunami_cli::validate::{run_validate, ValidateArgs};
use tsunami_manifest::{DocumentFormat, ManifestLoader};
use tsunami_proto::{DecodeOptions, SelectionConfig};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../tsunami-manifest/testdata")
        .join(name)
}

fn capture(run: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<u8>) -> (u8, String) {
    let mut out = Vec::new();
    let code = run(&mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn validate_clean_manifest() {
    let args = ValidateArgs {
        manifest: fixture("plugins.yaml"),
        deny_warnings: true,
    };
    let (code, text) = capture(|out| run_validate(&args, out));
    assert_eq!(code, 0);
    assert!(text.contains("5 plugin(s), 0 warning(s)"), "{text}");
    assert!(!text.contains("WARN"));
}

#[test]
fn validate_reports_warnings() {
    let mut args = ValidateArgs {
        manifest: fixture("warnings.json"),
        deny_warnings: false,
    };
    let (code, text) = capture(|out| run_validate(&args, out));
    assert_eq!(code, 0);
    assert!(text.contains("WARN "), "{text}");
    assert!(text.contains("OK "), "{text}");

    args.deny_warnings = true;
    let (code, _) = capture(|out| run_validate(&args, out));
    assert_eq!(code, 1);
}

#[test]
fn validate_reports_schema_violations() {
    let args = ValidateArgs {
        manifest: fixture("invalid.yaml"),
        deny_warnings: false,
    };
    let (code, text) = capture(|out| run_validate(&args, out));
    assert_eq!(code, 1);
    assert!(text.starts_with("FAIL "), "{text}");
    assert!(text.contains("plugin-manifest.schema.json"));
    assert!(text.contains("/plugins/0/info/type"), "{text}");
}

#[test]
fn validate_missing_file_is_an_error() {
    let args = ValidateArgs {
        manifest: fixture("absent.yaml"),
        deny_warnings: false,
    };
    assert!(run_validate(&args, &mut Vec::new()).is_err());
}

#[test]
fn encode_then_decode_file() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("plugins.bin");
    let encode = EncodeArgs {
        manifest: fixture("plugins.yaml"),
        output: Some(bin.clone()),
    };
    let (code, text) = capture(|out| run_encode(&encode, out));
    assert_eq!(code, 0);
    assert!(text.starts_with("wrote 5 definition(s)"), "{text}");

    let decode = DecodeArgs {
        input: bin,
        hex: false,
        format: OutputFormat::Yaml,
    };
    let (code, yaml) = capture(|out| run_decode(&decode, DecodeOptions::default(), out));
    assert_eq!(code, 0);

    let loader = ManifestLoader::new().unwrap();
    let original = loader.load_manifest_file(&fixture("plugins.yaml")).unwrap();
    let decoded = loader.load_manifest_str(&yaml, DocumentFormat::Yaml).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn encode_hex_then_decode_hex() {
    let encode = EncodeArgs {
        manifest: fixture("plugins.yaml"),
        output: None,
    };
    let (_, hex_text) = capture(|out| run_encode(&encode, out));
    assert_eq!(hex_text.lines().count(), 5);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugins.hex");
    std::fs::write(&path, &hex_text).unwrap();

    let decode = DecodeArgs {
        input: path,
        hex: true,
        format: OutputFormat::Json,
    };
    let (code, json) = capture(|out| run_decode(&decode, DecodeOptions::default(), out));
    assert_eq!(code, 0);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["plugins"].as_array().unwrap().len(), 5);
    assert_eq!(value["plugins"][2]["info"]["name"], "NginxRangeDetector");
    assert_eq!(value["plugins"][1]["for_web_service"], true);
}

#[test]
fn decode_skips_corrupted_message() {
    let encode = EncodeArgs {
        manifest: fixture("plugins.yaml"),
        output: None,
    };
    let (_, hex_text) = capture(|out| run_encode(&encode, out));
    let mut lines: Vec<String> = hex_text.lines().map(str::to_owned).collect();
    // Frame of two bytes whose body declares field 4 as length-delimited.
    lines.insert(1, "022200".to_owned());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.hex");
    std::fs::write(&path, lines.join("\n")).unwrap();

    let decode = DecodeArgs {
        input: path,
        hex: true,
        format: OutputFormat::Json,
    };
    let (code, json) = capture(|out| run_decode(&decode, DecodeOptions::default(), out));
    assert_eq!(code, 1);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["plugins"].as_array().unwrap().len(), 5);
}

#[test]
fn decode_rejects_bad_hex() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.hex");
    std::fs::write(&path, "0a zz").unwrap();
    let decode = DecodeArgs {
        input: path,
        hex: true,
        format: OutputFormat::Yaml,
    };
    let err = run_decode(&decode, DecodeOptions::default(), &mut Vec::new()).unwrap_err();
    assert!(err.to_string().contains("invalid hex"), "{err}");
}

#[test]
fn match_lists_plugins_per_target() {
    let args = MatchArgs {
        manifest: fixture("plugins.yaml"),
        targets: fixture("targets.yaml"),
    };
    let (code, text) = capture(|out| run_match(&args, &SelectionConfig::default(), out));
    assert_eq!(code, 0);
    let expected = "\
10.0.0.5:443
  /Tsunami Team/PORT_SCAN/NmapPortScanner/0.1
  /Tsunami Team/SERVICE_FINGERPRINT/WebServiceFingerprinter/0.1
  /Tsunami Team/VULN_DETECTION/NginxRangeDetector/1.0
10.0.0.7:445
  /Tsunami Team/PORT_SCAN/NmapPortScanner/0.1
  /Tsunami Team/VULN_DETECTION/WindowsSmbDetector/1.0
10.0.0.9:22
  /Tsunami Team/PORT_SCAN/NmapPortScanner/0.1
  /Tsunami Team/VULN_DETECTION/SshDetector/1.0
";
    assert_eq!(text, expected);
}

#[test]
fn match_honours_detector_selection() {
    let args = MatchArgs {
        manifest: fixture("plugins.yaml"),
        targets: fixture("targets.yaml"),
    };
    let selection = SelectionConfig {
        detectors_include: Vec::new(),
        detectors_exclude: vec!["SshDetector".to_owned()],
    };
    let (_, text) = capture(|out| run_match(&args, &selection, out));
    assert!(!text.contains("SshDetector"));
    assert!(text.contains("10.0.0.9:22\n  /Tsunami Team/PORT_SCAN/NmapPortScanner/0.1\n"));
}

#[test]
fn describe_prints_descriptors() {
    let (code, text) = capture(|out| run_describe(out));
    assert_eq!(code, 0);
    assert!(text.starts_with("message tsunami.proto.PluginDefinition\n"), "{text}");
    assert!(text.contains("enum tsunami.proto.PluginInfo.PluginType"));
    assert!(text.contains("uint32 min_accuracy"));
}
