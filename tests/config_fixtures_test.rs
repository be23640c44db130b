//! Configuration fixture tests using datatest-stable for test data discovery
//!
//! Fixtures live under `tests/testdata/<kind>/{valid,invalid}/*.yaml`, where
//! `<kind>` names the file type. Each valid fixture must parse, and writing it
//! must be stable: the written form reads back and writes out byte-for-byte
//! the same. Each invalid fixture must fail with a user error, and its first
//! line, `# error: <text>`, names text the error message must contain.

use bufconfig::buf_lock::BufLockFile;
use bufconfig::buf_policy_yaml::BufPolicyYamlFile;
use bufconfig::buf_work_yaml::BufWorkYamlFile;
use bufconfig::buf_yaml::BufYamlFile;
use bufconfig::error::Result;
use bufconfig::generate::BufGenYamlFile;
use std::path::Path;

/// Parse `data` as the file kind named by the fixture directory and return
/// its canonical form.
fn canonical(kind: &str, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        "buf_yaml" => BufYamlFile::parse_named("buf.yaml", data, false)?.to_bytes(),
        "buf_work_yaml" => BufWorkYamlFile::parse_named("buf.work.yaml", data)?.to_bytes(),
        "buf_gen_yaml" => BufGenYamlFile::parse_named("buf.gen.yaml", data)?.to_bytes(),
        "buf_lock" => BufLockFile::parse_named("buf.lock", data)?.to_bytes(),
        "buf_policy_yaml" => BufPolicyYamlFile::parse_named("buf.policy.yaml", data)?.to_bytes(),
        other => panic!("unknown fixture kind {:?}", other),
    }
}

fn dir_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Test one fixture file.
///
/// This test is automatically run for each YAML file in the testdata directory.
fn test_config_fixture(path: &Path) -> datatest_stable::Result<()> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read test file {}: {}", path.display(), e))?;
    let expectation_dir = path.parent().ok_or("fixture has no parent directory")?;
    let kind_dir = expectation_dir.parent().ok_or("fixture has no kind directory")?;
    let kind = dir_name(kind_dir);

    match dir_name(expectation_dir) {
        "valid" => {
            let written = canonical(kind, &data)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
            let rewritten = canonical(kind, &written).map_err(|e| {
                format!(
                    "Canonical form of {} does not read back: {}\n{}",
                    path.display(),
                    e,
                    String::from_utf8_lossy(&written)
                )
            })?;
            assert_eq!(
                String::from_utf8_lossy(&rewritten),
                String::from_utf8_lossy(&written),
                "Writing {} is not stable",
                path.display()
            );
        }
        "invalid" => {
            let text = String::from_utf8_lossy(&data);
            let expected = text
                .lines()
                .next()
                .and_then(|line| line.strip_prefix("# error: "))
                .ok_or_else(|| format!("{} must start with '# error: <text>'", path.display()))?;
            let err = match canonical(kind, &data) {
                Ok(_) => return Err(format!("{} parsed but should fail", path.display()).into()),
                Err(e) => e,
            };
            assert!(
                err.is_user_error(),
                "{} failed with an internal error: {}",
                path.display(),
                err
            );
            assert!(
                err.to_string().contains(expected.trim()),
                "error for {} was {:?}, expected it to contain {:?}",
                path.display(),
                err.to_string(),
                expected
            );
        }
        other => return Err(format!("unexpected fixture directory {:?}", other).into()),
    }
    Ok(())
}

// Register datatest harness to discover and run tests on all YAML files in testdata directory
datatest_stable::harness!(test_config_fixture, "tests/testdata", r".*\.yaml$");
