use chunkdiff::config::effective_chunk_size;
use chunkdiff::report::{render, ReportFormat};
use chunkdiff::sync::build_parallel;
use chunkdiff::{
    build_signature_table, compute_delta, DeltaOp, RollingHash, SignatureTable, SyncError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn diff_files(old: &Path, new: &Path, chunk_size: usize) -> Result<Vec<DeltaOp>, SyncError> {
    let table = build_signature_table(File::open(old)?, chunk_size)?;
    Ok(compute_delta(table, File::open(new)?, chunk_size)?.ops)
}

fn write_pair(dir: &TempDir, old: &[u8], new: &[u8]) -> (PathBuf, PathBuf) {
    let old_path = dir.path().join("old.txt");
    let new_path = dir.path().join("new.txt");
    fs::write(&old_path, old).unwrap();
    fs::write(&new_path, new).unwrap();
    (old_path, new_path)
}

fn assert_conserved(ops: &[DeltaOp], chunks: u64) {
    let mut seen: HashMap<u64, usize> = HashMap::new();
    for ordinal in ops.iter().filter_map(DeltaOp::baseline_ordinal) {
        *seen.entry(ordinal).or_default() += 1;
    }
    assert_eq!(seen.len() as u64, chunks, "ops: {:?}", ops);
    assert!(seen.values().all(|&n| n == 1), "ops: {:?}", ops);
}

#[test]
fn test_interior_removal_from_files() {
    let dir = TempDir::new().unwrap();
    let (old, new) = write_pair(&dir, b"AAAABBBBCCCC", b"AAAACCCC");

    let ops = diff_files(&old, &new, 4).unwrap();
    assert_eq!(
        ops,
        vec![
            DeltaOp::Unmodified { ordinal: 1 },
            DeltaOp::Removed { ordinal: 2 },
            DeltaOp::Unmodified { ordinal: 3 },
        ]
    );
}

#[test]
fn test_identity_is_all_unmodified() {
    let dir = TempDir::new().unwrap();
    let data: Vec<u8> = b"0123456789abcdef".repeat(64);
    let (old, new) = write_pair(&dir, &data, &data);

    let ops = diff_files(&old, &new, 16).unwrap();
    let expected: Vec<DeltaOp> = (1..=64)
        .map(|ordinal| DeltaOp::Unmodified { ordinal })
        .collect();
    assert_eq!(ops, expected);
}

#[test]
fn test_pure_append() {
    let dir = TempDir::new().unwrap();
    let old: Vec<u8> = b"line one\nline two\n".to_vec();
    let mut new = old.clone();
    new.extend_from_slice(b"tail");
    let (old_path, new_path) = write_pair(&dir, &old, &new);

    let ops = diff_files(&old_path, &new_path, 6).unwrap();
    let (last, head) = ops.split_last().unwrap();

    assert_eq!(head.len(), 3);
    assert!(head
        .iter()
        .zip(1..)
        .all(|(op, ordinal)| *op == DeltaOp::Unmodified { ordinal }));
    assert!(matches!(last, DeltaOp::Inserted { data, .. } if data == b"tail"));
}

#[test]
fn test_text_report_for_edited_chunk() {
    let dir = TempDir::new().unwrap();
    let (old, new) = write_pair(&dir, b"AAAAABBBBBCCCCC", b"AAAAAxyzBBCCCCC");

    let table = build_signature_table(File::open(&old).unwrap(), 5).unwrap();
    let delta = compute_delta(table, File::open(&new).unwrap(), 5).unwrap();

    assert_eq!(
        render(&delta, ReportFormat::Text).unwrap(),
        "1 | U | \n2 | M | xyzBB\n3 | U | \n"
    );
}

#[test]
fn test_signature_file_workflow() {
    let dir = TempDir::new().unwrap();
    let (old, new) = write_pair(&dir, b"alpha---beta----gamma---", b"alpha---gamma---");

    let table = build_signature_table(File::open(&old).unwrap(), 8).unwrap();
    let sig_path = dir.path().join("old.sig");
    fs::write(&sig_path, table.to_bytes().unwrap()).unwrap();

    // Only the signature file is needed from here on
    fs::remove_file(&old).unwrap();
    let restored = SignatureTable::from_bytes(&fs::read(&sig_path).unwrap()).unwrap();
    let delta = compute_delta(restored, File::open(&new).unwrap(), 8).unwrap();

    assert_eq!(
        delta.ops,
        vec![
            DeltaOp::Unmodified { ordinal: 1 },
            DeltaOp::Removed { ordinal: 2 },
            DeltaOp::Unmodified { ordinal: 3 },
        ]
    );
    assert_eq!(
        hex::encode(delta.target_hash),
        hex::encode(blake3::hash(b"alpha---gamma---").as_bytes())
    );
}

#[test]
fn test_new_file_shorter_than_chunk() {
    let dir = TempDir::new().unwrap();
    let (old, new) = write_pair(&dir, b"AAAABBBB", b"AB");

    let err = diff_files(&old, &new, 4).unwrap_err();
    assert!(matches!(
        err,
        SyncError::TruncatedInput {
            needed: 4,
            available: 2
        }
    ));
}

#[test]
fn test_chunk_size_policy_halves_oversized_chunks() {
    let dir = TempDir::new().unwrap();
    let (old, new) = write_pair(&dir, b"AAAABBBB", b"AAAABBBB");
    let len = fs::metadata(&old).unwrap().len();

    let chunk_size = effective_chunk_size(1024, len).unwrap();
    assert_eq!(chunk_size, 4);

    let ops = diff_files(&old, &new, chunk_size).unwrap();
    assert_eq!(ops.len(), 2);
}

#[test]
fn test_random_edits_conserve_chunks() {
    let mut rng = StdRng::seed_from_u64(42);
    let chunk_size = 32;
    let old: Vec<u8> = (0..4096).map(|_| rng.gen_range(b'a'..=b'z')).collect();
    let chunks = (old.len() / chunk_size) as u64;

    for _ in 0..25 {
        let mut new = old.clone();
        for _ in 0..rng.gen_range(1..5) {
            let at = rng.gen_range(0..new.len());
            match rng.gen_range(0..3) {
                0 => {
                    let end = (at + rng.gen_range(1..100)).min(new.len());
                    new.drain(at..end);
                }
                1 => {
                    let insert: Vec<u8> = (0..rng.gen_range(1..100))
                        .map(|_| rng.gen_range(b'A'..=b'Z'))
                        .collect();
                    new.splice(at..at, insert);
                }
                _ => new[at] = b'#',
            }
        }

        let table = SignatureTable::build(old.as_slice(), chunk_size).unwrap();
        let delta = compute_delta(table, new.as_slice(), chunk_size).unwrap();
        assert_conserved(&delta.ops, chunks);
    }
}

#[test]
fn test_rolling_matches_one_shot_on_random_data() {
    let mut rng = StdRng::seed_from_u64(7);
    let data: Vec<u8> = (0..2048).map(|_| rng.gen()).collect();

    for chunk_size in [1, 2, 31, 256] {
        let mut rolling = RollingHash::new(chunk_size).unwrap();
        rolling.fill(&data[..chunk_size]).unwrap();

        for start in 1..=data.len() - chunk_size {
            rolling.roll_in(data[start + chunk_size - 1]).unwrap();
            assert_eq!(
                rolling.signature(),
                RollingHash::checksum(&data[start..start + chunk_size])
            );
        }
    }
}

#[tokio::test]
async fn test_parallel_signature_from_file() {
    let dir = TempDir::new().unwrap();
    let data: Vec<u8> = (0..100_000u32).map(|i| (i % 253) as u8).collect();
    let path = dir.path().join("baseline.bin");
    fs::write(&path, &data).unwrap();

    let file = tokio::fs::File::open(&path).await.unwrap();
    let parallel = build_parallel(file, 512).await.unwrap();
    let sequential = SignatureTable::build(File::open(&path).unwrap(), 512).unwrap();

    assert_eq!(parallel.len(), sequential.len());
    assert_eq!(
        parallel.iter().collect::<Vec<_>>(),
        sequential.iter().collect::<Vec<_>>()
    );
}

#[test]
fn test_cli_diff_writes_report() {
    let dir = TempDir::new().unwrap();
    let (old, new) = write_pair(&dir, b"AAAABBBBCCCC", b"AAAACCCC");
    let report = dir.path().join("report.diff");

    let output = Command::new(env!("CARGO_BIN_EXE_chunkdiff"))
        .arg("diff")
        .arg("--old")
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .args(["--chunk-size", "4", "--output"])
        .arg(&report)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        fs::read_to_string(&report).unwrap(),
        "1 | U | \n2 | R | \n3 | U | \n"
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 | R | "));
}

#[test]
fn test_cli_signature_then_delta() {
    let dir = TempDir::new().unwrap();
    let (old, new) = write_pair(&dir, b"AAAABBBBCCCC", b"AAAAXXXXCCCC");
    let sig = dir.path().join("old.sig");
    let report = dir.path().join("delta.json");

    let status = Command::new(env!("CARGO_BIN_EXE_chunkdiff"))
        .arg("signature")
        .arg("--old")
        .arg(&old)
        .args(["--chunk-size", "4", "--output"])
        .arg(&sig)
        .status()
        .unwrap();
    assert!(status.success());

    let status = Command::new(env!("CARGO_BIN_EXE_chunkdiff"))
        .arg("delta")
        .arg("--signature")
        .arg(&sig)
        .arg("--new")
        .arg(&new)
        .args(["--format", "json", "--output"])
        .arg(&report)
        .status()
        .unwrap();
    assert!(status.success());

    let delta: chunkdiff::Delta =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(
        delta.ops,
        vec![
            DeltaOp::Unmodified { ordinal: 1 },
            DeltaOp::Modified {
                ordinal: 2,
                data: b"XXXX".to_vec()
            },
            DeltaOp::Unmodified { ordinal: 3 },
        ]
    );
}

#[test]
fn test_cli_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_chunkdiff"))
        .arg("diff")
        .arg("--old")
        .arg(dir.path().join("nope.txt"))
        .arg("--new")
        .arg(dir.path().join("nope2.txt"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.txt"));
}
