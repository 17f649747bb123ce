use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::Command;

const BIN_PATH: &str = "target/release/dedup";

fn compile_binary() {
    let status = Command::new("cargo")
        .arg("build")
        .arg("--release")
        .arg("--bin")
        .arg("dedup")
        .status()
        .expect("Failed to run cargo build");
    assert!(status.success(), "Cargo build failed");
}

fn generate_data(path: &str, size_mb: usize) {
    let status = Command::new("dd")
        .arg("if=/dev/urandom")
        .arg(format!("of={}", path))
        .arg("bs=1M")
        .arg(format!("count={}", size_mb))
        .arg("status=none")
        .status()
        .expect("Failed to run dd");
    assert!(status.success(), "Failed to generate data");
}

fn read_archive(path: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    fs::File::open(path)
        .unwrap()
        .read_to_end(&mut buf)
        .unwrap();
    buf
}

#[test]
fn test_e2e_random_input_produces_valid_archive() {
    compile_binary();
    let input = "test_e2e_random.bin";
    let output = "test_e2e_random.ddup";

    generate_data(input, 2);

    let status = Command::new(Path::new(BIN_PATH))
        .arg(input)
        .arg("--output")
        .arg(output)
        .status()
        .expect("Failed to run dedup");
    assert!(status.success());

    let archive = read_archive(output);
    assert_eq!(&archive[0..4], b"DDUP");
    assert_eq!(archive[5], 0, "default codec id should be None");

    let _ = fs::remove_file(input);
    let _ = fs::remove_file(output);
}

#[test]
fn test_e2e_duplicated_input_is_smaller_than_concatenation() {
    compile_binary();
    let input = "test_e2e_dup.bin";
    let output = "test_e2e_dup.ddup";

    generate_data(input, 1);
    let mut doubled = fs::read(input).unwrap();
    let original_len = doubled.len();
    doubled.extend(doubled.clone());
    fs::write(input, &doubled).unwrap();

    let status = Command::new(Path::new(BIN_PATH))
        .arg(input)
        .arg("--output")
        .arg(output)
        .arg("--threads")
        .arg("4")
        .status()
        .expect("Failed to run dedup");
    assert!(status.success());

    let archive_len = fs::metadata(output).unwrap().len() as usize;
    assert!(
        archive_len < original_len * 3 / 2,
        "archive ({archive_len}) should be far smaller than an un-deduplicated double ({})",
        original_len * 2
    );

    let _ = fs::remove_file(input);
    let _ = fs::remove_file(output);
}

#[test]
fn test_e2e_empty_input_produces_header_only_archive() {
    compile_binary();
    let input = "test_e2e_empty.bin";
    let output = "test_e2e_empty.ddup";
    fs::write(input, b"").unwrap();

    let status = Command::new(Path::new(BIN_PATH))
        .arg(input)
        .arg("--output")
        .arg(output)
        .status()
        .expect("Failed to run dedup");
    assert!(status.success());

    let archive = read_archive(output);
    assert_eq!(archive.len(), 8);

    let _ = fs::remove_file(input);
    let _ = fs::remove_file(output);
}
