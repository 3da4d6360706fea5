#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use data_encoding::BASE64;
use domain::base::Ttl;
use dnssign::dnssec::key::{SigningKey, SECURE_ENTRY_POINT};
use dnssign::message::StoredName;

/// Compares the output of an installed ldns tool with our emulation of it.
#[track_caller]
pub fn assert_org_ldns_cmd_eq_new_ldns_cmd(org_ldns_cmd: &[&str], expect_stdout_content: bool) {
    let org_ldns_cmd_out = Command::new(org_ldns_cmd[0])
        .args(&org_ldns_cmd[1..])
        .output()
        .unwrap();

    let new_ldns_cmd_out = test_bin::get_test_bin("ldns")
        .args(org_ldns_cmd)
        .output()
        .unwrap();

    assert_eq!(
        std::str::from_utf8(&org_ldns_cmd_out.stderr),
        Ok(""),
        "Unexpected stderr content for original ldns command: {}",
        org_ldns_cmd.join(" ")
    );
    assert_eq!(
        std::str::from_utf8(&new_ldns_cmd_out.stderr),
        Ok(""),
        "Unexpected stderr content for reimplemented ldns command: {}",
        org_ldns_cmd.join(" ")
    );
    if expect_stdout_content {
        assert!(
            !org_ldns_cmd_out.stdout.is_empty(),
            "Expected stdout content for original ldns command: {}: {:?}",
            org_ldns_cmd.join(" "),
            std::str::from_utf8(&org_ldns_cmd_out.stdout)
        );
    }
    assert_eq!(
        org_ldns_cmd_out.status.code(),
        new_ldns_cmd_out.status.code(),
        "Exit code mismatch for ldns command: {}",
        org_ldns_cmd.join(" ")
    );
    assert_eq!(
        std::str::from_utf8(&org_ldns_cmd_out.stdout),
        std::str::from_utf8(&new_ldns_cmd_out.stdout),
        "Stdout content mismatch for ldns command: {}",
        org_ldns_cmd.join(" ")
    );
}

/// Creates an Ed25519 key for `apex` from a fixed seed.
pub fn test_key(apex: &str, seed: [u8; 32]) -> SigningKey {
    let apex = StoredName::from_str(apex).unwrap();
    SigningKey::ed25519_from_seed(apex, SECURE_ENTRY_POINT, &seed).unwrap()
}

/// Writes the key pair for `test_key(apex, seed)` in BIND format.
///
/// Returns the path prefix of the two files.
pub fn write_key_pair(dir: &Path, apex: &str, seed: [u8; 32]) -> PathBuf {
    let key = test_key(apex, seed);
    let name = format!(
        "K{}+{:03}+{:05}",
        key.owner().fmt_with_dot(),
        key.algorithm().to_int(),
        key.key_tag()
    );
    fs::write(
        dir.join(format!("{name}.key")),
        format!(
            "; This is a key-signing key, keyid {}, for {}\n{}\n",
            key.key_tag(),
            key.owner().fmt_with_dot(),
            key.dnskey_record(Ttl::from_secs(3600))
        ),
    )
    .unwrap();
    fs::write(
        dir.join(format!("{name}.private")),
        format!(
            "Private-key-format: v1.2\nAlgorithm: 15 (ED25519)\nPrivateKey: {}\n",
            BASE64.encode(&seed)
        ),
    )
    .unwrap();
    dir.join(name)
}
