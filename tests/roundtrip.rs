use std::collections::BTreeMap;
use std::io::Cursor;

use artifact_codec::manifest::ChecksumStore;
use artifact_codec::tar_io;
use mender_artifact::{
    read_artifact, write_artifact, ArtifactDepends, AugmentInput, AugmentUpdateInput, DiscardingStorer, Error, ModuleImage, PayloadInput, PrivateKey, PublicKey, RootfsImage, SignatureStatus, TypeInfo,
    UpdateInput, UpdateKind, Verifier, WriteArtifactArgs, WriterConfig,
};

fn data_file(name: &str, contents: &[u8]) -> PayloadInput {
    PayloadInput::new(name, Cursor::new(contents.to_vec()))
}

fn minimal_args() -> WriteArtifactArgs {
    WriteArtifactArgs {
        version: 3,
        compatible_devices: vec!["vexpress-qemu".to_string()],
        artifact_name: "release-1".to_string(),
        artifact_provides: None,
        artifact_depends: None,
        updates: vec![UpdateInput {
            kind: UpdateKind::RootfsImage(RootfsImage),
            type_info: TypeInfo::default(),
            meta_data: serde_json::Value::Object(Default::default()),
            scripts: Vec::new(),
            data_files: vec![data_file("img.ext4", b"hello")],
            augment: None,
        }],
        signer: None,
        augment: None,
    }
}

fn outer_entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = tar::Archive::new(bytes);
    archive.entries().unwrap().map(|entry| entry.unwrap().path().unwrap().to_string_lossy().into_owned()).collect()
}

fn outer_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = tar::Archive::new(bytes);
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.path().unwrap().to_string_lossy() == name {
            let mut out = Vec::new();
            std::io::Read::read_to_end(&mut entry, &mut out).unwrap();
            return out;
        }
    }
    panic!("entry {name:?} not found");
}

#[test]
fn minimal_v3_unsigned_round_trip() {
    let mut out = Vec::new();
    write_artifact(&mut out, minimal_args(), &WriterConfig::default()).unwrap();

    assert_eq!(outer_entry_names(&out), vec!["version", "manifest", "header.tar.gz", "0000.tar.gz"]);

    let manifest = ChecksumStore::parse(&outer_entry(&out, "manifest")).unwrap();
    assert_eq!(manifest.paths().collect::<Vec<_>>(), vec!["version", "header.tar.gz", "data/0000/img.ext4"]);
    assert_eq!(manifest.get("data/0000/img.ext4").unwrap().to_hex(), "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");

    let mut storer = DiscardingStorer::default();
    let summary = read_artifact(out.as_slice(), None, &mut storer).unwrap();

    assert_eq!(summary.info.version, 3);
    assert_eq!(summary.header_info.artifact_name, "release-1");
    assert_eq!(summary.header_info.compatible_devices, vec!["vexpress-qemu".to_string()]);
    assert_eq!(summary.updates.len(), 1);
    assert_eq!(summary.updates[0].type_name, "rootfs-image");
    assert_eq!(summary.signature_status, SignatureStatus::NoSignature);
    assert_eq!(storer.observed, vec![("img.ext4".to_string(), 5)]);
}

#[test]
fn rsa_signed_status_scenarios() {
    let mut rng = rand_core::OsRng;
    let private = rsa::RsaPrivateKey::new(&mut rng, 2048).expect("generate rsa key");
    let public = rsa::RsaPublicKey::from(&private);
    let other_private = rsa::RsaPrivateKey::new(&mut rng, 2048).expect("generate mismatched rsa key");
    let other_public = rsa::RsaPublicKey::from(&other_private);

    let mut args = minimal_args();
    args.signer = Some(Box::new(PrivateKey::Rsa(private)));

    let mut out = Vec::new();
    write_artifact(&mut out, args, &WriterConfig::default()).unwrap();
    assert_eq!(outer_entry_names(&out), vec!["version", "manifest", "manifest.sig", "header.tar.gz", "0000.tar.gz"]);

    let verified = PublicKey::Rsa(public);
    let mut storer = DiscardingStorer::default();
    let summary = read_artifact(out.as_slice(), Some(&verified), &mut storer).unwrap();
    assert_eq!(summary.signature_status, SignatureStatus::SignedAndVerified);

    let mut storer = DiscardingStorer::default();
    let summary = read_artifact(out.as_slice(), None, &mut storer).unwrap();
    assert_eq!(summary.signature_status, SignatureStatus::SignedUnverified);

    let wrong = PublicKey::Rsa(other_public);
    let mut storer = DiscardingStorer::default();
    let err = read_artifact(out.as_slice(), Some(&wrong), &mut storer).unwrap_err();
    assert!(matches!(err, Error::InvalidSignature));
}

#[test]
fn multi_update_v3() {
    let mut args = minimal_args();
    args.updates.push(UpdateInput {
        kind: UpdateKind::ModuleImage(ModuleImage { module_name: "module-image-foo".to_string() }),
        type_info: TypeInfo::default(),
        meta_data: serde_json::Value::Object(Default::default()),
        scripts: Vec::new(),
        data_files: vec![data_file("file1", b"one"), data_file("file2", b"two")],
        augment: None,
    });

    let mut out = Vec::new();
    write_artifact(&mut out, args, &WriterConfig::default()).unwrap();
    assert_eq!(outer_entry_names(&out), vec!["version", "manifest", "header.tar.gz", "0000.tar.gz", "0001.tar.gz"]);

    let manifest = ChecksumStore::parse(&outer_entry(&out, "manifest")).unwrap();
    assert_eq!(manifest.paths().count(), 5);

    let mut storer = DiscardingStorer::default();
    let summary = read_artifact(out.as_slice(), None, &mut storer).unwrap();
    assert_eq!(summary.updates.len(), 2);
    assert_eq!(summary.updates[1].type_name, "module-image-foo");
    assert_eq!(storer.observed, vec![("img.ext4".to_string(), 5), ("file1".to_string(), 3), ("file2".to_string(), 3)]);
}

fn ed25519_keypair() -> (ed25519_dalek::SigningKey, ed25519_dalek::VerifyingKey) {
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rand_core::OsRng);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key)
}

fn augmented_args(signing_key: ed25519_dalek::SigningKey) -> WriteArtifactArgs {
    let mut provides = BTreeMap::new();
    provides.insert("rootfs-image.checksum".to_string(), "abc123".to_string());

    let mut args = minimal_args();
    args.signer = Some(Box::new(PrivateKey::Ed25519(signing_key)));
    args.augment = Some(AugmentInput { artifact_depends: ArtifactDepends::default() });
    args.updates[0].augment = Some(AugmentUpdateInput {
        type_info: TypeInfo { artifact_provides: provides, ..TypeInfo::default() },
        meta_data: serde_json::Value::Object(Default::default()),
        data_files: vec![data_file("patch.bin", b"patchdata")],
        overlay_allowed_keys: Vec::new(),
    });
    args
}

#[test]
fn augmented_v3_artifact() {
    let (signing_key, verifying_key) = ed25519_keypair();
    let args = augmented_args(signing_key);

    let mut out = Vec::new();
    write_artifact(&mut out, args, &WriterConfig::default()).unwrap();
    assert_eq!(
        outer_entry_names(&out),
        vec!["version", "manifest", "manifest.sig", "manifest-augment", "header.tar.gz", "header-augment.tar.gz", "0000.tar.gz", "0000.tar.gz"]
    );

    let manifest = ChecksumStore::parse(&outer_entry(&out, "manifest")).unwrap();
    assert!(!manifest.contains("data/0000/patch.bin"));
    let augment_manifest = ChecksumStore::parse(&outer_entry(&out, "manifest-augment")).unwrap();
    assert!(augment_manifest.contains("data/0000/patch.bin"));

    let verifier = PublicKey::Ed25519(verifying_key);
    let mut storer = DiscardingStorer::default();
    let summary = read_artifact(out.as_slice(), Some(&verifier), &mut storer).unwrap();
    assert_eq!(summary.signature_status, SignatureStatus::SignedAndVerified);
    assert_eq!(summary.updates[0].augment_type_info.as_ref().unwrap().artifact_provides.get("rootfs-image.checksum"), Some(&"abc123".to_string()));
    assert_eq!(storer.observed, vec![("img.ext4".to_string(), 5), ("patch.bin".to_string(), 9)]);
}

#[test]
fn augment_independence_strips_clean() {
    let (signing_key, verifying_key) = ed25519_keypair();
    let args = augmented_args(signing_key);

    let mut out = Vec::new();
    write_artifact(&mut out, args, &WriterConfig::default()).unwrap();

    let mut archive = tar::Archive::new(out.as_slice());
    let mut kept: Vec<(String, Vec<u8>)> = Vec::new();
    let mut seen_payload_names: std::collections::HashSet<String> = std::collections::HashSet::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        if name == "manifest-augment" || name.starts_with("header-augment.tar") {
            continue;
        }
        if name.starts_with("0000.tar") {
            if !seen_payload_names.insert(name.clone()) {
                continue;
            }
        }
        let mut contents = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut contents).unwrap();
        kept.push((name, contents));
    }

    let mut stripped = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut stripped);
        for (name, contents) in &kept {
            tar_io::append_stream(&mut builder, name, contents).unwrap();
        }
        builder.into_inner().unwrap();
    }

    assert_eq!(outer_entry_names(&stripped), vec!["version", "manifest", "manifest.sig", "header.tar.gz", "0000.tar.gz"]);

    let verifier = PublicKey::Ed25519(verifying_key);
    let mut storer = DiscardingStorer::default();
    let summary = read_artifact(stripped.as_slice(), Some(&verifier), &mut storer).unwrap();
    assert_eq!(summary.signature_status, SignatureStatus::SignedAndVerified);
    assert!(summary.updates[0].augment_type_info.is_none());
    assert_eq!(storer.observed, vec![("img.ext4".to_string(), 5)]);
}

#[test]
fn manifest_canonicalization_depends_on_insertion_order() {
    let (signing_key, verifying_key) = ed25519_keypair();
    let verifier = PublicKey::Ed25519(verifying_key);

    let mut args_a = minimal_args();
    args_a.updates[0].data_files = vec![data_file("file1", b"one"), data_file("file2", b"two")];
    args_a.signer = Some(Box::new(PrivateKey::Ed25519(signing_key.clone())));

    let mut args_b = minimal_args();
    args_b.updates[0].data_files = vec![data_file("file2", b"two"), data_file("file1", b"one")];
    args_b.signer = Some(Box::new(PrivateKey::Ed25519(signing_key)));

    let mut out_a = Vec::new();
    write_artifact(&mut out_a, args_a, &WriterConfig::default()).unwrap();
    let mut out_b = Vec::new();
    write_artifact(&mut out_b, args_b, &WriterConfig::default()).unwrap();

    let manifest_a = outer_entry(&out_a, "manifest");
    let manifest_b = outer_entry(&out_b, "manifest");
    assert_ne!(manifest_a, manifest_b);

    let sig_a = outer_entry(&out_a, "manifest.sig");
    let sig_b = outer_entry(&out_b, "manifest.sig");
    assert_ne!(sig_a, sig_b);

    assert!(verifier.verify(&manifest_a, &sig_b).is_err());
    assert!(verifier.verify(&manifest_b, &sig_a).is_err());
}

#[test]
fn corruption_is_detected_before_reaching_the_storer() {
    let mut out = Vec::new();
    write_artifact(&mut out, minimal_args(), &WriterConfig::default()).unwrap();

    let offset = {
        let mut archive = tar::Archive::new(out.as_slice());
        let mut found = None;
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() == "0000.tar.gz" {
                found = Some(entry.raw_file_position());
            }
        }
        found.expect("payload entry present")
    };
    out[offset as usize] ^= 0xff;

    let mut storer = DiscardingStorer::default();
    let err = read_artifact(out.as_slice(), None, &mut storer).unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }));
    assert!(storer.observed.is_empty());
}

#[test]
fn malformed_entry_order_is_rejected() {
    let mut out = Vec::new();
    write_artifact(&mut out, minimal_args(), &WriterConfig::default()).unwrap();

    let entries: Vec<(String, Vec<u8>)> = {
        let mut archive = tar::Archive::new(out.as_slice());
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let name = entry.path().unwrap().to_string_lossy().into_owned();
                let mut contents = Vec::new();
                std::io::Read::read_to_end(&mut entry, &mut contents).unwrap();
                (name, contents)
            })
            .collect()
    };
    assert_eq!(entries[1].0, "manifest");
    assert_eq!(entries[2].0, "header.tar.gz");

    let mut reordered = out.clone();
    reordered.clear();
    let swapped = [entries[0].clone(), entries[2].clone(), entries[1].clone(), entries[3].clone()];
    {
        let mut builder = tar::Builder::new(&mut reordered);
        for (name, contents) in &swapped {
            tar_io::append_stream(&mut builder, name, contents).unwrap();
        }
        builder.into_inner().unwrap();
    }

    let mut storer = DiscardingStorer::default();
    let err = read_artifact(reordered.as_slice(), None, &mut storer).unwrap_err();
    assert!(matches!(err, Error::MalformedArtifact(_)));
}

#[test]
fn whitespace_and_name_rules() {
    let mut args = minimal_args();
    args.artifact_name = "a b".to_string();
    assert!(matches!(write_artifact(&mut Vec::new(), args, &WriterConfig::default()), Err(Error::InvalidParameters(_))));

    let mut args = minimal_args();
    args.updates[0].data_files = vec![data_file("sub/dir.ext4", b"hello")];
    assert!(matches!(write_artifact(&mut Vec::new(), args, &WriterConfig::default()), Err(Error::InvalidParameters(_))));

    let mut args = minimal_args();
    args.updates[0].scripts = vec![("foo.sh".to_string(), b"#!/bin/sh\n".to_vec())];
    assert!(matches!(write_artifact(&mut Vec::new(), args, &WriterConfig::default()), Err(Error::InvalidParameters(_))));

    let mut args = minimal_args();
    args.updates[0].scripts = vec![("ArtifactInstall_Enter_10".to_string(), b"#!/bin/sh\n".to_vec())];
    let mut out = Vec::new();
    write_artifact(&mut out, args, &WriterConfig::default()).unwrap();

    let mut storer = DiscardingStorer::default();
    let summary = read_artifact(out.as_slice(), None, &mut storer).unwrap();
    assert_eq!(summary.scripts, vec![("ArtifactInstall_Enter_10".to_string(), b"#!/bin/sh\n".to_vec())]);
}
