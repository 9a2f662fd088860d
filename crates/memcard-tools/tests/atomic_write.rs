use std::fs;

use memcard_tools::{write_container, Config, Error};
use ps1_memcard::{CardImage, ContainerFormat};
use tempfile::tempdir;

#[test]
fn failed_write_keeps_the_existing_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("card.mcx");
    fs::write(&path, b"previous contents").expect("seed destination");

    // No mcx keys configured, so encoding fails before anything is staged.
    let err = write_container(&CardImage::new(), &path, ContainerFormat::Mcx, &Config::default())
        .unwrap_err();
    assert!(matches!(err, Error::Contract(_)), "{err:?}");
    assert_eq!(fs::read(&path).expect("read"), b"previous contents");
    assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
}

#[test]
fn write_into_missing_folder_fails_cleanly() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("missing").join("card.mcr");

    let err = write_container(&CardImage::new(), &path, ContainerFormat::Raw, &Config::default())
        .unwrap_err();
    assert!(matches!(err, Error::Write { .. }), "{err:?}");
    assert!(!path.exists());
}

#[test]
fn overwrite_replaces_the_whole_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("card.gme");
    fs::write(&path, vec![0xAA; 200_000]).expect("seed destination");

    write_container(&CardImage::new(), &path, ContainerFormat::Gme, &Config::default())
        .expect("write");

    let bytes = fs::read(&path).expect("read");
    assert_eq!(bytes.len(), ContainerFormat::Gme.encoded_len());
    assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
}

#[cfg(unix)]
#[test]
fn overwrite_keeps_the_destination_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("card.mcr");
    fs::write(&path, b"old card").expect("seed destination");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

    write_container(&CardImage::new(), &path, ContainerFormat::Raw, &Config::default())
        .expect("write");

    let mode = fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}
