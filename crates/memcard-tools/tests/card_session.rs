use std::fs;
use std::path::Path;

use memcard_tools::{convert_container, open_container, Config, Error, Session};
use ps1_memcard::save::{self, SaveFile, SaveFormat};
use ps1_memcard::{ContainerFormat, DecodeError, SaveName, SlotError, BLOCK_SIZE, CARD_SIZE};
use tempfile::tempdir;

const SAVE_NAME: &str = "BISLUS-00594GAME0001";

fn one_block_save() -> SaveFile {
    let mut payload = vec![0u8; BLOCK_SIZE];
    payload[..2].copy_from_slice(b"SC");
    payload[0x100..0x104].copy_from_slice(b"DATA");
    SaveFile {
        name: SaveName::parse(SAVE_NAME),
        payload,
    }
}

fn raw_card(path: &Path) -> Session {
    Session::new_card(path, Some(ContainerFormat::Raw), Config::default()).expect("create card")
}

fn write_save(path: &Path, format: SaveFormat, save: &SaveFile) {
    fs::write(path, save::encode(format, save)).expect("write save file");
}

#[test]
fn new_card_is_a_blank_raw_image() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("card.bin");

    let session = Session::new_card(&path, Some(ContainerFormat::Raw), Config::default())
        .expect("create card");

    assert_eq!(fs::metadata(&path).expect("metadata").len(), CARD_SIZE as u64);
    assert!(session.list_slots().is_empty());
    assert!(!session.is_changed());
}

#[test]
fn import_export_delete_walkthrough() {
    let dir = tempdir().expect("temp dir");
    let card_path = dir.path().join("card.bin");
    let save_path = dir.path().join("game.mcs");
    let save = one_block_save();
    write_save(&save_path, SaveFormat::Mcs, &save);

    let mut session = raw_card(&card_path);
    session.import_slot(3, &save_path).expect("import");
    assert!(session.is_changed());
    assert_eq!(session.list_slots(), vec![(3, SAVE_NAME.to_string())]);

    let exported = session
        .export_slot(3, Some(&dir.path().join("exported")), Some(SaveFormat::Raw))
        .expect("export");
    assert_eq!(fs::read(&exported).expect("read export"), save.payload);

    session.delete_slot(3).expect("delete");
    assert!(session.list_slots().is_empty());
    assert!(matches!(
        session.resolve_slot(SAVE_NAME),
        Err(Error::Slot(SlotError::NotFound(_)))
    ));
    assert!(matches!(
        session.delete_slot(3),
        Err(Error::Slot(SlotError::NotFound(_)))
    ));

    assert!(session.save().expect("save"));
    assert!(!session.save().expect("second save is a no-op"));
    let reopened = Session::open(&card_path, Config::default()).expect("reopen");
    assert_eq!(reopened.card().image, session.card().image);
    assert!(reopened.list_slots().is_empty());
}

#[test]
fn every_save_format_imports() {
    let dir = tempdir().expect("temp dir");
    let card_path = dir.path().join("card.mcr");
    let save = one_block_save();
    let mut session = raw_card(&card_path);

    for (index, format) in SaveFormat::ALL.into_iter().enumerate() {
        // Raw saves carry no name; the file stem supplies it.
        let save_path = dir.path().join(format!("{SAVE_NAME}.{}", format.name()));
        write_save(&save_path, format, &save);
        session.import_slot(index, &save_path).expect("import");
        assert_eq!(
            session.card().image.save_file(index).expect("save"),
            save,
            "{format}"
        );
    }
}

#[test]
fn default_export_path_is_named_after_the_save() {
    let dir = tempdir().expect("temp dir");
    let card_path = dir.path().join("card.mcr");
    let save_path = dir.path().join("game.psv");
    write_save(&save_path, SaveFormat::Ps3, &one_block_save());

    let mut session = raw_card(&card_path);
    session.import_slot(0, &save_path).expect("import");

    let name = session
        .export_file_name(0, Some(SaveFormat::Mcs))
        .expect("file name");
    assert_eq!(name, Path::new(&format!("{SAVE_NAME}.mcs")));
    assert_eq!(
        session.export_file_name(4, Some(SaveFormat::Mcs)).expect("file name"),
        Path::new("slot4.mcs")
    );

    let target = dir.path().join(&name);
    let exported = session
        .export_slot(0, Some(&target), Some(SaveFormat::Mcs))
        .expect("export");
    assert_eq!(exported, target);
    assert_eq!(fs::metadata(&target).expect("metadata").len() % BLOCK_SIZE as u64, 0);
}

#[test]
fn unrecognized_file_is_not_imported() {
    let dir = tempdir().expect("temp dir");
    let card_path = dir.path().join("card.mcr");
    let save_path = dir.path().join("game.mcs");
    let notes_path = dir.path().join("notes.txt");
    write_save(&save_path, SaveFormat::Mcs, &one_block_save());
    fs::write(&notes_path, b"hello, this is not a save").expect("write notes");

    let mut session = raw_card(&card_path);
    session.import_slot(0, &save_path).expect("import");
    let before = session.card().image.clone();

    let err = session.import_slot(0, &notes_path).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Import {
                source: SlotError::Decode(DecodeError::UnknownFormat),
                ..
            }
        ),
        "{err:?}"
    );
    assert_eq!(session.card().image, before);
    assert_eq!(session.list_slots(), vec![(0, SAVE_NAME.to_string())]);
}

#[test]
fn configured_card_format_is_the_default() {
    let dir = tempdir().expect("temp dir");
    let config = Config {
        card_format: ContainerFormat::Vgs,
        ..Config::default()
    };

    let card_path = dir.path().join("card.bin");
    let session = Session::new_card(&card_path, None, config).expect("create");
    assert_eq!(session.card().format, ContainerFormat::Vgs);
    assert_eq!(
        fs::read(&card_path).expect("read").len(),
        ContainerFormat::Vgs.encoded_len()
    );

    let converted = dir.path().join("converted.bin");
    let raw_config = Config::default();
    convert_container(&card_path, &converted, None, &raw_config).expect("convert");
    assert_eq!(fs::read(&converted).expect("read").len(), CARD_SIZE);
}

#[test]
fn convert_to_gme_preserves_the_card() {
    let dir = tempdir().expect("temp dir");
    let card_path = dir.path().join("card.bin");
    let gme_path = dir.path().join("card.gme");
    let save_path = dir.path().join("game.mcs");
    write_save(&save_path, SaveFormat::Mcs, &one_block_save());

    let mut session = raw_card(&card_path);
    session.import_slot(7, &save_path).expect("import");
    session.save().expect("save");

    convert_container(&card_path, &gme_path, Some(ContainerFormat::Gme), &Config::default())
        .expect("convert");

    let (format, image) = open_container(&gme_path, &Config::default()).expect("open gme");
    assert_eq!(format, ContainerFormat::Gme);
    assert_eq!(image, session.card().image);
    assert_eq!(image.to_bytes(), fs::read(&card_path).expect("read raw card"));
}

#[test]
fn oversized_save_leaves_the_card_untouched() {
    let dir = tempdir().expect("temp dir");
    let card_path = dir.path().join("card.bin");
    let small_path = dir.path().join("small.mcs");
    let huge_path = dir.path().join("huge.mcs");
    write_save(&small_path, SaveFormat::Mcs, &one_block_save());

    let mut huge = one_block_save();
    huge.payload.resize(3 * BLOCK_SIZE + 1, 0xEE);
    write_save(&huge_path, SaveFormat::Mcs, &huge);

    let mut session = raw_card(&card_path);
    session.import_slot(2, &small_path).expect("import");
    let before = session.card().image.clone();

    // Slot 2 is formatted before the import is attempted and must come back.
    let err = session.import_slot(2, &huge_path).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Import {
                source: SlotError::InsufficientSpace { required: 4 },
                ..
            }
        ),
        "{err:?}"
    );
    assert_eq!(session.card().image, before);

    let err = session
        .import_slot(2, &dir.path().join("missing.mcs"))
        .unwrap_err();
    assert!(matches!(err, Error::Read { .. }), "{err:?}");
    assert_eq!(session.card().image, before);
}

#[test]
fn erase_frees_deleted_saves() {
    let dir = tempdir().expect("temp dir");
    let card_path = dir.path().join("card.bin");
    let save_path = dir.path().join("game.mcs");
    write_save(&save_path, SaveFormat::Mcs, &one_block_save());

    let mut session = raw_card(&card_path);
    session.import_slot(5, &save_path).expect("import");
    session.delete_slot(5).expect("delete");
    session.erase_slot(5).expect("erase");

    let slot = session.card().image.find_slot(5).expect("slot");
    assert!(slot.is_free());
    assert!(slot.name.is_empty());
}

#[test]
fn unreadable_card_reports_its_path() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("broken.bin");
    fs::write(&path, b"not a memory card").expect("write");

    let err = Session::open(&path, Config::default()).unwrap_err();
    let Error::Open { path: reported, .. } = err else {
        panic!("expected open error, got {err:?}");
    };
    assert_eq!(reported, path);
}
