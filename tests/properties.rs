//! Properties store persistence tests.

#![allow(clippy::unwrap_used)]

use std::fs;

use tempfile::TempDir;
use xmlette::{Properties, PropertiesError};

fn sample() -> Properties {
    let mut props = Properties::new();
    props.set("app.name", "demo").unwrap();
    props.set("app.port", "8080").unwrap();
    props.set("motd", "  Welcome & \"enjoy\" <it>").unwrap();
    props.set("debug", "false").unwrap();
    props
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.properties.xml");

    let props = sample();
    props.save(&path).unwrap();
    let loaded = Properties::load(&path).unwrap();

    assert_eq!(loaded, props);
    assert_eq!(loaded.get_as::<u16>("APP.PORT"), Some(Ok(8080)));
    assert_eq!(loaded.get_as::<bool>("debug"), Some(Ok(false)));
    assert_eq!(loaded.get("motd"), Some("  Welcome & \"enjoy\" <it>"));
}

#[test]
fn test_saved_file_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.xml");

    let mut props = Properties::new();
    props.set("b", "2").unwrap();
    props.set("a", "1").unwrap();
    props.save(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<properties>\n  <b>2</b>\n  <a>1</a>\n</properties>\n"
    );
}

#[test]
fn test_load_hand_written_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hand.xml");
    fs::write(
        &path,
        "<!-- settings -->\n<Properties>\n\t<Timeout>30</Timeout>\n\t<empty/>\n\t<timeout>45</timeout>\n</Properties>\n",
    )
    .unwrap();

    let props = Properties::load(&path).unwrap();
    assert_eq!(props.len(), 2);
    assert_eq!(props.get("timeout"), Some("45"));
    assert_eq!(props.get_or("empty", "unset"), "");
}

#[test]
fn test_load_latin1_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("latin1.xml");
    let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>".to_vec();
    bytes.extend_from_slice(b"<properties><city>Z\xFCrich</city></properties>");
    fs::write(&path, bytes).unwrap();

    let props = Properties::load(&path).unwrap();
    assert_eq!(props.get("city"), Some("Z\u{fc}rich"));
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.xml");
    let Err(err) = Properties::load(&path) else {
        panic!("missing file loaded");
    };
    assert!(matches!(err, PropertiesError::Io { .. }));
    assert!(err.to_string().contains("missing.xml"));
}

#[test]
fn test_load_rejects_other_documents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("other.xml");

    fs::write(&path, "<settings><a>1</a></settings>").unwrap();
    assert!(matches!(
        Properties::load(&path),
        Err(PropertiesError::UnexpectedRoot { found }) if found == "settings"
    ));

    fs::write(&path, "<properties><a>1</a>").unwrap();
    assert!(matches!(Properties::load(&path), Err(PropertiesError::Parse(_))));

    fs::write(&path, [0xC3, 0x28]).unwrap();
    assert!(matches!(Properties::load(&path), Err(PropertiesError::Encoding(_))));
}
