use assert_fs::TempDir;
use gitcat::artifacts::objects::object_format::ObjectFormat;
use gitcat::artifacts::objects::object_id::ObjectId;
use gitcat::artifacts::objects::object_type::ObjectType;
use proptest::prelude::*;
use rstest::rstest;

mod common;

use common::command::{git_init, git_output, repository_dir};

proptest! {
    #[test]
    fn hex_text_round_trips(raw in prop::collection::vec(any::<u8>(), 20)) {
        let id = ObjectId::from_raw(&raw).unwrap();
        let parsed = ObjectId::try_parse(&id.to_hex()).unwrap();

        prop_assert_eq!(parsed, id);
        prop_assert_eq!(parsed.format(), ObjectFormat::Sha1);
        prop_assert_eq!(parsed.as_bytes(), raw.as_slice());
    }

    #[test]
    fn sha256_hex_text_round_trips(raw in prop::collection::vec(any::<u8>(), 32)) {
        let id = ObjectId::from_raw(&raw).unwrap();
        let parsed: ObjectId = id.to_hex().parse().unwrap();

        prop_assert_eq!(parsed, id);
        prop_assert_eq!(parsed.format(), ObjectFormat::Sha256);
    }

    #[test]
    fn other_lengths_are_rejected(text in "[0-9a-f]{0,80}") {
        prop_assume!(text.len() != 40 && text.len() != 64);

        prop_assert!(ObjectId::try_parse(&text).is_err());
        prop_assert!(!ObjectFormat::Sha1.is_valid(&text));
        prop_assert!(!ObjectFormat::Sha256.is_valid(&text));
    }

    #[test]
    fn non_hex_characters_are_rejected(prefix in "[0-9a-f]{39}", bad in "[g-z]") {
        let text = format!("{prefix}{bad}");

        prop_assert!(ObjectId::try_parse(&text).is_err());
    }

    #[test]
    fn short_ids_are_prefixes(raw in prop::collection::vec(any::<u8>(), 20)) {
        let id = ObjectId::from_raw(&raw).unwrap();

        prop_assert!(id.to_hex().starts_with(&id.to_short_oid()));
        prop_assert_eq!(id.to_short_oid().len(), 7);
    }
}

#[rstest]
#[case("sha1")]
#[case("sha256")]
fn blob_hashes_match_git(
    repository_dir: TempDir,
    #[case] object_format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use assert_fs::fixture::{FileWriteStr, PathChild};
    use fake::Fake;
    use fake::faker::lorem::en::Words;

    git_init(repository_dir.path(), object_format);
    let content = Words(5..10).fake::<Vec<String>>().join(" ");
    repository_dir.child("file.txt").write_str(&content)?;

    let format = ObjectFormat::from_name(object_format)?;
    let expected = git_output(repository_dir.path(), &["hash-object", "file.txt"])?;
    let actual = format.hash_blob(content.as_bytes());

    pretty_assertions::assert_eq!(actual.to_hex(), expected);
    pretty_assertions::assert_eq!(
        format.compute_hash(ObjectType::Blob, content.as_bytes()),
        actual
    );

    Ok(())
}

#[test]
fn ids_of_different_formats_differ() -> Result<(), Box<dyn std::error::Error>> {
    let sha1 = ObjectFormat::Sha1.hash_blob(b"same content");
    let sha256 = ObjectFormat::Sha256.hash_blob(b"same content");

    assert_ne!(sha1, sha256);
    assert_ne!(sha1.format(), sha256.format());
    assert!(ObjectFormat::Sha1.parse(&sha256.to_hex()).is_err());

    Ok(())
}
