//! Membership of the catch-all ("Others") bucket.
//!
//! The catch-all has no rules of its own. A file belongs to it unless the
//! catch-all excludes it, and either the catch-all includes it or no ordinary
//! bucket claims its extension. Any extension claim anywhere therefore
//! shrinks the catch-all on the next pass.

use std::collections::BTreeSet;

use crate::bucket::Bucket;
use crate::types::{Extension, FileObservation};

/// Whether the catch-all bucket claims `file`.
///
/// `claimed` is the union of every ordinary bucket's extension set.
pub fn catch_all_claims(
    file: &FileObservation,
    claimed: &BTreeSet<&Extension>,
    others: &Bucket,
) -> bool {
    if others.overrides.is_excluded(&file.name) {
        return false;
    }
    if others.overrides.is_included(&file.name) {
        return true;
    }
    match &file.extension {
        Some(ext) => !claimed.contains(ext),
        None => true,
    }
}

/// The full member set of the catch-all bucket over `files`.
pub fn project_others(
    claimed: &BTreeSet<&Extension>,
    files: &[FileObservation],
    others: &Bucket,
) -> BTreeSet<String> {
    files
        .iter()
        .filter(|file| catch_all_claims(file, claimed, others))
        .map(|file| file.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BucketId;

    fn ext(raw: &str) -> Extension {
        Extension::parse(raw).unwrap()
    }

    fn others() -> Bucket {
        Bucket::new_catch_all(BucketId::new(9).unwrap(), "Others")
    }

    #[test]
    fn test_complement_of_claimed_extensions() {
        let pdf = ext(".pdf");
        let docx = ext(".docx");
        let claimed: BTreeSet<&Extension> = [&pdf, &docx].into_iter().collect();
        let files = vec![
            FileObservation::file("a.pdf"),
            FileObservation::file("b.docx"),
            FileObservation::file("notes.txt"),
            FileObservation::file("Makefile"),
            FileObservation::directory("projects"),
        ];

        let members = project_others(&claimed, &files, &others());
        let expected: BTreeSet<String> = ["notes.txt", "Makefile", "projects"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(members, expected);
    }

    #[test]
    fn test_claiming_an_extension_shrinks_the_complement() {
        let pdf = ext(".pdf");
        let txt = ext(".txt");
        let file = FileObservation::file("notes.txt");

        let before: BTreeSet<&Extension> = [&pdf].into_iter().collect();
        assert!(catch_all_claims(&file, &before, &others()));

        let after: BTreeSet<&Extension> = [&pdf, &txt].into_iter().collect();
        assert!(!catch_all_claims(&file, &after, &others()));
    }

    #[test]
    fn test_overrides_on_catch_all() {
        let pdf = ext(".pdf");
        let claimed: BTreeSet<&Extension> = [&pdf].into_iter().collect();
        let mut others = others();
        others.overrides.include("keep.pdf");
        others.overrides.exclude("drop.txt");

        assert!(catch_all_claims(&FileObservation::file("keep.pdf"), &claimed, &others));
        assert!(!catch_all_claims(&FileObservation::file("drop.txt"), &claimed, &others));
    }
}
