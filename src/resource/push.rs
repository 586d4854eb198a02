//! resource::push
//!
//! Builds the single-change push that creates, edits or deletes a managed
//! file. Construction is pure: the precondition commit id is supplied by the
//! caller and a fresh request is built for every attempt.

use crate::core::types::BranchRef;
use crate::forge::{ChangeKind, GitChange, ItemContent, PushRequest, RefUpdate};

use super::schema::FileDeclaration;

/// Commit message used when a declaration carries none.
pub fn default_comment(kind: ChangeKind, path: &str) -> String {
    let verb = match kind {
        ChangeKind::Add => "Add",
        ChangeKind::Edit => "Update",
        ChangeKind::Delete => "Delete",
    };
    format!("{} {}", verb, path)
}

/// The commit message for a push: the declared one, else the default for `kind`.
pub fn resolve_comment(declared: Option<&str>, kind: ChangeKind, path: &str) -> String {
    match declared {
        Some(comment) => comment.to_string(),
        None => default_comment(kind, path),
    }
}

/// Replace a comment that is the generated default of another change kind
/// with the default for `kind`.
///
/// After a create, the read-back comment is `Add <path>`; carrying it into an
/// update would label the edit as an add.
pub fn normalize_comment(comment: Option<&str>, kind: ChangeKind, path: &str) -> Option<String> {
    let comment = comment?;
    let generated = [ChangeKind::Add, ChangeKind::Edit, ChangeKind::Delete]
        .into_iter()
        .filter(|other| *other != kind)
        .any(|other| comment == default_comment(other, path));

    if generated {
        Some(default_comment(kind, path))
    } else {
        Some(comment.to_string())
    }
}

/// Build a push of one `kind` change to `decl.file` on `branch`,
/// conditional on the branch tip still being `precondition`.
///
/// `new_content` is sent as raw text when present.
pub fn build_push(
    decl: &FileDeclaration,
    branch: &BranchRef,
    precondition: &str,
    kind: ChangeKind,
    new_content: Option<&str>,
) -> PushRequest {
    PushRequest {
        repository_id: decl.repository_id.clone(),
        ref_update: RefUpdate {
            name: branch.qualified(),
            old_object_id: precondition.to_string(),
        },
        comment: resolve_comment(decl.comment.as_deref(), kind, &decl.file),
        change: GitChange {
            kind,
            path: decl.file.clone(),
            new_content: new_content.map(ItemContent::raw_text),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::ContentType;

    fn decl() -> FileDeclaration {
        FileDeclaration::new("repo", "docs/readme.md", "hello")
    }

    fn main() -> BranchRef {
        BranchRef::new("refs/heads/main").unwrap()
    }

    #[test]
    fn defaults_per_kind() {
        assert_eq!(default_comment(ChangeKind::Add, "a.txt"), "Add a.txt");
        assert_eq!(default_comment(ChangeKind::Edit, "a.txt"), "Update a.txt");
        assert_eq!(default_comment(ChangeKind::Delete, "a.txt"), "Delete a.txt");
    }

    #[test]
    fn declared_comment_wins() {
        assert_eq!(
            resolve_comment(Some("Seed docs"), ChangeKind::Add, "a.txt"),
            "Seed docs"
        );
        assert_eq!(resolve_comment(None, ChangeKind::Add, "a.txt"), "Add a.txt");
    }

    #[test]
    fn normalize_rewrites_other_defaults() {
        assert_eq!(
            normalize_comment(Some("Add a.txt"), ChangeKind::Edit, "a.txt").as_deref(),
            Some("Update a.txt")
        );
        assert_eq!(
            normalize_comment(Some("Update a.txt"), ChangeKind::Delete, "a.txt").as_deref(),
            Some("Delete a.txt")
        );
        assert_eq!(
            normalize_comment(Some("Update a.txt"), ChangeKind::Edit, "a.txt").as_deref(),
            Some("Update a.txt")
        );
    }

    #[test]
    fn normalize_keeps_user_comments() {
        assert_eq!(
            normalize_comment(Some("Add b.txt"), ChangeKind::Edit, "a.txt").as_deref(),
            Some("Add b.txt")
        );
        assert_eq!(
            normalize_comment(Some("tweak"), ChangeKind::Edit, "a.txt").as_deref(),
            Some("tweak")
        );
        assert_eq!(normalize_comment(None, ChangeKind::Edit, "a.txt"), None);
    }

    #[test]
    fn builds_single_raw_text_change() {
        let push = build_push(&decl(), &main(), "abc123", ChangeKind::Add, Some("hello"));

        assert_eq!(push.repository_id, "repo");
        assert_eq!(push.ref_update.name, "refs/heads/main");
        assert_eq!(push.ref_update.old_object_id, "abc123");
        assert_eq!(push.comment, "Add docs/readme.md");
        assert_eq!(push.change.kind, ChangeKind::Add);
        assert_eq!(push.change.path, "docs/readme.md");

        let content = push.change.new_content.unwrap();
        assert_eq!(content.content, "hello");
        assert_eq!(content.content_type, ContentType::RawText);
    }

    #[test]
    fn delete_carries_no_content() {
        let push = build_push(&decl(), &main(), "abc123", ChangeKind::Delete, None);
        assert!(push.change.new_content.is_none());
        assert_eq!(push.comment, "Delete docs/readme.md");
    }

    #[test]
    fn bare_branch_is_qualified_in_ref_update() {
        let feature = BranchRef::new("feature").unwrap();
        let push = build_push(&decl(), &feature, "abc123", ChangeKind::Edit, Some("x"));
        assert_eq!(push.ref_update.name, "refs/heads/feature");
    }
}
