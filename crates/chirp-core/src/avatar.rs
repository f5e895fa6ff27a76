//! Avatar object naming.
//!
//! Uploads go under `avatars/<random-id>_<original-filename>`. The random id
//! makes collisions between users unlikely; two uploads that do land on the
//! same path overwrite each other (last write wins).

use uuid::Uuid;

/// Storage folder for avatar uploads.
pub const AVATAR_FOLDER: &str = "avatars";

/// Builds a fresh object path for an avatar file.
pub fn avatar_object_path(file_name: &str) -> String {
    format!(
        "{AVATAR_FOLDER}/{}_{}",
        Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}

/// Keeps only the final path component and strips separators.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    if base.is_empty() {
        "avatar".to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_path_shape() {
        let path = avatar_object_path("me.png");
        let (folder, object) = path.split_once('/').unwrap();
        assert_eq!(folder, "avatars");
        let (random, name) = object.split_once('_').unwrap();
        assert_eq!(random.len(), 32);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(name, "me.png");
    }

    #[test]
    fn test_avatar_paths_are_unique() {
        assert_ne!(avatar_object_path("a.png"), avatar_object_path("a.png"));
    }

    #[test]
    fn test_file_name_is_sanitized() {
        assert!(avatar_object_path("/home/u/pics/me.jpg").ends_with("_me.jpg"));
        assert!(avatar_object_path("C:\\pics\\me.jpg").ends_with("_me.jpg"));
        assert!(avatar_object_path("  ").ends_with("_avatar"));
    }
}
