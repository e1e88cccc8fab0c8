use std::collections::BTreeMap;

use crate::config::ImageType;

/// Column names that carry one media role of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRole {
    pub path_column: String,
    pub label_column: String,
    pub position_column: String,
}

pub type MediaRoles = BTreeMap<String, MediaRole>;

pub struct MediaRoleResolver;

impl MediaRoleResolver {
    /// Build the role table from configured (path, label) column pairs:
    /// `base_image` becomes role `base` with position column
    /// `base_image_position`.
    pub fn derive_roles(image_types: &[ImageType]) -> MediaRoles {
        image_types
            .iter()
            .map(|image_type| {
                let role = image_type
                    .path
                    .strip_suffix("_image")
                    .unwrap_or(&image_type.path)
                    .to_string();
                let media_role = MediaRole {
                    path_column: image_type.path.clone(),
                    label_column: image_type.label.clone(),
                    position_column: format!("{}_image_position", role),
                };
                tracing::debug!("Derived media role '{}' from '{}'", role, image_type.path);
                (role, media_role)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;

    #[test]
    fn test_derive_roles_from_pairs() {
        let roles = MediaRoleResolver::derive_roles(&[
            ImageType::new("base_image", "base_image_label"),
            ImageType::new("swatch_image", "swatch_image_label"),
        ]);
        assert_eq!(roles.len(), 2);
        assert_eq!(
            roles.get("base"),
            Some(&MediaRole {
                path_column: "base_image".to_string(),
                label_column: "base_image_label".to_string(),
                position_column: "base_image_position".to_string(),
            })
        );
        assert_eq!(
            roles["swatch"].position_column,
            "swatch_image_position".to_string()
        );
    }

    #[test]
    fn test_default_roles() {
        let roles = MediaRoleResolver::derive_roles(&ImportConfig::default().image_types);
        let names: Vec<&str> = roles.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["base", "small", "swatch", "thumbnail"]);
    }
}
