//! Loading a [`TemplateModel`] from a directory of labeled reference tiles.
//!
//! Each image's file stem names its class (`wP.png`, `xx.png`). A `-N`
//! suffix allows several references per class (`wP-1.png`, `wP-2.png`).
//! Files with other extensions are skipped.

use std::path::Path;

use fenscan_pipeline::{NormalizedTile, PieceLabel, TemplateModel};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Class name encoded in a reference file stem, or `None` if the stem
/// does not name one of the 13 labels.
pub fn class_from_stem(stem: &str) -> Option<&str> {
    let name = match stem.rsplit_once('-') {
        Some((name, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => stem,
    };
    PieceLabel::from_class_name(name).map(|_| name)
}

/// Build a template model from every reference image in `dir`, each
/// normalized to `tile_size`.
pub fn load_template_model(dir: &Path, tile_size: u32) -> Result<TemplateModel, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Error reading template directory {}: {e}", dir.display()))?;

    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    let mut references = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(class) = class_from_stem(stem) else {
            log::warn!("skipping {}: not a piece class name", path.display());
            continue;
        };
        let image =
            image::open(&path).map_err(|e| format!("Error decoding {}: {e}", path.display()))?;
        references.push((
            class.to_string(),
            NormalizedTile::from_rgb(&image.to_rgb8(), tile_size),
        ));
        log::debug!("loaded template {} as {class}", path.display());
    }

    TemplateModel::from_references(references)
        .map_err(|e| format!("Error building templates from {}: {e}", dir.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stems_map_to_classes() {
        assert_eq!(class_from_stem("wP"), Some("wP"));
        assert_eq!(class_from_stem("xx"), Some("xx"));
        assert_eq!(class_from_stem("bK-12"), Some("bK"));
        assert_eq!(class_from_stem("bK-"), None);
        assert_eq!(class_from_stem("bK-a"), None);
        assert_eq!(class_from_stem("queen"), None);
    }

    #[test]
    fn loads_references_from_directory() {
        let dir = std::env::temp_dir().join(format!("fenscan-templates-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbImage::from_pixel(40, 40, image::Rgb([110, 110, 110]))
            .save(dir.join("xx-1.png"))
            .unwrap();
        image::RgbImage::from_pixel(40, 40, image::Rgb([40, 40, 40]))
            .save(dir.join("xx-2.png"))
            .unwrap();
        image::RgbImage::from_pixel(40, 40, image::Rgb([0, 255, 0]))
            .save(dir.join("wK.png"))
            .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let model = load_template_model(&dir, 16);
        std::fs::remove_dir_all(&dir).unwrap();

        let model = model.unwrap();
        assert_eq!(model.tile_size(), Some(16));
        assert_eq!(
            fenscan_pipeline::PieceModel::class_names(&model),
            ["wK".to_string(), "xx".to_string()]
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(load_template_model(Path::new("/nonexistent/fenscan/templates"), 32).is_err());
    }
}
