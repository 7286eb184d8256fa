use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// Footprint of a polyomino: cell offsets from the anchor cell, unique and
/// in authoring order. `x` is the column offset, `y` the row offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TemplateData")]
pub struct ShapeTemplate {
    name: String,
    offsets: Vec<[i32; 2]>,
}

#[derive(Deserialize)]
struct TemplateData {
    name: String,
    offsets: Vec<[i32; 2]>,
}

impl From<TemplateData> for ShapeTemplate {
    fn from(data: TemplateData) -> Self {
        Self::new(data.name, data.offsets.into_iter().map(IVec2::from))
    }
}

impl ShapeTemplate {
    pub fn new(name: impl Into<String>, offsets: impl IntoIterator<Item = IVec2>) -> Self {
        let mut unique: Vec<[i32; 2]> = Vec::new();
        for offset in offsets {
            let offset = offset.to_array();
            if !unique.contains(&offset) {
                unique.push(offset);
            }
        }

        Self {
            name: name.into(),
            offsets: unique,
        }
    }

    /// Builds a template from block positions in the shape's local frame, as
    /// authored in a scene. Horizontal coordinates are divided by the tile
    /// size and rounded, so any transform that keeps blocks within half a
    /// cell of the lattice yields the intended offsets.
    pub fn from_block_positions(name: impl Into<String>, positions: &[Vec3], tile_size: f32) -> Self {
        Self::new(
            name,
            positions.iter().map(|position| {
                IVec2::new(
                    (position.x / tile_size).round() as i32,
                    (position.z / tile_size).round() as i32,
                )
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offsets(&self) -> impl ExactSizeIterator<Item = IVec2> + '_ {
        self.offsets.iter().map(|offset| IVec2::from(*offset))
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Absolute cells covered when the template is anchored at `anchor`.
    pub fn cells_at(&self, anchor: IVec2) -> Vec<IVec2> {
        self.offsets().map(|offset| anchor + offset).collect()
    }
}

/// Built-in polyominoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ShapeKind {
    Monomino,
    Domino,
    StraightTromino,
    CornerTromino,
    Square,
    TTetromino,
    LTetromino,
    STetromino,
    StraightTetromino,
    Plus,
}

impl ShapeKind {
    const fn offsets(self) -> &'static [[i32; 2]] {
        match self {
            Self::Monomino => &[[0, 0]],
            Self::Domino => &[[0, 0], [1, 0]],
            Self::StraightTromino => &[[0, 0], [1, 0], [2, 0]],
            Self::CornerTromino => &[[0, 0], [1, 0], [0, 1]],
            Self::Square => &[[0, 0], [1, 0], [0, 1], [1, 1]],
            Self::TTetromino => &[[0, 0], [-1, 0], [1, 0], [0, 1]],
            Self::LTetromino => &[[0, 0], [0, 1], [0, 2], [1, 2]],
            Self::STetromino => &[[0, 0], [1, 0], [-1, 1], [0, 1]],
            Self::StraightTetromino => &[[0, 0], [1, 0], [2, 0], [3, 0]],
            Self::Plus => &[[0, 0], [1, 0], [-1, 0], [0, 1], [0, -1]],
        }
    }

    pub fn template(self) -> ShapeTemplate {
        ShapeTemplate::new(
            self.to_string(),
            self.offsets().iter().copied().map(IVec2::from),
        )
    }
}

/// Templates the placement pass draws from.
#[derive(Resource, Debug, Clone)]
pub struct ShapeCatalog {
    pub templates: Vec<ShapeTemplate>,
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self {
            templates: ShapeKind::iter().map(ShapeKind::template).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn duplicate_offsets_are_dropped() {
        let template = ShapeTemplate::new(
            "dupes",
            [IVec2::ZERO, IVec2::X, IVec2::ZERO, IVec2::X, IVec2::Y],
        );
        assert_eq!(
            template.offsets().collect::<Vec<_>>(),
            vec![IVec2::ZERO, IVec2::X, IVec2::Y]
        );
    }

    #[test]
    fn block_positions_round_to_cells() {
        let positions = [
            Vec3::new(0.02, 0.5, -0.01),
            Vec3::new(2.01, 0.5, 0.0),
            Vec3::new(1.98, 0.5, 2.03),
            // Same cell as the previous block
            Vec3::new(2.2, 0.5, 1.9),
        ];

        let template = ShapeTemplate::from_block_positions("bent", &positions, 2.0);
        assert_eq!(
            template.offsets().collect::<Vec<_>>(),
            vec![IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(1, 1)]
        );
    }

    #[test]
    fn rotated_blocks_still_land_on_cells() {
        let rotation = Quat::from_rotation_y(FRAC_PI_2);
        let positions: Vec<Vec3> = ShapeKind::LTetromino
            .template()
            .offsets()
            .map(|offset| rotation * Vec3::new(offset.x as f32, 0.0, offset.y as f32))
            .collect();

        let template = ShapeTemplate::from_block_positions("rotated", &positions, 1.0);

        assert_eq!(template.len(), 4);
        // A quarter turn about +Y maps (x, z) to (z, -x)
        assert_eq!(
            template.offsets().collect::<Vec<_>>(),
            vec![
                IVec2::new(0, 0),
                IVec2::new(1, 0),
                IVec2::new(2, 0),
                IVec2::new(2, -1)
            ]
        );
    }

    #[test]
    fn cells_follow_the_anchor() {
        let plus = ShapeKind::Plus.template();
        let cells = plus.cells_at(IVec2::new(2, 2));
        assert_eq!(
            cells,
            vec![
                IVec2::new(2, 2),
                IVec2::new(3, 2),
                IVec2::new(1, 2),
                IVec2::new(2, 3),
                IVec2::new(2, 1)
            ]
        );
    }

    #[test]
    fn catalog_holds_every_kind() {
        let catalog = ShapeCatalog::default();
        assert_eq!(catalog.templates.len(), ShapeKind::iter().count());
        assert_eq!(catalog.templates[0].name(), "monomino");
        assert!(catalog.templates.iter().all(|template| !template.is_empty()));
    }

    #[test]
    fn templates_load_from_plain_data() {
        let template: ShapeTemplate =
            serde_json::from_str(r#"{ "name": "bar", "offsets": [[0, 0], [0, 1], [0, 1]] }"#)
                .unwrap();

        assert_eq!(template.name(), "bar");
        assert_eq!(template.len(), 2);

        let round_trip: ShapeTemplate =
            serde_json::from_str(&serde_json::to_string(&template).unwrap()).unwrap();
        assert_eq!(round_trip, template);
    }
}
