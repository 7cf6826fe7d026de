use bevy::asset::RenderAssetUsages;
use bevy::image::Image;
use bevy::math::Vec3;
use bevy::mesh::{Indices, Mesh, PrimitiveTopology};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat, TextureUsages};

/// Flat square water plane in the XZ plane, centered on the origin
#[derive(Debug, Clone, Copy)]
pub struct PlaneConfig {
    /// Side length in world units
    pub size: f32,
    /// Quads per side
    pub subdivisions: u32,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            size: 10000.0,
            subdivisions: 128,
        }
    }
}

/// Builds the flat water plane. Waves are added per fragment by the water
/// shader, so the vertices stay at height 0.
pub struct WaterPlaneBuilder {
    config: PlaneConfig,
}

impl WaterPlaneBuilder {
    pub fn new(config: PlaneConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Mesh {
        let side = self.config.subdivisions.max(1) as usize + 1;
        let half = self.config.size / 2.0;
        let step = self.config.size / (side - 1) as f32;

        let points: Vec<Vec3> = (0..side)
            .flat_map(|row| (0..side).map(move |column| (column, row)))
            .map(|(column, row)| Vec3::new(column as f32 * step - half, 0.0, row as f32 * step - half))
            .collect();

        // A square point list always has a matching side
        grid_mesh(&points, side).unwrap_or_else(|| Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default()))
    }
}

/// Triangulate a row-major `side * side` grid of points.
///
/// Normals come from central differences of the neighbouring points, so a
/// displaced grid shades correctly. Returns `None` if the point count does
/// not match `side`.
pub fn grid_mesh(points: &[Vec3], side: usize) -> Option<Mesh> {
    if side < 2 || points.len() != side * side {
        return None;
    }
    let at = |column: usize, row: usize| points[row * side + column];
    let last = side - 1;

    let mut positions = Vec::with_capacity(points.len());
    let mut normals = Vec::with_capacity(points.len());
    let mut uvs = Vec::with_capacity(points.len());
    for row in 0..side {
        for column in 0..side {
            let point = at(column, row);
            let along_x = at((column + 1).min(last), row) - at(column.saturating_sub(1), row);
            let along_z = at(column, (row + 1).min(last)) - at(column, row.saturating_sub(1));
            let normal = along_z.cross(along_x).try_normalize().unwrap_or(Vec3::Y);

            positions.push(point.to_array());
            normals.push(normal.to_array());
            uvs.push([column as f32 / last as f32, row as f32 / last as f32]);
        }
    }

    let mut indices = Vec::with_capacity(last * last * 6);
    for row in 0..last {
        for column in 0..last {
            let i0 = (row * side + column) as u32;
            let i1 = i0 + 1;
            let i2 = i0 + side as u32;
            let i3 = i2 + 1;

            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    Some(mesh)
}

/// Quad spanning clip space, for shaders that ignore the camera
pub fn screen_quad() -> Mesh {
    let points = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, points.map(Vec3::to_array).to_vec());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 0.0, 1.0]; 4]);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
    mesh.insert_indices(Indices::U32(vec![0, 1, 2, 2, 1, 3]));
    mesh
}

/// Color image a camera can render into and a material can sample
pub fn render_target_image(width: u32, height: u32) -> Image {
    let size = Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let mut image = Image::new_fill(
        size,
        TextureDimension::D2,
        &[0, 0, 0, 255],
        TextureFormat::Bgra8UnormSrgb,
        RenderAssetUsages::default(),
    );
    image.texture_descriptor.usage =
        TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST | TextureUsages::RENDER_ATTACHMENT;
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::mesh::VertexAttributeValues;
    use rstest::rstest;

    fn positions(mesh: &Mesh) -> &[[f32; 3]] {
        match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(values)) => values,
            other => panic!("unexpected positions {other:?}"),
        }
    }

    #[rstest]
    #[case(1, 4, 6)]
    #[case(4, 25, 96)]
    #[case(128, 129 * 129, 128 * 128 * 6)]
    fn plane_has_expected_topology(#[case] subdivisions: u32, #[case] vertices: usize, #[case] indices: usize) {
        let mesh = WaterPlaneBuilder::new(PlaneConfig { size: 10.0, subdivisions }).build();
        assert_eq!(mesh.count_vertices(), vertices);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(indices));
    }

    #[test]
    fn plane_spans_its_size() {
        let mesh = WaterPlaneBuilder::new(PlaneConfig { size: 10.0, subdivisions: 2 }).build();
        let xs: Vec<f32> = positions(&mesh).iter().map(|p| p[0]).collect();
        assert_eq!(xs.first(), Some(&-5.0));
        assert_eq!(xs.last(), Some(&5.0));
    }

    #[test]
    fn plane_is_flat() {
        let mesh = WaterPlaneBuilder::new(PlaneConfig { size: 2.0, subdivisions: 2 }).build();
        assert!(positions(&mesh).iter().all(|p| p[1] == 0.0));
    }

    #[test]
    fn flat_grid_normals_point_up() {
        let points: Vec<Vec3> = (0..9).map(|i| Vec3::new((i % 3) as f32, 0.0, (i / 3) as f32)).collect();
        let mesh = grid_mesh(&points, 3).unwrap();
        match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(normals)) => {
                assert!(normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
            }
            other => panic!("unexpected normals {other:?}"),
        }
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        assert!(grid_mesh(&[Vec3::ZERO; 5], 2).is_none());
        assert!(grid_mesh(&[Vec3::ZERO], 1).is_none());
    }

    #[test]
    fn render_target_is_bindable() {
        let image = render_target_image(0, 300);
        assert_eq!(image.texture_descriptor.size.width, 1);
        assert!(image.texture_descriptor.usage.contains(TextureUsages::RENDER_ATTACHMENT));
    }
}
