//! Building geometries from definition items.
//!
//! Every `[[geometry]]` item names a `library` that decides which variant is
//! built. After construction the common inputs are applied: `"media input"`,
//! `"set label"` and `"boundary tolerance"`. The result is registered under
//! its `name` so later items can refer to it.
//!
//! Fatal errors propagate as `Err`. Any other construction failure is logged
//! and the item produces no geometry (`Ok(None)`).

use std::path::Path;

use log::{debug, info, warn};
use nalgebra::{Point3, Vector2, Vector3};
use toml::Value;

use crate::error::{GeometryError, Result};
use crate::geometry::{Geometry, GeometryQuery, SharedGeometry};
use crate::input::{Definition, GeometryInput};
use crate::iplanes::SectorDivider;
use crate::media::MediumTable;
use crate::prism::Prism;
use crate::projector::{
    GeneralProjector, PlanarPolygon, Projector, ProjectorX, ProjectorY, ProjectorZ,
};
use crate::pyramid::Pyramid;
use crate::registry::GeometryRegistry;
use crate::repeater::RadialRepeater;
use crate::spheres::Spheres;
use crate::stl::read_stl;
use crate::tet_mesh::TetMeshGeometry;
use crate::tetgen::read_tetgen;
use crate::triangle_mesh::TriangleMesh;
use crate::union::UnionGeometry;

pub const IPLANES_LIBRARY: &str = "egs_iplanes";
pub const UNION_LIBRARY: &str = "egs_union";
pub const PRISM_LIBRARY: &str = "egs_prism";
pub const PYRAMID_LIBRARY: &str = "egs_pyramid";
pub const TRIANGLE_MESH_LIBRARY: &str = "egs_triangle_mesh";
pub const MESH_LIBRARY: &str = "egs_mesh";
pub const SPHERES_LIBRARY: &str = "egs_spheres";

/// Build every geometry of `definition`, in order.
pub fn build_registry(definition: &Definition) -> Result<GeometryRegistry> {
    let mut registry = GeometryRegistry::new();
    for item in &definition.geometries {
        create_geometry(
            item,
            &mut registry,
            &definition.base_dir,
            definition.boundary_tolerance,
        )?;
    }
    info!(
        "built {} geometries using {} media",
        registry.len(),
        registry.media.len()
    );
    Ok(registry)
}

/// The geometry named by `"simulation geometry"`, falling back to the last one defined.
pub fn simulation_geometry(
    definition: &Definition,
    registry: &GeometryRegistry,
) -> Option<SharedGeometry> {
    match &definition.simulation_geometry {
        Some(name) => registry.get(name),
        None => registry.iter().last().cloned(),
    }
}

/// Build, configure and register one geometry.
///
/// `default_tolerance` applies when the item has no `"boundary tolerance"` of its own.
pub fn create_geometry(
    input: &GeometryInput,
    registry: &mut GeometryRegistry,
    base_dir: &Path,
    default_tolerance: Option<f64>,
) -> Result<Option<SharedGeometry>> {
    let label = input
        .get_string("name")
        .unwrap_or_else(|| "<unnamed>".to_string());
    let built = build(input, registry, base_dir).and_then(|mut geometry| {
        configure(&mut geometry, input, &mut registry.media, default_tolerance);
        registry.insert(geometry)
    });
    match built {
        Ok(geometry) => {
            debug!("{}", geometry.describe(&registry.media));
            Ok(Some(geometry))
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("geometry `{}` not created: {}", label, e);
            Ok(None)
        }
    }
}

fn build(
    input: &GeometryInput,
    registry: &mut GeometryRegistry,
    base_dir: &Path,
) -> Result<Geometry> {
    let name = input.require_string("name")?;
    let library = input.require_string("library")?;
    match library.as_str() {
        IPLANES_LIBRARY => match input.get_string("type").as_deref() {
            Some("EGS_RadialRepeater") | Some("repeater") => {
                build_repeater(&name, input, registry)
            }
            _ => build_sector_divider(&name, input),
        },
        UNION_LIBRARY | "egs_gunion" => build_union(&name, input, registry),
        PRISM_LIBRARY => build_prism(&name, input),
        PYRAMID_LIBRARY => build_pyramid(&name, input),
        TRIANGLE_MESH_LIBRARY => {
            build_triangle_mesh(&name, input, &mut registry.media, base_dir)
        }
        MESH_LIBRARY => build_tet_mesh(&name, input, &mut registry.media, base_dir),
        SPHERES_LIBRARY => build_spheres(&name, input),
        other => Err(GeometryError::UnknownLibrary(other.to_string())),
    }
}

/// `axis = [x, y, z, ux, uy, uz]` as a point and a unit direction.
fn read_axis(input: &GeometryInput) -> Option<Result<(Point3<f64>, Vector3<f64>)>> {
    let values = input.get_f64s("axis")?;
    let [x, y, z, ux, uy, uz] = values[..] else {
        return Some(Err(GeometryError::invalid("axis", "expected 6 numbers")));
    };
    Some(
        Vector3::new(ux, uy, uz)
            .try_normalize(0.0)
            .map(|a| (Point3::new(x, y, z), a))
            .ok_or_else(|| GeometryError::invalid("axis", "zero direction")),
    )
}

fn build_sector_divider(name: &str, input: &GeometryInput) -> Result<Geometry> {
    let (xo, axis) = read_axis(input).ok_or_else(|| GeometryError::missing("axis"))??;
    let divider = if let Some(angles) = input.get_f64s("angles") {
        SectorDivider::from_angles(name, xo, axis, &angles, true)?
    } else if let Some(angles) = input.get_f64s("angles in radian") {
        SectorDivider::from_angles(name, xo, axis, &angles, false)?
    } else if let Some(n) = input.get_i32("number of planes") {
        if n < 1 {
            return Err(GeometryError::invalid("number of planes", "must be positive"));
        }
        let first = input.get_f64("first angle").unwrap_or(0.0).to_radians();
        SectorDivider::uniform(name, xo, axis, n as usize, first)?
    } else if let (Some(normals), Some(positions)) =
        (input.get_f64s("normals"), input.get_f64s("positions"))
    {
        if normals.len() % 3 != 0 {
            return Err(GeometryError::invalid("normals", "expected triples of numbers"));
        }
        let normals = normals
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0], c[1], c[2]))
            .collect::<Vec<_>>();
        SectorDivider::from_planes(name, xo, axis, &normals, &positions)?
    } else {
        return Err(GeometryError::missing("angles"));
    };
    Ok(divider.into())
}

fn build_repeater(
    name: &str,
    input: &GeometryInput,
    registry: &mut GeometryRegistry,
) -> Result<Geometry> {
    let (xo, axis) = read_axis(input).unwrap_or_else(|| {
        warn!("`{}`: missing axis, using the z axis through the origin", name);
        Ok((Point3::origin(), Vector3::z()))
    })?;
    let nrep = input
        .get_i32("number of repetitions")
        .ok_or_else(|| GeometryError::missing("number of repetitions"))?;
    let nrep = usize::try_from(nrep)
        .map_err(|_| GeometryError::invalid("number of repetitions", "must be at least 2"))?;
    let child_name = input.require_string("repeated geometry")?;
    let child = registry
        .get(&child_name)
        .ok_or(GeometryError::UnknownGeometry(child_name))?;
    let first = match (input.get_f64("first angle"), input.get_f64("first angle in radians")) {
        (Some(degrees), _) => degrees.to_radians(),
        (None, Some(radians)) => radians,
        (None, None) => 0.0,
    };

    let mut repeater = RadialRepeater::new(name, xo, axis, nrep, child, first)?;
    if let Some(medium) = input.get_string("medium") {
        repeater.set_all_media(registry.media.add(&medium));
    }
    for (label, wedges) in read_labels(input, "set repeater label") {
        repeater.add_wedge_label(&label, &wedges);
    }
    Ok(repeater.into())
}

fn build_union(name: &str, input: &GeometryInput, registry: &GeometryRegistry) -> Result<Geometry> {
    let names = input
        .get_strings("geometries")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| GeometryError::missing("geometries"))?;
    let children: Vec<SharedGeometry> = names
        .iter()
        .filter_map(|n| {
            let child = registry.get(n);
            if child.is_none() {
                warn!("union `{}`: no geometry named `{}` is defined", name, n);
            }
            child
        })
        .collect();
    if children.is_empty() {
        return Err(GeometryError::invalid(
            "geometries",
            "none of the listed geometries is defined",
        ));
    }
    let priorities = input.get_i32s("priorities");
    Ok(UnionGeometry::new(name, children, priorities.as_deref())?.into())
}

fn points_2d(values: &[f64]) -> Result<Vec<Vector2<f64>>> {
    if values.len() / 2 < 3 {
        return Err(GeometryError::invalid("points", "at least 3 points are required"));
    }
    Ok(values
        .chunks_exact(2)
        .map(|c| Vector2::new(c[0], c[1]))
        .collect())
}

fn points_3d(values: &[f64]) -> Result<Vec<Point3<f64>>> {
    if values.len() / 3 < 3 {
        return Err(GeometryError::invalid("points", "at least 3 points are required"));
    }
    Ok(values
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

fn prism<P: Projector>(
    name: &str,
    base: PlanarPolygon<P>,
    slab: Option<(f64, f64)>,
) -> Prism<P> {
    match slab {
        Some((d1, d2)) => Prism::closed(name, base, d1, d2),
        None => Prism::open(name, base),
    }
}

fn build_prism(name: &str, input: &GeometryInput) -> Result<Geometry> {
    let kind = input.require_string("type")?;
    let points = input.require_f64s("points")?;
    let slab = match input.get_f64s("closed").as_deref() {
        Some(&[d1, d2]) => Some((d1, d2)),
        _ => None,
    };
    let open_triangle = input.get_i32("open triangle") == Some(1);

    let geometry = match kind.as_str() {
        "EGS_PrismX" => {
            let base = PlanarPolygon::from_2d(&points_2d(&points)?, ProjectorX, open_triangle)?;
            prism(name, base, slab).into()
        }
        "EGS_PrismY" => {
            let base = PlanarPolygon::from_2d(&points_2d(&points)?, ProjectorY, open_triangle)?;
            prism(name, base, slab).into()
        }
        "EGS_PrismZ" => {
            let base = PlanarPolygon::from_2d(&points_2d(&points)?, ProjectorZ, open_triangle)?;
            prism(name, base, slab).into()
        }
        "EGS_Prism" => {
            let base: PlanarPolygon<GeneralProjector> =
                PlanarPolygon::from_3d(&points_3d(&points)?, open_triangle)?;
            prism(name, base, slab).into()
        }
        other => {
            return Err(GeometryError::invalid("type", format!("unknown prism type `{other}`")));
        }
    };
    Ok(geometry)
}

fn build_pyramid(name: &str, input: &GeometryInput) -> Result<Geometry> {
    let kind = input.require_string("type")?;
    let points = input.require_f64s("points")?;
    let tip = match input.require_f64s("tip")?[..] {
        [x, y, z] => Point3::new(x, y, z),
        _ => return Err(GeometryError::invalid("tip", "expected 3 numbers")),
    };
    let open = input.get_i32("closed") != Some(1);

    let geometry = match kind.as_str() {
        "EGS_PyramidX" => {
            let base = PlanarPolygon::from_2d(&points_2d(&points)?, ProjectorX, false)?;
            Pyramid::new(name, base, tip, open)?.into()
        }
        "EGS_PyramidY" => {
            let base = PlanarPolygon::from_2d(&points_2d(&points)?, ProjectorY, false)?;
            Pyramid::new(name, base, tip, open)?.into()
        }
        "EGS_PyramidZ" => {
            let base = PlanarPolygon::from_2d(&points_2d(&points)?, ProjectorZ, false)?;
            Pyramid::new(name, base, tip, open)?.into()
        }
        "EGS_Pyramid" => {
            let base: PlanarPolygon<GeneralProjector> =
                PlanarPolygon::from_3d(&points_3d(&points)?, false)?;
            Pyramid::new(name, base, tip, open)?.into()
        }
        other => {
            return Err(GeometryError::invalid("type", format!("unknown pyramid type `{other}`")));
        }
    };
    Ok(geometry)
}

fn build_triangle_mesh(
    name: &str,
    input: &GeometryInput,
    media: &mut MediumTable,
    base_dir: &Path,
) -> Result<Geometry> {
    let file = input.require_string("file")?;
    if !file.ends_with("stl") {
        return Err(GeometryError::invalid(
            "file",
            format!("unknown extension for `{file}`, only STL files are supported"),
        ));
    }
    let mut spec = read_stl(base_dir.join(&file))?;
    if let Some(scale) = input.get_f64("scale") {
        spec.scale(scale)?;
    }
    let mut mesh = TriangleMesh::new(name, spec)?;
    if let Some(medium) = input.get_string("medium") {
        mesh.set_all_media(media.add(&medium));
    }
    Ok(mesh.into())
}

fn build_tet_mesh(
    name: &str,
    input: &GeometryInput,
    media: &mut MediumTable,
    base_dir: &Path,
) -> Result<Geometry> {
    let file = input.require_string("file")?;
    let names = input.get_strings("media");
    let mut read = read_tetgen(base_dir.join(&file), names.as_deref())?;
    if let Some(scale) = input.get_f64("scale") {
        read.mesh.scale(scale)?;
    }
    let indices: Vec<i32> = read.media.iter().map(|m| media.add(m)).collect();
    read.mesh
        .map_media(|local| usize::try_from(local).map_or(local, |i| indices[i]));
    Ok(TetMeshGeometry::new(name, read.mesh)?.into())
}

fn build_spheres(name: &str, input: &GeometryInput) -> Result<Geometry> {
    let midpoint = match input.get_f64s("midpoint").as_deref() {
        Some(&[x, y, z]) => Point3::new(x, y, z),
        Some(_) => return Err(GeometryError::invalid("midpoint", "expected 3 numbers")),
        None => Point3::origin(),
    };
    let radii = input.require_f64s("radii")?;
    Ok(Spheres::new(name, midpoint, radii)?.into())
}

/// Apply the inputs every geometry accepts.
fn configure(
    geometry: &mut Geometry,
    input: &GeometryInput,
    media: &mut MediumTable,
    default_tolerance: Option<f64>,
) {
    if let Some(media_input) = input.get_table("media input") {
        apply_media_input(geometry, &media_input, media);
    }
    for (label, regions) in read_labels(input, "set label") {
        let valid = regions.iter().filter(|&&r| r >= 0 && r < geometry.regions()).count();
        if valid < regions.len() {
            warn!(
                "`{}`: label `{}` names regions beyond the {} regions of this geometry",
                geometry.name(),
                label,
                geometry.regions()
            );
        }
        geometry.data_mut().add_label(&label, &regions);
    }
    if let Some(tolerance) = input.get_f64("boundary tolerance").or(default_tolerance) {
        geometry.set_boundary_tolerance(tolerance);
    }
}

/// `media`, `"set medium"` and `"set relative density"` from a media input block.
///
/// Medium numbers in `"set medium"` index the block's `media` list. Without a
/// list they index the medium table directly.
pub fn apply_media_input(geometry: &mut Geometry, input: &GeometryInput, media: &mut MediumTable) {
    let indices: Vec<i32> = match input.get_strings("media") {
        Some(names) if !names.is_empty() => names.iter().map(|n| media.add(n)).collect(),
        _ => (0..media.len() as i32).collect(),
    };
    let Some(&first) = indices.first() else {
        return;
    };
    geometry.set_all_media(first);

    let medium = |i: f64| (i >= 0.0).then(|| indices.get(i as usize).copied()).flatten();
    for row in input.get_rows("set medium") {
        let applied = match row.as_deref() {
            Some(&[region, m]) => medium(m).map(|m| (region, region, m, 1.0)),
            Some(&[start, end, m]) => medium(m).map(|m| (start, end, m, 1.0)),
            Some(&[start, end, m, delta]) => medium(m).map(|m| (start, end, m, delta)),
            _ => None,
        };
        match applied {
            Some((start, end, m, delta)) => {
                geometry.set_medium(start as i32, end as i32, m, delta as i32)
            }
            None => warn!(
                "`{}`: ignoring `set medium` input {:?}, expected 2 to 4 numbers with a known medium",
                geometry.name(),
                row
            ),
        }
    }

    for row in input.get_rows("set relative density") {
        match row.as_deref() {
            Some(&[region, rho]) => {
                let region = (region + 0.1) as i32;
                geometry.set_relative_rho(region, region, rho);
            }
            Some(&[start, end, rho]) => {
                geometry.set_relative_rho((start + 0.1) as i32, (end + 0.1) as i32, rho)
            }
            _ => warn!(
                "`{}`: ignoring `set relative density` input {:?}, 2 or 3 numbers are allowed",
                geometry.name(),
                row
            ),
        }
    }
}

/// Label items: `["name", r1, r2, ...]` or the string `"name r1 r2 ..."`.
fn read_labels(input: &GeometryInput, key: &str) -> Vec<(String, Vec<i32>)> {
    let mut labels = Vec::new();
    for row in input.get_raw_rows(key) {
        let tokens: Vec<Value> = match row.as_slice() {
            [Value::String(s)] => s
                .split_whitespace()
                .map(|w| match w.parse::<i64>() {
                    Ok(i) => Value::Integer(i),
                    Err(_) => Value::String(w.to_string()),
                })
                .collect(),
            _ => row.clone(),
        };
        let Some((Value::String(name), rest)) = tokens.split_first() else {
            warn!("`{}` item without a label name", key);
            continue;
        };
        let regions = rest
            .iter()
            .filter_map(|v| v.as_integer().and_then(|i| i32::try_from(i).ok()))
            .collect::<Vec<_>>();
        if regions.len() < rest.len() {
            warn!("label `{}`: ignoring region numbers that are not integers", name);
        }
        labels.push((name.clone(), regions));
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GeometryKind, OUTSIDE, VACUUM};
    use std::sync::Arc;

    fn definition(text: &str) -> Definition {
        Definition::parse(text, ".").unwrap()
    }

    #[test]
    fn builds_spheres_with_media() {
        let def = definition(
            r#"
            "simulation geometry" = "ball"
            [[geometry]]
            name = "ball"
            library = "egs_spheres"
            midpoint = [0, 0, 0]
            radii = [1, 2]
            "set label" = ["core", 0]
            [geometry."media input"]
            media = ["H2O", "AIR"]
            "set medium" = [[1, 1]]
            "set relative density" = [0, 1.5]
            "#,
        );
        let registry = build_registry(&def).unwrap();
        let ball = simulation_geometry(&def, &registry).unwrap();
        assert_eq!(ball.kind(), GeometryKind::Spheres);
        assert_eq!(ball.medium(0), 0);
        assert_eq!(ball.medium(1), 1);
        assert_eq!(ball.relative_rho(0), 1.5);
        assert_eq!(ball.label_regions("core"), vec![0]);
        assert_eq!(registry.media.names(), &["H2O", "AIR"]);
    }

    #[test]
    fn recoverable_errors_skip_the_item() {
        let def = definition(
            r#"
            [[geometry]]
            name = "nothing"
            library = "egs_spheres"

            [[geometry]]
            name = "mystery"
            library = "egs_teapot"

            [[geometry]]
            name = "u"
            library = "egs_union"
            geometries = ["ghost"]
            "#,
        );
        let registry = build_registry(&def).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn fatal_errors_propagate() {
        let def = definition(
            r#"
            [[geometry]]
            name = "flat"
            library = "egs_pyramid"
            type = "EGS_PyramidZ"
            points = [0, 0, 1, 0, 1, 1, 0, 1]
            tip = [0.5, 0.5, 0]
            closed = 1
            "#,
        );
        let err = build_registry(&def).unwrap_err();
        assert!(matches!(err, GeometryError::TipTooCloseToBase { .. }));
    }

    #[test]
    fn duplicate_name_is_not_registered() {
        let def = definition(
            r#"
            [[geometry]]
            name = "s"
            library = "egs_spheres"
            radii = [1]
            [[geometry]]
            name = "s"
            library = "egs_spheres"
            radii = [3]
            "#,
        );
        let registry = build_registry(&def).unwrap();
        assert_eq!(registry.len(), 1);
        let s = registry.get("s").unwrap();
        assert_eq!(s.is_where(&Point3::new(2.0, 0.0, 0.0)), OUTSIDE);
    }

    #[test]
    fn union_shares_children_with_the_registry() {
        let def = definition(
            r#"
            [[geometry]]
            name = "a"
            library = "egs_spheres"
            radii = [1]
            [[geometry]]
            name = "b"
            library = "egs_spheres"
            midpoint = [1, 0, 0]
            radii = [1]
            [[geometry]]
            name = "ab"
            library = "egs_union"
            geometries = ["a", "ghost", "b"]
            priorities = [1, 2]
            "boundary tolerance" = 1e-8
            "#,
        );
        let registry = build_registry(&def).unwrap();
        let ab = registry.get("ab").unwrap();
        assert_eq!(ab.regions(), 2);
        assert_eq!(ab.boundary_tolerance(), 1e-8);
        let Geometry::Union(union) = ab.as_ref() else {
            panic!("expected a union");
        };
        // b has the higher priority
        assert!(Arc::ptr_eq(&union.children()[0], &registry.get("b").unwrap()));
        assert_eq!(ab.is_where(&Point3::new(0.5, 0.0, 0.0)), 0);
    }

    #[test]
    fn prism_and_pyramid_types() {
        let def = definition(
            r#"
            [[geometry]]
            name = "bar"
            library = "egs_prism"
            type = "EGS_PrismZ"
            points = [0, 0, 1, 0, 1, 1, 0, 1]
            closed = [0, 2]

            [[geometry]]
            name = "wedge"
            library = "egs_prism"
            type = "EGS_Prism"
            points = [0, 0, 0, 1, 0, 0, 0, 1, 0]

            [[geometry]]
            name = "spike"
            library = "egs_pyramid"
            type = "EGS_PyramidX"
            points = [0, 0, 1, 0, 0, 1]
            tip = [3, 0.2, 0.2]
            closed = 1

            [[geometry]]
            name = "odd"
            library = "egs_prism"
            type = "EGS_PrismW"
            points = [0, 0, 1, 0, 1, 1]
            "#,
        );
        let registry = build_registry(&def).unwrap();
        assert_eq!(registry.len(), 3);
        let bar = registry.get("bar").unwrap();
        assert_eq!(bar.kind(), GeometryKind::PrismZ);
        assert_eq!(bar.is_where(&Point3::new(0.5, 0.5, 1.5)), 0);
        assert_eq!(bar.is_where(&Point3::new(0.5, 0.5, 2.5)), OUTSIDE);
        assert_eq!(registry.get("wedge").unwrap().kind(), GeometryKind::Prism);
        let spike = registry.get("spike").unwrap();
        assert_eq!(spike.kind(), GeometryKind::PyramidX);
        assert_eq!(spike.is_where(&Point3::new(1.0, 0.2, 0.2)), 0);
    }

    #[test]
    fn sector_divider_and_repeater() {
        let def = definition(
            r#"
            [[geometry]]
            name = "quadrants"
            library = "egs_iplanes"
            axis = [0, 0, 0, 0, 0, 1]
            angles = [0, 90]

            [[geometry]]
            name = "ball"
            library = "egs_spheres"
            midpoint = [3, 0, 0]
            radii = [1]
            [geometry."media input"]
            media = ["lead"]

            [[geometry]]
            name = "ring"
            library = "egs_iplanes"
            type = "EGS_RadialRepeater"
            "repeated geometry" = "ball"
            "number of repetitions" = 4
            medium = "air"
            "set repeater label" = ["first", 0]
            "#,
        );
        let registry = build_registry(&def).unwrap();
        let quadrants = registry.get("quadrants").unwrap();
        assert_eq!(quadrants.regions(), 4);
        let ring = registry.get("ring").unwrap();
        assert_eq!(ring.kind(), GeometryKind::RadialRepeater);
        assert_eq!(ring.regions(), 5);
        assert_eq!(ring.is_where(&Point3::new(0.0, 3.0, 0.0)), 1);
        assert_eq!(ring.medium(1), registry.media.index_of("lead").unwrap());
        assert_eq!(ring.medium(4), registry.media.index_of("air").unwrap());
        assert_eq!(ring.label_regions("first"), vec![0]);
    }

    #[test]
    fn bad_set_medium_rows_are_skipped() {
        let mut media = MediumTable::new();
        let mut g: Geometry = Spheres::new("s", Point3::origin(), vec![1.0, 2.0, 3.0])
            .unwrap()
            .into();
        let input = GeometryInput::parse(
            r#"
            media = ["A", "B"]
            "set medium" = [[1, 2, 1], [0, 7], [1, 2, 3, 4, 5]]
            "#,
        )
        .unwrap();
        apply_media_input(&mut g, &input, &mut media);
        assert_eq!(g.medium(0), 0);
        assert_eq!(g.medium(1), 1);
        assert_eq!(g.medium(2), 1);
        assert_eq!(g.medium(OUTSIDE), VACUUM);
    }

    #[test]
    fn labels_from_strings() {
        let input = GeometryInput::parse(r#""set label" = [["rings 1 2"], ["core", 0]]"#).unwrap();
        let labels = read_labels(&input, "set label");
        assert_eq!(labels[0], ("rings".to_string(), vec![1, 2]));
        assert_eq!(labels[1], ("core".to_string(), vec![0]));
    }

    #[test]
    fn triangle_mesh_needs_stl() {
        let def = definition(
            r#"
            [[geometry]]
            name = "m"
            library = "egs_triangle_mesh"
            file = "mesh.obj"
            "#,
        );
        assert!(build_registry(&def).unwrap().is_empty());
    }
}
