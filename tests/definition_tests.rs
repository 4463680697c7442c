use std::path::PathBuf;

use approx::assert_relative_eq;
use egs_geom::factory::{build_registry, simulation_geometry};
use egs_geom::geometry::{GeometryKind, GeometryQuery, OUTSIDE};
use egs_geom::input::Definition;
use egs_geom::stl::read_stl;
use egs_geom::tester::{check, trace};
use egs_geom::tetgen::read_tetgen;
use nalgebra::{Point3, Vector3};

fn test_data(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(file)
}

#[test]
fn ascii_and_binary_stl_agree() {
    let ascii = read_stl(test_data("three_facets.stl")).unwrap();
    let binary = read_stl(test_data("three_facets_binary.stl")).unwrap();
    assert_eq!(ascii.len(), 3);
    assert_eq!(binary.len(), 3);

    for (a, b) in ascii.triangles.iter().zip(&binary.triangles) {
        assert_relative_eq!(a.a, b.a, epsilon = 1e-4);
        assert_relative_eq!(a.b, b.b, epsilon = 1e-4);
        assert_relative_eq!(a.c, b.c, epsilon = 1e-4);
    }
    let first = &ascii.triangles[0];
    assert_relative_eq!(first.a, Point3::new(43.062, 20.491, -149.441), epsilon = 1e-4);
    assert_relative_eq!(
        first.normal,
        Vector3::new(0.6229, 0.35962, 0.694744),
        epsilon = 1e-6
    );
}

#[test]
fn tetgen_cube() {
    let read = read_tetgen(test_data("cube.node"), None).unwrap();
    assert_eq!(read.mesh.len(), 5);
    assert_eq!(read.mesh.num_nodes(), 8);
    assert_eq!(read.media, vec!["medium_1", "medium_2"]);
    assert_eq!(read.mesh.media(), vec![0, 1, 1, 1, 1]);
    // the central tetrahedron touches every corner one
    assert_eq!(read.mesh.neighbour_table()[0], [4, 3, 2, 1]);
    assert_eq!(read.mesh.boundaries(), vec![false, true, true, true, true]);
}

#[test]
fn world_definition() {
    let definition = Definition::from_file(&test_data("world.toml")).unwrap();
    let registry = build_registry(&definition).unwrap();

    // the unknown library is skipped
    assert_eq!(registry.len(), 5);
    assert!(!registry.contains("teapot"));
    assert_eq!(registry.media.names(), &["PMMA", "water", "lead", "air"]);

    let world = simulation_geometry(&definition, &registry).unwrap();
    assert_eq!(world.name(), "world");
    assert_eq!(world.kind(), GeometryKind::Union);
    assert_eq!(world.regions(), 10);
    assert_eq!(world.boundary_tolerance(), 1e-9);
    assert_eq!(world.label_regions("inner"), vec![0, 1, 2, 3, 4]);

    assert_eq!(world.is_where(&Point3::new(0.5, 0.5, 0.5)), 0);
    assert_eq!(world.medium(0), 1);
    assert_eq!(world.is_where(&Point3::new(0.1, 0.1, 0.1)), 1);
    assert_eq!(world.medium(1), 2);
    assert_eq!(world.is_where(&Point3::new(1.5, 1.5, 1.5)), 5);
    assert_eq!(world.medium(5), 0);
    assert_eq!(world.is_where(&Point3::new(2.5, 0.5, 0.5)), OUTSIDE);
}

#[test]
fn trace_leaves_the_core_through_the_shell() {
    let definition = Definition::from_file(&test_data("world.toml")).unwrap();
    let registry = build_registry(&definition).unwrap();
    let world = registry.get("world").unwrap();

    let steps = trace(world.as_ref(), &Point3::new(0.5, 0.3, 0.6), &Vector3::x());
    let (core, rest): (Vec<_>, Vec<_>) = steps.iter().partition(|s| (0..5).contains(&s.region));
    assert_eq!(steps[0].region, 0);
    assert_relative_eq!(core.iter().map(|s| s.length).sum::<f64>(), 0.5, epsilon = 1e-8);

    assert_eq!(rest.len(), 2);
    assert_eq!(rest[0].region, 5);
    assert_eq!(rest[0].medium, 0);
    assert_relative_eq!(rest[0].length, 1.0, epsilon = 1e-8);
    assert_eq!(rest[1].region, OUTSIDE);
    assert!(rest[1].length.is_infinite());
}

#[test]
fn repeated_balls() {
    let definition = Definition::from_file(&test_data("world.toml")).unwrap();
    let registry = build_registry(&definition).unwrap();
    let balls = registry.get("balls").unwrap();
    let air = registry.media.index_of("air").unwrap();
    let water = registry.media.index_of("water").unwrap();

    assert_eq!(balls.kind(), GeometryKind::RadialRepeater);
    assert_eq!(balls.regions(), 13);
    assert_eq!(balls.is_where(&Point3::new(4.0, 0.0, 0.0)), 0);
    let angle = std::f64::consts::FRAC_PI_3;
    let x = Point3::new(4.0 * angle.cos(), 4.0 * angle.sin(), 0.0);
    assert_eq!(balls.is_where(&x), 2);
    assert_eq!(balls.medium(2), water);
    assert_eq!(balls.medium(3), air);
    assert_eq!(balls.is_where(&Point3::origin()), 12);
    assert_eq!(balls.medium(12), air);
}

#[test]
fn shell_passes_the_random_checks() {
    let definition = Definition::from_file(&test_data("world.toml")).unwrap();
    let registry = build_registry(&definition).unwrap();
    let shell = registry.get("shell").unwrap();
    let settings = egs_geom::settings::Settings {
        samples: 1000,
        centre: [1.0, 1.0, 1.0],
        extent: 2.0,
        tolerance: 1e-8,
        seed: Some(11),
        log_level: "info".to_string(),
    };
    let report = check(shell.as_ref(), &settings, false);
    assert_eq!(report.samples, 1000);
    assert_eq!(report.inside_mismatches, 0);
    assert_eq!(report.hownear_violations, 0);
}
