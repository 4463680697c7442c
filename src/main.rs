use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use nalgebra::{Point3, Vector3};

use egs_geom::factory::{build_registry, simulation_geometry};
use egs_geom::geometry::{GeometryQuery, SharedGeometry};
use egs_geom::input::Definition;
use egs_geom::registry::GeometryRegistry;
use egs_geom::settings::{self, CliArgs, Command};
use egs_geom::tester;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let settings = settings::load_config(&args)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    let definition = Definition::from_file(args.command.file())?;
    let registry = build_registry(&definition)
        .with_context(|| format!("fatal error in {:?}", args.command.file()))?;

    match &args.command {
        Command::Describe { .. } => {
            for geometry in registry.iter() {
                info!("{}", geometry.describe(&registry.media));
            }
            if let Some(geometry) = simulation_geometry(&definition, &registry) {
                info!("simulation geometry: {}", geometry.name());
            }
        }
        Command::Check { geometry, .. } => {
            let geometry = select(&definition, &registry, geometry.as_deref())?;
            println!("{}", settings);
            let report = tester::check(geometry.as_ref(), &settings, true);
            println!("{}", report);
            if !report.is_consistent() {
                bail!("geometry `{}` failed the consistency check", geometry.name());
            }
        }
        Command::Trace {
            origin,
            direction,
            geometry,
            json,
            ..
        } => {
            let geometry = select(&definition, &registry, geometry.as_deref())?;
            let origin = Point3::from_slice(origin);
            let direction = Vector3::from_column_slice(direction)
                .try_normalize(0.0)
                .context("direction must not be zero")?;
            let steps = tester::trace(geometry.as_ref(), &origin, &direction);
            if *json {
                println!("{}", serde_json::to_string_pretty(&steps)?);
            } else {
                for step in &steps {
                    println!(
                        "region {:>5}  medium {:<12}  from ({:.6}, {:.6}, {:.6})  length {:.6}",
                        step.region,
                        registry.media.display_name(step.medium),
                        step.start.x,
                        step.start.y,
                        step.start.z,
                        step.length
                    );
                }
            }
        }
    }
    Ok(())
}

/// The geometry named on the command line, or the simulation geometry.
fn select(
    definition: &Definition,
    registry: &GeometryRegistry,
    name: Option<&str>,
) -> Result<SharedGeometry> {
    match name {
        Some(name) => registry
            .get(name)
            .with_context(|| format!("no geometry named `{}`", name)),
        None => simulation_geometry(definition, registry).context("no geometry was built"),
    }
}
