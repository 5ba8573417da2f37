//! Isoforge CLI - compile density formulas and mesh them from the command line

mod args;
mod watch;

use anyhow::{Context, Result, bail};
use args::{MeshArgs, parse_param};
use clap::{Parser, Subcommand};
use glam::Vec3;
use isoforge_formula::{Formula, FunctionRegistry, parse};
use isoforge_mesh::{MeshGenerator, export_obj};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Parameter name formula files are compiled against when they declare none
const POSITION_PARAMETER: &str = "coords";

#[derive(Parser)]
#[command(name = "isoforge")]
#[command(about = "Density formulas and voxel surface extraction", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and print its canonical form
    Parse {
        /// Expression text
        expression: String,
    },

    /// Evaluate an expression once
    Eval {
        /// Expression text
        expression: String,

        /// Runtime parameter as name=x,y,z (or name=s); order sets the slot
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Vec3)>,
    },

    /// Compile a formula file and print or save the program
    Compile {
        /// Formula file (.json document or bare expression text)
        formula: PathBuf,

        /// Write the program as JSON instead of printing a disassembly
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Mesh one region of a formula and export it as OBJ
    Mesh {
        /// Formula file (.json document or bare expression text)
        formula: PathBuf,

        #[command(flatten)]
        mesh: MeshArgs,

        /// Output OBJ file
        #[arg(short, long, default_value = "mesh.obj")]
        output: PathBuf,
    },

    /// Re-mesh a formula file every time it changes
    Watch {
        /// Formula file to watch
        formula: PathBuf,

        #[command(flatten)]
        mesh: MeshArgs,

        /// Output OBJ file, rewritten after every successful edit
        #[arg(short, long, default_value = "mesh.obj")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { expression } => run_parse(&expression)?,
        Commands::Eval { expression, params } => run_eval(&expression, &params)?,
        Commands::Compile { formula, output } => run_compile(&formula, output.as_deref())?,
        Commands::Mesh {
            formula,
            mesh,
            output,
        } => run_mesh(&formula, &mesh, &output)?,
        Commands::Watch {
            formula,
            mesh,
            output,
        } => watch::run_watch(&formula, &mesh, &output)?,
    }

    Ok(())
}

/// Load a formula file, defaulting its parameters to the sample position
pub(crate) fn load_formula(path: &Path) -> Result<Formula> {
    let mut formula =
        Formula::load(path).with_context(|| format!("Failed to load formula {}", path.display()))?;
    if formula.parameters().is_empty() {
        formula.set_parameters([POSITION_PARAMETER]);
    }
    Ok(formula)
}

fn run_parse(expression: &str) -> Result<()> {
    match parse(expression) {
        Ok(Some(ast)) => println!("{}", ast),
        Ok(None) => println!("(empty)"),
        Err(e) => bail!("{}", e),
    }
    Ok(())
}

fn run_eval(expression: &str, params: &[(String, Vec3)]) -> Result<()> {
    let mut formula = Formula::new(expression).with_parameters(params.iter().map(|(name, _)| name));
    let compiled = formula.compile(&FunctionRegistry::builtin())?;

    let values: Vec<Vec3> = params.iter().map(|(_, value)| *value).collect();
    let result = compiled.program.eval(&values);
    println!("{} {} {}", result.x, result.y, result.z);
    Ok(())
}

fn run_compile(path: &Path, output: Option<&Path>) -> Result<()> {
    let mut formula = load_formula(path)?;
    let compiled = formula.compile(&FunctionRegistry::builtin())?;

    if let Some(output) = output {
        std::fs::write(output, compiled.program.to_json()?)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {} instructions to {}", compiled.program.len(), output.display());
    } else {
        print!("{}", compiled.program);
    }

    if !compiled.used_variables.is_empty() {
        let names: Vec<&str> = compiled.used_variables.iter().map(String::as_str).collect();
        println!("Variables: {}", names.join(", "));
    }
    Ok(())
}

fn run_mesh(path: &Path, args: &MeshArgs, output: &Path) -> Result<()> {
    let request = args.request()?;
    let mut formula = load_formula(path)?;
    let generator = MeshGenerator::from_formula(&mut formula)?;

    let mesh = generator.generate(&request)?;
    println!(
        "Generated mesh: {} vertices, {} triangles",
        mesh.buffers.vertex_count(),
        mesh.buffers.triangle_count()
    );

    export_obj(&mesh.buffers, output)?;
    println!("Exported to: {}", output.display());
    Ok(())
}
