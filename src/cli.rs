use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use crate::creation::{CreationDefinition, CreationInstance};
use crate::value::{Storage, Value};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Instantiate a creation and print its variables over a number of ticks
    Inspect {
        /// Creation definition JSON file
        #[arg(long)]
        creation: PathBuf,

        /// Number of ticks to advance
        #[arg(long, default_value_t = 1)]
        ticks: u64,

        /// Variable assignments applied every tick, as name=value
        /// (vectors and matrices as comma-separated components)
        #[arg(long)]
        set: Vec<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            creation,
            ticks,
            set,
        } => inspect(creation, ticks, &set),
    }
}

fn inspect(path: PathBuf, ticks: u64, assignments: &[String]) -> Result<()> {
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("reading creation file {:?}", path))?;
    let def: CreationDefinition =
        serde_json::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;

    let mut instance = CreationInstance::instantiate(&def);
    println!(
        "creation '{}': {} nodes, {} variables",
        instance.name(),
        instance.scene().len(),
        instance.variables().len()
    );

    let parsed: Vec<(String, String)> = assignments
        .iter()
        .map(|a| {
            a.split_once('=')
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("malformed --set '{}', expected name=value", a))
        })
        .collect::<Result<_>>()?;

    for _ in 0..ticks {
        instance.advance_tick();
        println!("--- tick {} ---", instance.tick());

        for (name, raw) in &parsed {
            let Some(var) = instance.variable(name) else {
                log::warn!("--set names unknown variable '{}'", name);
                continue;
            };
            let value = parse_value(raw, var.value_type().storage())
                .with_context(|| format!("parsing --set value for '{}'", name))?;
            if !instance.set(name, value) {
                log::warn!("write to '{}' was dropped", name);
            }
        }

        let names: Vec<String> = instance
            .variables()
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        for name in names {
            let value = instance.get(&name).unwrap_or(Value::Bool(false));
            let var = instance.variable(&name).unwrap();
            let marker = if var.changed() { " *" } else { "" };
            let inert = if var.is_inert() { " (inert)" } else { "" };
            println!("  {} = {}{}{}", name, value, marker, inert);
        }
    }

    let issues = instance.take_issues();
    if !issues.is_empty() {
        println!("diagnostics:");
        println!("{}", serde_json::to_string_pretty(&issues)?);
    }

    Ok(())
}

/// Parse a CLI value literal for the given storage class.
fn parse_value(raw: &str, storage: Storage) -> Result<Value> {
    let floats = |expected: usize| -> Result<Vec<f32>> {
        let parts: Vec<f32> = raw
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("'{}' is not a comma-separated float list", raw))?;
        if parts.len() != expected {
            return Err(anyhow!(
                "'{}' has {} components, expected {}",
                raw,
                parts.len(),
                expected
            ));
        }
        Ok(parts)
    };

    Ok(match storage {
        Storage::Double => Value::Double(raw.trim().parse()?),
        Storage::Float => Value::Float(raw.trim().parse()?),
        Storage::Int => Value::Int(raw.trim().parse()?),
        Storage::Bool => Value::Bool(raw.trim().parse()?),
        Storage::Str => Value::Str(raw.to_string()),
        Storage::Vec2 => {
            let v = floats(2)?;
            Value::Vec2(glam::Vec2::new(v[0], v[1]))
        }
        Storage::Vec3 => {
            let v = floats(3)?;
            Value::Vec3(glam::Vec3::new(v[0], v[1], v[2]))
        }
        Storage::Vec4 => {
            let v = floats(4)?;
            Value::Vec4(glam::Vec4::new(v[0], v[1], v[2], v[3]))
        }
        Storage::Quat => {
            let v = floats(4)?;
            Value::Quat(glam::Quat::from_xyzw(v[0], v[1], v[2], v[3]).normalize())
        }
        Storage::Mat4 => {
            let v = floats(16)?;
            let mut cols = [0.0f32; 16];
            cols.copy_from_slice(&v);
            Value::Mat4(glam::Mat4::from_cols_array(&cols))
        }
    })
}
