// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod layout;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use layout::Layout;
use runtime::HostRuntime;
use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tablenav_core::{Document, Navigator, Selector};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    init_tracing(&Config::log_path(&options.config_path))?;

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tablenav --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let layout = load_layout(&options, &config)?;
    let selector = options
        .selector
        .clone()
        .unwrap_or_else(|| config.selector().to_owned());
    let mut navigator = build_navigator(&layout, &selector, &config)?;
    info!(
        selector = %selector,
        tables = navigator.tables().len(),
        "navigator ready"
    );
    if options.check_only {
        return Ok(());
    }

    let mut runtime = HostRuntime::new(options.pick);
    tablenav_tui::run_app(&mut navigator, &mut runtime)?;
    info!(activations = runtime.activations(), "session finished");
    if let Some(picked) = runtime.picked() {
        println!("{picked}");
    }
    Ok(())
}

fn load_layout(options: &CliOptions, config: &Config) -> Result<Layout> {
    if options.demo {
        return Layout::demo();
    }
    let path = options
        .layout_path
        .clone()
        .or_else(|| config.layout_path(&options.config_path))
        .ok_or_else(|| {
            anyhow!(
                "no layout to navigate; pass --layout <path>, set [layout].path in {}, or try --demo",
                options.config_path.display()
            )
        })?;
    Layout::load(&path)
}

fn build_navigator(
    layout: &Layout,
    selector: &str,
    config: &Config,
) -> Result<Navigator<Document>> {
    Selector::parse(selector).with_context(|| format!("container selector {selector:?}"))?;
    let document = layout.to_document()?;
    Ok(Navigator::new(document, selector, config.navigator_config()))
}

fn init_tracing(log_path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;
    let filter =
        EnvFilter::try_from_env("TABLENAV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    layout_path: Option<PathBuf>,
    selector: Option<String>,
    print_config_path: bool,
    demo: bool,
    pick: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        layout_path: None,
        selector: None,
        print_config_path: false,
        demo: false,
        pick: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--layout" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--layout requires a file path"))?;
                options.layout_path = Some(PathBuf::from(value.as_ref()));
            }
            "--selector" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow!("--selector requires a selector such as table.tablenav")
                })?;
                options.selector = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--pick" => {
                options.pick = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if options.demo && options.layout_path.is_some() {
        return Err(anyhow!("--demo and --layout are mutually exclusive"));
    }

    Ok(options)
}

fn print_help() {
    println!("tablenav: keyboard navigation over link tables");
    println!("  --config <path>          Use a specific config path");
    println!("  --layout <path>          Navigate the tables described by a layout file");
    println!("  --selector <selector>    Override [navigator].selector");
    println!("  --demo                   Navigate a built-in demo layout");
    println!("  --pick                   Quit on the first activation and print its action");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config + layout without opening the terminal");
    println!("  --help                   Show this help");
    println!();
    println!("Logs go to tablenav.log next to the config; set TABLENAV_LOG=debug for more.");
}
