//! threads CLI - track threads of work and render them as a tree.

use clap::Parser;
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use threads::action_log::{self, ActionLog};
use threads::cli::{Cli, Commands, ConfigCommands, ContainerCommands, GroupCommands, ThreadCommands};
use threads::commands::{self, ContainerParams, Output, ThreadFilter, ThreadParams, ThreadUpdate};
use threads::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use threads::storage::{Storage, find_git_root};
use threads::tree::style::style_for;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "TH_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    // Determine repo path: --repo flag > TH_REPO env > auto-detect git root > cwd
    let repo_path = resolve_repo_path(cli.repo_path.clone(), cli.human_readable);

    let overrides = overrides_from(&cli);
    let human = human_output(&repo_path, &overrides);

    let (cmd_name, args_json) = serialize_command(&cli.command);
    let start = Instant::now();

    let result = run_command(cli.command, &repo_path, &overrides, human);

    let duration = start.elapsed().as_millis() as u64;
    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    if cmd_name != "log" {
        let entry = ActionLog::new(&repo_path, &cmd_name, args_json, success, error, duration);
        action_log::record(&repo_path, &entry);
    }

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Resolve the repository path based on explicit flag, environment variable, or auto-detection.
///
/// An explicit path (via -C/--repo or TH_REPO) is used literally. Otherwise
/// the git root above the current directory is used, falling back to the
/// current directory itself.
fn resolve_repo_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let message = format!("Specified repo path does not exist: {}", path.display());
                if human {
                    eprintln!("Error: {}", message);
                } else {
                    eprintln!("{}", serde_json::json!({ "error": message }));
                }
                process::exit(1);
            }
            path
        }
        None => {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_git_root(&cwd).unwrap_or(cwd)
        }
    }
}

fn overrides_from(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    if cli.no_color || env::var_os("NO_COLOR").is_some() {
        overrides = overrides.with_color(false);
    }
    overrides
}

/// Configuration for this run. Falls back to defaults (plus CLI flags) when
/// the repository is not initialized.
fn resolved_config(repo_path: &Path, overrides: &ConfigOverrides) -> ResolvedConfig {
    let system = Storage::read_system_config().unwrap_or_default();
    let session = Storage::open(repo_path)
        .and_then(|storage| storage.read_config())
        .unwrap_or_default();
    threads::config::resolve_from(&system, &session, overrides)
}

fn human_output(repo_path: &Path, overrides: &ConfigOverrides) -> bool {
    resolved_config(repo_path, overrides).output_format() == OutputFormat::Human
}

fn run_command(
    command: Option<Commands>,
    repo_path: &Path,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), threads::Error> {
    let Some(command) = command else {
        // No subcommand: show the tree.
        return run_command(Some(Commands::Tree { group: None }), repo_path, overrides, human);
    };

    if let Commands::Init = command {
        output(&commands::init(repo_path)?, human);
        return Ok(());
    }

    let mut storage = Storage::open(repo_path)?;
    let config = resolve_config(&storage, overrides)?;

    match command {
        // Handled before storage is opened.
        Commands::Init => {}

        Commands::Thread { command } => match command {
            ThreadCommands::New {
                name,
                description,
                importance,
                size,
                status,
                parent,
                group,
                tag,
            } => {
                let params = ThreadParams {
                    name,
                    description,
                    importance,
                    size,
                    status,
                    parent,
                    group,
                    tags: tag,
                };
                output(&commands::thread_create(&mut storage, params, &config)?, human);
            }
            ThreadCommands::List { status, group, tag } => {
                let filter = ThreadFilter { status, group, tag };
                output(&commands::thread_list(&storage, &filter)?, human);
            }
            ThreadCommands::Show { id } => {
                output(&commands::thread_show(&storage, &id)?, human);
            }
            ThreadCommands::Update {
                id,
                name,
                description,
                status,
                importance,
                size,
                parent,
                no_parent,
                group,
                no_group,
                add_tag,
                remove_tag,
            } => {
                let update = ThreadUpdate {
                    name,
                    description,
                    status,
                    importance,
                    size,
                    parent: if no_parent { Some(None) } else { parent.map(Some) },
                    group: if no_group { Some(None) } else { group.map(Some) },
                    add_tags: add_tag,
                    remove_tags: remove_tag,
                };
                output(&commands::thread_update(&mut storage, &id, update)?, human);
            }
            ThreadCommands::Progress { id, note } => {
                output(&commands::thread_progress(&mut storage, &id, &note)?, human);
            }
        },

        Commands::Container { command } => match command {
            ContainerCommands::New {
                name,
                description,
                parent,
                group,
                tag,
            } => {
                let params = ContainerParams {
                    name,
                    description,
                    parent,
                    group,
                    tags: tag,
                };
                output(&commands::container_create(&mut storage, params)?, human);
            }
            ContainerCommands::List => {
                output(&commands::container_list(&storage)?, human);
            }
        },

        Commands::Group { command } => match command {
            GroupCommands::New { name, description } => {
                output(&commands::group_create(&mut storage, &name, description)?, human);
            }
            GroupCommands::List => {
                output(&commands::group_list(&storage)?, human);
            }
            GroupCommands::Rm { id } => {
                output(&commands::group_remove(&mut storage, &id)?, human);
            }
        },

        Commands::Detail { id, content } => {
            output(&commands::detail_add(&mut storage, &id, &content)?, human);
        }

        Commands::Rm { id } => {
            output(&commands::remove(&mut storage, &id)?, human);
        }

        Commands::Tree { group } => {
            let color = config.color() && std::io::stdout().is_terminal();
            let style = style_for(color);
            output(&commands::tree(&storage, group.as_deref(), style.as_ref())?, human);
        }

        Commands::Import { file } => {
            output(&commands::import(&mut storage, &file)?, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                output(&commands::config_get(&storage, &key)?, human);
            }
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(&storage, &key, &value)?, human);
            }
            ConfigCommands::List => {
                output(&commands::config_list(&storage)?, human);
            }
        },

        Commands::Log { limit } => {
            output(&commands::log(&storage, limit)?, human);
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Command name and arguments for the action log.
fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    match command {
        None => ("tree".to_string(), serde_json::json!({})),

        Some(Commands::Init) => ("init".to_string(), serde_json::json!({})),

        Some(Commands::Thread { command }) => match command {
            ThreadCommands::New {
                name,
                description,
                importance,
                size,
                status,
                parent,
                group,
                tag,
            } => (
                "thread new".to_string(),
                serde_json::json!({
                    "name": name,
                    "description": description,
                    "importance": importance,
                    "size": size,
                    "status": status,
                    "parent": parent,
                    "group": group,
                    "tag": tag,
                }),
            ),
            ThreadCommands::List { status, group, tag } => (
                "thread list".to_string(),
                serde_json::json!({ "status": status, "group": group, "tag": tag }),
            ),
            ThreadCommands::Show { id } => {
                ("thread show".to_string(), serde_json::json!({ "id": id }))
            }
            ThreadCommands::Update {
                id,
                name,
                description,
                status,
                importance,
                size,
                parent,
                no_parent,
                group,
                no_group,
                add_tag,
                remove_tag,
            } => (
                "thread update".to_string(),
                serde_json::json!({
                    "id": id,
                    "name": name,
                    "description": description,
                    "status": status,
                    "importance": importance,
                    "size": size,
                    "parent": parent,
                    "no_parent": no_parent,
                    "group": group,
                    "no_group": no_group,
                    "add_tag": add_tag,
                    "remove_tag": remove_tag,
                }),
            ),
            ThreadCommands::Progress { id, note } => (
                "thread progress".to_string(),
                serde_json::json!({ "id": id, "note": note }),
            ),
        },

        Some(Commands::Container { command }) => match command {
            ContainerCommands::New {
                name,
                description,
                parent,
                group,
                tag,
            } => (
                "container new".to_string(),
                serde_json::json!({
                    "name": name,
                    "description": description,
                    "parent": parent,
                    "group": group,
                    "tag": tag,
                }),
            ),
            ContainerCommands::List => ("container list".to_string(), serde_json::json!({})),
        },

        Some(Commands::Group { command }) => match command {
            GroupCommands::New { name, description } => (
                "group new".to_string(),
                serde_json::json!({ "name": name, "description": description }),
            ),
            GroupCommands::List => ("group list".to_string(), serde_json::json!({})),
            GroupCommands::Rm { id } => ("group rm".to_string(), serde_json::json!({ "id": id })),
        },

        Some(Commands::Detail { id, content }) => (
            "detail".to_string(),
            serde_json::json!({ "id": id, "content": content }),
        ),

        Some(Commands::Rm { id }) => ("rm".to_string(), serde_json::json!({ "id": id })),

        Some(Commands::Tree { group }) => {
            ("tree".to_string(), serde_json::json!({ "group": group }))
        }

        Some(Commands::Import { file }) => (
            "import".to_string(),
            serde_json::json!({ "file": file.display().to_string() }),
        ),

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { key } => {
                ("config get".to_string(), serde_json::json!({ "key": key }))
            }
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                serde_json::json!({ "key": key, "value": value }),
            ),
            ConfigCommands::List => ("config list".to_string(), serde_json::json!({})),
        },

        Some(Commands::Log { limit }) => ("log".to_string(), serde_json::json!({ "limit": limit })),
    }
}
