//! Command dispatch: one handler per subcommand

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::services::{RebuildStatus, ReleaseSubmission};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{ChangeDetail, ChangePolicy, TreeDump};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see 'reltree --help'".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(cli, command),
        Commands::Platforms => cmd_platforms(&open(cli)?),
        Commands::Versions { platform } => cmd_versions(&open(cli)?, platform),
        Commands::Filters { platform, json } => cmd_filters(&open(cli)?, platform, *json),
        Commands::Diff {
            end,
            start,
            policy,
            json,
        } => cmd_diff(&open(cli)?, end, start, *policy, *json),
        Commands::Lca { platform, a, b } => cmd_lca(&open(cli)?, platform, a, b),
        Commands::Path { platform, version } => cmd_path(&open(cli)?, platform, version),
        Commands::Tree { platform } => cmd_tree(&open(cli)?, platform),
        Commands::Dump { platform, json } => cmd_dump(&open(cli)?, platform, *json),
        Commands::Submit {
            version,
            platform,
            from_ver,
            date,
            submitted_by,
            changes_file,
            changes,
        } => {
            let mut details = match changes_file {
                Some(path) => read_changes_file(path)?,
                None => Vec::new(),
            };
            details.extend(changes.iter().map(|id| ChangeDetail::new(id.as_str())));
            cmd_submit(
                &open(cli)?,
                ReleaseSubmission {
                    version: version.clone(),
                    from_ver: from_ver.clone(),
                    platform: platform.clone(),
                    release_date: *date,
                    submitted_by: submitted_by.clone(),
                    changes: details,
                },
            )
        }
        Commands::Delete { version } => cmd_delete(&open(cli)?, version),
    }
}

fn current_dir() -> CliResult<PathBuf> {
    std::env::current_dir().map_err(|e| InfraError::io("read current directory", e).into())
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let cwd = current_dir()?;
    let mut settings = Settings::load(Some(cwd.as_path()))?;
    if let Some(catalog) = &cli.catalog {
        settings.catalog = catalog.clone();
    }
    debug!("catalog: {}", settings.catalog.display());
    Ok(settings)
}

fn open(cli: &Cli) -> CliResult<ServiceContainer> {
    Ok(ServiceContainer::new(load_settings(cli)?)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| InfraError::io("serialize json", e.into()))?;
    output::info(&text);
    Ok(())
}

fn read_changes_file(path: &Path) -> CliResult<Vec<ChangeDetail>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::InvalidArgs(format!("{}: {}", path.display(), e)))
}

/// Bring one platform tree in from the store.
fn load_platform(container: &ServiceContainer, platform: &str) -> CliResult<()> {
    container.trees.rebuild(platform, &*container.store)?;
    Ok(())
}

fn cmd_platforms(container: &ServiceContainer) -> CliResult<()> {
    for platform in container.releases.platforms()? {
        output::info(&platform);
    }
    Ok(())
}

fn cmd_versions(container: &ServiceContainer, platform: &str) -> CliResult<()> {
    let releases = container.releases.releases(platform)?;
    if releases.is_empty() {
        return Err(ApplicationError::NoTree(platform.to_string()).into());
    }
    for r in releases {
        let date = r.release_date.map(|d| d.to_string()).unwrap_or_default();
        output::info(&format!(
            "{}\t{}\t{}\t{}",
            r.version, r.from_ver, date, r.submitted_by
        ));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_diff(
    container: &ServiceContainer,
    end: &str,
    start: &str,
    policy: Option<ChangePolicy>,
    json: bool,
) -> CliResult<()> {
    let summary = container.releases.load()?;
    for (platform, err) in &summary.failures {
        output::warning(&format!("{platform}: {err}"));
    }

    let policy = policy.unwrap_or(container.releases.policy());
    let changes = container.releases.changes_between_with(end, start, policy)?;

    if json {
        return print_json(&changes);
    }
    for change in &changes {
        if change.title.is_empty() {
            output::info(&change.id);
        } else {
            output::info(&format!("{}\t{}", change.id, change.title));
        }
    }
    Ok(())
}

fn cmd_filters(container: &ServiceContainer, platform: &str, json: bool) -> CliResult<()> {
    let filters = container.releases.filters(platform)?;
    if json {
        return print_json(&filters);
    }
    output::info(&format!("domains: {}", filters.domains.join(", ")));
    output::info(&format!("impacts: {}", filters.impacts.join(", ")));
    Ok(())
}

fn cmd_lca(container: &ServiceContainer, platform: &str, a: &str, b: &str) -> CliResult<()> {
    load_platform(container, platform)?;
    let lca = container.trees.find_lca(platform, a, b)?;
    output::info(&lca);
    Ok(())
}

fn cmd_path(container: &ServiceContainer, platform: &str, version: &str) -> CliResult<()> {
    load_platform(container, platform)?;
    let path = container.trees.path(platform, version)?;
    output::info(&path.join(" -> "));
    Ok(())
}

fn cmd_tree(container: &ServiceContainer, platform: &str) -> CliResult<()> {
    load_platform(container, platform)?;
    output::header(platform);
    output::info(&container.trees.render(platform)?);
    Ok(())
}

fn print_dump(dump: &TreeDump) {
    output::header(&format!(
        "{}: {} releases, root {}",
        dump.platform, dump.node_count, dump.root
    ));
    for node in &dump.nodes {
        let parent = if node.from_ver.is_empty() {
            "-"
        } else {
            node.from_ver.as_str()
        };
        output::detail(&format!(
            "{} <- {}  changes: [{}]  children: [{}]",
            node.version,
            parent,
            node.changes.join(", "),
            node.children.join(", ")
        ));
    }
}

fn cmd_dump(container: &ServiceContainer, platform: &str, json: bool) -> CliResult<()> {
    load_platform(container, platform)?;
    let dump = container.trees.dump(platform)?;
    if json {
        return print_json(&dump);
    }
    print_dump(&dump);
    Ok(())
}

#[instrument(skip(container, submission), fields(version = %submission.version))]
fn cmd_submit(container: &ServiceContainer, submission: ReleaseSubmission) -> CliResult<()> {
    let version = submission.version.clone();
    let stats = container.releases.submit(submission)?;
    output::success(&format!("submitted {version} ({stats})"));
    Ok(())
}

fn cmd_delete(container: &ServiceContainer, version: &str) -> CliResult<()> {
    match container.releases.delete(version)? {
        RebuildStatus::Rebuilt(stats) => output::success(&format!("deleted {version} ({stats})")),
        RebuildStatus::Removed => {
            output::success(&format!("deleted {version}, platform has no releases left"))
        }
        RebuildStatus::Stale(reason) => {
            output::success(&format!("deleted {version}"));
            output::warning(&format!("tree left stale: {reason}"));
        }
    }
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(&current_dir()?)
            };
            write_template(&path)?;
            output::action("Created", &path.display());
            Ok(())
        }
        ConfigCommands::Path => {
            let marker = |p: &Path| if p.exists() { "" } else { " (not found)" };
            match global_config_path() {
                Some(p) => output::info(&format!("global: {}{}", p.display(), marker(p.as_path()))),
                None => output::info("global: <unavailable>"),
            }
            let local = local_config_path(&current_dir()?);
            output::info(&format!("local:  {}{}", local.display(), marker(local.as_path())));
            Ok(())
        }
    }
}

fn write_template(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
    }
    std::fs::write(path, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    Ok(())
}
