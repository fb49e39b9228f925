use anyhow::{Context, Result};
use tracing::info;
use dockwatch::hub::HubClient;
use dockwatch::logs::DEFAULT_CAPACITY;
use dockwatch::{host_snapshot, EngineClient, Tail};
use crate::cli::{Cli, Commands};
use crate::output::{self, Format};

pub fn run(cli: Cli) -> Result<()> {
    let format = Format::parse(&cli.output)?;

    // Docker Hub 查询不需要 Engine 连接
    if let Commands::Search { name } = &cli.command {
        let hub = HubClient::new()?;
        let repo = hub.search(name)?;
        return output::hub_repository(name, repo.as_ref(), format);
    }

    let settings = cli.connection.settings();
    let profile = settings.resolve()?;
    let engine = EngineClient::with_options(&profile, settings.client_options())?;
    info!(engine = engine.base_url(), "connected");

    match cli.command {
        Commands::Snapshot => output::snapshot(&host_snapshot(&engine), format),
        Commands::Containers { all } => output::containers(&engine.list_containers(all)?, format),
        Commands::Images => output::images(&engine.list_images()?, format),
        Commands::Networks => output::networks(&engine.list_networks()?, format),
        Commands::Volumes => output::volumes(&engine.list_volumes()?, format),

        Commands::Logs { container, tail, follow, streams } => {
            let tail = parse_tail(&tail)?;
            let stream = engine.open_container_log_stream(&container, tail, follow)?;

            if !follow {
                for line in stream {
                    output::log_line(&line?, format, streams)?;
                }
                return Ok(());
            }

            let subscription = stream.subscribe(DEFAULT_CAPACITY)?;
            let token = subscription.cancel_token();
            ctrlc::set_handler(move || token.cancel())
                .context("cannot install Ctrl+C handler")?;

            for line in subscription {
                output::log_line(&line?, format, streams)?;
            }
            Ok(())
        }

        Commands::Start { container } => {
            engine.start_container(&container)?;
            output::done("started", &container, format)
        }
        Commands::Stop { container } => {
            engine.stop_container(&container)?;
            output::done("stopped", &container, format)
        }
        Commands::Restart { container } => {
            engine.restart_container(&container)?;
            output::done("restarted", &container, format)
        }
        Commands::Rm { container, force } => {
            engine.remove_container(&container, force)?;
            output::done("removed", &container, format)
        }
        Commands::Rmi { image, force } => {
            engine.remove_image(&image, force)?;
            output::done("removed", &image, format)
        }
        Commands::NetworkRm { network } => {
            engine.remove_network(&network)?;
            output::done("removed", &network, format)
        }
        Commands::VolumeRm { volume } => {
            engine.remove_volume(&volume)?;
            output::done("removed", &volume, format)
        }

        Commands::Search { .. } => unreachable!("handled before connecting"),
    }
}

fn parse_tail(s: &str) -> Result<Tail> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(Tail::All);
    }
    let n = s.parse::<u64>()
        .with_context(|| format!("--tail must be a number or \"all\", got {:?}", s))?;
    Ok(Tail::Lines(n))
}
