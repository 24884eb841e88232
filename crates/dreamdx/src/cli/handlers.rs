//! Command handlers.

use super::{Cli, Commands};
use anyhow::Context;
use dreamdx::{
    Acknowledgement, DreamConfig, DreamSession, GatewayClient, GatewayError, NarrativeDocument,
    RetryPolicy, describe_gateway_error, run_dream_loop,
};
use serde_json::Value;
use tracing::{info, instrument};

/// Run the parsed command.
pub async fn handle(cli: Cli, config: DreamConfig) -> anyhow::Result<()> {
    let json = cli.json;

    match cli.command {
        Commands::Serve { bind, stage } => serve(config, bind, stage).await,
        Commands::Start {
            target,
            description,
        } => {
            let client = gateway_client(&config)?;
            let reply = client
                .start_narrative(&target.user, &target.session, &description.join(" "))
                .await;
            print_document(reply, json)
        }
        Commands::Continue { target, action } => {
            let client = gateway_client(&config)?;
            let reply = client
                .continue_narrative(&target.user, &target.session, &action.join(" "))
                .await;
            print_document(reply, json)
        }
        Commands::WakeUp => print_ack(gateway_client(&config)?.wake_up().await, json),
        Commands::List { user } => {
            let dreams = gateway_client(&config)?.get_narratives(&user).await;
            print_list(dreams, json)
        }
        Commands::Delete { target } => {
            let ack = gateway_client(&config)?
                .delete_narrative(&target.user, &target.session)
                .await;
            print_ack(ack, json)
        }
        Commands::Show { target } => {
            let dream = gateway_client(&config)?
                .get_narrative_content(&target.user, &target.session)
                .await;
            print_history(dream, json)
        }
        Commands::Dream { user } => {
            let client = gateway_client(&config)?;
            let mut session = DreamSession::new(user);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            run_dream_loop(&client, &mut session, stdin, &mut stdout).await?;
            Ok(())
        }
    }
}

#[instrument(skip(config))]
async fn serve(
    config: DreamConfig,
    bind: Option<String>,
    stage: Option<String>,
) -> anyhow::Result<()> {
    let mut server = config.server().clone();
    if let Some(bind) = bind {
        server = server.with_bind(bind);
    }
    if let Some(stage) = stage {
        server = server.with_stage(stage);
    }
    let config = config.with_server(server);

    info!(bind = %config.server().bind(), "Starting narrative endpoint");
    dreamdx_server::run(&config).await?;
    Ok(())
}

fn gateway_client(config: &DreamConfig) -> anyhow::Result<GatewayClient> {
    let settings = config.gateway();
    let policy = RetryPolicy::default()
        .with_max_retries(*settings.max_retries())
        .with_backoff_factor(*settings.backoff_factor());

    GatewayClient::new(
        settings.resolve_base_url()?,
        settings.stage().clone(),
        policy,
        settings.timeout(),
    )
    .context("Failed to create gateway client")
}

fn fail(err: GatewayError) -> anyhow::Result<()> {
    anyhow::bail!(describe_gateway_error(&err))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let value: Value = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_document(reply: Result<NarrativeDocument, GatewayError>, json: bool) -> anyhow::Result<()> {
    match reply {
        Ok(dream) if json => print_json(&dream),
        Ok(dream) => {
            println!("{}", dream.description);
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn print_ack(reply: Result<Acknowledgement, GatewayError>, json: bool) -> anyhow::Result<()> {
    match reply {
        Ok(ack) if json => print_json(&ack),
        Ok(ack) => {
            println!("{}", ack.message);
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn print_list(reply: Result<Vec<NarrativeDocument>, GatewayError>, json: bool) -> anyhow::Result<()> {
    match reply {
        Ok(dreams) if json => print_json(&dreams),
        Ok(dreams) if dreams.is_empty() => {
            println!("No dreams yet.");
            Ok(())
        }
        Ok(dreams) => {
            for dream in dreams {
                println!(
                    "{}\t{}\t{} actions",
                    dream.session_id,
                    dream.date,
                    dream.actions.len()
                );
            }
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn print_history(reply: Result<NarrativeDocument, GatewayError>, json: bool) -> anyhow::Result<()> {
    match reply {
        Ok(dream) if json => print_json(&dream),
        Ok(dream) => {
            for entry in &dream.entries {
                if entry.is_action() {
                    println!("> {}\n", entry.text());
                } else {
                    println!("{}\n", entry.text().trim_end());
                }
            }
            Ok(())
        }
        Err(e) => fail(e),
    }
}
