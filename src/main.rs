use clap::{Arg, Command};
use herald::actions::ActionFactory;
use herald::config::Config;
use herald::memory::{
    InMemoryFollowers, InMemoryInboxes, InMemoryMessages, InMemoryPreferences, InMemoryReactions,
    RecordingNotificationService, RecordingPushGateway,
};
use herald::message::User;
use herald::reactor::MessageReactor;
use herald::runner::ActionRunner;
use herald::service::{HeraldService, NewMessageRequest};
use herald::webhook::WebhookClient;
use herald::Urgency;
use log::LevelFilter;
use std::collections::HashSet;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("herald")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Message ingestion service with a reaction engine")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/herald.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Run sample messages through the configured reactions")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        let config = Config::default();
        match config.to_file(generate_path) {
            Ok(()) => {
                println!("Generated default configuration at {generate_path}");
                return;
            }
            Err(e) => {
                eprintln!("Failed to generate configuration: {e}");
                process::exit(1);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {config_path}: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!(
            "Configuration OK: {} applications, {} users, algorithm {:?}, runner {:?}",
            config.applications.len(),
            config.users.len(),
            config.match_algorithm,
            config.runner
        );
        return;
    }

    if matches.get_flag("demo") {
        if let Err(e) = run_demo(&config).await {
            eprintln!("Demo failed: {e}");
            process::exit(1);
        }
        return;
    }

    eprintln!("Nothing to do; pass --demo, --test-config, or --generate-config");
    process::exit(2);
}

/// Wires the in-memory collaborators from the configuration and runs one
/// sample message per configured application through the service.
async fn run_demo(config: &Config) -> anyhow::Result<()> {
    let reactions = Arc::new(InMemoryReactions::new());
    let messages = Arc::new(InMemoryMessages::new());
    let inboxes = Arc::new(InMemoryInboxes::new());
    let followers = Arc::new(InMemoryFollowers::new());
    let preferences = Arc::new(InMemoryPreferences::new());
    let push_gateway = Arc::new(RecordingPushGateway::new());
    let notifications = Arc::new(RecordingNotificationService::new());

    for app in &config.applications {
        reactions.set_application_reactions(&app.application_id, app.reactions.clone());
        let users = app
            .followers
            .iter()
            .map(|user_id| User {
                user_id: user_id.clone(),
                name: None,
            })
            .collect();
        followers.set_followers(&app.application_id, users);
    }
    for user in &config.users {
        reactions.set_user_reactions(&user.user_id, user.reactions.clone());
        preferences.set_devices(&user.user_id, HashSet::from_iter(user.devices.clone()));
    }

    let factory = ActionFactory::new(
        reactions,
        messages.clone(),
        inboxes.clone(),
        followers,
        preferences,
        push_gateway.clone(),
        notifications,
        WebhookClient::new(),
        config.match_algorithm.into(),
    );
    let runner = ActionRunner::new(config.runner, config.max_rounds);
    let reactor = MessageReactor::new(factory.clone(), runner);
    let service = HeraldService::new(factory, reactor);

    for app in &config.applications {
        let request = NewMessageRequest {
            application_id: app.application_id.clone(),
            application_name: app.name.clone(),
            title: "Demo: disk usage above 90%".to_string(),
            body: Some("Partition /var is filling up".to_string()),
            urgency: Urgency::High,
            hostname: Some("demo-host".to_string()),
            mac_address: None,
            time_of_creation: None,
        };
        let response = service.send_message(request).await?;
        log::info!(
            "Application {} accepted demo message {}",
            app.name,
            response.message_id
        );
    }

    println!(
        "Demo complete: {} messages stored, {} inbox deliveries, {} pushes sent",
        messages.saved_count(),
        inboxes.total_delivered(),
        push_gateway.push_count()
    );
    Ok(())
}
