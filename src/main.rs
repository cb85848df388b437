// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

extern crate clap;
extern crate clap_derive;
extern crate tokio;
extern crate tracing;
extern crate tracing_subscriber;

use catalog_admin::{
    Column, MemoryCatalog, ServerConfig, Session, SessionConfig, UserAttribute, start_http_server,
};
use clap::Parser;
use clap_derive::{Parser, Subcommand};
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(name = "catalog-admin", about = "Administer users and groups in a catalog zone")]
struct Args {
    #[arg(long, help = "Enable debug logging", default_value = "false")]
    debug: bool,

    #[arg(long, help = "Catalog host (overrides CATALOG_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Catalog port (overrides CATALOG_PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Identity to act as (overrides CATALOG_USER)")]
    user: Option<String>,

    #[arg(long, help = "Session home zone (overrides CATALOG_ZONE)")]
    home_zone: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the in-memory reference catalog over HTTP
    Serve {
        #[arg(long, help = "Listen address (overrides CATALOG_LISTEN)")]
        listen: Option<String>,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Manage groups and membership
    Group {
        #[command(subcommand)]
        action: GroupCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create {
        name: String,
        #[arg(long = "type", default_value = "rodsuser")]
        user_type: String,
        #[arg(long)]
        zone: Option<String>,
    },
    Get {
        name: String,
        #[arg(long)]
        zone: Option<String>,
    },
    /// Change one of: type, password, comment, info
    Modify {
        name: String,
        attribute: String,
        value: String,
        #[arg(long)]
        zone: Option<String>,
    },
    Remove {
        name: String,
        #[arg(long)]
        zone: Option<String>,
    },
    List {
        #[arg(long)]
        zone: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create {
        name: String,
        #[arg(long)]
        zone: Option<String>,
    },
    Get {
        name: String,
        #[arg(long)]
        zone: Option<String>,
    },
    Remove {
        name: String,
        #[arg(long)]
        zone: Option<String>,
    },
    AddMember {
        group: String,
        user: String,
        #[arg(long)]
        user_zone: Option<String>,
    },
    RemoveMember {
        group: String,
        user: String,
        #[arg(long)]
        user_zone: Option<String>,
    },
    Members {
        group: String,
        #[arg(long)]
        zone: Option<String>,
    },
}

fn main() -> Result<(), eyre::Error> {
    color_eyre::install()?;
    let args: Args = Args::parse();

    let main_subscriber = tracing_subscriber::fmt()
        .compact()
        .with_ansi(true)
        .with_file(true)
        .with_target(false)
        .with_line_number(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(main_subscriber)?;

    match args.command {
        Command::Serve { listen } => {
            let mut config = ServerConfig::from_env();
            if let Some(listen) = listen {
                config.listen = listen;
            }
            if let Some(zone) = args.home_zone {
                config.zone = zone;
            }
            serve(config)
        }
        Command::User { action } => {
            let session = connect(args.host, args.port, args.user, args.home_zone)?;
            run_user_command(session, action)
        }
        Command::Group { action } => {
            let session = connect(args.host, args.port, args.user, args.home_zone)?;
            run_group_command(session, action)
        }
    }
}

fn serve(config: ServerConfig) -> Result<(), eyre::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let mut hup_signal = signal(SignalKind::hangup())?;
        let mut stop_signal = signal(SignalKind::interrupt())?;

        let catalog = MemoryCatalog::with_admin(&config.zone, &config.admin_user);
        let server = tokio::spawn(async move {
            if let Err(e) = start_http_server(&config.listen, catalog, config.api_key).await {
                error!("HTTP server exited with error: {}", e);
            }
        });

        select! {
            _ = hup_signal.recv() => {
                info!("Received HUP signal, reloading configuration is not supported yet");
            },
            _ = stop_signal.recv() => {
                info!("Received STOP signal, shutting down...");
            },
            _ = server => {
                info!("HTTP server task exited");
            }
        }
        info!("Done");
        Ok::<(), eyre::Error>(())
    })
}

fn connect(
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    zone: Option<String>,
) -> Result<Session, eyre::Error> {
    let mut config = SessionConfig::from_env()?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(user) = user {
        config.user_name = user;
    }
    if let Some(zone) = zone {
        config.zone = zone;
    }
    Ok(Session::connect(config)?)
}

fn run_user_command(mut session: Session, action: UserCommand) -> Result<(), eyre::Error> {
    let users = session.users();
    match action {
        UserCommand::Create {
            name,
            user_type,
            zone,
        } => {
            users.create(&name, &user_type, zone.as_deref())?;
            println!("Created user {}", users.get(&name, zone.as_deref())?);
        }
        UserCommand::Get { name, zone } => {
            let user = users.get(&name, zone.as_deref())?;
            let row = session
                .query(&[
                    Column::UserId,
                    Column::UserType,
                    Column::UserComment,
                    Column::UserInfo,
                ])
                .filter_eq(Column::UserName, user.name())
                .filter_eq(Column::UserZone, user.zone())
                .one()?;
            println!("{user}");
            for (column, value) in row.iter() {
                println!("  {column}: {value}");
            }
        }
        UserCommand::Modify {
            name,
            attribute,
            value,
            zone,
        } => {
            let attribute: UserAttribute = attribute.parse()?;
            users.modify_attribute(&name, attribute, &value, zone.as_deref())?;
            println!("Modified {attribute} of {name}");
        }
        UserCommand::Remove { name, zone } => {
            users.remove(&name, zone.as_deref())?;
            println!("Removed user {name}");
        }
        UserCommand::List { zone } => {
            for user in users.list(zone.as_deref())? {
                println!("{user}");
            }
        }
    }
    session.cleanup()?;
    Ok(())
}

fn run_group_command(mut session: Session, action: GroupCommand) -> Result<(), eyre::Error> {
    let groups = session.groups();
    match action {
        GroupCommand::Create { name, zone } => {
            groups.create(&name, zone.as_deref())?;
            println!("Created group {}", groups.get(&name, zone.as_deref())?);
        }
        GroupCommand::Get { name, zone } => {
            println!("{}", groups.get(&name, zone.as_deref())?);
        }
        GroupCommand::Remove { name, zone } => {
            groups.remove(&name, zone.as_deref())?;
            println!("Removed group {name}");
        }
        GroupCommand::AddMember {
            group,
            user,
            user_zone,
        } => {
            groups.add_member(&group, &user, user_zone.as_deref())?;
            println!("Added {user} to {group}");
        }
        GroupCommand::RemoveMember {
            group,
            user,
            user_zone,
        } => {
            groups.remove_member(&group, &user, user_zone.as_deref())?;
            println!("Removed {user} from {group}");
        }
        GroupCommand::Members { group, zone } => {
            for member in groups.members(&group, zone.as_deref())? {
                println!("{member}");
            }
        }
    }
    session.cleanup()?;
    Ok(())
}
