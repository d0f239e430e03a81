use chrono::Local;
use clap::{Parser, Subcommand};
use log::{error, info};
use whatsapp_pairing::config::{DEFAULT_API_BASE_URL, DEFAULT_EVENTS_URL};
use whatsapp_pairing::transport::{TokioWebSocketTransportFactory, UreqHttpClient};
use whatsapp_pairing::{ConnectionForm, DialogState, PairingConfig, PairingConsole};

// Pairing console for the WhatsApp connection service.
//
// Usage:
//   cargo run -- pair 51987654321
//   cargo run -- status 51987654321
//   cargo run -- add --name "Sales desk" --country-code 51 --phone 987654321 --color '#25d366'
//   cargo run -- delete 7

#[derive(Parser, Debug)]
#[command(name = "pairing-cli", version, about = "Pair WhatsApp numbers with the connection service")]
struct Cli {
    /// Base URL of the connection service REST API.
    #[arg(long, env = "PAIRING_API_URL", default_value = DEFAULT_API_BASE_URL)]
    api_url: String,

    /// Pairing-events WebSocket endpoint.
    #[arg(long, env = "PAIRING_WS_URL", default_value = DEFAULT_EVENTS_URL)]
    ws_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the pairing dialog and wait for Ctrl-C.
    Pair { phone: String },
    /// Print whether a number is already authenticated.
    Status { phone: String },
    /// Register a new connection.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        country_code: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        color: String,
    },
    /// Delete a connection by id.
    Delete { id: i64 },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PairingConfig::default()
        .with_api_base_url(cli.api_url)
        .with_events_url(cli.ws_url);

    let console = PairingConsole::builder()
        .with_transport_factory(TokioWebSocketTransportFactory::new(config.events_url.clone()))
        .with_http_client(UreqHttpClient::new())
        .with_config(config)
        .build()?;

    match cli.command {
        Command::Pair { phone } => {
            let coordinator = console.coordinator();
            if coordinator.open_dialog(&phone).await == DialogState::Authenticated {
                return Ok(());
            }

            info!("Waiting for the QR code to be scanned. Press Ctrl-C to stop.");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {e}");
            }
            coordinator.close_dialog().await;
        }
        Command::Status { phone } => {
            let status = console
                .coordinator()
                .poller()
                .check_status(&phone)
                .await?;
            if status.is_authenticated {
                info!("{phone} is authenticated");
            } else {
                info!("{phone} is not authenticated");
            }
        }
        Command::Add {
            name,
            country_code,
            phone,
            color,
        } => {
            let form = ConnectionForm {
                name,
                country_code,
                phone_number: phone,
                color,
            };
            let connection = console.add_connection(&form).await?.connection;
            info!(
                "Created connection {} ({}) for {}",
                connection.id, connection.name, connection.phone_number
            );
        }
        Command::Delete { id } => {
            console.delete_connection(id).await?;
        }
    }

    Ok(())
}
