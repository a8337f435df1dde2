//! TESmart CLI
//!
//! Command-line interface for driving a switch.

use clap::{Parser, Subcommand, ValueEnum};
use crossbeam::channel::{self, Receiver};
use tesmart::protocol::decode;
use tesmart::{Config, Frame, Model, SwitchClient};
use tracing_subscriber::{fmt, EnvFilter};

/// TESmart HDMI switch CLI
#[derive(Parser, Debug)]
#[command(name = "tesmart-cli")]
#[command(about = "Control a TESmart HDMI matrix switch over TCP")]
#[command(version)]
struct Args {
    /// Switch host
    #[arg(long, default_value = "192.168.1.10")]
    host: String,

    /// Switch control port
    #[arg(short, long, default_value = "5000")]
    port: String,

    /// Hardware variant
    #[arg(short, long, value_enum, default_value_t = ModelArg::Sixteen)]
    model: ModelArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    Eight,
    Sixteen,
}

impl From<ModelArg> for Model {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Eight => Model::EightPort,
            ModelArg::Sixteen => Model::SixteenPort,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Switch to an input
    Switch {
        /// Input number, starting at 1
        #[arg(allow_negative_numbers = true)]
        input: i32,
    },

    /// Print the active input
    Current,

    /// Set the LED display timeout
    LedTimeout {
        /// Seconds (0 disables the timeout)
        #[arg(allow_negative_numbers = true)]
        seconds: i32,
    },

    /// Mute the buzzer
    Mute,

    /// Unmute the buzzer
    Unmute,

    /// Toggle automatic input detection (8-port model)
    AutoDetect {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Print status frames the switch pushes on its own
    Watch,
}

fn main() {
    // DEBUG in the environment turns on frame-level logging
    let default_filter = if std::env::var_os("DEBUG").is_some() {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let config = Config::builder()
        .host_port(&args.host, &args.port)
        .model(args.model.into())
        .build();

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> tesmart::Result<()> {
    let (pushed_tx, pushed_rx) = channel::unbounded();
    let client = SwitchClient::connect_with_observer(config, move |frame| {
        let _ = pushed_tx.send(frame);
    })?;

    match command {
        Commands::Switch { input } => {
            let active = client.switch_input(input)?;
            println!("Active input: {}", active);
        }
        Commands::Current => {
            let active = client.get_current_input()?;
            println!("Active input: {}", active);
        }
        Commands::LedTimeout { seconds } => client.set_led_timeout(seconds)?,
        Commands::Mute => client.mute_buzzer()?,
        Commands::Unmute => client.unmute_buzzer()?,
        Commands::AutoDetect { state: Toggle::On } => client.enable_auto_input_detection()?,
        Commands::AutoDetect { state: Toggle::Off } => client.disable_auto_input_detection()?,
        Commands::Watch => watch(&pushed_rx),
    }

    client.shutdown();
    Ok(())
}

/// Print pushed frames until the process is killed
fn watch(pushed: &Receiver<Frame>) {
    tracing::info!("Watching for input changes (Ctrl+C to stop)");
    for frame in pushed {
        match decode(frame.as_bytes()) {
            Ok(input) => println!("Input changed: {}", input),
            Err(e) => println!("Unrecognized frame {}: {}", frame, e),
        }
    }
}
