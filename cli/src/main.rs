use clap::{Parser, Subcommand};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use voicelink_core::channel::{count_bit_errors, transmit_with_rng};
use voicelink_core::quantize::quantized_from_values;
use voicelink_core::{
    Decoder, Encoder, Features, LinkConfig, LinkError, PacketCodec, TemplateLibrary,
};

#[derive(Parser)]
#[command(name = "voicelink")]
#[command(about = "Narrowband voice-command link simulator")]
struct Cli {
    /// JSON configuration file (quantization, packet, channel, matcher)
    #[arg(long, global = true, value_name = "CONFIG.JSON")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize a feature matrix and write it as a packet
    Tx {
        /// Feature matrix as a JSON array of frames
        #[arg(value_name = "FEATURES.JSON")]
        input: PathBuf,

        /// Output packet file
        #[arg(value_name = "OUTPUT.BIN")]
        output: PathBuf,

        /// Packet sequence number
        #[arg(long, default_value = "1")]
        seq: u16,

        /// Command id carried in the header
        #[arg(long, default_value = "0")]
        cmd_id: u8,

        /// Input already holds int8 values; skip quantization
        #[arg(long)]
        quantized: bool,
    },

    /// Send a packet through the channel, decode it and recognize the command
    Rx {
        /// Packet file produced by `tx`
        #[arg(value_name = "PACKET.BIN")]
        input: PathBuf,

        /// Enrolled templates (JSON)
        #[arg(long, value_name = "TEMPLATES.JSON")]
        templates: PathBuf,

        /// Channel Eb/N0 in dB
        #[arg(long, allow_negative_numbers = true)]
        ebn0: Option<f64>,

        /// DTW band half-width
        #[arg(long)]
        band: Option<usize>,

        /// RNG seed for the channel noise
        #[arg(long)]
        seed: Option<u64>,

        /// Bypass the noisy channel
        #[arg(long)]
        clean: bool,
    },

    /// Measure bit error rate and packet rejections over repeated trials
    Ber {
        /// Packet (or any binary) file to send
        #[arg(value_name = "INPUT.BIN")]
        input: PathBuf,

        /// Eb/N0 values in dB
        #[arg(
            long,
            num_args = 1..,
            allow_negative_numbers = true,
            default_values_t = [-5.0, 0.0, 5.0, 10.0]
        )]
        ebn0: Vec<f64>,

        /// Trials per Eb/N0 value
        #[arg(long, default_value = "1000")]
        trials: usize,

        /// RNG seed for the channel noise
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Link(#[from] LinkError),
}

type Result<T> = std::result::Result<T, CliError>;

/// One command in the templates file; order in the file is match priority
#[derive(Deserialize)]
struct TemplateEntry {
    command: String,
    references: Vec<Vec<Vec<f32>>>,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => read_json::<LinkConfig>(path)?,
        None => LinkConfig::default(),
    };
    debug!("config: {:?}", config);

    match cli.command {
        Commands::Tx {
            input,
            output,
            seq,
            cmd_id,
            quantized,
        } => tx_command(&config, &input, &output, seq, cmd_id, quantized)?,
        Commands::Rx {
            input,
            templates,
            ebn0,
            band,
            seed,
            clean,
        } => {
            let mut config = config;
            if let Some(ebn0) = ebn0 {
                config.channel.eb_n0_db = ebn0;
            }
            if band.is_some() {
                config.matcher.band = band;
            }
            if seed.is_some() {
                config.channel.seed = seed;
            }
            rx_command(&config, &input, &templates, clean)?
        }
        Commands::Ber {
            input,
            ebn0,
            trials,
            seed,
        } => ber_command(&config, &input, &ebn0, trials, seed.or(config.channel.seed))?,
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn channel_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn load_templates(path: &Path) -> Result<TemplateLibrary> {
    let entries: Vec<TemplateEntry> = read_json(path)?;
    let mut library = TemplateLibrary::new();
    for entry in entries {
        for reference in entry.references {
            library.insert(entry.command.as_str(), Features::from_rows(reference)?);
        }
    }
    info!(
        "Loaded {} templates for {} commands from {}",
        library.reference_count(),
        library.len(),
        path.display()
    );
    Ok(library)
}

fn tx_command(
    config: &LinkConfig,
    input_path: &Path,
    output_path: &Path,
    seq: u16,
    cmd_id: u8,
    quantized: bool,
) -> Result<()> {
    let encoder = Encoder::new(config.packet, config.quantization)?;

    let packet = if quantized {
        let rows: Vec<Vec<i64>> = read_json(input_path)?;
        encoder.encode_quantized(&quantized_from_values(rows)?, seq, cmd_id)?
    } else {
        let rows: Vec<Vec<f32>> = read_json(input_path)?;
        let features = Features::from_rows(rows)?;
        println!(
            "Read {} frames x {} dims from {}",
            features.n_frames(),
            features.dim(),
            input_path.display()
        );
        encoder.encode(&features, seq, cmd_id)?
    };

    std::fs::write(output_path, &packet).map_err(|source| CliError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;
    println!("Packet bytes: {}", packet.len());
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn rx_command(
    config: &LinkConfig,
    input_path: &Path,
    templates_path: &Path,
    clean: bool,
) -> Result<()> {
    let raw = read_file(input_path)?;
    let templates = load_templates(templates_path)?;

    let received = if clean {
        raw
    } else {
        let mut rng = channel_rng(config.channel.seed);
        let received = transmit_with_rng(&raw, config.channel.eb_n0_db, &mut rng);
        println!(
            "Channel: Eb/N0 {:.1} dB, {} bit errors",
            config.channel.eb_n0_db,
            count_bit_errors(&raw, &received)
        );
        received
    };

    let decoder = Decoder::new(config.packet, config.quantization, config.matcher, templates);
    let reception = decoder.decode(&received)?;
    println!(
        "cmd={} dist={:.2} seq={} frames={}",
        reception.recognition.command,
        reception.recognition.distance,
        reception.header.seq,
        reception.header.n_frames
    );
    Ok(())
}

fn ber_command(
    config: &LinkConfig,
    input_path: &Path,
    ebn0_values: &[f64],
    trials: usize,
    seed: Option<u64>,
) -> Result<()> {
    let data = read_file(input_path)?;
    let codec = PacketCodec::new(&config.packet);
    let mut rng = channel_rng(seed);
    let total_bits = data.len() * 8 * trials;

    println!(
        "{:>8} {:>12} {:>8} {:>10} {:>8}",
        "Eb/N0", "BER", "ok", "rejected", "crc"
    );
    for &eb_n0_db in ebn0_values {
        let mut bit_errors = 0usize;
        let mut ok = 0usize;
        let mut rejections: BTreeMap<&'static str, usize> = BTreeMap::new();

        for _ in 0..trials {
            let received = transmit_with_rng(&data, eb_n0_db, &mut rng);
            bit_errors += count_bit_errors(&data, &received);
            match codec.decode(&received) {
                Ok(_) => ok += 1,
                Err(e) => *rejections.entry(rejection_kind(&e)).or_default() += 1,
            }
        }

        let ber = if total_bits == 0 {
            0.0
        } else {
            bit_errors as f64 / total_bits as f64
        };
        println!(
            "{:>8.1} {:>12.3e} {:>8} {:>10} {:>8}",
            eb_n0_db,
            ber,
            ok,
            trials - ok,
            rejections.get("crc").copied().unwrap_or(0)
        );
        for (kind, count) in &rejections {
            debug!("  {}: {}", kind, count);
        }
    }
    Ok(())
}

fn rejection_kind(error: &LinkError) -> &'static str {
    match error {
        LinkError::PacketTooShort { .. } => "too short",
        LinkError::MagicMismatch { .. } => "magic",
        LinkError::LengthMismatch { .. } => "length",
        LinkError::CrcMismatch { .. } => "crc",
        _ => "other",
    }
}
