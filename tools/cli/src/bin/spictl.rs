// CLASSIFICATION: COMMUNITY
// Filename: spictl.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use cohesix_spi::hal::SimHal;
use cohesix_spi::{
    BoardConfig, DirectHandle, ModeFlags, RemoteHandle, SpiCfg, SpiHandle, SpiHost, SpiMsg,
    TransferMode,
};

#[derive(Parser)]
#[command(about = "Drive SPI buses of a simulated board")]
struct Cli {
    /// Board description (TOML)
    #[arg(long)]
    config: PathBuf,
    /// Go through the dispatch service thread instead of calling the controller
    #[arg(long)]
    remote: bool,
    /// Wire every bus in loopback so reads return what was written
    #[arg(long)]
    loopback: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write and/or read one chip-select
    Transfer {
        #[arg(long)]
        bus: u32,
        #[arg(long, default_value_t = 0)]
        cs: u32,
        /// Bytes to write, as hex
        #[arg(long)]
        write: Option<String>,
        /// Bytes to read after the write
        #[arg(long)]
        read: Option<usize>,
    },
    /// Print the bus configuration
    GetCfg {
        #[arg(long)]
        bus: u32,
        #[arg(long, default_value_t = 0)]
        cs: u32,
    },
    /// Replace the bus configuration, then print it
    SetCfg {
        #[arg(long)]
        bus: u32,
        #[arg(long, default_value_t = 0)]
        cs: u32,
        #[arg(long)]
        speed: u32,
        #[arg(long, default_value_t = 0)]
        mode: u16,
        /// interrupt, polling or dma
        #[arg(long, default_value = "polling")]
        transfer_mode: String,
        #[arg(long, default_value_t = 8)]
        bits: u8,
    },
}

fn parse_transfer_mode(name: &str) -> anyhow::Result<TransferMode> {
    match name {
        "interrupt" => Ok(TransferMode::Interrupt),
        "polling" => Ok(TransferMode::Polling),
        "dma" => Ok(TransferMode::Dma),
        other => Err(anyhow!("unknown transfer mode {other}")),
    }
}

fn parse_write(text: &str) -> anyhow::Result<Vec<u8>> {
    hex::decode(text).context("--write is not hex")
}

fn print_cfg(cfg: &SpiCfg) {
    println!(
        "speed={} mode={:#06x} (spi mode {}) transfer={:?} bits={}",
        cfg.max_speed_hz,
        cfg.mode.bits(),
        cfg.mode.mode_number(),
        cfg.transfer_mode,
        cfg.bits_per_word
    );
}

fn run(handle: &impl SpiHandle, cmd: &Cmd) -> anyhow::Result<()> {
    match cmd {
        Cmd::Transfer { write, read, .. } => {
            let tx = match write {
                Some(text) => parse_write(text)?,
                None => Vec::new(),
            };
            let mut rx = vec![0u8; read.unwrap_or(0)];
            let mut msgs = Vec::new();
            if write.is_some() {
                msgs.push(SpiMsg::write(&tx));
            }
            if read.is_some() {
                msgs.push(SpiMsg::read(&mut rx));
            }
            if msgs.is_empty() {
                return Err(anyhow!("nothing to do: pass --write and/or --read"));
            }
            handle.transfer(&mut msgs)?;
            drop(msgs);
            if read.is_some() {
                println!("{}", hex::encode(&rx));
            }
        }
        Cmd::GetCfg { .. } => print_cfg(&handle.get_cfg()?),
        Cmd::SetCfg {
            speed,
            mode,
            transfer_mode,
            bits,
            ..
        } => {
            let cfg = SpiCfg {
                max_speed_hz: *speed,
                mode: ModeFlags::from_bits_retain(*mode),
                transfer_mode: parse_transfer_mode(transfer_mode)?,
                bits_per_word: *bits,
            };
            handle.set_cfg(&cfg)?;
            print_cfg(&handle.get_cfg()?);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut board = BoardConfig::load(&cli.config)?;
    if cli.loopback {
        for bus in &mut board.buses {
            bus.mode |= ModeFlags::LOOP;
        }
    }
    let mut host = SpiHost::start(&board, cli.remote, |_| Ok(SimHal::new().0))?;

    let (bus, cs) = match &cli.cmd {
        Cmd::Transfer { bus, cs, .. } | Cmd::GetCfg { bus, cs } | Cmd::SetCfg { bus, cs, .. } => {
            (*bus, *cs)
        }
    };
    let result = if cli.remote {
        let handle = RemoteHandle::open_with_prefix(host.prefix(), bus, cs)?;
        run(&handle, &cli.cmd).and_then(|()| handle.close().map_err(Into::into))
    } else {
        let handle = DirectHandle::open_with_prefix(host.prefix(), bus, cs)?;
        run(&handle, &cli.cmd).and_then(|()| handle.close().map_err(Into::into))
    };
    host.shutdown()?;
    result
}
