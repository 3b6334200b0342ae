use clap::{Parser, Subcommand};
use crate::config::WalletConfig;
use crate::messages::{JettonTransfer, NftTransfer, build_comment_cell};
use crate::tvm::{Address, boc_to_base64};
use crate::utils::format_ton;
use crate::wallet::Wallet;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// tonwallet-rs CLI
#[derive(Parser, Debug)]
#[command(name = "tonwallet-rs")]
#[command(about = "Batched jetton and NFT transfers from a V5R1 wallet", long_about = None)]
pub struct Cli {
    /// Wallet config file (JSON)
    #[arg(short = 'c', long, global = true, default_value = "wallet.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the wallet balance
    Balance,
    /// Show the wallet public key, or the key stored in another wallet contract
    PublicKey {
        /// Wallet contract to query
        #[arg(short = 'a', long)]
        address: Option<String>,
    },
    /// Send jettons to several recipients in one transaction
    TransferJetton {
        /// The sender's jetton wallet contract
        #[arg(short = 'j', long)]
        jetton_wallet: String,
        /// Receives excess gas
        #[arg(short = 'r', long)]
        response: String,
        /// JSON array of {"wallet", "amount", "message"}
        #[arg(short = 'f', long)]
        file: PathBuf,
        /// Confirmation timeout in seconds (config value by default)
        #[arg(short = 't', long)]
        timeout: Option<u64>,
    },
    /// Transfer several NFT items in one transaction
    TransferNft {
        /// Receives excess gas
        #[arg(short = 'r', long)]
        response: String,
        /// JSON array of {"address_nft", "address_target", "message"}
        #[arg(short = 'f', long)]
        file: PathBuf,
        /// Confirmation timeout in seconds (config value by default)
        #[arg(short = 't', long)]
        timeout: Option<u64>,
    },
    /// Print the BoC of a text comment cell (offline)
    CommentBoc {
        #[arg(long)]
        text: String,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    fn load_config(&self) -> Result<WalletConfig> {
        WalletConfig::from_file(&self.config)
            .with_context(|| format!("cannot load config {}", self.config.display()))
    }

    fn create_wallet(&self, config: &WalletConfig) -> Result<Wallet> {
        let init_start = Instant::now();
        let wallet = Wallet::from_config(config)?;
        log::info!("Wallet {}", wallet.address());
        log::info!("⏱️  Wallet initialization: {:.3}s", init_start.elapsed().as_secs_f64());
        Ok(wallet)
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Balance => self.execute_balance().await,
            Commands::PublicKey { address } => self.execute_public_key(address.as_deref()).await,
            Commands::TransferJetton {
                jetton_wallet,
                response,
                file,
                timeout,
            } => {
                self.execute_transfer_jetton(jetton_wallet, response, file, *timeout)
                    .await
            }
            Commands::TransferNft {
                response,
                file,
                timeout,
            } => self.execute_transfer_nft(response, file, *timeout).await,
            Commands::CommentBoc { text } => self.execute_comment_boc(text),
        }
    }

    async fn execute_balance(&self) -> Result<()> {
        let config = self.load_config()?;
        let wallet = self.create_wallet(&config)?;

        let op_start = Instant::now();
        let balance = wallet.balance().await?;
        log::info!("⏱️  get_balance: {:.3}s", op_start.elapsed().as_secs_f64());

        println!("{} nanoton ({} TON)", balance, format_ton(balance));
        Ok(())
    }

    async fn execute_public_key(&self, address: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let wallet = self.create_wallet(&config)?;

        let key = match address {
            Some(address) => {
                let address = Address::parse(address)?;
                let op_start = Instant::now();
                let key = wallet.public_key_of(&address).await?;
                log::info!("⏱️  get_public_key: {:.3}s", op_start.elapsed().as_secs_f64());
                key
            }
            None => wallet.public_key(),
        };

        println!("{}", hex::encode(key));
        Ok(())
    }

    fn timeout(config: &WalletConfig, timeout: Option<u64>) -> Duration {
        timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.confirmation_timeout())
    }

    async fn execute_transfer_jetton(
        &self,
        jetton_wallet: &str,
        response: &str,
        file: &Path,
        timeout: Option<u64>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let transfers: Vec<JettonTransfer> = read_json(file)?;
        let wallet = self.create_wallet(&config)?;

        log::info!("Sending {} jetton transfer(s)", transfers.len());
        let op_start = Instant::now();
        let tx = wallet
            .transfer_jetton(jetton_wallet, response, &transfers, Self::timeout(&config, timeout))
            .await?;
        log::info!("⏱️  transfer_jetton: {:.3}s", op_start.elapsed().as_secs_f64());

        println!("{tx}");
        Ok(())
    }

    async fn execute_transfer_nft(
        &self,
        response: &str,
        file: &Path,
        timeout: Option<u64>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let transfers: Vec<NftTransfer> = read_json(file)?;
        let wallet = self.create_wallet(&config)?;

        log::info!("Sending {} NFT transfer(s)", transfers.len());
        let op_start = Instant::now();
        let tx = wallet
            .transfer_nft(response, &transfers, Self::timeout(&config, timeout))
            .await?;
        log::info!("⏱️  transfer_nft: {:.3}s", op_start.elapsed().as_secs_f64());

        println!("{tx}");
        Ok(())
    }

    fn execute_comment_boc(&self, text: &str) -> Result<()> {
        let cell = build_comment_cell(text)?;
        log::debug!("Comment cell hash {}", hex::encode(cell.hash()));
        println!("{}", boc_to_base64(&cell, false)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfer_jetton() {
        let cli = Cli::try_parse_from([
            "tonwallet-rs",
            "transfer-jetton",
            "--jetton-wallet",
            "EQJ",
            "-r",
            "EQR",
            "--file",
            "payouts.json",
            "--config",
            "prod.json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("prod.json"));
        match cli.command {
            Commands::TransferJetton {
                jetton_wallet,
                response,
                file,
                timeout,
            } => {
                assert_eq!(jetton_wallet, "EQJ");
                assert_eq!(response, "EQR");
                assert_eq!(file, PathBuf::from("payouts.json"));
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["tonwallet-rs", "balance"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("wallet.json"));
        assert!(matches!(cli.command, Commands::Balance));
    }

    #[test]
    fn test_comment_boc_runs_offline() {
        let cli = Cli::try_parse_from(["tonwallet-rs", "comment-boc", "--text", "hello"]).unwrap();
        assert!(cli.execute_comment_boc("hello").is_ok());
    }
}
