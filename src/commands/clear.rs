// `clear` command: wipe the local profile and conversations.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::storage::Storage;
use crate::utils::config::Config;

pub fn run(config: &Config, yes: bool) -> Result<()> {
    let storage = Storage::new(config.data_dir.clone())?;

    if !yes {
        print!(
            "Delete all local data in {}? This cannot be undone. [y/N] ",
            storage.data_dir().display()
        );
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    storage.clear_all()?;
    println!("All local data cleared.");
    Ok(())
}
