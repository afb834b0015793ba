use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use job_search_kernel::{CredentialStore, Removal};

/// `--save-key`: prompt for a key and store it, replacing any previous one.
pub fn save(store: &CredentialStore, input: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Enter your Anthropic API key:")?;
    let saved = store
        .prompt_and_save(input, out)
        .with_context(|| format!("failed to save API key to {}", store.path().display()))?;
    if saved.is_none() {
        writeln!(out, "No API key entered.")?;
    }
    Ok(())
}

/// `--reset-key`: delete the stored key.
pub fn reset(store: &CredentialStore, out: &mut impl Write) -> Result<()> {
    let removal = store
        .remove()
        .with_context(|| format!("failed to remove {}", store.path().display()))?;
    match removal {
        Removal::Removed => writeln!(out, "API key removed successfully!")?,
        Removal::NothingStored => writeln!(out, "No API key found to remove.")?,
    }
    Ok(())
}
