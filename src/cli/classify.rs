//! `classify` command: show the probe strategy per identifier.

use crate::cli::args::{ClassifyArgs, OutputFormat};
use crate::core::classifier::{ProbeKind, classify};
use crate::error::Result;
use crate::render;

/// Pair every identifier with its probe strategy, keeping input order.
#[must_use]
pub fn classify_all(ids: &[String]) -> Vec<(String, ProbeKind)> {
    ids.iter().map(|id| (id.clone(), classify(id))).collect()
}

/// Execute the classify command. Needs no configuration or network.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn execute(args: &ClassifyArgs, format: OutputFormat, pretty: bool, no_color: bool) -> Result<()> {
    let rows = classify_all(&args.ids);
    let output = render::render_classification(&rows, format, pretty, no_color)?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_input_order() {
        let ids = vec![
            "whisper-1".to_string(),
            "gpt-4".to_string(),
            "text-embedding-3-small".to_string(),
        ];
        let kinds: Vec<ProbeKind> = classify_all(&ids).into_iter().map(|(_, k)| k).collect();
        assert_eq!(kinds, vec![ProbeKind::NonChat, ProbeKind::Chat, ProbeKind::NonChat]);
    }
}
