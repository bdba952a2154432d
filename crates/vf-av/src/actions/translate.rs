//! Subtitle translation through translate-shell (`trans`).

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::tools::ToolRegistry;

/// Translate a whole subtitle file: `trans :<code> -b -i <input> -o <output>`.
pub async fn translate_file(
    tools: &ToolRegistry,
    code: &str,
    input: &Path,
    output: &Path,
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<()> {
    let trans = tools.require("trans")?;
    tracing::info!("Translate: {:?} -> {:?} ({code})", input, output);

    let mut cmd = trans.command();
    cmd.args([format!(":{code}"), "-b".to_string(), "-i".to_string()]);
    cmd.arg_path(input).arg("-o").arg_path(output);
    cmd.execute_streaming(|_, line| tracing::debug!(tool = "trans", "{line}"), cancel)
        .await?;

    if !output.exists() {
        return Err(vf_core::Error::tool(
            "trans",
            format!("no translation written for {code}"),
        ));
    }
    Ok(())
}

/// Translate text fed on stdin (`trans :<code> -b`) and return stdout.
pub async fn translate_text(
    tools: &ToolRegistry,
    code: &str,
    text: &str,
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<String> {
    let trans = tools.require("trans")?;

    let mut cmd = trans.command();
    cmd.args([format!(":{code}"), "-b".to_string()]);
    cmd.stdin(text.as_bytes().to_vec());
    let output = cmd.execute_streaming(|_, _| {}, cancel).await?;
    Ok(output.stdout)
}
