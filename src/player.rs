use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::config::PlayerConfig;

/// Expands the configured command template for one playback URL. `%URL%`
/// placeholders are substituted; when the template carries none, the URL is
/// appended as the final argument.
pub fn build_command(template: &[String], url: &str) -> Result<Vec<String>> {
    if url.trim().is_empty() {
        bail!("player: video URL missing");
    }
    if template.is_empty() {
        bail!("player: video_command is empty");
    }

    let mut args: Vec<String> = template
        .iter()
        .map(|part| part.replace("%URL%", url.trim()))
        .collect();
    if !template.iter().any(|part| part.contains("%URL%")) {
        args.push(url.trim().to_string());
    }
    Ok(args)
}

/// Launches the configured external player for a video post. Detached mode
/// fires and forgets; otherwise the call blocks until the player exits and
/// reports a non-zero status as an error.
pub fn play(config: &PlayerConfig, url: &str) -> Result<()> {
    let args = build_command(&config.video_command, url)?;
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("player: video_command is empty"))?;

    let mut command = Command::new(program);
    command.args(rest);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    if config.video_detach {
        command
            .spawn()
            .with_context(|| format!("launch {} for {}", program, url))?;
        return Ok(());
    }

    let status = command
        .status()
        .with_context(|| format!("launch {} for {}", program, url))?;
    if !status.success() {
        bail!("player: {} exited with status {}", program, status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_url_placeholder() {
        let template = vec!["mpv".to_string(), "--fs".to_string(), "%URL%".to_string()];
        let args = build_command(&template, "https://cdn.test/clip.mp4").unwrap();
        assert_eq!(args, ["mpv", "--fs", "https://cdn.test/clip.mp4"]);
    }

    #[test]
    fn appends_url_when_template_has_no_placeholder() {
        let template = vec!["vlc".to_string(), "--play-and-exit".to_string()];
        let args = build_command(&template, "https://cdn.test/clip.mp4").unwrap();
        assert_eq!(args, ["vlc", "--play-and-exit", "https://cdn.test/clip.mp4"]);
    }

    #[test]
    fn rejects_blank_url_and_empty_template() {
        let template = vec!["mpv".to_string()];
        assert!(build_command(&template, "   ").is_err());
        assert!(build_command(&[], "https://cdn.test/clip.mp4").is_err());
    }

    #[test]
    fn trims_url_before_substitution() {
        let template = vec!["mpv".to_string(), "%URL%".to_string()];
        let args = build_command(&template, "  https://cdn.test/clip.mp4  ").unwrap();
        assert_eq!(args[1], "https://cdn.test/clip.mp4");
    }
}
