fn main() {
    if handle_cli_flags() {
        return;
    }

    if let Err(err) = skillhub_tui::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut saw_flag = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("skillhub-tui {}", skillhub_tui::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "skillhub-tui — Browse the Skillhub feed from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --check-updates      Check for updates and exit\n  --login <user-id> [auth-token]\n                       Save credentials to the config file and exit"
                );
                saw_flag = true;
            }
            "--check-updates" => {
                saw_flag = true;
                if let Err(err) = check_updates_once() {
                    eprintln!("Update check failed: {err:?}");
                    std::process::exit(1);
                }
            }
            "--login" => {
                saw_flag = true;
                let user_id = iter
                    .clone()
                    .next()
                    .filter(|value| !value.starts_with('-'))
                    .cloned();
                let Some(user_id) = user_id else {
                    eprintln!("Usage: skillhub-tui --login <user-id> [auth-token]");
                    std::process::exit(2);
                };
                iter.next();
                let auth_token = iter
                    .clone()
                    .next()
                    .filter(|value| !value.starts_with('-'))
                    .cloned();
                if auth_token.is_some() {
                    iter.next();
                }
                match skillhub_tui::config::save_credentials(
                    None,
                    &user_id,
                    auth_token.as_deref().unwrap_or(""),
                    "",
                ) {
                    Ok(path) => println!("Saved credentials to {}", path.display()),
                    Err(err) => {
                        eprintln!("Failed to save credentials: {err:?}");
                        std::process::exit(1);
                    }
                }
            }
            _ => {}
        }
    }
    saw_flag
}

fn check_updates_once() -> anyhow::Result<()> {
    use semver::Version;

    let skip_env = skillhub_tui::update::SKIP_UPDATE_ENV;
    if std::env::var(skip_env).is_ok() {
        println!("Update check skipped: {skip_env} is set.");
        return Ok(());
    }

    let current = Version::parse(skillhub_tui::VERSION)?;
    match skillhub_tui::update::check_for_update(&current)? {
        Some(info) => {
            let skillhub_tui::update::UpdateInfo {
                version,
                release_url,
            } = info;
            println!("Update available: {current} -> {version}\n{release_url}");
        }
        None => {
            println!("skillhub-tui {current} is up to date.");
        }
    }
    Ok(())
}
