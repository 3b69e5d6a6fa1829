//! Line-oriented game loop.
//!
//! Every input line is either a `#` command or a player action of the form
//! `action details`. Output lines are tagged (`[NARRATOR]`, `[STATUS]`,
//! `[ERROR]`, ...) so scripts can follow along.

use rpg_core::session::parse_provider;
use rpg_core::{GameSession, Response, SessionConfig, SessionError};
use std::io::{self, BufRead, Write};

/// Run the game until `#quit` or end of input.
pub async fn run_headless<R: BufRead, W: Write>(
    config: SessionConfig,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    let mut session = match GameSession::start(config).await {
        Ok(session) => session,
        Err(e) => {
            writeln!(out, "[ERROR] Could not start game: {e}")?;
            return Err(io::Error::other(e));
        }
    };

    writeln!(out, "=== Text RPG ===")?;
    writeln!(out, "{}", session.character().status_line())?;
    writeln!(out, "Location: {}", session.current_location())?;
    if !session.has_narrator() {
        writeln!(out, "(narrator offline, using canned descriptions)")?;
    }
    writeln!(out)?;
    print_commands(out)?;
    writeln!(out)?;
    writeln!(out, "Enter your actions (one per line):")?;
    writeln!(out)?;
    out.flush()?;

    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "failed to read input");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.split_whitespace().next() {
                Some("quit") | Some("exit") => {
                    writeln!(out, "Goodbye!")?;
                    break;
                }
                Some("status") => {
                    writeln!(out, "[STATUS]")?;
                    for row in session.status().lines() {
                        writeln!(out, "  {row}")?;
                    }
                }
                Some("reset") => match session.reset().await {
                    Ok(()) => {
                        writeln!(out, "[RESET] A new adventure begins.")?;
                        writeln!(out, "[STATUS] {}", session.character().status_line())?;
                    }
                    Err(e) => writeln!(out, "[ERROR] Reset failed: {e}")?,
                },
                Some("help") => {
                    writeln!(out, "[HELP]")?;
                    print_commands(out)?;
                    writeln!(out, "  (anything else is sent as a player action)")?;
                }
                _ => writeln!(out, "[ERROR] Unknown command. Type #help for help.")?,
            }
            out.flush()?;
            continue;
        }

        let (action, details) = split_action(line);
        let response = session.player_action(action, details).await;
        print_response(out, &session, &response)?;
        out.flush()?;
    }

    Ok(())
}

fn print_commands<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "  #quit    - Exit the game")?;
    writeln!(out, "  #status  - Show character and location")?;
    writeln!(out, "  #reset   - Delete this save and start over")?;
    writeln!(out, "  #help    - Show this help")
}

fn print_response<W: Write>(
    out: &mut W,
    session: &GameSession,
    response: &Response,
) -> io::Result<()> {
    let outcome = &response.outcome;
    if outcome.success {
        writeln!(out, "[NARRATOR]")?;
    } else {
        writeln!(out, "[FAILED]")?;
    }
    for para in response.text().split("\n\n") {
        writeln!(out, "{para}")?;
    }
    // The narration may replace the mechanical message; keep the latter visible.
    if outcome.narration.is_some() && !outcome.message.is_empty() {
        writeln!(out, "[RESULT] {}", outcome.message.replace('\n', " "))?;
    }
    if let Some(roll) = &outcome.suggested_roll {
        writeln!(out, "[ROLL] {} ({} DC {})", roll.description, roll.attribute, roll.dc)?;
    }
    writeln!(out)?;

    if outcome.in_combat {
        let c = session.character();
        writeln!(
            out,
            "[COMBAT] HP: {}/{}, Stamina: {}/{}",
            c.current_hp, c.max_hp, c.current_stamina, c.max_stamina
        )?;
    }
    if !response.saved {
        writeln!(out, "[ERROR] Progress could not be saved")?;
    }
    Ok(())
}

/// Split `attack the goblin` into (`attack`, `the goblin`).
pub fn split_action(line: &str) -> (&str, &str) {
    match line.trim().split_once(char::is_whitespace) {
        Some((action, details)) => (action, details.trim()),
        None => (line.trim(), ""),
    }
}

/// Apply command line flags on top of `config`.
pub fn parse_config_from_args(
    args: &[String],
    mut config: SessionConfig,
) -> Result<SessionConfig, SessionError> {
    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--name", Some(name)) => {
                config = config.with_character_name(name.clone());
                i += 1;
            }
            ("--user", Some(user)) => {
                config.user_id = user.clone();
                i += 1;
            }
            ("--save-dir", Some(dir)) => {
                config = config.with_save_dir(dir.clone());
                i += 1;
            }
            ("--provider", Some(provider)) => {
                config = config.with_provider(parse_provider(provider)?);
                i += 1;
            }
            ("--model", Some(model)) => {
                config = config.with_model(model.clone());
                i += 1;
            }
            ("--seed", Some(seed)) => {
                match seed.parse::<u64>() {
                    Ok(seed) => config = config.with_seed(seed),
                    Err(_) => tracing::warn!(%seed, "ignoring invalid seed"),
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::Provider;
    use std::io::Cursor;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_action() {
        assert_eq!(split_action("move north"), ("move", "north"));
        assert_eq!(split_action("  attack the  goblin "), ("attack", "the  goblin"));
        assert_eq!(split_action("rest"), ("rest", ""));
    }

    #[test]
    fn test_parse_config_from_args() {
        let base = SessionConfig::new("player");
        let config = parse_config_from_args(
            &args(&[
                "rpg", "--name", "Thorin", "--user", "thorin", "--provider", "openrouter",
                "--model", "some/model", "--seed", "42",
            ]),
            base,
        )
        .unwrap();

        assert_eq!(config.character_name, "Thorin");
        assert_eq!(config.user_id, "thorin");
        assert_eq!(config.provider, Some(Provider::OpenRouter));
        assert_eq!(config.model.as_deref(), Some("some/model"));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_parse_config_rejects_unknown_provider() {
        let result = parse_config_from_args(
            &args(&["rpg", "--provider", "mystery"]),
            SessionConfig::new("player"),
        );
        assert!(matches!(result, Err(SessionError::UnknownProvider(_))));
    }

    #[test]
    fn test_parse_config_ignores_bad_seed_and_dangling_flag() {
        let config = parse_config_from_args(
            &args(&["rpg", "--seed", "lots", "--name"]),
            SessionConfig::new("player"),
        )
        .unwrap();
        assert_eq!(config.seed, None);
        assert_eq!(config.character_name, "Adventurer");
    }

    #[tokio::test]
    async fn test_scripted_session() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let config = SessionConfig::new("script")
            .with_character_name("Scripted")
            .with_save_dir(temp_dir.path())
            .with_provider(None)
            .with_seed(1);
        let input = Cursor::new("#help\nrest\n\n#status\n#bogus\n#quit\nmove north\n");
        let mut out = Vec::new();

        run_headless(config, input, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[HELP]"));
        assert!(text.contains("[NARRATOR]"));
        assert!(text.contains("[STATUS]"));
        assert!(text.contains("Scripted"));
        assert!(text.contains("[ERROR] Unknown command"));
        assert!(text.trim_end().ends_with("Goodbye!"));
        assert!(!text.contains("[ERROR] Progress"));
    }
}
