/// Which debug stream a toggle applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugTarget {
    Frontend,
    Backend,
}

/// All possible messages that drive state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    // -- Lifecycle
    Setup,
    RefreshInfo,
    RefreshProfiles,

    // -- Settings
    LoadSettings,
    SaveSettings,
    SetDebug(DebugTarget, bool),
    SelectProfile(String),
    UpdateProfile,

    // -- Profile server
    StartServer,
    StopServer,
    CheckServer,

    // -- Services
    StartService(String),
    StopService(String),
    CheckServiceExists(String),
    InstallService,
    UninstallService,
    CheckResolved,
    RestoreResolved,
    DisableResolved,

    // -- System
    Command(String),
    Help,
    Quit,
}

/// Parse one line of driver input into a message.
pub fn parse_command(raw: &str) -> Result<Msg, String> {
    let words: Vec<&str> = raw.split_whitespace().collect();

    let msg = match words.as_slice() {
        ["refresh"] => Msg::RefreshInfo,
        ["profiles"] => Msg::RefreshProfiles,
        ["load"] => Msg::LoadSettings,
        ["save"] => Msg::SaveSettings,
        ["debug", target, state] => {
            let target = match *target {
                "frontend" => DebugTarget::Frontend,
                "backend" => DebugTarget::Backend,
                other => return Err(format!("unknown debug target: {other}")),
            };
            Msg::SetDebug(target, parse_switch(state)?)
        }
        ["profile", name] => Msg::SelectProfile((*name).to_string()),
        ["update-profile"] => Msg::UpdateProfile,
        ["server", "start"] => Msg::StartServer,
        ["server", "stop"] => Msg::StopServer,
        ["server", "check"] => Msg::CheckServer,
        ["service", "start", name] => Msg::StartService((*name).to_string()),
        ["service", "stop", name] => Msg::StopService((*name).to_string()),
        ["service", "exists", name] => Msg::CheckServiceExists((*name).to_string()),
        ["install"] => Msg::InstallService,
        ["uninstall"] => Msg::UninstallService,
        ["resolved", "check"] => Msg::CheckResolved,
        ["resolved", "restore"] => Msg::RestoreResolved,
        ["resolved", "disable"] => Msg::DisableResolved,
        ["help"] => Msg::Help,
        ["quit"] | ["q"] => Msg::Quit,
        [] => return Err("empty command".to_string()),
        _ => return Err(format!("unknown command: {}", raw.trim())),
    };

    Ok(msg)
}

fn parse_switch(raw: &str) -> Result<bool, String> {
    match raw {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on/off, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_debug_toggles() {
        assert_eq!(
            parse_command("debug frontend off"),
            Ok(Msg::SetDebug(DebugTarget::Frontend, false))
        );
        assert_eq!(
            parse_command("  debug backend on "),
            Ok(Msg::SetDebug(DebugTarget::Backend, true))
        );
        assert!(parse_command("debug kernel on").is_err());
        assert!(parse_command("debug frontend maybe").is_err());
    }

    #[test]
    fn parses_service_commands_with_names() {
        assert_eq!(
            parse_command("service start tunup"),
            Ok(Msg::StartService("tunup".to_string()))
        );
        assert_eq!(
            parse_command("service exists systemd-resolved"),
            Ok(Msg::CheckServiceExists("systemd-resolved".to_string()))
        );
        assert!(parse_command("service start").is_err());
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("server start"), Ok(Msg::StartServer));
        assert_eq!(parse_command("resolved restore"), Ok(Msg::RestoreResolved));
        assert_eq!(parse_command("profile home"), Ok(Msg::SelectProfile("home".into())));
        assert_eq!(parse_command("q"), Ok(Msg::Quit));
    }

    #[test]
    fn rejects_empty_and_unknown() {
        assert_eq!(parse_command("   "), Err("empty command".to_string()));
        assert_eq!(
            parse_command("reboot now"),
            Err("unknown command: reboot now".to_string())
        );
    }
}
